//! Notification text for accepted leads.

use crate::validation::LeadSubmission;

const TITLE: &str = "🪄 Заявка на пробный урок";
const MISSING_EMAIL: &str = "-";

/// Text delivered to the notification channel for one accepted lead.
///
/// The only way to obtain one is [`NotificationMessage::for_lead`], so every
/// message describes a submission that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationMessage {
	text: String,
}

impl NotificationMessage {
	pub fn for_lead(lead: &LeadSubmission) -> Self {
		let text = format!(
			"{}\nИмя родителя: {}\nТелефон: {}\nВозраст ребёнка: {}\nEmail: {}",
			TITLE,
			lead.parent(),
			lead.phone(),
			lead.age(),
			lead.email().unwrap_or(MISSING_EMAIL),
		);
		Self { text }
	}

	pub fn text(&self) -> &str {
		&self.text
	}
}

impl From<&LeadSubmission> for NotificationMessage {
	fn from(lead: &LeadSubmission) -> Self {
		Self::for_lead(lead)
	}
}
