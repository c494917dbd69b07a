//! Validation of sanitized lead fields.

use crate::sanitize::{limits, sanitize};
use lead_types::{value_text, IntakeError, RawSubmission, GENERIC_BAD_REQUEST};
use regex::Regex;
use std::sync::LazyLock;

/// Youngest accepted child age.
pub const MIN_AGE: u8 = 7;
/// Oldest accepted child age.
pub const MAX_AGE: u8 = 13;
/// Shortest accepted parent name, in characters.
pub const MIN_NAME_CHARS: usize = 2;

static PHONE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r"^\+7 \([0-9]{3}\) [0-9]{3}-[0-9]{2}-[0-9]{2}$").expect("phone pattern is valid")
});

static EMAIL_PATTERN: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"^\S+@\S+\.\S+$").expect("email pattern is valid"));

pub const NAME_MESSAGE: &str = "Укажите имя";
pub const PHONE_MESSAGE: &str = "Телефон в формате +7 (XXX) XXX-XX-XX";
pub const AGE_MESSAGE: &str = "Возраст 7–13";
pub const EMAIL_MESSAGE: &str = "Неверный email";

/// A lead that passed sanitation and every validation predicate.
///
/// Only [`LeadValidator::validate`] produces values of this type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeadSubmission {
	parent: String,
	phone: String,
	age: u8,
	email: Option<String>,
}

impl LeadSubmission {
	pub fn parent(&self) -> &str {
		&self.parent
	}

	pub fn phone(&self) -> &str {
		&self.phone
	}

	pub fn age(&self) -> u8 {
		self.age
	}

	pub fn email(&self) -> Option<&str> {
		self.email.as_deref()
	}
}

/// Checks whether `phone` has the `+7 (XXX) XXX-XX-XX` shape.
pub fn is_valid_phone(phone: &str) -> bool {
	PHONE_PATTERN.is_match(phone)
}

/// Checks the permissive `local@domain.tld` shape.
pub fn is_valid_email(email: &str) -> bool {
	EMAIL_PATTERN.is_match(email)
}

/// Parses an age that must be a whole number within the accepted range.
pub fn parse_age(age: &str) -> Option<u8> {
	let value: f64 = age.parse().ok()?;
	if !value.is_finite() || value.fract() != 0.0 {
		return None;
	}
	if value < f64::from(MIN_AGE) || value > f64::from(MAX_AGE) {
		return None;
	}
	Some(value as u8)
}

/// Sanitizes and validates the form fields of a submission.
#[derive(Debug, Clone, Copy)]
pub struct LeadValidator {
	verbose_errors: bool,
}

impl LeadValidator {
	pub fn new(verbose_errors: bool) -> Self {
		Self { verbose_errors }
	}

	pub fn validate(&self, raw: &RawSubmission) -> Result<LeadSubmission, IntakeError> {
		let parent = sanitize(&value_text(&raw.parent), limits::PARENT);
		let phone = sanitize(&value_text(&raw.phone), limits::PHONE);
		let age = sanitize(&value_text(&raw.age), limits::AGE);
		let email = sanitize(&value_text(&raw.email), limits::EMAIL);

		if parent.chars().count() < MIN_NAME_CHARS {
			return Err(self.reject(NAME_MESSAGE));
		}

		if !is_valid_phone(&phone) {
			return Err(self.reject(PHONE_MESSAGE));
		}

		let age = parse_age(&age).ok_or_else(|| self.reject(AGE_MESSAGE))?;

		let email = if email.is_empty() {
			None
		} else if is_valid_email(&email) {
			Some(email)
		} else {
			return Err(self.reject(EMAIL_MESSAGE));
		};

		Ok(LeadSubmission {
			parent,
			phone,
			age,
			email,
		})
	}

	fn reject(&self, message: &str) -> IntakeError {
		if self.verbose_errors {
			IntakeError::bad_request(message)
		} else {
			IntakeError::bad_request(GENERIC_BAD_REQUEST)
		}
	}
}
