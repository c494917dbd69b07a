//! Honeypot and minimum fill-time checks.

use lead_config::{AntiBotConfig, HoneypotAction};
use lead_types::{is_filled, IntakeError, RawSubmission, GENERIC_BAD_REQUEST};
use serde_json::Value;

/// Message returned when the form was submitted faster than a human could.
pub const TOO_FAST_MESSAGE: &str = "Too fast";

/// Result of the anti-bot screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screening {
	/// Looks human; continue with validation.
	Passed,
	/// Honeypot was filled; answer success without dispatching.
	Suppressed,
}

#[derive(Debug, Clone)]
pub struct AntiBot {
	honeypot_field: String,
	honeypot_action: HoneypotAction,
	min_fill_time_ms: u64,
}

impl AntiBot {
	pub fn new(config: &AntiBotConfig) -> Self {
		Self {
			honeypot_field: config.honeypot_field.trim().to_string(),
			honeypot_action: config.honeypot_action,
			min_fill_time_ms: config.min_fill_time_ms,
		}
	}

	/// Screens a submission received at `now_ms` (epoch milliseconds).
	///
	/// The honeypot is checked first so bots never learn about the timer.
	pub fn screen(&self, raw: &RawSubmission, now_ms: i64) -> Result<Screening, IntakeError> {
		if is_filled(raw.extra_field(&self.honeypot_field)) {
			return match self.honeypot_action {
				HoneypotAction::QuietSuccess => Ok(Screening::Suppressed),
				HoneypotAction::Reject => Err(IntakeError::bad_request(GENERIC_BAD_REQUEST)),
			};
		}

		let rendered_at = render_timestamp(&raw.ts)
			.ok_or_else(|| IntakeError::bad_request(TOO_FAST_MESSAGE))?;

		let elapsed = now_ms as f64 - rendered_at;
		if elapsed < self.min_fill_time_ms as f64 {
			return Err(IntakeError::bad_request(TOO_FAST_MESSAGE));
		}

		Ok(Screening::Passed)
	}
}

/// Reads the render timestamp; a missing value counts as the epoch.
///
/// Returns `None` when the value is present but not a finite number.
fn render_timestamp(ts: &Value) -> Option<f64> {
	let value = match ts {
		Value::Null => 0.0,
		Value::Number(n) => n.as_f64()?,
		Value::String(s) if s.trim().is_empty() => 0.0,
		Value::String(s) => s.trim().parse::<f64>().ok()?,
		_ => return None,
	};
	value.is_finite().then_some(value)
}
