//! API types for the lead intake HTTP endpoint.
//!
//! The inbound body is kept loosely typed: browsers send `age` as either a
//! string or a number, and the honeypot field name is chosen per deployment,
//! so every field is held as a raw JSON value until sanitation.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Form fields consumed by the intake pipeline.
pub const FORM_FIELDS: [&str; 5] = ["parent", "phone", "age", "email", "ts"];

static NULL: Value = Value::Null;

/// Lead form submission as received on the wire.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawSubmission {
	/// Parent name
	pub parent: Value,
	/// Phone in `+7 (XXX) XXX-XX-XX` format
	pub phone: Value,
	/// Child age, string or number
	pub age: Value,
	/// Optional contact email
	pub email: Value,
	/// Form render timestamp in epoch milliseconds
	pub ts: Value,
	/// Any other fields, including the honeypot
	#[serde(flatten)]
	pub extra: Map<String, Value>,
}

impl RawSubmission {
	/// Looks up a field that is not part of the fixed form shape.
	pub fn extra_field(&self, name: &str) -> &Value {
		self.extra.get(name).unwrap_or(&NULL)
	}
}

/// Renders a JSON value as the text a form field would carry.
///
/// `null` becomes the empty string; strings are taken as-is; numbers and
/// booleans use their JSON spelling.
pub fn value_text(value: &Value) -> String {
	match value {
		Value::Null => String::new(),
		Value::String(s) => s.clone(),
		Value::Number(n) => n.to_string(),
		Value::Bool(b) => b.to_string(),
		other => other.to_string(),
	}
}

/// Whether a field carries anything a human could have typed.
pub fn is_filled(value: &Value) -> bool {
	match value {
		Value::Null => false,
		Value::Bool(b) => *b,
		Value::String(s) => !s.trim().is_empty(),
		Value::Number(n) => n.as_f64().map_or(true, |v| v != 0.0),
		Value::Array(items) => !items.is_empty(),
		Value::Object(fields) => !fields.is_empty(),
	}
}

/// Response envelope for every intake outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeadResponse {
	pub ok: bool,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub error: Option<String>,
}

impl LeadResponse {
	pub fn success() -> Self {
		Self {
			ok: true,
			error: None,
		}
	}

	pub fn failure(message: impl Into<String>) -> Self {
		Self {
			ok: false,
			error: Some(message.into()),
		}
	}
}

/// Liveness response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
	pub status: String,
	pub version: String,
}
