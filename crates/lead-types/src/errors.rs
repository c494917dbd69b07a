//! Error types for the intake pipeline.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, IntakeError>;

/// Generic message used when validation detail is withheld.
pub const GENERIC_BAD_REQUEST: &str = "Bad request";

/// Message for any server-side failure whose detail stays in the logs.
pub const SERVER_ERROR: &str = "Server error";

/// Terminal outcome of a failed intake request.
///
/// Every variant maps to exactly one HTTP status. The `Display` text is for
/// logs; callers see [`IntakeError::public_message`].
#[derive(Error, Debug)]
pub enum IntakeError {
	#[error("Method not allowed")]
	MethodNotAllowed,

	#[error("Forbidden origin")]
	ForbiddenOrigin,

	#[error("Rate limit exceeded")]
	RateLimited,

	#[error("Bad request: {0}")]
	BadRequest(String),

	#[error("Missing server configuration")]
	MissingServerConfig,

	#[error("Upstream notification failure")]
	Upstream { excerpt: Option<String> },

	#[error("Request timed out")]
	TimedOut,

	#[error("Internal error: {0}")]
	Internal(String),
}

impl IntakeError {
	pub fn bad_request(message: impl Into<String>) -> Self {
		Self::BadRequest(message.into())
	}

	pub fn status_code(&self) -> u16 {
		match self {
			Self::MethodNotAllowed => 405,
			Self::ForbiddenOrigin => 403,
			Self::RateLimited => 429,
			Self::BadRequest(_) => 400,
			Self::MissingServerConfig => 500,
			Self::Upstream { .. } => 502,
			Self::TimedOut => 408,
			Self::Internal(_) => 500,
		}
	}

	/// Message safe to return to the client.
	///
	/// Server-side variants never carry internal detail.
	pub fn public_message(&self) -> String {
		match self {
			Self::MethodNotAllowed => "Method not allowed".to_string(),
			Self::ForbiddenOrigin => "Forbidden origin".to_string(),
			Self::RateLimited => "Too many requests, try later".to_string(),
			Self::BadRequest(message) => message.clone(),
			Self::MissingServerConfig => "Server misconfigured".to_string(),
			Self::Upstream { excerpt: Some(excerpt) } => {
				format!("Notification service error: {}", excerpt)
			}
			Self::Upstream { excerpt: None } => "Notification service error".to_string(),
			Self::TimedOut => "Request timeout".to_string(),
			Self::Internal(_) => SERVER_ERROR.to_string(),
		}
	}
}
