//! Notification delivery for accepted leads.
//!
//! A [`Notifier`] sends one message per call and never retries; callers
//! decide how a failure is surfaced.

use async_trait::async_trait;
use lead_core::NotificationMessage;
use thiserror::Error;

pub mod implementations;

pub use implementations::*;

/// Longest upstream error text kept for diagnostics, in characters.
pub const MAX_EXCERPT_CHARS: usize = 200;

#[derive(Error, Debug)]
pub enum DeliveryError {
	#[error("Notification rejected with status {status}: {body_excerpt}")]
	Rejected { status: u16, body_excerpt: String },

	#[error("Transport error: {0}")]
	Transport(String),

	#[error("Configuration error: {0}")]
	Configuration(String),
}

impl DeliveryError {
	/// Bounded upstream text suitable for a client-facing diagnostic.
	pub fn excerpt(&self) -> Option<&str> {
		match self {
			Self::Rejected { body_excerpt, .. } if !body_excerpt.is_empty() => Some(body_excerpt),
			_ => None,
		}
	}
}

pub type DeliveryResult<T> = Result<T, DeliveryError>;

/// Outbound channel for lead notifications.
#[async_trait]
pub trait Notifier: Send + Sync {
	fn name(&self) -> &str;

	/// Sends `message` exactly once.
	async fn send(&self, message: &NotificationMessage) -> DeliveryResult<()>;
}

/// Cuts `body` to at most `max_chars` characters.
pub fn excerpt(body: &str, max_chars: usize) -> String {
	let body = body.trim();
	match body.char_indices().nth(max_chars) {
		Some((cut, _)) => format!("{}…", &body[..cut]),
		None => body.to_string(),
	}
}
