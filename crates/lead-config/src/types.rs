//! Configuration types for the intake service.
//!
//! Every section has defaults, so an empty file (or no file at all) yields
//! a runnable configuration apart from the Telegram credentials.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Complete intake service configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct IntakeConfig {
	/// HTTP listener settings
	#[serde(default)]
	pub server: ServerConfig,
	/// Origin policy and error disclosure
	#[serde(default)]
	pub security: SecurityConfig,
	/// Per-client request limiting
	#[serde(default)]
	pub rate_limit: RateLimitConfig,
	/// Honeypot and fill-time checks
	#[serde(default)]
	pub antibot: AntiBotConfig,
	/// Notification destination
	#[serde(default)]
	pub telegram: TelegramConfig,
	/// Log level and output format
	#[serde(default)]
	pub logging: LoggingConfig,
}

/// HTTP listener settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
	pub host: String,
	pub port: u16,
	/// Path the intake handler is mounted on
	pub route: String,
	/// Ceiling for the raw request body
	pub max_body_bytes: usize,
	/// Whole-request timeout
	pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
	fn default() -> Self {
		Self {
			host: "0.0.0.0".to_string(),
			port: 8080,
			route: "/api/lead".to_string(),
			max_body_bytes: 10 * 1024,
			request_timeout_secs: 30,
		}
	}
}

/// Which origins may submit the form.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum OriginPolicy {
	/// Reject any `Origin` whose host differs from the `Host` header.
	#[default]
	SameHost,
	/// Accept only listed origins and emit CORS headers; `fallback` is
	/// advertised to browsers when the request origin is not listed.
	AllowList { origins: Vec<String>, fallback: String },
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
	pub origin: OriginPolicy,
	/// Take the client identifier from `X-Forwarded-For` when present.
	pub trust_forwarded_for: bool,
	/// Field-specific validation messages instead of a generic one.
	pub verbose_errors: bool,
	/// Include a bounded excerpt of upstream failures in 502 responses.
	pub expose_upstream_errors: bool,
}

impl Default for SecurityConfig {
	fn default() -> Self {
		Self {
			origin: OriginPolicy::default(),
			trust_forwarded_for: true,
			verbose_errors: true,
			expose_upstream_errors: false,
		}
	}
}

/// Counting strategy for the rate limiter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowStrategy {
	/// Counter restarts once the window since its first request elapses.
	#[default]
	Fixed,
	/// Admission looks at request timestamps in the trailing window.
	Sliding,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
	pub enabled: bool,
	/// Requests allowed per window
	pub limit: u32,
	pub window_secs: u64,
	pub strategy: WindowStrategy,
	/// How often stale counters are dropped
	pub sweep_interval_secs: u64,
}

impl Default for RateLimitConfig {
	fn default() -> Self {
		Self {
			enabled: true,
			limit: 5,
			window_secs: 60,
			strategy: WindowStrategy::Fixed,
			sweep_interval_secs: 300,
		}
	}
}

/// What to do when the honeypot field is filled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HoneypotAction {
	/// Answer as if the lead was accepted, but send nothing.
	#[default]
	QuietSuccess,
	/// Answer with a generic 400.
	Reject,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AntiBotConfig {
	pub honeypot_field: String,
	pub honeypot_action: HoneypotAction,
	/// Minimum time between form render and submission
	pub min_fill_time_ms: u64,
}

impl Default for AntiBotConfig {
	fn default() -> Self {
		Self {
			honeypot_field: "website".to_string(),
			honeypot_action: HoneypotAction::QuietSuccess,
			min_fill_time_ms: 1500,
		}
	}
}

/// Telegram Bot API destination.
///
/// The token and chat id normally come from `TELEGRAM_BOT_TOKEN` and
/// `TELEGRAM_CHAT_ID` and are never serialized back out.
#[derive(Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TelegramConfig {
	pub api_base: String,
	#[serde(skip_serializing)]
	pub bot_token: Option<String>,
	#[serde(skip_serializing)]
	pub chat_id: Option<String>,
	pub parse_mode: Option<String>,
	pub timeout_secs: u64,
}

impl Default for TelegramConfig {
	fn default() -> Self {
		Self {
			api_base: "https://api.telegram.org".to_string(),
			bot_token: None,
			chat_id: None,
			parse_mode: None,
			timeout_secs: 10,
		}
	}
}

impl TelegramConfig {
	/// Token and chat id, if both are set and non-blank.
	pub fn credentials(&self) -> Option<(&str, &str)> {
		let token = self.bot_token.as_deref().map(str::trim).filter(|t| !t.is_empty())?;
		let chat_id = self.chat_id.as_deref().map(str::trim).filter(|c| !c.is_empty())?;
		Some((token, chat_id))
	}
}

impl fmt::Debug for TelegramConfig {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("TelegramConfig")
			.field("api_base", &self.api_base)
			.field("bot_token", &self.bot_token.as_ref().map(|_| "<redacted>"))
			.field("chat_id", &self.chat_id.as_ref().map(|_| "<redacted>"))
			.field("parse_mode", &self.parse_mode)
			.field("timeout_secs", &self.timeout_secs)
			.finish()
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
	#[default]
	Pretty,
	Json,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
	pub level: String,
	pub format: LogFormat,
}

impl Default for LoggingConfig {
	fn default() -> Self {
		Self {
			level: "info".to_string(),
			format: LogFormat::Pretty,
		}
	}
}
