//! Telegram Bot API notifier.

use crate::{excerpt, DeliveryError, DeliveryResult, Notifier, MAX_EXCERPT_CHARS};
use async_trait::async_trait;
use lead_config::TelegramConfig;
use lead_core::NotificationMessage;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

#[derive(Debug, Serialize)]
struct SendMessage<'a> {
	chat_id: &'a str,
	text: &'a str,
	#[serde(skip_serializing_if = "Option::is_none")]
	parse_mode: Option<&'a str>,
}

/// Sends notifications through `POST {api_base}/bot{token}/sendMessage`.
#[derive(Clone)]
pub struct TelegramNotifier {
	client: reqwest::Client,
	endpoint: String,
	chat_id: String,
	parse_mode: Option<String>,
}

impl std::fmt::Debug for TelegramNotifier {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("TelegramNotifier")
			.field("parse_mode", &self.parse_mode)
			.finish_non_exhaustive()
	}
}

impl TelegramNotifier {
	pub fn new(
		api_base: &str,
		bot_token: &str,
		chat_id: impl Into<String>,
		parse_mode: Option<String>,
		timeout: Duration,
	) -> DeliveryResult<Self> {
		let client = reqwest::Client::builder()
			.timeout(timeout)
			.build()
			.map_err(|e| {
				DeliveryError::Configuration(format!("failed to build HTTP client: {}", e))
			})?;

		Ok(Self {
			client,
			endpoint: format!(
				"{}/bot{}/sendMessage",
				api_base.trim_end_matches('/'),
				bot_token
			),
			chat_id: chat_id.into(),
			parse_mode,
		})
	}

	/// Builds a notifier from configuration.
	///
	/// Fails when the bot token or chat id is missing.
	pub fn from_config(config: &TelegramConfig) -> DeliveryResult<Self> {
		let (token, chat_id) = config.credentials().ok_or_else(|| {
			DeliveryError::Configuration("Telegram credentials are not configured".to_string())
		})?;

		Self::new(
			&config.api_base,
			token,
			chat_id,
			config.parse_mode.clone(),
			Duration::from_secs(config.timeout_secs),
		)
	}
}

#[async_trait]
impl Notifier for TelegramNotifier {
	fn name(&self) -> &str {
		"telegram"
	}

	#[instrument(skip_all)]
	async fn send(&self, message: &NotificationMessage) -> DeliveryResult<()> {
		let payload = SendMessage {
			chat_id: &self.chat_id,
			text: message.text(),
			parse_mode: self.parse_mode.as_deref(),
		};

		debug!("Sending Telegram notification");

		// The endpoint embeds the bot token, so errors are stripped of the URL.
		let response = self
			.client
			.post(&self.endpoint)
			.json(&payload)
			.send()
			.await
			.map_err(|e| DeliveryError::Transport(e.without_url().to_string()))?;

		let status = response.status();
		if status.is_success() {
			info!(status = status.as_u16(), "Telegram notification delivered");
			return Ok(());
		}

		let body = response.text().await.unwrap_or_default();
		warn!(status = status.as_u16(), "Telegram rejected notification");

		Err(DeliveryError::Rejected {
			status: status.as_u16(),
			body_excerpt: excerpt(&body, MAX_EXCERPT_CHARS),
		})
	}
}
