//! The intake pipeline shared by every request.
//!
//! Admission (origin policy, rate limit) runs before the body is read;
//! processing covers decoding, anti-bot screening, validation and delivery.

use lead_config::IntakeConfig;
use lead_core::{
	client_identifier, parse_submission, rate_limiter_from_config, AntiBot, LeadValidator,
	NotificationMessage, OriginGuard, RateLimiter, Screening,
};
use lead_delivery::{DeliveryError, Notifier, TelegramNotifier};
use lead_types::IntakeError;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Successful end state of a processed submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
	/// The notification was accepted by the channel.
	Delivered,
	/// A bot was detected; nothing was sent.
	Suppressed,
}

/// Validated, ready-to-serve intake pipeline.
pub struct LeadIntake {
	origin: OriginGuard,
	limiter: Arc<dyn RateLimiter>,
	antibot: AntiBot,
	validator: LeadValidator,
	notifier: Option<Arc<dyn Notifier>>,
	max_body_bytes: usize,
	request_timeout: Duration,
	trust_forwarded_for: bool,
	expose_upstream_errors: bool,
}

impl LeadIntake {
	pub fn max_body_bytes(&self) -> usize {
		self.max_body_bytes
	}

	/// Upper bound on handling one submission, delivery included.
	pub fn request_timeout(&self) -> Duration {
		self.request_timeout
	}

	pub fn client_id(&self, forwarded_for: Option<&str>, peer: Option<IpAddr>) -> String {
		client_identifier(forwarded_for, peer, self.trust_forwarded_for)
	}

	/// CORS headers to attach to a response for the given request origin.
	pub fn cors_headers(&self, origin: Option<&str>) -> Vec<(&'static str, String)> {
		self.origin.cors_headers(origin)
	}

	/// Origin policy, then rate limit.
	pub async fn admit(
		&self,
		origin: Option<&str>,
		host: Option<&str>,
		client: &str,
		now: Instant,
	) -> Result<(), IntakeError> {
		if let Err(e) = self.origin.check(origin, host) {
			info!("Rejected request from disallowed origin");
			return Err(e);
		}

		if !self.limiter.check(client, now).await {
			info!("Rate limit exceeded");
			return Err(IntakeError::RateLimited);
		}

		Ok(())
	}

	/// Runs an admitted request body through screening, validation and
	/// delivery. `now_ms` is the receive time in epoch milliseconds.
	pub async fn process(&self, body: &[u8], now_ms: i64) -> Result<Outcome, IntakeError> {
		let raw = parse_submission(body, self.max_body_bytes)?;

		if self.antibot.screen(&raw, now_ms)? == Screening::Suppressed {
			info!("Honeypot filled, suppressing notification");
			return Ok(Outcome::Suppressed);
		}

		let lead = self.validator.validate(&raw).inspect_err(|e| {
			debug!(error = %e, "Submission failed validation");
		})?;

		let Some(notifier) = &self.notifier else {
			warn!("Notification credentials are not configured");
			return Err(IntakeError::MissingServerConfig);
		};

		let message = NotificationMessage::for_lead(&lead);
		notifier
			.send(&message)
			.await
			.map_err(|e| self.upstream_error(notifier.name(), e))?;

		Ok(Outcome::Delivered)
	}

	/// Drops expired rate-limit state; returns how many entries went away.
	pub async fn sweep(&self, now: Instant) -> usize {
		self.limiter.purge_expired(now).await
	}

	fn upstream_error(&self, channel: &str, error: DeliveryError) -> IntakeError {
		warn!(channel, error = %error, "Notification delivery failed");
		match error {
			DeliveryError::Configuration(detail) => IntakeError::Internal(detail),
			rejected @ DeliveryError::Rejected { .. } => IntakeError::Upstream {
				excerpt: rejected
					.excerpt()
					.filter(|_| self.expose_upstream_errors)
					.map(str::to_string),
			},
			DeliveryError::Transport(_) => IntakeError::Upstream { excerpt: None },
		}
	}
}

/// Assembles a [`LeadIntake`] from configuration.
///
/// Without an explicit notifier, a Telegram notifier is built when both
/// credentials are configured. Without credentials the pipeline still
/// starts and answers every valid submission with a server error.
pub struct LeadIntakeBuilder {
	config: IntakeConfig,
	notifier: Option<Arc<dyn Notifier>>,
	limiter: Option<Arc<dyn RateLimiter>>,
}

impl LeadIntakeBuilder {
	pub fn new(config: IntakeConfig) -> Self {
		Self {
			config,
			notifier: None,
			limiter: None,
		}
	}

	pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
		self.notifier = Some(notifier);
		self
	}

	pub fn with_rate_limiter(mut self, limiter: Arc<dyn RateLimiter>) -> Self {
		self.limiter = Some(limiter);
		self
	}

	pub fn build(self) -> Result<LeadIntake, DeliveryError> {
		let config = self.config;

		let notifier = match self.notifier {
			Some(notifier) => Some(notifier),
			None if config.telegram.credentials().is_some() => {
				let telegram = TelegramNotifier::from_config(&config.telegram)?;
				Some(Arc::new(telegram) as Arc<dyn Notifier>)
			}
			None => None,
		};

		let limiter = self
			.limiter
			.unwrap_or_else(|| rate_limiter_from_config(&config.rate_limit));

		Ok(LeadIntake {
			origin: OriginGuard::new(&config.security.origin),
			limiter,
			antibot: AntiBot::new(&config.antibot),
			validator: LeadValidator::new(config.security.verbose_errors),
			notifier,
			max_body_bytes: config.server.max_body_bytes,
			request_timeout: Duration::from_secs(config.server.request_timeout_secs),
			trust_forwarded_for: config.security.trust_forwarded_for,
			expose_upstream_errors: config.security.expose_upstream_errors,
		})
	}
}
