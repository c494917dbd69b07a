//! Per-client request limiting.
//!
//! The limiter is a trait so a shared store can replace the in-memory map
//! when the service runs as more than one instance. The in-memory store is
//! per process: counts are not shared between instances.

use async_trait::async_trait;
use dashmap::DashMap;
use lead_config::{RateLimitConfig, WindowStrategy};
use std::collections::VecDeque;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Identifier used when neither a forwarded address nor a peer is known.
pub const UNKNOWN_CLIENT: &str = "unknown";

/// Admission decision per client identifier.
#[async_trait]
pub trait RateLimiter: Send + Sync {
	/// Records a request from `key` at `now` and returns whether it is allowed.
	async fn check(&self, key: &str, now: Instant) -> bool;

	/// Drops state that can no longer influence a decision at `now`.
	/// Returns the number of entries removed.
	async fn purge_expired(&self, _now: Instant) -> usize {
		0
	}
}

/// Builds the limiter described by `config`.
pub fn from_config(config: &RateLimitConfig) -> Arc<dyn RateLimiter> {
	if config.enabled {
		Arc::new(InMemoryRateLimiter::new(
			config.limit,
			Duration::from_secs(config.window_secs),
			config.strategy,
		))
	} else {
		Arc::new(Unlimited)
	}
}

/// Limiter that admits everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unlimited;

#[async_trait]
impl RateLimiter for Unlimited {
	async fn check(&self, _key: &str, _now: Instant) -> bool {
		true
	}
}

#[derive(Debug)]
enum WindowState {
	Fixed { count: u32, started: Instant },
	Sliding(VecDeque<Instant>),
}

/// In-memory limiter backed by a sharded concurrent map.
#[derive(Debug)]
pub struct InMemoryRateLimiter {
	entries: DashMap<String, WindowState>,
	limit: u32,
	window: Duration,
	strategy: WindowStrategy,
}

impl InMemoryRateLimiter {
	pub fn new(limit: u32, window: Duration, strategy: WindowStrategy) -> Self {
		Self {
			entries: DashMap::new(),
			limit,
			window,
			strategy,
		}
	}

	/// Number of tracked clients.
	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	fn fresh_state(&self, now: Instant) -> WindowState {
		match self.strategy {
			WindowStrategy::Fixed => WindowState::Fixed {
				count: 0,
				started: now,
			},
			WindowStrategy::Sliding => WindowState::Sliding(VecDeque::new()),
		}
	}

	fn is_expired(&self, state: &WindowState, now: Instant) -> bool {
		match state {
			WindowState::Fixed { started, .. } => {
				now.saturating_duration_since(*started) > self.window
			}
			WindowState::Sliding(hits) => hits
				.back()
				.map_or(true, |last| now.saturating_duration_since(*last) >= self.window),
		}
	}
}

#[async_trait]
impl RateLimiter for InMemoryRateLimiter {
	async fn check(&self, key: &str, now: Instant) -> bool {
		let mut entry = self
			.entries
			.entry(key.to_string())
			.or_insert_with(|| self.fresh_state(now));

		match entry.value_mut() {
			WindowState::Fixed { count, started } => {
				if now.saturating_duration_since(*started) > self.window {
					*count = 0;
					*started = now;
				}
				*count = count.saturating_add(1);
				*count <= self.limit
			}
			WindowState::Sliding(hits) => {
				while hits
					.front()
					.is_some_and(|first| now.saturating_duration_since(*first) >= self.window)
				{
					hits.pop_front();
				}
				if hits.len() < self.limit as usize {
					hits.push_back(now);
					true
				} else {
					false
				}
			}
		}
	}

	async fn purge_expired(&self, now: Instant) -> usize {
		let before = self.entries.len();
		self.entries.retain(|_, state| !self.is_expired(state, now));
		before.saturating_sub(self.entries.len())
	}
}

/// Derives the rate-limit key for a request.
///
/// Uses the first non-empty `X-Forwarded-For` entry when trusted, then the
/// transport peer, then [`UNKNOWN_CLIENT`].
pub fn client_identifier(
	forwarded_for: Option<&str>,
	peer: Option<IpAddr>,
	trust_forwarded_for: bool,
) -> String {
	let forwarded = forwarded_for
		.filter(|_| trust_forwarded_for)
		.and_then(|value| value.split(',').next())
		.map(str::trim)
		.filter(|first| !first.is_empty());

	match (forwarded, peer) {
		(Some(first), _) => first.to_string(),
		(None, Some(peer)) => peer.to_string(),
		(None, None) => UNKNOWN_CLIENT.to_string(),
	}
}
