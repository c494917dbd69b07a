//! Origin policy enforcement and CORS header selection.

use lead_config::OriginPolicy;
use lead_types::IntakeError;

pub use lead_types::{parse_origin, ParsedOrigin};

pub const ALLOW_METHODS: &str = "POST, OPTIONS";
pub const ALLOW_HEADERS: &str = "Content-Type";

/// Applies the configured origin policy to each request.
#[derive(Debug, Clone)]
pub struct OriginGuard {
	policy: OriginPolicy,
	allowed: Vec<String>,
	fallback: String,
}

impl OriginGuard {
	pub fn new(policy: &OriginPolicy) -> Self {
		let allowed = match policy {
			OriginPolicy::SameHost => Vec::new(),
			OriginPolicy::AllowList { origins, .. } => origins
				.iter()
				.filter_map(|o| parse_origin(o))
				.map(|o| o.serialize())
				.collect(),
		};

		let fallback = match policy {
			OriginPolicy::SameHost => String::new(),
			OriginPolicy::AllowList { fallback, .. } => parse_origin(fallback)
				.map(|o| o.serialize())
				.unwrap_or_else(|| fallback.trim().to_string()),
		};

		Self {
			policy: policy.clone(),
			allowed,
			fallback,
		}
	}

	/// Whether responses should carry CORS headers.
	pub fn cors_enabled(&self) -> bool {
		matches!(self.policy, OriginPolicy::AllowList { .. })
	}

	/// Accepts or rejects a request given its `Origin` and `Host` headers.
	///
	/// Requests without an `Origin` header are not cross-origin browser
	/// requests and always pass.
	pub fn check(&self, origin: Option<&str>, host: Option<&str>) -> Result<(), IntakeError> {
		let Some(origin) = origin.filter(|o| !o.trim().is_empty()) else {
			return Ok(());
		};

		let parsed = parse_origin(origin).ok_or(IntakeError::ForbiddenOrigin)?;

		let allowed = match &self.policy {
			OriginPolicy::SameHost => {
				let host = host.unwrap_or_default().trim().to_ascii_lowercase();
				let host = strip_default_port(&host, &parsed.scheme);
				parsed.host == host
			}
			OriginPolicy::AllowList { .. } => self.is_listed(&parsed),
		};

		if allowed {
			Ok(())
		} else {
			Err(IntakeError::ForbiddenOrigin)
		}
	}

	/// CORS headers for a response to a request with the given `Origin`.
	///
	/// Listed origins are echoed back; anything else gets the fallback so
	/// browsers refuse to expose the response.
	pub fn cors_headers(&self, origin: Option<&str>) -> Vec<(&'static str, String)> {
		if !self.cors_enabled() {
			return Vec::new();
		}

		let allow_origin = origin
			.and_then(parse_origin)
			.filter(|parsed| self.is_listed(parsed))
			.map(|parsed| parsed.serialize())
			.unwrap_or_else(|| self.fallback.clone());

		vec![
			("access-control-allow-origin", allow_origin),
			("access-control-allow-methods", ALLOW_METHODS.to_string()),
			("access-control-allow-headers", ALLOW_HEADERS.to_string()),
			("vary", "Origin".to_string()),
		]
	}

	fn is_listed(&self, origin: &ParsedOrigin) -> bool {
		let serialized = origin.serialize();
		self.allowed.iter().any(|allowed| *allowed == serialized)
	}
}

fn strip_default_port<'a>(host: &'a str, scheme: &str) -> &'a str {
	let suffix = match scheme {
		"http" => ":80",
		"https" => ":443",
		_ => return host,
	};
	host.strip_suffix(suffix).unwrap_or(host)
}
