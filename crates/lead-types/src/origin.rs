//! `Origin` header parsing shared by configuration checks and the
//! request-time origin policy.

/// Scheme and host of a parsed `Origin` header, lowercased, default port removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedOrigin {
	pub scheme: String,
	pub host: String,
}

impl ParsedOrigin {
	pub fn serialize(&self) -> String {
		format!("{}://{}", self.scheme, self.host)
	}
}

/// Parses an `Origin` value such as `https://example.com:8443`.
///
/// Returns `None` for anything that is not an absolute http(s) origin,
/// including the opaque `null` origin.
pub fn parse_origin(origin: &str) -> Option<ParsedOrigin> {
	let origin = origin.trim().to_ascii_lowercase();
	let (scheme, rest) = origin.split_once("://")?;
	let default_port = match scheme {
		"http" => "80",
		"https" => "443",
		_ => return None,
	};

	let authority = rest.split(&['/', '?', '#'][..]).next().unwrap_or_default();
	let authority = authority.rsplit_once('@').map_or(authority, |(_, host)| host);
	if authority.contains(char::is_whitespace) {
		return None;
	}

	let (name, port) = if let Some(literal) = authority.strip_prefix('[') {
		let (address, after) = literal.split_once(']')?;
		let name = &authority[..address.len() + 2];
		match after {
			"" => (name, None),
			after => (name, Some(after.strip_prefix(':')?)),
		}
	} else {
		match authority.split_once(':') {
			Some((name, port)) => (name, Some(port)),
			None => (authority, None),
		}
	};

	if name.is_empty() || name == "[]" {
		return None;
	}

	let host = match port {
		None => name.to_string(),
		Some(port) if port.is_empty() || !port.bytes().all(|b| b.is_ascii_digit()) => {
			return None;
		}
		Some(port) if port == default_port => name.to_string(),
		Some(port) => format!("{}:{}", name, port),
	};

	Some(ParsedOrigin {
		scheme: scheme.to_string(),
		host,
	})
}

/// Parses a configured origin, which must be exactly `scheme://host[:port]`.
///
/// Paths (a trailing slash included), queries, fragments and credentials
/// are refused.
pub fn parse_bare_origin(value: &str) -> Option<ParsedOrigin> {
	let (_, rest) = value.trim().split_once("://")?;
	if rest.contains(&['/', '?', '#', '@'][..]) {
		return None;
	}
	parse_origin(value)
}
