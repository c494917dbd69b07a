//! Configuration loading for the lead intake service.
//!
//! Sources are applied in order: built-in defaults, an optional file
//! (TOML, JSON or YAML by extension, with `${VAR}` substitution), then
//! environment overrides. The merged result is validated before use.

use lead_types::{parse_bare_origin, FORM_FIELDS};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use thiserror::Error;
use tracing::{debug, info};

pub mod types;

pub use types::*;

/// Liveness path; the intake route may not reuse it.
pub const HEALTH_ROUTE: &str = "/health";

static ENV_PLACEHOLDER: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").expect("placeholder pattern is valid"));

#[derive(Error, Debug)]
pub enum ConfigError {
	#[error("File not found: {0}")]
	FileNotFound(String),

	#[error("Parse error: {0}")]
	ParseError(String),

	#[error("Validation error: {0}")]
	ValidationError(String),

	#[error("Environment variable not found: {0}")]
	EnvVarNotFound(String),

	#[error("IO error: {0}")]
	IoError(#[from] std::io::Error),
}

/// Supported configuration file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
	Toml,
	Json,
	Yaml,
}

impl ConfigFormat {
	fn from_path(path: &Path) -> Result<Self, ConfigError> {
		match path.extension().and_then(|s| s.to_str()) {
			Some("toml") => Ok(Self::Toml),
			Some("json") => Ok(Self::Json),
			Some("yaml") | Some("yml") => Ok(Self::Yaml),
			_ => Err(ConfigError::ParseError(format!(
				"Unsupported config format: {:?}",
				path
			))),
		}
	}
}

/// Configuration loader with environment variable substitution
pub struct ConfigLoader {
	file_path: Option<PathBuf>,
	env_prefix: String,
}

impl Default for ConfigLoader {
	fn default() -> Self {
		Self::new()
	}
}

impl ConfigLoader {
	pub fn new() -> Self {
		Self {
			file_path: None,
			env_prefix: "LEAD_".to_string(),
		}
	}

	pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
		self.file_path = Some(path.as_ref().to_path_buf());
		self
	}

	/// Like [`ConfigLoader::with_file`], for a path that may be absent.
	pub fn with_optional_file<P: AsRef<Path>>(mut self, path: Option<P>) -> Self {
		self.file_path = path.map(|p| p.as_ref().to_path_buf());
		self
	}

	pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
		self.env_prefix = prefix.into();
		self
	}

	/// Loads configuration using the process environment.
	pub async fn load(&self) -> Result<IntakeConfig, ConfigError> {
		self.load_with(|name| std::env::var(name).ok()).await
	}

	/// Loads configuration resolving variables through `lookup`.
	pub async fn load_with<F>(&self, lookup: F) -> Result<IntakeConfig, ConfigError>
	where
		F: Fn(&str) -> Option<String>,
	{
		let mut config = match &self.file_path {
			Some(path) => self.load_from_file(path, &lookup).await?,
			None => {
				debug!("No configuration file given, using defaults");
				IntakeConfig::default()
			}
		};

		self.apply_env_overrides(&mut config, &lookup)?;
		validate_config(&config)?;

		Ok(config)
	}

	async fn load_from_file<F>(&self, path: &Path, lookup: &F) -> Result<IntakeConfig, ConfigError>
	where
		F: Fn(&str) -> Option<String>,
	{
		info!("Loading configuration from {:?}", path);

		let format = ConfigFormat::from_path(path)?;
		let content = tokio::fs::read_to_string(path).await.map_err(|e| {
			if e.kind() == std::io::ErrorKind::NotFound {
				ConfigError::FileNotFound(path.display().to_string())
			} else {
				ConfigError::IoError(e)
			}
		})?;

		let substituted = substitute_env_vars(&content, lookup)?;
		parse_config(&substituted, format)
	}

	fn apply_env_overrides<F>(&self, config: &mut IntakeConfig, lookup: &F) -> Result<(), ConfigError>
	where
		F: Fn(&str) -> Option<String>,
	{
		let var = |suffix: &str| lookup(&format!("{}{}", self.env_prefix, suffix));

		if let Some(host) = var("HTTP_HOST") {
			config.server.host = host;
		}

		if let Some(port) = var("HTTP_PORT") {
			config.server.port = port
				.parse()
				.map_err(|e| ConfigError::ValidationError(format!("Invalid HTTP port: {}", e)))?;
		}

		if let Some(level) = var("LOG_LEVEL") {
			config.logging.level = level;
		}

		if let Some(api_base) = var("TELEGRAM_API_BASE") {
			config.telegram.api_base = api_base;
		}

		if let Some(token) = lookup("TELEGRAM_BOT_TOKEN") {
			debug!("Using Telegram bot token from environment");
			config.telegram.bot_token = Some(token);
		}

		if let Some(chat_id) = lookup("TELEGRAM_CHAT_ID") {
			debug!("Using Telegram chat id from environment");
			config.telegram.chat_id = Some(chat_id);
		}

		Ok(())
	}
}

/// Parses configuration text in the given format.
pub fn parse_config(contents: &str, format: ConfigFormat) -> Result<IntakeConfig, ConfigError> {
	match format {
		ConfigFormat::Toml => {
			toml::from_str(contents).map_err(|e| ConfigError::ParseError(e.to_string()))
		}
		ConfigFormat::Json => {
			serde_json::from_str(contents).map_err(|e| ConfigError::ParseError(e.to_string()))
		}
		ConfigFormat::Yaml => {
			serde_yaml::from_str(contents).map_err(|e| ConfigError::ParseError(e.to_string()))
		}
	}
}

/// Replaces every `${VAR_NAME}` with its value; unknown variables are errors.
fn substitute_env_vars<F>(content: &str, lookup: &F) -> Result<String, ConfigError>
where
	F: Fn(&str) -> Option<String>,
{
	let mut result = content.to_string();

	for cap in ENV_PLACEHOLDER.captures_iter(content) {
		let full_match = &cap[0];
		let var_name = &cap[1];

		let value =
			lookup(var_name).ok_or_else(|| ConfigError::EnvVarNotFound(var_name.to_string()))?;

		result = result.replace(full_match, &value);
	}

	Ok(result)
}

/// Checks cross-field constraints serde cannot express.
pub fn validate_config(config: &IntakeConfig) -> Result<(), ConfigError> {
	if config.server.max_body_bytes == 0 {
		return Err(ConfigError::ValidationError(
			"server.max_body_bytes must be greater than zero".to_string(),
		));
	}

	if !config.server.route.starts_with('/') {
		return Err(ConfigError::ValidationError(format!(
			"server.route must start with '/': {}",
			config.server.route
		)));
	}
	if config.server.route == HEALTH_ROUTE {
		return Err(ConfigError::ValidationError(format!(
			"server.route must not shadow {}",
			HEALTH_ROUTE
		)));
	}

	if config.server.request_timeout_secs == 0 {
		return Err(ConfigError::ValidationError(
			"server.request_timeout_secs must be greater than zero".to_string(),
		));
	}

	if config.rate_limit.sweep_interval_secs == 0 {
		return Err(ConfigError::ValidationError(
			"rate_limit.sweep_interval_secs must be greater than zero".to_string(),
		));
	}

	if config.rate_limit.enabled {
		if config.rate_limit.limit == 0 {
			return Err(ConfigError::ValidationError(
				"rate_limit.limit must be greater than zero".to_string(),
			));
		}
		if config.rate_limit.window_secs == 0 {
			return Err(ConfigError::ValidationError(
				"rate_limit.window_secs must be greater than zero".to_string(),
			));
		}
	}

	if let OriginPolicy::AllowList { origins, fallback } = &config.security.origin {
		if origins.is_empty() {
			return Err(ConfigError::ValidationError(
				"security.origin.origins must list at least one origin".to_string(),
			));
		}
		for origin in origins.iter().chain(std::iter::once(fallback)) {
			if parse_bare_origin(origin).is_none() {
				return Err(ConfigError::ValidationError(format!(
					"Invalid origin '{}': expected http(s)://host[:port]",
					origin
				)));
			}
		}
	}

	let honeypot = config.antibot.honeypot_field.trim();
	if honeypot.is_empty() {
		return Err(ConfigError::ValidationError(
			"antibot.honeypot_field must not be empty".to_string(),
		));
	}
	if FORM_FIELDS.contains(&honeypot) {
		return Err(ConfigError::ValidationError(format!(
			"antibot.honeypot_field '{}' collides with a form field",
			honeypot
		)));
	}

	if !is_http_url(&config.telegram.api_base) {
		return Err(ConfigError::ValidationError(format!(
			"Invalid telegram.api_base: {}",
			config.telegram.api_base
		)));
	}

	if config.telegram.timeout_secs == 0 {
		return Err(ConfigError::ValidationError(
			"telegram.timeout_secs must be greater than zero".to_string(),
		));
	}

	Ok(())
}

fn is_http_url(value: &str) -> bool {
	let rest = value
		.strip_prefix("https://")
		.or_else(|| value.strip_prefix("http://"));
	matches!(rest, Some(host) if !host.is_empty() && !host.contains(char::is_whitespace))
}
