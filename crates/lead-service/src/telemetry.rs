use anyhow::Result;
use lead_config::LogFormat;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Installs the global subscriber. `RUST_LOG` takes precedence over `level`.
pub fn setup_tracing(level: &str, format: LogFormat) -> Result<()> {
	let env_filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(level))?;

	let registry = tracing_subscriber::registry().with(env_filter);

	match format {
		LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).try_init()?,
		LogFormat::Json => registry
			.with(tracing_subscriber::fmt::layer().json())
			.try_init()?,
	}

	Ok(())
}
