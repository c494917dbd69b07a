use anyhow::{Context, Result};
use clap::Parser;
use lead_config::{ConfigLoader, IntakeConfig, OriginPolicy};
use lead_service::cli::{Args, Command};
use lead_service::telemetry::setup_tracing;
use lead_service::{run_server, LeadIntakeBuilder};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
	let args = Args::parse();

	let config = ConfigLoader::new()
		.with_optional_file(args.config.as_ref())
		.load()
		.await
		.context("Failed to load configuration")?;

	let level = args.log_level.as_deref().unwrap_or(&config.logging.level);
	setup_tracing(level, config.logging.format).context("Failed to initialise tracing")?;

	match args.command.unwrap_or(Command::Start) {
		Command::Start => start_service(config).await,
		Command::Validate => {
			describe(&config);
			info!("Configuration is valid");
			Ok(())
		}
	}
}

async fn start_service(config: IntakeConfig) -> Result<()> {
	info!("Starting lead intake service");
	describe(&config);

	let intake = LeadIntakeBuilder::new(config.clone())
		.build()
		.context("Failed to build intake pipeline")?;

	run_server(
		Arc::new(intake),
		&config.server,
		config
			.rate_limit
			.enabled
			.then(|| Duration::from_secs(config.rate_limit.sweep_interval_secs)),
	)
	.await?;

	info!("Lead intake service stopped");
	Ok(())
}

fn describe(config: &IntakeConfig) {
	info!("HTTP address: {}:{}", config.server.host, config.server.port);
	info!("Intake route: {}", config.server.route);

	match &config.security.origin {
		OriginPolicy::SameHost => info!("Origin policy: same host"),
		OriginPolicy::AllowList { origins, .. } => {
			info!("Origin policy: allow list ({} origins)", origins.len())
		}
	}

	if config.rate_limit.enabled {
		info!(
			"Rate limit: {} requests per {}s ({:?} window)",
			config.rate_limit.limit, config.rate_limit.window_secs, config.rate_limit.strategy
		);
	} else {
		warn!("Rate limiting is disabled");
	}

	if config.telegram.credentials().is_none() {
		warn!("Telegram credentials are not configured; valid submissions will fail");
	}
}
