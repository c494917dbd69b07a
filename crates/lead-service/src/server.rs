//! Router assembly, background maintenance and the HTTP listener.
//!
//! Layers, outermost first: request id, access log, panic recovery. The
//! request timeout is applied by the intake handler so a timed-out request
//! still gets the JSON envelope and CORS headers.

use crate::api::{self, AppState};
use crate::pipeline::LeadIntake;
use anyhow::{Context, Result};
use axum::{
	extract::Request,
	middleware::{self, Next},
	response::Response,
	routing::{get, post},
	Router,
};
use lead_config::{ServerConfig, HEALTH_ROUTE};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tower_http::{catch_panic::CatchPanicLayer, trace::TraceLayer};
use tracing::{debug, info};
use uuid::Uuid;

/// Builds the service router for `intake`.
pub fn create_router(intake: Arc<LeadIntake>, server: &ServerConfig) -> Router {
	let state = AppState::new(intake);

	let intake_route = post(api::submit_lead)
		.options(api::preflight)
		.fallback(api::method_not_allowed);

	Router::new()
		.route(HEALTH_ROUTE, get(api::health))
		.route(&server.route, intake_route)
		.with_state(state)
		.layer(CatchPanicLayer::custom(api::panic_response))
		.layer(TraceLayer::new_for_http())
		.layer(middleware::from_fn(inject_request_id))
}

/// Adds an `X-Request-Id` header to every response.
async fn inject_request_id(mut req: Request, next: Next) -> Response {
	let request_id = Uuid::new_v4().to_string();
	req.extensions_mut().insert(request_id.clone());

	let mut response = next.run(req).await;

	if let Ok(value) = request_id.parse() {
		response.headers_mut().insert("x-request-id", value);
	}

	response
}

/// Periodically drops rate-limit state that can no longer affect a decision.
pub fn spawn_sweeper(intake: Arc<LeadIntake>, every: Duration) -> JoinHandle<()> {
	tokio::spawn(async move {
		let mut ticker = tokio::time::interval(every);
		// The first tick completes immediately.
		ticker.tick().await;
		loop {
			ticker.tick().await;
			let removed = intake.sweep(Instant::now()).await;
			if removed > 0 {
				debug!(removed, "Purged expired rate-limit entries");
			}
		}
	})
}

/// Serves `intake` until Ctrl-C or SIGTERM.
///
/// The sweeper runs only when `sweep_every` is given.
pub async fn run_server(
	intake: Arc<LeadIntake>,
	server: &ServerConfig,
	sweep_every: Option<Duration>,
) -> Result<()> {
	let app = create_router(intake.clone(), server);
	let sweeper = sweep_every.map(|every| spawn_sweeper(intake, every));

	let addr = format!("{}:{}", server.host, server.port);
	let listener = tokio::net::TcpListener::bind(&addr)
		.await
		.with_context(|| format!("Failed to bind {}", addr))?;

	info!(
		"Lead intake listening on {} (route {})",
		listener.local_addr()?,
		server.route
	);

	axum::serve(
		listener,
		app.into_make_service_with_connect_info::<SocketAddr>(),
	)
	.with_graceful_shutdown(shutdown_signal())
	.await
	.context("HTTP server failed")?;

	if let Some(sweeper) = sweeper {
		sweeper.abort();
	}
	info!("HTTP server stopped");
	Ok(())
}

async fn shutdown_signal() {
	let ctrl_c = async {
		if let Err(e) = tokio::signal::ctrl_c().await {
			tracing::error!("Failed to install Ctrl+C handler: {}", e);
		}
	};

	#[cfg(unix)]
	let terminate = async {
		match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
			Ok(mut signal) => {
				signal.recv().await;
			}
			Err(e) => {
				tracing::error!("Failed to install SIGTERM handler: {}", e);
				std::future::pending::<()>().await;
			}
		}
	};

	#[cfg(not(unix))]
	let terminate = std::future::pending::<()>();

	tokio::select! {
		_ = ctrl_c => {},
		_ = terminate => {},
	}

	info!("Shutdown signal received");
}
