//! HTTP handlers for the intake route and the liveness probe.

use crate::pipeline::{LeadIntake, Outcome};
use axum::{
	body::Body,
	extract::{ConnectInfo, Request, State},
	http::{
		header::{self, HeaderMap, HeaderName, HeaderValue},
		StatusCode,
	},
	response::{IntoResponse, Json, Response},
};
use lead_types::{HealthResponse, IntakeError, LeadResponse, GENERIC_BAD_REQUEST, SERVER_ERROR};
use std::any::Any;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, instrument, warn};

const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";
const NO_STORE: &str = "no-store";

#[derive(Clone)]
pub struct AppState {
	pub intake: Arc<LeadIntake>,
}

impl AppState {
	pub fn new(intake: Arc<LeadIntake>) -> Self {
		Self { intake }
	}
}

/// A failed intake request together with the CORS headers its response needs.
#[derive(Debug)]
pub struct ApiError {
	error: IntakeError,
	cors: Vec<(&'static str, String)>,
}

impl ApiError {
	pub fn new(error: IntakeError, cors: Vec<(&'static str, String)>) -> Self {
		Self { error, cors }
	}
}

impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		let status = StatusCode::from_u16(self.error.status_code())
			.unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

		match &self.error {
			IntakeError::Internal(detail) => error!(detail = %detail, "Intake failed"),
			IntakeError::MissingServerConfig
			| IntakeError::Upstream { .. }
			| IntakeError::TimedOut => {
				warn!(status = status.as_u16(), "Intake failed")
			}
			_ => {}
		}

		json_response(
			status,
			&LeadResponse::failure(self.error.public_message()),
			&self.cors,
		)
	}
}

/// `POST {route}`: the full intake pipeline.
pub async fn submit_lead(State(state): State<AppState>, request: Request) -> Response {
	let intake = &state.intake;
	let headers = request.headers();
	let origin = header_text(headers, header::ORIGIN);
	let host = header_text(headers, header::HOST);
	let forwarded_for = header_text(headers, "x-forwarded-for");
	let peer = request
		.extensions()
		.get::<ConnectInfo<SocketAddr>>()
		.map(|ConnectInfo(addr)| addr.ip());

	let client = intake.client_id(forwarded_for.as_deref(), peer);
	let cors = intake.cors_headers(origin.as_deref());

	let pipeline = run_intake(intake, origin.as_deref(), host.as_deref(), &client, request.into_body());
	let result = tokio::time::timeout(intake.request_timeout(), pipeline)
		.await
		.unwrap_or(Err(IntakeError::TimedOut));

	match result {
		Ok(_) => json_response(StatusCode::OK, &LeadResponse::success(), &cors),
		Err(error) => ApiError::new(error, cors).into_response(),
	}
}

#[instrument(skip_all, fields(client = %client))]
async fn run_intake(
	intake: &LeadIntake,
	origin: Option<&str>,
	host: Option<&str>,
	client: &str,
	body: Body,
) -> Result<Outcome, IntakeError> {
	intake.admit(origin, host, client, Instant::now()).await?;

	let body = axum::body::to_bytes(body, intake.max_body_bytes())
		.await
		.map_err(|_| IntakeError::bad_request(GENERIC_BAD_REQUEST))?;

	let outcome = intake
		.process(&body, chrono::Utc::now().timestamp_millis())
		.await?;

	if outcome == Outcome::Delivered {
		info!("Lead delivered");
	}
	Ok(outcome)
}

/// `OPTIONS {route}`: CORS pre-flight.
pub async fn preflight(State(state): State<AppState>, headers: HeaderMap) -> Response {
	let origin = header_text(&headers, header::ORIGIN);
	let mut response = StatusCode::NO_CONTENT.into_response();
	response
		.headers_mut()
		.insert(header::CACHE_CONTROL, HeaderValue::from_static(NO_STORE));
	apply_headers(&mut response, &state.intake.cors_headers(origin.as_deref()));
	response
}

/// Any other method on the intake route.
pub async fn method_not_allowed(State(state): State<AppState>, headers: HeaderMap) -> Response {
	let origin = header_text(&headers, header::ORIGIN);
	let cors = state.intake.cors_headers(origin.as_deref());
	let mut response = ApiError::new(IntakeError::MethodNotAllowed, cors).into_response();
	response
		.headers_mut()
		.insert(header::ALLOW, HeaderValue::from_static("POST"));
	response
}

/// `GET /health`
pub async fn health() -> Json<HealthResponse> {
	Json(HealthResponse {
		status: "ok".to_string(),
		version: env!("CARGO_PKG_VERSION").to_string(),
	})
}

/// Converts a panic inside a handler into a generic server error.
pub fn panic_response(_panic: Box<dyn Any + Send + 'static>) -> Response {
	error!("Handler panicked");
	json_response(
		StatusCode::INTERNAL_SERVER_ERROR,
		&LeadResponse::failure(SERVER_ERROR),
		&[],
	)
}

fn json_response(
	status: StatusCode,
	body: &LeadResponse,
	cors: &[(&'static str, String)],
) -> Response {
	let mut response = (status, Json(body)).into_response();
	let headers = response.headers_mut();
	headers.insert(
		header::CONTENT_TYPE,
		HeaderValue::from_static(JSON_CONTENT_TYPE),
	);
	headers.insert(header::CACHE_CONTROL, HeaderValue::from_static(NO_STORE));
	apply_headers(&mut response, cors);
	response
}

fn apply_headers(response: &mut Response, extra: &[(&'static str, String)]) {
	let headers = response.headers_mut();
	for (name, value) in extra {
		match HeaderValue::from_str(value) {
			Ok(value) => {
				headers.insert(HeaderName::from_static(*name), value);
			}
			Err(_) => warn!(header = *name, "Skipping invalid header value"),
		}
	}
}

fn header_text<K: header::AsHeaderName>(headers: &HeaderMap, name: K) -> Option<String> {
	headers
		.get(name)
		.and_then(|value| value.to_str().ok())
		.map(str::to_string)
}
