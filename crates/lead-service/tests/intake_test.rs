//! End-to-end tests of the intake route.
//!
//! The router is driven with `oneshot`; the Telegram API is a wiremock
//! server so outbound calls can be counted and inspected.

use async_trait::async_trait;
use axum::{
	body::Body,
	http::{header, Method, Request, StatusCode},
	response::Response,
	Router,
};
use lead_config::{HoneypotAction, IntakeConfig, OriginPolicy};
use lead_core::NotificationMessage;
use lead_delivery::{DeliveryResult, Notifier};
use lead_service::{create_router, LeadIntakeBuilder};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ROUTE: &str = "/api/lead";
const TOKEN: &str = "42:test-token";
const CHAT_ID: &str = "-100777";

fn config_for(server: &MockServer) -> IntakeConfig {
	let mut config = IntakeConfig::default();
	config.telegram.api_base = server.uri();
	config.telegram.bot_token = Some(TOKEN.to_string());
	config.telegram.chat_id = Some(CHAT_ID.to_string());
	config.telegram.timeout_secs = 2;
	config
}

fn router(config: IntakeConfig) -> Router {
	let server = config.server.clone();
	let intake = LeadIntakeBuilder::new(config).build().unwrap();
	create_router(Arc::new(intake), &server)
}

async fn telegram(status: u16, expected_calls: u64) -> MockServer {
	let server = MockServer::start().await;
	Mock::given(method("POST"))
		.and(path(format!("/bot{}/sendMessage", TOKEN)))
		.respond_with(
			ResponseTemplate::new(status).set_body_string(r#"{"ok":false,"description":"chat not found"}"#),
		)
		.expect(expected_calls)
		.mount(&server)
		.await;
	server
}

fn rendered_ago(ms: i64) -> i64 {
	chrono::Utc::now().timestamp_millis() - ms
}

fn lead() -> Value {
	json!({
		"parent": "Мария Иванова",
		"phone": "+7 (912) 345-67-89",
		"age": "10",
		"email": "maria@example.com",
		"website": "",
		"ts": rendered_ago(10_000),
	})
}

fn post() -> axum::http::request::Builder {
	Request::builder()
		.method(Method::POST)
		.uri(ROUTE)
		.header(header::CONTENT_TYPE, "application/json")
}

fn post_json(body: &Value) -> Request<Body> {
	post().body(Body::from(body.to_string())).unwrap()
}

fn post_json_from(body: &Value, client: &str) -> Request<Body> {
	post()
		.header("x-forwarded-for", client)
		.body(Body::from(body.to_string()))
		.unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> Response {
	app.clone().oneshot(request).await.unwrap()
}

async fn json_body(response: Response) -> Value {
	let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
		.await
		.unwrap();
	serde_json::from_slice(&bytes).unwrap()
}

async fn error_of(response: Response) -> String {
	let body = json_body(response).await;
	assert_eq!(body["ok"], false);
	body["error"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn valid_lead_is_delivered_exactly_once() {
	let server = telegram(200, 1).await;
	let app = router(config_for(&server));

	let response = send(&app, post_json(&lead())).await;

	assert_eq!(response.status(), StatusCode::OK);
	let headers = response.headers();
	assert_eq!(
		headers[header::CONTENT_TYPE],
		"application/json; charset=utf-8"
	);
	assert_eq!(headers[header::CACHE_CONTROL], "no-store");
	assert!(headers.contains_key("x-request-id"));
	assert!(!headers.contains_key("access-control-allow-origin"));
	assert_eq!(json_body(response).await, json!({ "ok": true }));

	let requests = server.received_requests().await.unwrap();
	let sent: Value = serde_json::from_slice(&requests[0].body).unwrap();
	assert_eq!(sent["chat_id"], CHAT_ID);
	let text = sent["text"].as_str().unwrap();
	for expected in ["Мария Иванова", "+7 (912) 345-67-89", "10", "maria@example.com"] {
		assert!(text.contains(expected), "missing {} in {}", expected, text);
	}
}

#[tokio::test]
async fn missing_email_is_rendered_as_dash() {
	let server = telegram(200, 1).await;
	let app = router(config_for(&server));

	let mut body = lead();
	body["email"] = json!("");
	assert_eq!(send(&app, post_json(&body)).await.status(), StatusCode::OK);

	let requests = server.received_requests().await.unwrap();
	let sent: Value = serde_json::from_slice(&requests[0].body).unwrap();
	assert!(sent["text"].as_str().unwrap().ends_with("Email: -"));
}

#[tokio::test]
async fn malformed_phones_are_rejected() {
	let server = telegram(200, 0).await;
	let app = router(config_for(&server));

	for phone in ["89123456789", "+7 912 345-67-89", "+7 (912) 345-6789", ""] {
		let mut body = lead();
		body["phone"] = json!(phone);
		let response = send(&app, post_json(&body)).await;
		assert_eq!(response.status(), StatusCode::BAD_REQUEST, "phone {:?}", phone);
		assert_eq!(error_of(response).await, "Телефон в формате +7 (XXX) XXX-XX-XX");
	}
}

#[tokio::test]
async fn age_bounds_are_inclusive() {
	let server = telegram(200, 2).await;
	let app = router(config_for(&server));

	for (i, (age, expected)) in [
		(json!("6"), StatusCode::BAD_REQUEST),
		(json!(7), StatusCode::OK),
		(json!("13"), StatusCode::OK),
		(json!(14), StatusCode::BAD_REQUEST),
		(json!("9.5"), StatusCode::BAD_REQUEST),
		(json!("nine"), StatusCode::BAD_REQUEST),
	]
	.into_iter()
	.enumerate()
	{
		let mut body = lead();
		body["age"] = age.clone();
		// One client per case keeps every request under the rate limit.
		let response = send(&app, post_json_from(&body, &format!("10.0.0.{}", i))).await;
		assert_eq!(response.status(), expected, "age {}", age);
	}
}

#[tokio::test]
async fn filled_honeypot_succeeds_without_dispatch() {
	let server = telegram(200, 0).await;
	let app = router(config_for(&server));

	let mut body = lead();
	body["website"] = json!("http://spam.example");
	let response = send(&app, post_json(&body)).await;

	assert_eq!(response.status(), StatusCode::OK);
	assert_eq!(json_body(response).await, json!({ "ok": true }));
}

#[tokio::test]
async fn filled_honeypot_can_be_rejected() {
	let server = telegram(200, 0).await;
	let mut config = config_for(&server);
	config.antibot.honeypot_field = "hp".to_string();
	config.antibot.honeypot_action = HoneypotAction::Reject;
	let app = router(config);

	let mut body = lead();
	body["hp"] = json!("1");
	let response = send(&app, post_json(&body)).await;

	assert_eq!(response.status(), StatusCode::BAD_REQUEST);
	assert_eq!(error_of(response).await, "Bad request");
}

#[tokio::test]
async fn fast_submissions_are_rejected() {
	let server = telegram(200, 0).await;
	let app = router(config_for(&server));

	for ts in [json!(rendered_ago(200)), json!(rendered_ago(-60_000)), json!("soon")] {
		let mut body = lead();
		body["ts"] = ts;
		let response = send(&app, post_json(&body)).await;
		assert_eq!(response.status(), StatusCode::BAD_REQUEST);
		assert_eq!(error_of(response).await, "Too fast");
	}
}

#[tokio::test]
async fn request_over_limit_is_throttled() {
	let server = telegram(200, 5).await;
	let app = router(config_for(&server));

	let client = "203.0.113.9, 10.0.0.1";
	for _ in 0..5 {
		let response = send(&app, post_json_from(&lead(), client)).await;
		assert_eq!(response.status(), StatusCode::OK);
	}

	let response = send(&app, post_json_from(&lead(), client)).await;
	assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
	assert_eq!(error_of(response).await, "Too many requests, try later");

	// A different client still has its own budget.
	let mut body = lead();
	body["website"] = json!("bot");
	let response = send(&app, post_json_from(&body, "198.51.100.1")).await;
	assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn upstream_failure_is_bad_gateway_without_retry() {
	let server = telegram(500, 1).await;
	let app = router(config_for(&server));

	let response = send(&app, post_json(&lead())).await;

	assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
	assert_eq!(error_of(response).await, "Notification service error");
}

#[tokio::test]
async fn upstream_excerpt_is_exposed_when_enabled() {
	let server = telegram(400, 1).await;
	let mut config = config_for(&server);
	config.security.expose_upstream_errors = true;
	let app = router(config);

	let response = send(&app, post_json(&lead())).await;

	assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
	assert!(error_of(response).await.contains("chat not found"));
}

#[tokio::test]
async fn missing_credentials_fail_without_outbound_call() {
	let server = telegram(200, 0).await;

	for (token, chat) in [(None, Some(CHAT_ID)), (Some(TOKEN), None), (None, None)] {
		let mut config = config_for(&server);
		config.telegram.bot_token = token.map(str::to_string);
		config.telegram.chat_id = chat.map(str::to_string);
		let app = router(config);

		let response = send(&app, post_json(&lead())).await;
		assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
		assert_eq!(error_of(response).await, "Server misconfigured");
	}
}

#[tokio::test]
async fn malformed_and_oversize_bodies_are_rejected() {
	let server = telegram(200, 0).await;
	let app = router(config_for(&server));

	for body in ["", "{not json", "[1,2]", "null"] {
		let response = send(&app, post().body(Body::from(body)).unwrap()).await;
		assert_eq!(response.status(), StatusCode::BAD_REQUEST, "body {:?}", body);
	}

	let mut body = lead();
	body["parent"] = json!("x".repeat(20_000));
	let response = send(&app, post_json(&body)).await;
	assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn generic_errors_hide_field_detail() {
	let server = telegram(200, 0).await;
	let mut config = config_for(&server);
	config.security.verbose_errors = false;
	let app = router(config);

	let mut body = lead();
	body["parent"] = json!("A");
	let response = send(&app, post_json(&body)).await;

	assert_eq!(response.status(), StatusCode::BAD_REQUEST);
	assert_eq!(error_of(response).await, "Bad request");
}

#[tokio::test]
async fn other_methods_are_not_allowed() {
	let server = telegram(200, 0).await;
	let app = router(config_for(&server));

	for method in [Method::GET, Method::PUT, Method::DELETE] {
		let request = Request::builder()
			.method(method.clone())
			.uri(ROUTE)
			.body(Body::empty())
			.unwrap();
		let response = send(&app, request).await;
		assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED, "{}", method);
		assert_eq!(response.headers()[header::ALLOW], "POST");
		assert_eq!(error_of(response).await, "Method not allowed");
	}
}

#[tokio::test]
async fn same_host_policy_rejects_cross_origin_posts() {
	let server = telegram(200, 1).await;
	let app = router(config_for(&server));

	let mut request = post_json(&lead());
	request
		.headers_mut()
		.insert(header::ORIGIN, "https://evil.example".parse().unwrap());
	request
		.headers_mut()
		.insert(header::HOST, "school.example".parse().unwrap());
	let response = send(&app, request).await;
	assert_eq!(response.status(), StatusCode::FORBIDDEN);
	assert_eq!(error_of(response).await, "Forbidden origin");

	let mut request = post_json(&lead());
	request
		.headers_mut()
		.insert(header::ORIGIN, "https://school.example".parse().unwrap());
	request
		.headers_mut()
		.insert(header::HOST, "school.example".parse().unwrap());
	assert_eq!(send(&app, request).await.status(), StatusCode::OK);
}

#[tokio::test]
async fn allow_list_policy_sets_cors_headers() {
	let server = telegram(200, 1).await;
	let mut config = config_for(&server);
	config.security.origin = OriginPolicy::AllowList {
		origins: vec!["https://school.example".to_string()],
		fallback: "https://school.example".to_string(),
	};
	let app = router(config);

	let preflight = Request::builder()
		.method(Method::OPTIONS)
		.uri(ROUTE)
		.header(header::ORIGIN, "https://school.example")
		.body(Body::empty())
		.unwrap();
	let response = send(&app, preflight).await;
	assert_eq!(response.status(), StatusCode::NO_CONTENT);
	let headers = response.headers();
	assert_eq!(headers["access-control-allow-origin"], "https://school.example");
	assert_eq!(headers["access-control-allow-methods"], "POST, OPTIONS");
	assert_eq!(headers["access-control-allow-headers"], "Content-Type");
	assert_eq!(headers[header::VARY], "Origin");

	let mut request = post_json(&lead());
	request
		.headers_mut()
		.insert(header::ORIGIN, "https://school.example".parse().unwrap());
	let response = send(&app, request).await;
	assert_eq!(response.status(), StatusCode::OK);
	assert_eq!(
		response.headers()["access-control-allow-origin"],
		"https://school.example"
	);

	let mut request = post_json(&lead());
	request
		.headers_mut()
		.insert(header::ORIGIN, "https://evil.example".parse().unwrap());
	let response = send(&app, request).await;
	assert_eq!(response.status(), StatusCode::FORBIDDEN);
	assert_eq!(
		response.headers()["access-control-allow-origin"],
		"https://school.example"
	);
}

#[tokio::test]
async fn health_reports_version() {
	let app = router(IntakeConfig::default());

	let request = Request::builder()
		.uri("/health")
		.body(Body::empty())
		.unwrap();
	let response = send(&app, request).await;

	assert_eq!(response.status(), StatusCode::OK);
	assert!(response.headers().contains_key("x-request-id"));
	let body = json_body(response).await;
	assert_eq!(body["status"], "ok");
	assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

struct PanickingNotifier;

#[async_trait]
impl Notifier for PanickingNotifier {
	fn name(&self) -> &str {
		"panicking"
	}

	async fn send(&self, _message: &NotificationMessage) -> DeliveryResult<()> {
		panic!("notifier exploded");
	}
}

#[tokio::test]
async fn panics_become_generic_server_errors() {
	let config = IntakeConfig::default();
	let server = config.server.clone();
	let intake = LeadIntakeBuilder::new(config)
		.with_notifier(Arc::new(PanickingNotifier))
		.build()
		.unwrap();
	let app = create_router(Arc::new(intake), &server);

	let response = send(&app, post_json(&lead())).await;

	assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
	assert_eq!(error_of(response).await, "Server error");
}

struct StalledNotifier;

#[async_trait]
impl Notifier for StalledNotifier {
	fn name(&self) -> &str {
		"stalled"
	}

	async fn send(&self, _message: &NotificationMessage) -> DeliveryResult<()> {
		tokio::time::sleep(std::time::Duration::from_secs(30)).await;
		Ok(())
	}
}

#[tokio::test]
async fn timed_out_requests_keep_the_json_envelope() {
	let mut config = IntakeConfig::default();
	config.server.request_timeout_secs = 1;
	config.security.origin = OriginPolicy::AllowList {
		origins: vec!["https://school.example".to_string()],
		fallback: "https://school.example".to_string(),
	};
	let server = config.server.clone();
	let intake = LeadIntakeBuilder::new(config)
		.with_notifier(Arc::new(StalledNotifier))
		.build()
		.unwrap();
	let app = create_router(Arc::new(intake), &server);

	let mut request = post_json(&lead());
	request
		.headers_mut()
		.insert(header::ORIGIN, "https://school.example".parse().unwrap());
	let response = send(&app, request).await;

	assert_eq!(response.status(), StatusCode::REQUEST_TIMEOUT);
	let headers = response.headers();
	assert_eq!(
		headers[header::CONTENT_TYPE],
		"application/json; charset=utf-8"
	);
	assert_eq!(headers[header::CACHE_CONTROL], "no-store");
	assert_eq!(headers["access-control-allow-origin"], "https://school.example");
	assert_eq!(error_of(response).await, "Request timeout");
}
