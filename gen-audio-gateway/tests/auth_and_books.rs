//! Router-level tests against an in-memory store/broker, the same
//! `Router` + `tower::ServiceExt::oneshot` harness `ShahadIshraq-porua`
//! uses for its own route tests, swapping the real Postgres/Redis clients
//! for `MockMetadataStore`/`MockBroker` so no external services are
//! needed.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::{Request, StatusCode, header};
use gen_audio_core::auth::TokenIssuer;
use gen_audio_core::broker::mock::MockBroker;
use gen_audio_core::config::Config;
use gen_audio_core::store::mock::MockMetadataStore;
use gen_audio_gateway::rate_limit::RateLimiters;
use gen_audio_gateway::routes::router;
use gen_audio_gateway::state::AppState;
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

fn test_state() -> AppState {
    let config = Config {
        database_url: String::new(),
        redis_url: String::new(),
        secret_key: "test-secret".to_string(),
        text_data_path: "/tmp/gen-audio-test/text".into(),
        wav_data_path: "/tmp/gen-audio-test/wav".into(),
        ogg_data_path: "/tmp/gen-audio-test/ogg".into(),
        session_token_ttl: Duration::from_secs(3600),
        reset_token_ttl: Duration::from_secs(15 * 60),
        signed_url_ttl: Duration::from_secs(3600),
        chunk_size_chars: 800,
        transcode_segment_seconds: 3.14,
        opus_bitrate_kbps: 32,
        debug_bypass_rate_limits: true,
        admin_password: "admin123!".to_string(),
        cors_origins: vec!["http://localhost:3000".to_string()],
        api_base_url: "http://localhost:8000".to_string(),
    };
    AppState {
        store: Arc::new(MockMetadataStore::new()),
        broker: Arc::new(MockBroker::new()),
        config: Arc::new(config),
        tokens: Arc::new(TokenIssuer::new("test-secret")),
        rate_limiters: RateLimiters::new(true),
    }
}

fn app() -> Router {
    router(test_state())
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)), 1234);
    let mut req = req;
    req.extensions_mut().insert(ConnectInfo(addr));
    let response = app.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body: Value = if bytes.is_empty() { json!(null) } else { serde_json::from_slice(&bytes).unwrap() };
    (status, body)
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn register_then_login_round_trip() {
    let app = app();

    let (status, body) = send(
        &app,
        json_request(
            "POST",
            "/auth/register",
            json!({ "username": "alice", "email": "alice@example.com", "password": "Str0ng!Passw0rd" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "register failed: {body}");
    assert!(body["access_token"].as_str().is_some());

    let (status, body) = send(
        &app,
        json_request(
            "POST",
            "/auth/login/email",
            json!({ "email": "alice@example.com", "password": "Str0ng!Passw0rd" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "login failed: {body}");
    assert_eq!(body["username"], "alice");
}

#[tokio::test]
async fn login_with_wrong_password_is_unauthenticated() {
    let app = app();
    send(
        &app,
        json_request(
            "POST",
            "/auth/register",
            json!({ "username": "bob", "email": "bob@example.com", "password": "Str0ng!Passw0rd" }),
        ),
    )
    .await;

    let (status, _) = send(
        &app,
        json_request("POST", "/auth/login/email", json!({ "email": "bob@example.com", "password": "nope" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn protected_route_without_token_is_unauthenticated() {
    let app = app();
    let req = Request::builder()
        .method("GET")
        .uri("/api/v1/books")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&app, req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn listing_books_for_a_fresh_user_is_empty() {
    let app = app();
    let (_, body) = send(
        &app,
        json_request(
            "POST",
            "/auth/register",
            json!({ "username": "carol", "email": "carol@example.com", "password": "Str0ng!Passw0rd" }),
        ),
    )
    .await;
    let token = body["access_token"].as_str().unwrap();

    let req = Request::builder()
        .method("GET")
        .uri("/api/v1/books")
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn weak_password_is_rejected_at_registration() {
    let app = app();
    let (status, body) = send(
        &app,
        json_request("POST", "/auth/register", json!({ "username": "dave", "email": "dave@example.com", "password": "password" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "expected common-password rejection: {body}");
}
