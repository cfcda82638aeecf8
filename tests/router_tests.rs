//! Router tests driving the full middleware stack in-process.
//!
//! Requests go through `build_router` with the in-process counter store, so
//! no external services are needed.
//!
//! Run with: `cargo test --test router_tests`
#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::net::SocketAddr;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::extract::ConnectInfo;
use axum::http::{Request, StatusCode};
use serde_json::Value;
use tower::ServiceExt;

use travel_gate::limiter::{CounterBackend, MemoryStore};
use travel_gate::middleware::partition_key;
use travel_gate::routes::CLIENT_IP_SCOPE;
use travel_gate::{AppState, Config, build_router};

fn config(max_requests: u32) -> Config {
    Config {
        rate_limit_max_requests: max_requests,
        rate_limit_window_secs: 60,
        metrics_port: 0,
        ..Config::default()
    }
}

fn app_with(config: Config) -> (Router, AppState) {
    let state = AppState::new(CounterBackend::from(MemoryStore::new()), config);
    let router = build_router(state.clone()).unwrap();
    (router, state)
}

fn get(uri: &str) -> axum::http::request::Builder {
    Request::builder().method("GET").uri(uri)
}

fn with_peer(mut req: Request<Body>, peer: &str) -> Request<Body> {
    let addr: SocketAddr = peer.parse().unwrap();
    req.extensions_mut().insert(ConnectInfo(addr));
    req
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

// =============================================================================
// Health Endpoints
// =============================================================================

#[tokio::test]
async fn test_health_reports_backend() {
    let (app, state) = app_with(config(10));

    let response = app
        .oneshot(get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["rate_limit_backend"], "memory");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));

    state.shutdown().await;
}

#[tokio::test]
async fn test_ready_with_memory_store() {
    let (app, state) = app_with(config(10));

    let response = app
        .oneshot(get("/ready").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    state.shutdown().await;
}

#[tokio::test]
async fn test_health_is_not_rate_limited() {
    let (app, state) = app_with(config(1));

    for _ in 0..5 {
        let response = app
            .clone()
            .oneshot(get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    state.shutdown().await;
}

// =============================================================================
// Client IP Resolution
// =============================================================================

#[tokio::test]
async fn test_client_ip_prefers_first_forwarded_for_entry() {
    let (app, state) = app_with(config(10));

    let req = get("/client-ip")
        .header("x-forwarded-for", " 203.0.113.7 , 10.0.0.1")
        .header("x-real-ip", "198.51.100.2")
        .body(Body::empty())
        .unwrap();
    let response = app
        .oneshot(with_peer(req, "10.0.0.1:40000"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["client_ip"], "203.0.113.7");

    state.shutdown().await;
}

#[tokio::test]
async fn test_client_ip_falls_back_to_real_ip_then_peer() {
    let (app, state) = app_with(config(10));

    let req = get("/client-ip")
        .header("x-real-ip", "198.51.100.2")
        .body(Body::empty())
        .unwrap();
    let response = app
        .clone()
        .oneshot(with_peer(req, "10.0.0.1:40000"))
        .await
        .unwrap();
    assert_eq!(json_body(response).await["client_ip"], "198.51.100.2");

    let req = get("/client-ip").body(Body::empty()).unwrap();
    let response = app
        .oneshot(with_peer(req, "192.0.2.44:5555"))
        .await
        .unwrap();
    assert_eq!(json_body(response).await["client_ip"], "192.0.2.44");

    state.shutdown().await;
}

#[tokio::test]
async fn test_client_ip_unknown_without_headers_or_peer() {
    let (app, state) = app_with(config(10));

    let response = app
        .oneshot(get("/client-ip").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["client_ip"], "");

    state.shutdown().await;
}

#[tokio::test]
async fn test_untrusted_peer_cannot_spoof_forwarded_for() {
    let (app, state) = app_with(Config {
        trusted_proxies: vec!["10.0.0.0/8".to_string()],
        ..config(10)
    });

    let req = get("/client-ip")
        .header("x-forwarded-for", "1.2.3.4")
        .body(Body::empty())
        .unwrap();
    let response = app
        .clone()
        .oneshot(with_peer(req, "192.0.2.44:5555"))
        .await
        .unwrap();
    assert_eq!(json_body(response).await["client_ip"], "192.0.2.44");

    let req = get("/client-ip")
        .header("x-forwarded-for", "1.2.3.4")
        .body(Body::empty())
        .unwrap();
    let response = app
        .oneshot(with_peer(req, "10.1.2.3:5555"))
        .await
        .unwrap();
    assert_eq!(json_body(response).await["client_ip"], "1.2.3.4");

    state.shutdown().await;
}

// =============================================================================
// Rate Limiting
// =============================================================================

#[tokio::test]
async fn test_client_ip_rate_limited_after_quota() {
    let (app, state) = app_with(config(3));

    for expected_remaining in ["2", "1", "0"] {
        let req = get("/client-ip")
            .header("x-forwarded-for", "203.0.113.7")
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["x-ratelimit-limit"], "3");
        assert_eq!(
            response.headers()["x-ratelimit-remaining"],
            expected_remaining
        );
    }

    let req = get("/client-ip")
        .header("x-forwarded-for", "203.0.113.7")
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(response.headers()["retry-after"], "60");

    let body = json_body(response).await;
    assert_eq!(body["error"], "Rate limit exceeded");
    assert_eq!(body["message"], "Too many requests. Please try again later.");
    assert_eq!(body["retry_after"], 60);

    // Another client still has its own budget
    let req = get("/client-ip")
        .header("x-forwarded-for", "198.51.100.2")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    state.shutdown().await;
}

#[tokio::test]
async fn test_rejected_requests_keep_counting() {
    let (app, state) = app_with(config(1));

    for _ in 0..3 {
        let req = get("/client-ip")
            .header("x-real-ip", "203.0.113.9")
            .body(Body::empty())
            .unwrap();
        app.clone().oneshot(req).await.unwrap();
    }

    // Three requests, two of them rejected, all counted: the next is the 4th
    let quota = state.config.default_quota().unwrap();
    let decision = state
        .limiter
        .check(&partition_key("203.0.113.9", CLIENT_IP_SCOPE), quota)
        .await
        .unwrap();
    assert_eq!(decision.count, 4);
    assert!(!decision.allowed);

    state.shutdown().await;
}

// =============================================================================
// Request ID
// =============================================================================

#[tokio::test]
async fn test_request_id_is_generated() {
    let (app, state) = app_with(config(10));

    let response = app
        .oneshot(get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let id = response.headers()["x-request-id"].to_str().unwrap();
    assert!(!id.is_empty());

    state.shutdown().await;
}

#[tokio::test]
async fn test_request_id_is_propagated() {
    let (app, state) = app_with(config(10));

    let req = get("/health")
        .header("x-request-id", "booking-trace-42")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(req).await.unwrap();
    assert_eq!(response.headers()["x-request-id"], "booking-trace-42");

    state.shutdown().await;
}
