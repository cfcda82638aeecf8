//! Application routing configuration with middleware stack.
//!
//! # Middleware Stack (outermost first)
//!
//! ```text
//! Request
//!    │
//!    ▼
//! ┌──────────────────┐
//! │   Request ID     │ ← Sets/propagates X-Request-Id
//! └────────┬─────────┘
//!          ▼
//! ┌──────────────────┐
//! │     Tracing      │ ← HTTP request/response logging
//! └────────┬─────────┘
//!          ▼
//! ┌──────────────────┐
//! │    Client IP     │ ← Resolves and attaches ClientIp
//! └────────┬─────────┘
//!          ▼
//! ┌──────────────────┐
//! │  CORS, body limit│
//! └────────┬─────────┘
//!          ▼
//! ┌──────────────────┐
//! │  Rate Limiting   │ ← Per route, 429 if exceeded
//! └────────┬─────────┘
//!          ▼
//!      Handler
//! ```
//!
//! # Routes
//!
//! - `/health`, `/ready` - Health & monitoring (never rate limited)
//! - `/client-ip` - Echo of the resolved client address (rate limited)

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::get;
use tower_http::cors::{Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::error::AppResult;
use crate::handlers;
use crate::middleware::{ClientIpLayer, RateLimitLayer};
use crate::state::AppState;

/// Scope of the `/client-ip` route in rate limit partition keys.
pub const CLIENT_IP_SCOPE: &str = "client_ip";

/// Build the application router with all routes and middleware configured.
///
/// # Errors
///
/// Returns `AppError::ConfigError` if the configured quota is invalid.
pub fn build_router(state: AppState) -> AppResult<Router> {
    let config = &state.config;
    let quota = config.default_quota()?;

    info!(
        backend = state.backend(),
        max_requests = quota.max_requests(),
        window_secs = quota.window_secs(),
        fail_open = config.rate_limit_fail_open,
        trusted_proxies = config.trusted_proxies.len(),
        "Rate limiting enabled"
    );

    let client_ip_limit = RateLimitLayer::new(state.limiter.clone(), quota, CLIENT_IP_SCOPE)
        .fail_open(config.rate_limit_fail_open);

    let mut router = Router::new()
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .route(
            "/client-ip",
            get(handlers::client_ip).layer(client_ip_limit),
        );

    // =========================================================================
    // Apply Middleware Stack (applied bottom to top)
    // =========================================================================

    // 1. Request body size limit
    router = router.layer(DefaultBodyLimit::max(config.max_request_body_size));

    // 2. CORS
    router = router.layer(build_cors_layer(&config.cors_allowed_origins));

    // 3. Client IP resolution, shared by handlers and rate limiting
    router = router.layer(ClientIpLayer::new(state.resolver.clone()));

    // 4. Tracing, wrapped by request ID so spans and responses carry it
    router = router
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid));

    Ok(router.with_state(state))
}

/// Build CORS layer from configuration.
///
/// `["*"]` allows any origin; otherwise unparseable origins are skipped.
fn build_cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let allow_any = allowed_origins.iter().any(|o| o == "*");

    if allow_any {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = allowed_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}
