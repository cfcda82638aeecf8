//! Health and readiness endpoints.
//!
//! # Endpoints
//!
//! - `GET /health` - Liveness with the active counter store backend
//! - `GET /ready` - Readiness probe that pings the counter store
//!
//! Neither endpoint is rate limited.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use chrono::Utc;
use tracing::{instrument, warn};

use crate::limiter::CounterStore;
use crate::models::HealthResponse;
use crate::state::AppState;

/// Health check endpoint.
///
/// Always returns 200 OK; it does not touch the counter store.
///
/// # Response Body
///
/// ```json
/// {
///   "status": "healthy",
///   "rate_limit_backend": "memory",
///   "version": "0.1.0",
///   "uptime_seconds": 3600,
///   "timestamp": "2024-01-15T10:30:00Z"
/// }
/// ```
#[instrument(skip(state))]
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        rate_limit_backend: state.backend().to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.uptime_seconds(),
        timestamp: Utc::now(),
    })
}

/// Readiness check endpoint for Kubernetes probes.
///
/// Returns 200 OK if the counter store answers a ping,
/// 503 Service Unavailable otherwise.
///
/// ```yaml
/// readinessProbe:
///   httpGet:
///     path: /ready
///     port: 8000
///   periodSeconds: 10
/// ```
#[instrument(skip(state))]
pub async fn readiness_check(State(state): State<AppState>) -> Result<StatusCode, StatusCode> {
    match state.limiter.store().ping().await {
        Ok(()) => Ok(StatusCode::OK),
        Err(e) => {
            warn!(error = %e, backend = state.backend(), "Counter store not ready");
            Err(StatusCode::SERVICE_UNAVAILABLE)
        }
    }
}
