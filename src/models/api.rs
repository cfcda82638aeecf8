use chrono::{DateTime, Utc};
use serde::Serialize;

/// Body of a 429 response.
///
/// ```json
/// {
///   "error": "Rate limit exceeded",
///   "message": "Too many requests. Please try again later.",
///   "retry_after": 60
/// }
/// ```
#[derive(Debug, Serialize)]
pub struct RateLimitExceeded {
    pub error: &'static str,
    pub message: &'static str,
    /// Seconds to wait: the configured window length.
    pub retry_after: u64,
}

impl RateLimitExceeded {
    pub fn new(window_secs: u64) -> Self {
        Self {
            error: "Rate limit exceeded",
            message: "Too many requests. Please try again later.",
            retry_after: window_secs,
        }
    }
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Service health status
    pub status: String,
    /// Counter store backend in use ("memory" or "redis")
    pub rate_limit_backend: String,
    /// Service version
    pub version: String,
    /// Seconds since the process started
    pub uptime_seconds: u64,
    /// Current timestamp
    pub timestamp: DateTime<Utc>,
}

/// Response of `GET /client-ip`.
#[derive(Debug, Serialize)]
pub struct ClientIpResponse {
    pub client_ip: String,
}
