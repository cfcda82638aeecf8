use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;

use crate::limiter::StoreError;

/// Application-wide error types with appropriate HTTP status codes.
///
/// Rate limit rejections are not errors: they are produced directly by the
/// rate limit middleware as a 429 body. This enum only covers failures.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Counter store error: {0}")]
    Store(#[from] StoreError),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Error response body for API endpoints.
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Full details stay in the logs, clients get a sanitized message
        tracing::error!(error = %self, "Request failed");

        let (status, error_type, message) = match &self {
            AppError::Store(_) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "rate_limit_unavailable",
                "Rate limiting is temporarily unavailable. Please try again later.",
            ),
            AppError::ConfigError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "config_error",
                "Service configuration error. Please contact support.",
            ),
        };

        let body = ErrorResponse {
            error: error_type.to_string(),
            message: message.to_string(),
        };

        (status, axum::Json(body)).into_response()
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_store_error_maps_to_503() {
        let err = AppError::from(StoreError::Unavailable("connection refused".to_string()));
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn test_config_error_maps_to_500() {
        let response = AppError::ConfigError("bad".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_config_error_display() {
        let err = AppError::ConfigError("RATE_LIMIT_WINDOW_SECS must be > 0".to_string());
        assert!(err.to_string().contains("RATE_LIMIT_WINDOW_SECS"));
    }
}
