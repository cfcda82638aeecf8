//! Per-endpoint rate limiting middleware.
//!
//! `RateLimitLayer` wraps a single handler (attach it with
//! `get(handler).layer(...)`) and counts requests per client address and
//! endpoint scope:
//!
//! ```text
//! partition key = "rate_limit:{client_ip}:{scope}"
//! ```
//!
//! The client address is the [`ClientIp`] attached by `ClientIpLayer`; if
//! that layer is not installed the address is resolved on the spot.
//!
//! # Responses
//!
//! Allowed requests carry `X-RateLimit-Limit` and `X-RateLimit-Remaining`.
//! Rejected requests get 429 with a JSON body and `Retry-After` set to the
//! window length.
//!
//! # Counter Store Failures
//!
//! With `fail_open` (the default) an unreachable store lets the request
//! through and logs a warning. Otherwise the request is answered with 503.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use axum::Json;
use axum::body::Body;
use axum::http::{HeaderMap, HeaderValue, Request, Response, StatusCode};
use axum::response::IntoResponse;
use tower::{Layer, Service};
use tracing::{debug, warn};

use super::ip::{ClientIp, peer_addr, resolve_client_ip};
use crate::error::AppError;
use crate::limiter::{CounterStore, Quota, RateLimiter};
use crate::metrics::{self, CheckOutcome};
use crate::models::RateLimitExceeded;

pub const RETRY_AFTER: &str = "retry-after";
pub const X_RATELIMIT_LIMIT: &str = "x-ratelimit-limit";
pub const X_RATELIMIT_REMAINING: &str = "x-ratelimit-remaining";

/// Partition key for a client address and endpoint scope.
pub fn partition_key(client_ip: &str, scope: &str) -> String {
    format!("rate_limit:{client_ip}:{scope}")
}

/// Rate limiting layer for one endpoint.
///
/// # Example
///
/// ```rust,ignore
/// let quota = Quota::new(5, 60)?;
/// let router = Router::new().route(
///     "/bookings",
///     post(create_booking).layer(RateLimitLayer::new(limiter, quota, "create_booking")),
/// );
/// ```
pub struct RateLimitLayer<S> {
    limiter: RateLimiter<S>,
    quota: Quota,
    scope: &'static str,
    fail_open: bool,
}

impl<S> Clone for RateLimitLayer<S> {
    fn clone(&self) -> Self {
        Self {
            limiter: self.limiter.clone(),
            quota: self.quota,
            scope: self.scope,
            fail_open: self.fail_open,
        }
    }
}

impl<S: CounterStore> RateLimitLayer<S> {
    pub fn new(limiter: RateLimiter<S>, quota: Quota, scope: &'static str) -> Self {
        Self {
            limiter,
            quota,
            scope,
            fail_open: true,
        }
    }

    /// Whether a counter store failure admits (`true`) or refuses the request.
    pub fn fail_open(mut self, fail_open: bool) -> Self {
        self.fail_open = fail_open;
        self
    }
}

impl<S, I> Layer<I> for RateLimitLayer<S> {
    type Service = RateLimitService<S, I>;

    fn layer(&self, inner: I) -> Self::Service {
        RateLimitService {
            inner,
            layer: self.clone(),
        }
    }
}

/// Rate limiting service wrapper.
pub struct RateLimitService<S, I> {
    inner: I,
    layer: RateLimitLayer<S>,
}

impl<S, I: Clone> Clone for RateLimitService<S, I> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            layer: self.layer.clone(),
        }
    }
}

impl<S, I> Service<Request<Body>> for RateLimitService<S, I>
where
    S: CounterStore,
    I: Service<Request<Body>, Response = Response<Body>> + Clone + Send + 'static,
    I::Future: Send,
{
    type Response = Response<Body>;
    type Error = I::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let RateLimitLayer {
            limiter,
            quota,
            scope,
            fail_open,
        } = self.layer.clone();
        let mut inner = self.inner.clone();

        let client_ip = match ClientIp::attached(&req) {
            Some(ip) => ip.0.clone(),
            None => resolve_client_ip(req.headers(), peer_addr(req.extensions())),
        };
        let key = partition_key(&client_ip, scope);
        let backend = limiter.store().backend();

        Box::pin(async move {
            let decision = match limiter.check(&key, quota).await {
                Ok(decision) => decision,
                Err(e) => {
                    metrics::record_store_error(backend);
                    if fail_open {
                        warn!(
                            error = %e,
                            backend,
                            scope,
                            "Counter store unavailable, admitting request without rate limit"
                        );
                        metrics::record_rate_limit_check(backend, scope, CheckOutcome::Bypassed);
                        return inner.call(req).await;
                    }
                    metrics::record_rate_limit_check(backend, scope, CheckOutcome::Failed);
                    return Ok(AppError::from(e).into_response());
                }
            };

            if !decision.allowed {
                warn!(
                    client_ip = %client_ip,
                    scope,
                    count = decision.count,
                    retry_after_secs = quota.window_secs(),
                    "Rate limit exceeded"
                );
                metrics::record_rate_limit_check(backend, scope, CheckOutcome::Rejected);
                return Ok(too_many_requests(quota));
            }

            debug!(
                client_ip = %client_ip,
                scope,
                count = decision.count,
                limit = decision.limit,
                "Rate limit check passed"
            );
            metrics::record_rate_limit_check(backend, scope, CheckOutcome::Allowed);

            let mut response = inner.call(req).await?;
            set_limit_headers(response.headers_mut(), decision.limit, decision.remaining);
            Ok(response)
        })
    }
}

fn set_limit_headers(headers: &mut HeaderMap, limit: u32, remaining: u64) {
    headers.insert(X_RATELIMIT_LIMIT, HeaderValue::from(limit));
    headers.insert(X_RATELIMIT_REMAINING, HeaderValue::from(remaining));
}

/// 429 response for a rejected request.
pub fn too_many_requests(quota: Quota) -> Response<Body> {
    let window_secs = quota.window_secs();
    let mut response = (
        StatusCode::TOO_MANY_REQUESTS,
        Json(RateLimitExceeded::new(window_secs)),
    )
        .into_response();

    let headers = response.headers_mut();
    headers.insert(RETRY_AFTER, HeaderValue::from(window_secs));
    set_limit_headers(headers, quota.max_requests(), 0);
    response
}
