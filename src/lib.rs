//! # Travel Gate
//!
//! Client IP resolution and fixed-window rate limiting for the travel
//! booking API, packaged as Axum/Tower middleware:
//!
//! - **Client IP**: `X-Forwarded-For` (first entry), then `X-Real-IP`, then
//!   the socket peer, optionally restricted to trusted proxies
//! - **Rate limiting**: N requests per window per client and endpoint,
//!   counted in process memory or in Redis for multi-instance deployments
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Axum HTTP Server                       │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Middleware (Request ID → Trace → ClientIp → RateLimit)     │
//! ├─────────────────────────────────────────────────────────────┤
//! │  RateLimiter (fixed window: increment, compare to limit)    │
//! ├─────────────────────────────────────────────────────────────┤
//! │  CounterStore: MemoryStore │ RedisStore (Lua INCR+PEXPIRE)  │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Guarding a route
//!
//! ```rust,no_run
//! use axum::{Router, routing::post};
//! use travel_gate::limiter::{MemoryStore, Quota, RateLimiter};
//! use travel_gate::middleware::{ClientIpLayer, RateLimitLayer};
//!
//! async fn create_booking() -> &'static str {
//!     "booked"
//! }
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let limiter = RateLimiter::new(MemoryStore::new());
//! let quota = Quota::new(5, 60)?;
//!
//! let app: Router = Router::new()
//!     .route(
//!         "/bookings",
//!         post(create_booking).layer(RateLimitLayer::new(limiter, quota, "create_booking")),
//!     )
//!     .layer(ClientIpLayer::default());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod handlers;
pub mod limiter;
pub mod metrics;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod shutdown;
pub mod state;

// Re-exports for convenience
pub use config::Config;
pub use error::{AppError, AppResult};
pub use limiter::{CounterBackend, Quota, RateLimiter};
pub use middleware::{ClientIp, resolve_client_ip};
pub use routes::build_router;
pub use state::AppState;
