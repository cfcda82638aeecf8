//! HTTP middleware for client identification and rate limiting.
//!
//! # Architecture
//!
//! ```text
//! Request → ClientIpLayer → ... → RateLimitLayer (per route) → Handler
//!               ↓                        ↓
//!        ClientIp extension       429 Too Many Requests
//! ```
//!
//! `ClientIpLayer` runs for every request. `RateLimitLayer` is attached only
//! to the endpoints that need guarding, each with its own quota and scope.

pub mod ip;
pub mod rate_limit;

pub use ip::{
    ClientIp, ClientIpLayer, ClientIpResolver, TrustedProxies, X_FORWARDED_FOR, X_REAL_IP,
    resolve_client_ip,
};
pub use rate_limit::{RateLimitLayer, partition_key, too_many_requests};
