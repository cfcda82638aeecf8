mod api;

pub use api::{ClientIpResponse, HealthResponse, RateLimitExceeded};
