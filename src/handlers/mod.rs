mod client;
mod health;

pub use client::client_ip;
pub use health::{health_check, readiness_check};
