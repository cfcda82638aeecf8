//! Application configuration loaded from environment variables.
//!
//! All configuration is loaded from environment variables with defaults
//! suitable for development. In production, configure via environment
//! variables or a `.env` file.
//!
//! # Rate Limiting
//!
//! - `RATE_LIMIT_BACKEND`: `memory` (single process) or `redis` (shared)
//! - `REDIS_URL`: Redis connection URL (default: `redis://127.0.0.1:6379`)
//! - `RATE_LIMIT_KEY_PREFIX`: namespace for Redis keys (default: `travel_gate:`)
//! - `RATE_LIMIT_MAX_REQUESTS`: requests allowed per window (default: 10)
//! - `RATE_LIMIT_WINDOW_SECS`: window length in seconds (default: 60)
//! - `RATE_LIMIT_FAIL_OPEN`: admit requests when the store is down (default: true)
//! - `RATE_LIMIT_SWEEP_INTERVAL_SECS`: memory store cleanup period (default: 60)
//!
//! # Client IP Resolution
//!
//! - `TRUSTED_PROXIES`: comma-separated IPs/CIDRs whose forwarding headers
//!   are believed (default: empty, every peer trusted)

use std::env;
use std::net::SocketAddr;
use std::time::Duration;

use crate::error::{AppError, AppResult};
use crate::limiter::{BackendKind, Quota};

/// Application configuration loaded from environment variables.
///
/// # Example
///
/// ```rust,ignore
/// let config = Config::from_env()?;
/// println!("Server will listen on {}", config.server_addr());
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    // =========================================================================
    // Server Configuration
    // =========================================================================
    /// Server host address (default: "0.0.0.0")
    pub host: String,

    /// Server port (default: 8000)
    pub port: u16,

    /// Maximum request body size in bytes (default: 1MB)
    pub max_request_body_size: usize,

    /// Allowed CORS origins; "*" allows any origin
    pub cors_allowed_origins: Vec<String>,

    // =========================================================================
    // Rate Limiting Configuration
    // =========================================================================
    /// Counter store backend (default: memory)
    pub rate_limit_backend: BackendKind,

    /// Redis connection URL, used when the backend is `redis`
    pub redis_url: String,

    /// Prefix for every Redis counter key
    pub rate_limit_key_prefix: String,

    /// Requests allowed per client and endpoint in one window (default: 10)
    pub rate_limit_max_requests: u32,

    /// Window length in seconds (default: 60)
    pub rate_limit_window_secs: u64,

    /// Admit requests when the counter store is unreachable (default: true)
    pub rate_limit_fail_open: bool,

    /// How often expired entries are purged from the memory store (default: 60s)
    pub rate_limit_sweep_interval: Duration,

    /// Trusted proxy IPs/CIDRs.
    ///
    /// Empty means forwarding headers are believed from every peer, which
    /// lets clients choose their own rate limit key unless the edge proxy
    /// overwrites `X-Forwarded-For`/`X-Real-IP`.
    pub trusted_proxies: Vec<String>,

    // =========================================================================
    // Observability Configuration
    // =========================================================================
    /// Log level (e.g., "info", "debug", "trace")
    pub log_level: String,

    /// Port for Prometheus metrics endpoint (default: 9090, 0 = disabled)
    pub metrics_port: u16,
}

impl Config {
    /// Load configuration from environment variables with sensible defaults.
    ///
    /// # Errors
    ///
    /// Returns `AppError::ConfigError` if any value fails to parse or
    /// validate.
    pub fn from_env() -> AppResult<Self> {
        // Load an .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let config = Self {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: Self::parse_env("PORT", 8000)?,
            max_request_body_size: Self::parse_env("MAX_REQUEST_BODY_SIZE", 1024 * 1024)?,
            cors_allowed_origins: Self::parse_list("CORS_ALLOWED_ORIGINS", "*"),

            rate_limit_backend: Self::parse_env("RATE_LIMIT_BACKEND", BackendKind::Memory)?,
            redis_url: env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string()),
            rate_limit_key_prefix: env::var("RATE_LIMIT_KEY_PREFIX")
                .unwrap_or_else(|_| "travel_gate:".to_string()),
            rate_limit_max_requests: Self::parse_env("RATE_LIMIT_MAX_REQUESTS", 10)?,
            rate_limit_window_secs: Self::parse_env("RATE_LIMIT_WINDOW_SECS", 60)?,
            rate_limit_fail_open: Self::parse_env("RATE_LIMIT_FAIL_OPEN", true)?,
            rate_limit_sweep_interval: Duration::from_secs(Self::parse_env(
                "RATE_LIMIT_SWEEP_INTERVAL_SECS",
                60,
            )?),
            trusted_proxies: Self::parse_list("TRUSTED_PROXIES", ""),

            log_level: env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            metrics_port: Self::parse_env("METRICS_PORT", 9090)?,
        };

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values for consistency and correctness.
    ///
    /// # Errors
    ///
    /// Returns `AppError::ConfigError` if validation fails.
    pub fn validate(&self) -> AppResult<()> {
        self.default_quota()?;

        if self.rate_limit_sweep_interval.is_zero() {
            return Err(AppError::ConfigError(
                "RATE_LIMIT_SWEEP_INTERVAL_SECS must be greater than 0".to_string(),
            ));
        }

        if self.max_request_body_size == 0 {
            return Err(AppError::ConfigError(
                "MAX_REQUEST_BODY_SIZE must be greater than 0".to_string(),
            ));
        }

        if self.rate_limit_backend == BackendKind::Redis && self.redis_url.trim().is_empty() {
            return Err(AppError::ConfigError(
                "REDIS_URL must be set when RATE_LIMIT_BACKEND=redis".to_string(),
            ));
        }

        Ok(())
    }

    /// The quota applied to guarded endpoints.
    ///
    /// # Errors
    ///
    /// Returns `AppError::ConfigError` if the request count or window is zero.
    pub fn default_quota(&self) -> AppResult<Quota> {
        Quota::new(self.rate_limit_max_requests, self.rate_limit_window_secs).map_err(|e| {
            AppError::ConfigError(format!(
                "RATE_LIMIT_MAX_REQUESTS/RATE_LIMIT_WINDOW_SECS invalid: {e}"
            ))
        })
    }

    /// Get the full server address for binding.
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Check if Prometheus metrics export is enabled.
    pub fn metrics_enabled(&self) -> bool {
        self.metrics_port > 0
    }

    /// Get the metrics endpoint address.
    ///
    /// Returns `None` if metrics are disabled (port = 0).
    pub fn metrics_addr(&self) -> Option<SocketAddr> {
        self.metrics_enabled()
            .then(|| SocketAddr::from(([0, 0, 0, 0], self.metrics_port)))
    }

    /// Parse an environment variable into the specified type with a default value.
    fn parse_env<T>(name: &str, default: T) -> AppResult<T>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        match env::var(name) {
            Ok(val) => val
                .trim()
                .parse()
                .map_err(|e| AppError::ConfigError(format!("Invalid {name}: {e}"))),
            Err(_) => Ok(default),
        }
    }

    /// Parse a comma-separated list, dropping empty items.
    fn parse_list(name: &str, default: &str) -> Vec<String> {
        split_list(&env::var(name).unwrap_or_else(|_| default.to_string()))
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Default configuration for testing and development.
///
/// Production deployments should use `Config::from_env()` instead.
impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            max_request_body_size: 1024 * 1024,
            cors_allowed_origins: vec!["*".to_string()],
            rate_limit_backend: BackendKind::Memory,
            redis_url: "redis://127.0.0.1:6379".to_string(),
            rate_limit_key_prefix: "travel_gate:".to_string(),
            rate_limit_max_requests: 10,
            rate_limit_window_secs: 60,
            rate_limit_fail_open: true,
            rate_limit_sweep_interval: Duration::from_secs(60),
            trusted_proxies: vec![],
            log_level: "info".to_string(),
            metrics_port: 9090,
        }
    }
}
