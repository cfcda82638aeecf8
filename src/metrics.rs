//! Prometheus metrics for rate limiting.
//!
//! Metrics are exposed via a dedicated HTTP listener (default: `0.0.0.0:9090`).
//!
//! # Available Metrics
//!
//! - `travel_gate_rate_limit_checks_total` - Checks performed (labels: backend, scope, outcome)
//! - `travel_gate_rate_limit_store_errors_total` - Counter store failures (label: backend)
//! - `travel_gate_memory_store_entries` - Keys held by the in-process store
//!
//! Recording functions are no-ops until [`init_metrics`] installs a recorder.

use metrics::{counter, describe_counter, describe_gauge, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use tracing::{error, info};

/// Metric names as constants for consistency.
pub mod names {
    pub const RATE_LIMIT_CHECKS_TOTAL: &str = "travel_gate_rate_limit_checks_total";
    pub const RATE_LIMIT_STORE_ERRORS_TOTAL: &str = "travel_gate_rate_limit_store_errors_total";
    pub const MEMORY_STORE_ENTRIES: &str = "travel_gate_memory_store_entries";
}

/// Result label of a rate limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckOutcome {
    Allowed,
    Rejected,
    /// Store failed and the request was let through (fail-open).
    Bypassed,
    /// Store failed and the request was refused (fail-closed).
    Failed,
}

impl CheckOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Allowed => "allowed",
            Self::Rejected => "rejected",
            Self::Bypassed => "bypassed",
            Self::Failed => "failed",
        }
    }
}

/// Install the Prometheus exporter and describe all metrics.
pub fn init_metrics(metrics_addr: SocketAddr) -> Result<(), String> {
    PrometheusBuilder::new()
        .with_http_listener(metrics_addr)
        .install()
        .map_err(|e| format!("Failed to install Prometheus exporter: {e}"))?;

    describe_counter!(
        names::RATE_LIMIT_CHECKS_TOTAL,
        "Total number of rate limit checks by outcome"
    );
    describe_counter!(
        names::RATE_LIMIT_STORE_ERRORS_TOTAL,
        "Total number of counter store failures"
    );
    describe_gauge!(
        names::MEMORY_STORE_ENTRIES,
        "Number of keys held by the in-process counter store"
    );

    info!(addr = %metrics_addr, "Prometheus metrics endpoint started");
    Ok(())
}

/// Try to initialize metrics, logging any errors but not failing.
pub fn try_init_metrics(metrics_addr: SocketAddr) {
    if let Err(e) = init_metrics(metrics_addr) {
        error!(error = %e, "Failed to initialize metrics, continuing without metrics");
    }
}

pub fn record_rate_limit_check(backend: &'static str, scope: &'static str, outcome: CheckOutcome) {
    counter!(names::RATE_LIMIT_CHECKS_TOTAL, "backend" => backend, "scope" => scope, "outcome" => outcome.as_str())
        .increment(1);
}

pub fn record_store_error(backend: &'static str) {
    counter!(names::RATE_LIMIT_STORE_ERRORS_TOTAL, "backend" => backend).increment(1);
}

pub fn set_memory_store_entries(entries: usize) {
    gauge!(names::MEMORY_STORE_ENTRIES).set(entries as f64);
}
