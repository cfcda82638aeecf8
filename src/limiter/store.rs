//! Counter store abstraction shared by the rate limiter backends.

use std::future::Future;
use std::time::Duration;

use thiserror::Error;

/// State of a fixed-window counter right after it was incremented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowCount {
    /// Requests observed in the current window, including this one.
    pub count: u64,
    /// Time left until the window resets.
    pub reset_in: Duration,
}

/// Failures of the underlying counter store.
///
/// Store outages are an external dependency problem; whether they admit or
/// reject traffic is decided by the caller's failure policy.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("counter store unavailable: {0}")]
    Unavailable(String),

    #[error("unexpected counter store reply: {0}")]
    Protocol(String),
}

/// A keyed store of fixed-window counters.
///
/// `increment` is the single mutating capability: it creates the entry with
/// `count = 1` and an expiry of `window` when the key is absent or its window
/// has run out, otherwise it bumps the count. Implementations must make the
/// read-modify-write atomic with respect to other callers of the same store.
pub trait CounterStore: Send + Sync + 'static {
    /// Short backend name used in logs and metric labels.
    fn backend(&self) -> &'static str;

    /// Increment the counter for `key`, opening a fresh window if needed.
    fn increment(
        &self,
        key: &str,
        window: Duration,
    ) -> impl Future<Output = Result<WindowCount, StoreError>> + Send;

    /// Check that the store is reachable.
    fn ping(&self) -> impl Future<Output = Result<(), StoreError>> + Send;
}
