//! Fixed-window rate limiter on top of a [`CounterStore`].
//!
//! # Algorithm
//!
//! Each (partition key, window) pair owns one counter:
//!
//! - no counter, or its window has run out: open a new window with `count = 1`
//! - otherwise: increment `count`
//!
//! The request is allowed while `count <= max_requests`.
//!
//! # Window Boundaries
//!
//! Windows are fixed, not sliding. A client can spend its whole budget at
//! the end of one window and again at the start of the next, so up to
//! `2 * max_requests` requests may pass in any span of `window` length.

use std::fmt;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use super::store::{CounterStore, StoreError};

/// Error type for quota configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitError {
    /// `max_requests` cannot be zero.
    ZeroRequests,
    /// The window length cannot be zero.
    ZeroWindow,
    /// The window length exceeds [`Quota::MAX_WINDOW_SECS`].
    WindowTooLarge,
}

impl fmt::Display for RateLimitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RateLimitError::ZeroRequests => {
                write!(f, "max_requests must be greater than 0")
            }
            RateLimitError::ZeroWindow => {
                write!(f, "window must be at least one second")
            }
            RateLimitError::WindowTooLarge => {
                write!(f, "window must not exceed {} seconds", Quota::MAX_WINDOW_SECS)
            }
        }
    }
}

impl std::error::Error for RateLimitError {}

/// How many requests a partition key may make per window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quota {
    max_requests: NonZeroU32,
    window_secs: u64,
}

impl Quota {
    /// Longest accepted window: one year.
    pub const MAX_WINDOW_SECS: u64 = 365 * 24 * 60 * 60;

    /// # Errors
    ///
    /// Returns [`RateLimitError`] if either value is zero or the window is
    /// longer than [`Quota::MAX_WINDOW_SECS`].
    pub fn new(max_requests: u32, window_secs: u64) -> Result<Self, RateLimitError> {
        let max_requests = NonZeroU32::new(max_requests).ok_or(RateLimitError::ZeroRequests)?;
        if window_secs == 0 {
            return Err(RateLimitError::ZeroWindow);
        }
        if window_secs > Self::MAX_WINDOW_SECS {
            return Err(RateLimitError::WindowTooLarge);
        }
        Ok(Self {
            max_requests,
            window_secs,
        })
    }

    pub fn max_requests(&self) -> u32 {
        self.max_requests.get()
    }

    pub fn window_secs(&self) -> u64 {
        self.window_secs
    }

    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }
}

/// Outcome of a single rate limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    pub allowed: bool,
    /// Requests counted in the current window, this one included.
    pub count: u64,
    pub limit: u32,
    /// Requests still available in the current window.
    pub remaining: u64,
    /// Time until the current window closes.
    pub reset_in: Duration,
}

/// Fixed-window limiter over an injected counter store.
///
/// Cheap to clone; clones share the same store.
pub struct RateLimiter<S> {
    store: Arc<S>,
}

impl<S> Clone for RateLimiter<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: CounterStore> RateLimiter<S> {
    pub fn new(store: S) -> Self {
        Self {
            store: Arc::new(store),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Count one request for `key` and decide whether it may proceed.
    ///
    /// The counter entry is keyed by both `key` and the window length, so
    /// the same partition key under two different quotas keeps two counters.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the counter store cannot be reached.
    pub async fn check(&self, key: &str, quota: Quota) -> Result<Decision, StoreError> {
        let entry_key = format!("{key}:{}", quota.window_secs());
        let hit = self.store.increment(&entry_key, quota.window()).await?;
        let limit = quota.max_requests();

        Ok(Decision {
            allowed: hit.count <= u64::from(limit),
            count: hit.count,
            limit,
            remaining: u64::from(limit).saturating_sub(hit.count),
            reset_in: hit.reset_in,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::limiter::MemoryStore;

    fn limiter() -> RateLimiter<MemoryStore> {
        RateLimiter::new(MemoryStore::new())
    }

    #[test]
    fn test_quota_rejects_zero_requests() {
        assert_eq!(Quota::new(0, 60), Err(RateLimitError::ZeroRequests));
    }

    #[test]
    fn test_quota_rejects_zero_window() {
        assert_eq!(Quota::new(10, 0), Err(RateLimitError::ZeroWindow));
    }

    #[test]
    fn test_quota_rejects_oversized_window() {
        assert_eq!(Quota::new(10, u64::MAX), Err(RateLimitError::WindowTooLarge));
        assert_eq!(
            Quota::new(10, Quota::MAX_WINDOW_SECS + 1),
            Err(RateLimitError::WindowTooLarge)
        );
        assert!(Quota::new(10, Quota::MAX_WINDOW_SECS).is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_longest_window_is_enforced() {
        let limiter = limiter();
        let quota = Quota::new(1, Quota::MAX_WINDOW_SECS).unwrap();

        assert!(limiter.check("yearly", quota).await.unwrap().allowed);
        let decision = limiter.check("yearly", quota).await.unwrap();
        assert!(!decision.allowed);
        assert_eq!(decision.reset_in, quota.window());
    }

    #[test]
    fn test_quota_accessors() {
        let quota = Quota::new(10, 60).unwrap();
        assert_eq!(quota.max_requests(), 10);
        assert_eq!(quota.window(), Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn test_eleventh_request_is_rejected() {
        let limiter = limiter();
        let quota = Quota::new(10, 60).unwrap();

        for n in 1..=10u64 {
            let decision = limiter.check("198.51.100.4", quota).await.unwrap();
            assert!(decision.allowed, "request {n} should be allowed");
            assert_eq!(decision.count, n);
            assert_eq!(decision.remaining, 10 - n);
        }

        let decision = limiter.check("198.51.100.4", quota).await.unwrap();
        assert!(!decision.allowed);
        assert_eq!(decision.count, 11);
        assert_eq!(decision.remaining, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_counter_resets_after_window() {
        let limiter = limiter();
        let quota = Quota::new(2, 60).unwrap();

        for _ in 0..3 {
            limiter.check("client", quota).await.unwrap();
        }
        assert!(!limiter.check("client", quota).await.unwrap().allowed);

        tokio::time::advance(Duration::from_secs(60)).await;

        let decision = limiter.check("client", quota).await.unwrap();
        assert!(decision.allowed);
        assert_eq!(decision.count, 1);
        assert_eq!(decision.reset_in, Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn test_keys_do_not_share_budget() {
        let limiter = limiter();
        let quota = Quota::new(1, 60).unwrap();

        assert!(limiter.check("a", quota).await.unwrap().allowed);
        assert!(!limiter.check("a", quota).await.unwrap().allowed);
        assert!(limiter.check("b", quota).await.unwrap().allowed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_windows_are_tracked_separately() {
        let limiter = limiter();
        let per_minute = Quota::new(1, 60).unwrap();
        let per_hour = Quota::new(1, 3600).unwrap();

        assert!(limiter.check("a", per_minute).await.unwrap().allowed);
        assert!(limiter.check("a", per_hour).await.unwrap().allowed);
        assert_eq!(limiter.store().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_boundary_burst_is_admitted() {
        let limiter = limiter();
        let quota = Quota::new(3, 10).unwrap();

        // Window opens at t=0 and closes at t=10.
        assert!(limiter.check("burst", quota).await.unwrap().allowed);

        tokio::time::advance(Duration::from_secs(9)).await;
        let mut admitted = 0;
        for _ in 0..2 {
            if limiter.check("burst", quota).await.unwrap().allowed {
                admitted += 1;
            }
        }

        tokio::time::advance(Duration::from_secs(1)).await;
        for _ in 0..3 {
            if limiter.check("burst", quota).await.unwrap().allowed {
                admitted += 1;
            }
        }

        // Five requests inside one second, with a quota of three per ten.
        assert_eq!(admitted, 5);
    }

    #[test]
    fn test_rate_limit_error_display() {
        assert!(RateLimitError::ZeroRequests.to_string().contains("max_requests"));
        assert!(RateLimitError::ZeroWindow.to_string().contains("window"));
        assert!(RateLimitError::WindowTooLarge.to_string().contains("31536000"));
    }
}
