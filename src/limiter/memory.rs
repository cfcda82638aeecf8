//! In-process counter store.
//!
//! Counters live in a `HashMap` guarded by a single `Mutex`. This is only
//! correct for a single server process: state is lost on restart and
//! separate instances do not see each other's counts. Use the Redis store
//! when the API runs on more than one instance.
//!
//! Time comes from `tokio::time::Instant`, so tests can drive windows with
//! `tokio::time::pause()` / `advance()`.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

use super::fixed_window::Quota;
use super::store::{CounterStore, StoreError, WindowCount};

#[derive(Debug, Clone, Copy)]
struct Entry {
    count: u64,
    reset_at: Instant,
}

/// Mutex-guarded in-process fixed-window counters.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Entry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    // A poisoned lock only means another thread panicked mid-update; the
    // map itself is still a valid set of counters.
    fn lock(&self) -> MutexGuard<'_, HashMap<String, Entry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Increment `key` as of `now`.
    ///
    /// The window reopens at the instant `now == reset_at`, not after it;
    /// Redis expires the key at that same instant. A `window` too large to
    /// add to `now` is clamped to [`Quota::MAX_WINDOW_SECS`].
    pub fn increment_at(&self, key: &str, window: Duration, now: Instant) -> WindowCount {
        let mut entries = self.lock();

        let entry = match entries.get_mut(key) {
            Some(entry) if now < entry.reset_at => {
                entry.count = entry.count.saturating_add(1);
                *entry
            }
            _ => {
                let reset_at = now.checked_add(window).unwrap_or_else(|| {
                    now + Duration::from_secs(Quota::MAX_WINDOW_SECS)
                });
                let fresh = Entry { count: 1, reset_at };
                entries.insert(key.to_string(), fresh);
                fresh
            }
        };

        WindowCount {
            count: entry.count,
            reset_in: entry.reset_at.saturating_duration_since(now),
        }
    }

    /// Drop every entry whose window has closed. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|_, entry| now < entry.reset_at);
        let removed = before - entries.len();

        if removed > 0 {
            debug!(removed, remaining = entries.len(), "Purged expired rate limit entries");
        }
        removed
    }

    /// Number of tracked keys, expired or not.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

impl CounterStore for MemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn increment(&self, key: &str, window: Duration) -> Result<WindowCount, StoreError> {
        Ok(self.increment_at(key, window, Instant::now()))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
