//! Shared application state for Axum handlers.
//!
//! Holds the configuration, the client IP resolver and the rate limiter with
//! the counter store selected at startup.
//!
//! # Structured Concurrency
//!
//! With the in-process store a background task purges expired counters.
//! It is managed with `tokio_util::task::TaskTracker` and `CancellationToken`;
//! call `shutdown()` to stop it before exit.

use std::sync::Arc;
use std::time::Instant;

use tokio::time::interval;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info};

use crate::config::Config;
use crate::error::AppResult;
use crate::limiter::{BackendKind, CounterBackend, MemoryStore, RateLimiter, RedisStore};
use crate::metrics;
use crate::middleware::{ClientIpResolver, TrustedProxies};

/// Shared application state, cloned into every handler.
#[derive(Clone)]
pub struct AppState {
    /// Fixed-window limiter over the configured counter store
    pub limiter: RateLimiter<CounterBackend>,
    /// Client IP resolver honouring `TRUSTED_PROXIES`
    pub resolver: ClientIpResolver,
    /// Timestamp when the application started
    pub started_at: Instant,
    /// Application configuration
    pub config: Arc<Config>,
    task_tracker: TaskTracker,
    cancellation_token: CancellationToken,
}

impl AppState {
    /// Build state around an already constructed counter store.
    ///
    /// Spawns the expiry sweep when the store is the in-process one, so this
    /// must be called from within a Tokio runtime.
    pub fn new(backend: CounterBackend, config: Config) -> Self {
        let trusted = TrustedProxies::new(&config.trusted_proxies);
        if !trusted.is_enabled() {
            info!("TRUSTED_PROXIES not set, forwarding headers are accepted from any peer");
        }

        let state = Self {
            limiter: RateLimiter::new(backend),
            resolver: ClientIpResolver::new(trusted),
            started_at: Instant::now(),
            config: Arc::new(config),
            task_tracker: TaskTracker::new(),
            cancellation_token: CancellationToken::new(),
        };

        if state.limiter.store().as_memory().is_some() {
            state.spawn_sweep_task();
        }

        state
    }

    /// Connect the configured counter store and build the state.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Store` if the Redis backend is selected and the
    /// initial connection fails.
    pub async fn connect(config: Config) -> AppResult<Self> {
        let backend = match config.rate_limit_backend {
            BackendKind::Memory => {
                info!("Using in-process rate limit store (single instance only)");
                CounterBackend::from(MemoryStore::new())
            }
            BackendKind::Redis => {
                let store =
                    RedisStore::connect(&config.redis_url, config.rate_limit_key_prefix.clone())
                        .await?;
                CounterBackend::from(store)
            }
        };

        Ok(Self::new(backend, config))
    }

    /// Name of the active counter store backend.
    pub fn backend(&self) -> &'static str {
        use crate::limiter::CounterStore;
        self.limiter.store().backend()
    }

    /// Periodically drop closed windows from the in-process store.
    fn spawn_sweep_task(&self) {
        let limiter = self.limiter.clone();
        let period = self.config.rate_limit_sweep_interval;
        let cancel = self.cancellation_token.clone();

        self.task_tracker.spawn(async move {
            let mut ticker = interval(period);
            ticker.tick().await; // Skip the first immediate tick

            loop {
                tokio::select! {
                    biased;

                    _ = cancel.cancelled() => {
                        debug!("Rate limit sweep task received cancellation signal");
                        break;
                    }
                    _ = ticker.tick() => {
                        if let Some(store) = limiter.store().as_memory() {
                            store.purge_expired();
                            metrics::set_memory_store_entries(store.len());
                        }
                    }
                }
            }

            debug!("Rate limit sweep task shutting down");
        });
    }

    /// Gracefully shutdown all background tasks.
    pub async fn shutdown(&self) {
        info!("Initiating graceful shutdown of background tasks");

        self.cancellation_token.cancel();
        self.task_tracker.close();
        self.task_tracker.wait().await;

        info!("All background tasks have completed");
    }

    /// Get the application uptime in seconds.
    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}
