//! Runtime selection between the counter store implementations.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use super::memory::MemoryStore;
use super::redis_store::RedisStore;
use super::store::{CounterStore, StoreError, WindowCount};

/// Which counter store the application runs with (`RATE_LIMIT_BACKEND`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackendKind {
    /// In-process map, single instance only.
    #[default]
    Memory,
    /// Shared Redis store.
    Redis,
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "redis" => Ok(Self::Redis),
            other => Err(format!("unknown backend '{other}', expected 'memory' or 'redis'")),
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Memory => f.write_str("memory"),
            Self::Redis => f.write_str("redis"),
        }
    }
}

/// The counter store picked at startup.
pub enum CounterBackend {
    Memory(MemoryStore),
    Redis(RedisStore),
}

impl CounterBackend {
    /// The in-process store, when that is what is running.
    ///
    /// Used by the state to decide whether the expiry sweep is needed.
    pub fn as_memory(&self) -> Option<&MemoryStore> {
        match self {
            Self::Memory(store) => Some(store),
            Self::Redis(_) => None,
        }
    }
}

impl From<MemoryStore> for CounterBackend {
    fn from(store: MemoryStore) -> Self {
        Self::Memory(store)
    }
}

impl From<RedisStore> for CounterBackend {
    fn from(store: RedisStore) -> Self {
        Self::Redis(store)
    }
}

impl CounterStore for CounterBackend {
    fn backend(&self) -> &'static str {
        match self {
            Self::Memory(store) => store.backend(),
            Self::Redis(store) => store.backend(),
        }
    }

    async fn increment(&self, key: &str, window: Duration) -> Result<WindowCount, StoreError> {
        match self {
            Self::Memory(store) => store.increment(key, window).await,
            Self::Redis(store) => store.increment(key, window).await,
        }
    }

    async fn ping(&self) -> Result<(), StoreError> {
        match self {
            Self::Memory(store) => store.ping().await,
            Self::Redis(store) => store.ping().await,
        }
    }
}
