//! Redis-backed counter store.
//!
//! This is the production path: every API instance talks to the same Redis,
//! so limits hold across processes. The increment, the expiry on the first
//! hit and the TTL read run in one Lua script, which Redis executes
//! atomically; concurrent callers never lose an increment and the limiter
//! holds no lock of its own.

use std::time::Duration;

use redis::aio::ConnectionManager;
use redis::{Client, RedisError, Script};
use tracing::{info, warn};

use super::store::{CounterStore, StoreError, WindowCount};

/// Embedded Lua script for the atomic fixed-window increment.
const FIXED_WINDOW_SCRIPT: &str = include_str!("fixed_window.lua");

impl From<RedisError> for StoreError {
    fn from(err: RedisError) -> Self {
        if err.is_io_error() || err.is_connection_dropped() || err.is_timeout() {
            StoreError::Unavailable(err.to_string())
        } else {
            StoreError::Protocol(err.to_string())
        }
    }
}

/// Fixed-window counters shared through Redis.
#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
    key_prefix: String,
    script: Script,
}

impl RedisStore {
    /// Connect to Redis at `url`. Keys are stored as `{key_prefix}{key}`.
    ///
    /// The connection manager reconnects on its own after transient failures;
    /// only the initial connection has to succeed here.
    pub async fn connect(url: &str, key_prefix: impl Into<String>) -> Result<Self, StoreError> {
        let client = Client::open(url)?;
        let conn = ConnectionManager::new(client).await?;
        let key_prefix = key_prefix.into();

        info!(prefix = %key_prefix, "Connected to Redis counter store");

        Ok(Self {
            conn,
            key_prefix,
            script: Script::new(FIXED_WINDOW_SCRIPT),
        })
    }

    fn namespaced(&self, key: &str) -> String {
        format!("{}{key}", self.key_prefix)
    }
}

impl CounterStore for RedisStore {
    fn backend(&self) -> &'static str {
        "redis"
    }

    async fn increment(&self, key: &str, window: Duration) -> Result<WindowCount, StoreError> {
        let mut conn = self.conn.clone();
        let window_ms = u64::try_from(window.as_millis()).unwrap_or(u64::MAX).max(1);

        let (count, ttl_ms): (u64, i64) = self
            .script
            .key(self.namespaced(key))
            .arg(window_ms)
            .invoke_async(&mut conn)
            .await
            .inspect_err(|e| warn!(error = %e, key = %key, "Redis increment failed"))?;

        if count == 0 {
            return Err(StoreError::Protocol(format!(
                "counter for {key} reported zero after increment"
            )));
        }

        Ok(WindowCount {
            count,
            reset_in: Duration::from_millis(u64::try_from(ttl_ms).unwrap_or(0)),
        })
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        let reply: String = redis::cmd("PING").query_async(&mut conn).await?;

        if reply == "PONG" {
            Ok(())
        } else {
            Err(StoreError::Protocol(format!("unexpected PING reply: {reply}")))
        }
    }
}
