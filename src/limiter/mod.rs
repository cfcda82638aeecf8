//! Fixed-window rate limiting with pluggable counter stores.
//!
//! ```text
//!              RateLimiter::check(key, quota)
//!                          │
//!                          ▼
//!                 CounterStore::increment
//!                 ┌────────┴────────┐
//!                 ▼                 ▼
//!            RedisStore        MemoryStore
//!        (Lua, multi-process) (Mutex<HashMap>, one process)
//! ```
//!
//! `CounterBackend` picks one of the two at startup from configuration.

mod backend;
mod fixed_window;
mod memory;
mod redis_store;
mod store;

pub use backend::{BackendKind, CounterBackend};
pub use fixed_window::{Decision, Quota, RateLimitError, RateLimiter};
pub use memory::MemoryStore;
pub use redis_store::RedisStore;
pub use store::{CounterStore, StoreError, WindowCount};
