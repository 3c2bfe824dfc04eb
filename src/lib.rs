//! Chat Resilience - caching and call resilience for chat-bot provider adapters
//!
//! Provides a thread-safe cache with LRU eviction and TTL expiry, an
//! exponential-backoff retry wrapper and a circuit breaker. The host owns one
//! instance per logical resource and passes it to the code that needs it.

pub mod cache;
pub mod clock;
pub mod config;
pub mod error;
pub mod resilience;
pub mod tasks;

pub use cache::{BoundedCache, CachePreset, CacheStats};
pub use config::Config;
pub use error::{CacheError, CircuitError};
pub use resilience::{
    retry_with_backoff, CallResult, CircuitBreaker, CircuitState, GuardedCall, RetryConfig,
    RetryPolicy,
};
pub use tasks::{spawn_cleanup_thread, CleanupHandle};
