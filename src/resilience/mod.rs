//! Resilience Module
//!
//! Call wrappers for outbound requests to remote model providers.
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`retry`] | Exponential backoff with jitter; folds exhausted retries into a [`CallResult`] |
//! | [`circuit_breaker`] | Stops calling a persistently failing dependency for a cooldown window |
//! | [`guarded`] | Retry around a breaker, in that fixed order |
//!
//! ```rust
//! use chat_resilience::resilience::{CallResult, RetryConfig, RetryPolicy};
//! use std::time::Duration;
//!
//! let policy = RetryPolicy::new(
//!     RetryConfig::network()
//!         .with_max_retries(2)
//!         .with_base_delay(Duration::from_millis(1)),
//! );
//!
//! let result = policy.call(|| Ok::<_, std::io::Error>(CallResult::ok("reply")));
//! assert_eq!(result.unwrap(), CallResult::ok("reply"));
//! ```

pub mod circuit_breaker;
pub mod guarded;
mod outcome;
pub mod retry;

pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitSnapshot, CircuitState};
pub use guarded::GuardedCall;
pub use outcome::{CallResult, ClassifyFailure, FailureFilter, FailureKind};
pub use retry::{retry_with_backoff, RetryConfig, RetryPolicy};
