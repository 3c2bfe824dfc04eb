//! Retry and circuit breaking composed in a fixed order.
//!
//! The retry policy is the outer wrapper and the breaker the inner one, so the
//! breaker records every individual attempt. A circuit-open rejection is never
//! retried: it ends the call with `Err(CircuitError::Open)`.

use std::fmt::Display;
use std::sync::Arc;

use crate::error::CircuitError;
use crate::resilience::{CallResult, CircuitBreaker, ClassifyFailure, RetryPolicy};

/// A retry policy wrapped around a shared circuit breaker.
pub struct GuardedCall {
    retry: RetryPolicy,
    breaker: Arc<CircuitBreaker>,
}

impl GuardedCall {
    pub fn new(retry: RetryPolicy, breaker: Arc<CircuitBreaker>) -> Self {
        Self { retry, breaker }
    }

    pub fn breaker(&self) -> &Arc<CircuitBreaker> {
        &self.breaker
    }

    pub fn retry(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Runs `op` with each attempt passing through the breaker.
    ///
    /// Errors the retry filter accepts are retried and finally folded into a
    /// failed `CallResult`; other errors and circuit-open rejections are
    /// returned as `Err`.
    pub fn call<T, E, F>(&self, mut op: F) -> Result<CallResult<T>, CircuitError<E>>
    where
        F: FnMut() -> Result<CallResult<T>, E>,
        E: ClassifyFailure + Display,
    {
        let retry_on = &self.retry.config().retry_on;
        self.retry.call_with(
            || self.breaker.call(&mut op),
            |err: &CircuitError<E>| match err {
                CircuitError::Open { .. } => false,
                CircuitError::Inner(inner) => retry_on.matches_error(inner),
            },
        )
    }
}
