//! Error types for the cache and resilience primitives
//!
//! Provides unified error handling using thiserror.

use std::time::Duration;

use thiserror::Error;

// == Cache Error Enum ==
/// Errors raised by cache operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// Key not found in cache
    #[error("Key not found: {0}")]
    NotFound(String),
}

// == Circuit Error Enum ==
/// Outcome of a call rejected or failed behind a circuit breaker.
#[derive(Error, Debug)]
pub enum CircuitError<E> {
    /// The breaker is open and the call was not attempted
    #[error("Circuit open: retry after {retry_after:?}")]
    Open {
        /// Remaining cooldown before a trial call is admitted
        retry_after: Duration,
    },

    /// The wrapped operation failed; the original error is passed through
    #[error("{0}")]
    Inner(E),
}

impl<E> CircuitError<E> {
    /// Returns true if the call was rejected without being attempted.
    pub fn is_open(&self) -> bool {
        matches!(self, CircuitError::Open { .. })
    }

    /// Returns the wrapped failure, if the call was attempted.
    pub fn into_inner(self) -> Option<E> {
        match self {
            CircuitError::Inner(err) => Some(err),
            CircuitError::Open { .. } => None,
        }
    }
}

// == Result Type Alias ==
/// Convenience Result type for cache operations.
pub type Result<T> = std::result::Result<T, CacheError>;
