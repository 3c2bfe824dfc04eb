//! Cache Entry Module
//!
//! Defines the record stored for each key, with the access timestamp used for
//! TTL expiry folded into it.

use std::time::{Duration, Instant};

// == Cache Entry ==
/// A single cache entry: the stored value plus its last access time.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    /// The stored value
    pub value: V,
    /// Last time the entry was written or read through `get`
    pub last_access: Instant,
}

impl<V> CacheEntry<V> {
    // == Constructor ==
    /// Creates a new entry accessed at `now`.
    pub fn new(value: V, now: Instant) -> Self {
        Self {
            value,
            last_access: now,
        }
    }

    // == Age ==
    /// Time since the entry was last accessed.
    pub fn age(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.last_access)
    }

    // == Is Expired ==
    /// Checks if the entry has outlived `ttl`.
    ///
    /// An entry expires once its age strictly exceeds the TTL. With no TTL the
    /// entry never expires.
    pub fn is_expired(&self, now: Instant, ttl: Option<Duration>) -> bool {
        match ttl {
            Some(ttl) => self.age(now) > ttl,
            None => false,
        }
    }

    // == Touch ==
    /// Refreshes the access timestamp.
    pub fn touch(&mut self, now: Instant) {
        self.last_access = now;
    }

    // == Time To Live ==
    /// Remaining lifetime under `ttl`, or None if no TTL is set.
    ///
    /// # Returns
    /// - `Some(Duration::ZERO)` if the entry has expired
    /// - `Some(remaining)` if the entry has not yet expired
    /// - `None` if there is no TTL
    pub fn ttl_remaining(&self, now: Instant, ttl: Option<Duration>) -> Option<Duration> {
        ttl.map(|ttl| ttl.saturating_sub(self.age(now)))
    }
}
