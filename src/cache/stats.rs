//! Cache Statistics Module
//!
//! Tracks cache performance metrics including hits, misses, evictions and
//! expirations.

use std::time::Duration;

use serde::Serialize;

// == Counters ==
/// Running counters owned by a cache.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct Counters {
    pub hit_count: u64,
    pub miss_count: u64,
    pub eviction_count: u64,
    pub expired_count: u64,
}

impl Counters {
    pub fn record_hit(&mut self) {
        self.hit_count += 1;
    }

    pub fn record_miss(&mut self) {
        self.miss_count += 1;
    }

    pub fn record_eviction(&mut self) {
        self.eviction_count += 1;
    }

    pub fn record_expired(&mut self, count: usize) {
        self.expired_count += count as u64;
    }
}

// == Cache Stats ==
/// Point-in-time snapshot of a cache's size, configuration and counters.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheStats {
    /// Current number of stored entries
    pub size: usize,
    /// Capacity bound
    pub max_size: usize,
    /// Number of successful retrievals
    pub hit_count: u64,
    /// Number of failed retrievals (key absent or expired)
    pub miss_count: u64,
    /// hit_count / (hit_count + miss_count), 0.0 before any lookup
    pub hit_rate: f64,
    /// Number of entries removed by LRU eviction
    pub eviction_count: u64,
    /// Number of entries removed because they outlived the TTL
    pub expired_count: u64,
    /// Entry lifetime, if any
    pub ttl: Option<Duration>,
}

impl CacheStats {
    pub(crate) fn snapshot(
        counters: &Counters,
        size: usize,
        max_size: usize,
        ttl: Option<Duration>,
    ) -> Self {
        Self {
            size,
            max_size,
            hit_count: counters.hit_count,
            miss_count: counters.miss_count,
            hit_rate: hit_rate(counters.hit_count, counters.miss_count),
            eviction_count: counters.eviction_count,
            expired_count: counters.expired_count,
            ttl,
        }
    }

    /// Total number of lookups recorded.
    pub fn lookups(&self) -> u64 {
        self.hit_count + self.miss_count
    }
}

// == Hit Rate ==
/// Returns hits / (hits + misses), or 0.0 if no requests have been made.
fn hit_rate(hits: u64, misses: u64) -> f64 {
    let total = hits + misses;
    if total == 0 {
        0.0
    } else {
        hits as f64 / total as f64
    }
}
