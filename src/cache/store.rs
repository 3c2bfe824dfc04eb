//! Cache Store Module
//!
//! Main cache engine combining the LRU map with TTL expiration behind a single
//! per-instance mutex.

use std::borrow::Borrow;
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::cache::stats::Counters;
use crate::cache::{CacheEntry, CacheStats, LruMap};
use crate::clock::{Clock, SystemClock};
use crate::error::{CacheError, Result};

const DEFAULT_NAME: &str = "cache";

struct Inner<K, V> {
    entries: LruMap<K, CacheEntry<V>>,
    counters: Counters,
}

// == Bounded Cache ==
/// Thread-safe key→value cache with a capacity bound and optional TTL.
///
/// Every operation runs under one mutex, so all threads observe the
/// operations of a single instance in some total order.
///
/// Expiry is lazy: an entry older than the TTL is reported absent by `get`
/// and `contains` even while it still occupies a slot, until a `get`, a
/// capacity-driven purge or `cleanup_expired` removes it. Age is measured
/// from the last `set` or successful `get`. The clock is read with the lock
/// held, so recency order and timestamp order agree.
pub struct BoundedCache<K, V> {
    name: String,
    max_size: usize,
    ttl: Option<Duration>,
    clock: Arc<dyn Clock>,
    inner: Mutex<Inner<K, V>>,
}

impl<K, V> BoundedCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    // == Constructor ==
    /// Creates a cache holding at most `max_size` entries.
    ///
    /// A `max_size` of zero is raised to one.
    pub fn new(max_size: usize, ttl: Option<Duration>) -> Self {
        let max_size = if max_size == 0 {
            warn!("BoundedCache max_size of 0 raised to 1");
            1
        } else {
            max_size
        };

        Self {
            name: DEFAULT_NAME.to_string(),
            max_size,
            ttl,
            clock: Arc::new(SystemClock),
            inner: Mutex::new(Inner {
                entries: LruMap::with_capacity(max_size.min(4096)),
                counters: Counters::default(),
            }),
        }
    }

    /// Sets the name reported in log events.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Replaces the time source used for TTL bookkeeping.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    // == Accessors ==
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    pub fn ttl(&self) -> Option<Duration> {
        self.ttl
    }

    // == Get ==
    /// Retrieves a value by key.
    ///
    /// A live entry is promoted to most recently used, its timestamp is
    /// refreshed and a hit is recorded. An expired entry is removed and
    /// counted as a miss.
    pub fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let mut guard = self.inner.lock();
        let now = self.clock.now();
        let inner = &mut *guard;

        let expired = match inner.entries.peek(key) {
            Some(entry) => entry.is_expired(now, self.ttl),
            None => {
                inner.counters.record_miss();
                return None;
            }
        };

        if expired {
            inner.entries.remove(key);
            inner.counters.record_miss();
            inner.counters.record_expired(1);
            debug!(cache = %self.name, "Expired entry removed on access");
            return None;
        }

        inner.entries.promote(key);
        let entry = inner.entries.peek_mut(key)?;
        entry.touch(now);
        let value = entry.value.clone();
        inner.counters.record_hit();
        Some(value)
    }

    /// Retrieves a value by key, or `default` if it is absent or expired.
    pub fn get_or<Q>(&self, key: &Q, default: V) -> V
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.get(key).unwrap_or(default)
    }

    // == Set ==
    /// Stores a key-value pair at the most recently used position.
    ///
    /// An existing key has its value replaced and timestamp refreshed. A new
    /// key on a full cache first drops expired entries from the LRU end, then
    /// evicts the least recently used entry if the cache is still full.
    pub fn set(&self, key: K, value: V) {
        let mut guard = self.inner.lock();
        let now = self.clock.now();
        let inner = &mut *guard;

        if !inner.entries.contains_key(&key) && inner.entries.len() >= self.max_size {
            self.make_room(inner, now);
        }

        inner.entries.insert(key, CacheEntry::new(value, now));
    }

    fn make_room(&self, inner: &mut Inner<K, V>, now: Instant) {
        let mut purged = 0;
        while let Some((_, entry)) = inner.entries.peek_oldest() {
            if !entry.is_expired(now, self.ttl) {
                break;
            }
            inner.entries.pop_oldest();
            purged += 1;
        }
        if purged > 0 {
            inner.counters.record_expired(purged);
            debug!(cache = %self.name, purged, "Purged expired entries before insert");
        }

        if inner.entries.len() >= self.max_size && inner.entries.pop_oldest().is_some() {
            inner.counters.record_eviction();
            debug!(
                cache = %self.name,
                max_size = self.max_size,
                "Evicted least recently used entry"
            );
        }
    }

    // == Delete ==
    /// Removes an entry by key.
    ///
    /// Fails with `CacheError::NotFound` if the key is absent.
    pub fn delete<Q>(&self, key: &Q) -> Result<()>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + fmt::Debug + ?Sized,
    {
        match self.inner.lock().entries.remove(key) {
            Some(_) => Ok(()),
            None => Err(CacheError::NotFound(format!("{:?}", key))),
        }
    }

    // == Contains ==
    /// Membership check that neither promotes the entry nor touches counters.
    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let inner = self.inner.lock();
        let now = self.clock.now();
        inner
            .entries
            .peek(key)
            .is_some_and(|entry| !entry.is_expired(now, self.ttl))
    }

    // == Cleanup Expired ==
    /// Removes every entry older than the TTL.
    ///
    /// Returns the number of entries removed; always 0 without a TTL.
    pub fn cleanup_expired(&self) -> usize {
        let Some(ttl) = self.ttl else {
            return 0;
        };

        let mut guard = self.inner.lock();
        let now = self.clock.now();
        let inner = &mut *guard;
        let removed = inner
            .entries
            .retain(|_, entry| !entry.is_expired(now, Some(ttl)));
        inner.counters.record_expired(removed);

        if removed > 0 {
            info!(cache = %self.name, removed, "Cleaned up expired entries");
        } else {
            debug!(cache = %self.name, "No expired entries found");
        }
        removed
    }

    // == Clear ==
    /// Removes all entries. Counters are left untouched.
    pub fn clear(&self) {
        self.inner.lock().entries.clear();
    }

    // == Size ==
    /// Number of stored entries, including expired ones not yet removed.
    pub fn size(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    // == Stats ==
    /// Returns a snapshot of size, configuration and counters.
    pub fn stats(&self) -> CacheStats {
        let inner = self.inner.lock();
        CacheStats::snapshot(&inner.counters, inner.entries.len(), self.max_size, self.ttl)
    }

    /// Zeroes the hit, miss, eviction and expiry counters.
    pub fn reset_stats(&self) {
        self.inner.lock().counters = Counters::default();
    }

    // == Snapshots ==
    /// Live keys, oldest first.
    pub fn keys(&self) -> Vec<K> {
        self.collect_live(|key, _| key.clone())
    }

    /// Live values, oldest first.
    pub fn values(&self) -> Vec<V> {
        self.collect_live(|_, value| value.clone())
    }

    /// Live key-value pairs, oldest first.
    pub fn items(&self) -> Vec<(K, V)> {
        self.collect_live(|key, value| (key.clone(), value.clone()))
    }

    fn collect_live<T, F>(&self, mut project: F) -> Vec<T>
    where
        F: FnMut(&K, &V) -> T,
    {
        let inner = self.inner.lock();
        let now = self.clock.now();
        inner
            .entries
            .iter()
            .filter(|(_, entry)| !entry.is_expired(now, self.ttl))
            .map(|(key, entry)| project(key, &entry.value))
            .collect()
    }
}

impl<K: Eq + Hash + Clone, V> fmt::Debug for BoundedCache<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundedCache")
            .field("name", &self.name)
            .field("max_size", &self.max_size)
            .field("ttl", &self.ttl)
            .field("size", &self.inner.lock().entries.len())
            .finish()
    }
}
