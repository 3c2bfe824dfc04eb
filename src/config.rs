//! Configuration Module
//!
//! Loads cache, retry and circuit-breaker settings from environment variables
//! and builds the corresponding instances for the host to own.

use std::env;
use std::hash::Hash;
use std::str::FromStr;
use std::time::Duration;

use crate::cache::{BoundedCache, CachePreset};
use crate::resilience::{CircuitBreaker, CircuitBreakerConfig, RetryConfig, RetryPolicy};

/// Resilience and caching configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Capacity of the conversation cache
    pub conversation_cache_size: usize,
    /// Conversation entry lifetime in seconds
    pub conversation_cache_ttl: u64,
    /// Capacity of the uploaded-file cache
    pub file_cache_size: usize,
    /// File entry lifetime in seconds
    pub file_cache_ttl: u64,
    /// Background cleanup interval in seconds
    pub cleanup_interval: u64,
    /// Retries after the first attempt
    pub retry_max_retries: u32,
    /// First backoff delay in milliseconds
    pub retry_base_delay_ms: u64,
    /// Backoff ceiling in milliseconds
    pub retry_max_delay_ms: u64,
    /// Consecutive failures that open a circuit
    pub breaker_failure_threshold: u32,
    /// Seconds an open circuit waits before a trial call
    pub breaker_recovery_timeout: u64,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CONVERSATION_CACHE_SIZE` - Conversation cache capacity (default: 1000)
    /// - `CONVERSATION_CACHE_TTL` - Conversation TTL in seconds (default: 10800)
    /// - `FILE_CACHE_SIZE` - File cache capacity (default: 500)
    /// - `FILE_CACHE_TTL` - File TTL in seconds (default: 3600)
    /// - `CLEANUP_INTERVAL` - Cleanup frequency in seconds (default: 60)
    /// - `RETRY_MAX_RETRIES` - Retries per call (default: 3)
    /// - `RETRY_BASE_DELAY_MS` - First backoff delay (default: 1000)
    /// - `RETRY_MAX_DELAY_MS` - Backoff ceiling (default: 60000)
    /// - `BREAKER_FAILURE_THRESHOLD` - Failures before opening (default: 5)
    /// - `BREAKER_RECOVERY_TIMEOUT` - Open-state cooldown in seconds (default: 60)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            conversation_cache_size: env_or("CONVERSATION_CACHE_SIZE", defaults.conversation_cache_size),
            conversation_cache_ttl: env_or("CONVERSATION_CACHE_TTL", defaults.conversation_cache_ttl),
            file_cache_size: env_or("FILE_CACHE_SIZE", defaults.file_cache_size),
            file_cache_ttl: env_or("FILE_CACHE_TTL", defaults.file_cache_ttl),
            cleanup_interval: env_or("CLEANUP_INTERVAL", defaults.cleanup_interval),
            retry_max_retries: env_or("RETRY_MAX_RETRIES", defaults.retry_max_retries),
            retry_base_delay_ms: env_or("RETRY_BASE_DELAY_MS", defaults.retry_base_delay_ms),
            retry_max_delay_ms: env_or("RETRY_MAX_DELAY_MS", defaults.retry_max_delay_ms),
            breaker_failure_threshold: env_or(
                "BREAKER_FAILURE_THRESHOLD",
                defaults.breaker_failure_threshold,
            ),
            breaker_recovery_timeout: env_or(
                "BREAKER_RECOVERY_TIMEOUT",
                defaults.breaker_recovery_timeout,
            ),
        }
    }

    /// Builds the conversation cache.
    pub fn conversation_cache<K, V>(&self) -> BoundedCache<K, V>
    where
        K: Eq + Hash + Clone,
        V: Clone,
    {
        BoundedCache::new(
            self.conversation_cache_size,
            Some(Duration::from_secs(self.conversation_cache_ttl)),
        )
        .with_name(CachePreset::Conversation.name())
    }

    /// Builds the uploaded-file cache.
    pub fn file_cache<K, V>(&self) -> BoundedCache<K, V>
    where
        K: Eq + Hash + Clone,
        V: Clone,
    {
        BoundedCache::new(self.file_cache_size, Some(Duration::from_secs(self.file_cache_ttl)))
            .with_name(CachePreset::File.name())
    }

    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval)
    }

    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig::new()
            .with_max_retries(self.retry_max_retries)
            .with_base_delay(Duration::from_millis(self.retry_base_delay_ms))
            .with_max_delay(Duration::from_millis(self.retry_max_delay_ms))
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.retry_config())
    }

    pub fn breaker_config(&self) -> CircuitBreakerConfig {
        CircuitBreakerConfig::new()
            .with_failure_threshold(self.breaker_failure_threshold)
            .with_recovery_timeout(Duration::from_secs(self.breaker_recovery_timeout))
    }

    /// Builds a breaker named after the dependency it guards.
    pub fn circuit_breaker(&self, name: &str) -> CircuitBreaker {
        CircuitBreaker::new(self.breaker_config()).with_name(name)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            conversation_cache_size: CachePreset::Conversation.max_size(),
            conversation_cache_ttl: CachePreset::Conversation.ttl().as_secs(),
            file_cache_size: CachePreset::File.max_size(),
            file_cache_ttl: CachePreset::File.ttl().as_secs(),
            cleanup_interval: 60,
            retry_max_retries: 3,
            retry_base_delay_ms: 1000,
            retry_max_delay_ms: 60_000,
            breaker_failure_threshold: 5,
            breaker_recovery_timeout: 60,
        }
    }
}

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
