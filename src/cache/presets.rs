//! Cache Presets Module
//!
//! Named capacity/lifetime configurations for the caches a chat backend keeps.

use std::hash::Hash;
use std::time::Duration;

use crate::cache::BoundedCache;

// == Cache Preset ==
/// Predefined cache configurations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CachePreset {
    /// Recent dialogue history: large capacity, three-hour lifetime
    Conversation,
    /// Uploaded-document metadata: moderate capacity, one-hour lifetime
    File,
}

impl CachePreset {
    pub fn max_size(self) -> usize {
        match self {
            CachePreset::Conversation => 1000,
            CachePreset::File => 500,
        }
    }

    pub fn ttl(self) -> Duration {
        match self {
            CachePreset::Conversation => Duration::from_secs(3 * 60 * 60),
            CachePreset::File => Duration::from_secs(60 * 60),
        }
    }

    /// Log name used by caches built from this preset.
    pub fn name(self) -> &'static str {
        match self {
            CachePreset::Conversation => "conversations",
            CachePreset::File => "files",
        }
    }
}

impl<K, V> BoundedCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// Creates a cache sized and timed by `preset`.
    pub fn from_preset(preset: CachePreset) -> Self {
        BoundedCache::new(preset.max_size(), Some(preset.ttl())).with_name(preset.name())
    }
}

/// Cache tuned for dialogue history.
pub fn conversation_cache<K, V>() -> BoundedCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    BoundedCache::from_preset(CachePreset::Conversation)
}

/// Cache tuned for uploaded-file metadata.
pub fn file_cache<K, V>() -> BoundedCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    BoundedCache::from_preset(CachePreset::File)
}
