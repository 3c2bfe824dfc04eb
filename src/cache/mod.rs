//! Cache Module
//!
//! Provides a thread-safe in-memory cache with LRU eviction and TTL expiry.

mod entry;
mod lru;
mod presets;
mod stats;
mod store;


// Re-export public types
pub use entry::CacheEntry;
pub use lru::LruMap;
pub use presets::{conversation_cache, file_cache, CachePreset};
pub use stats::CacheStats;
pub use store::BoundedCache;
