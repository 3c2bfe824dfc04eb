//! Background Tasks Module
//!
//! Contains background work that runs periodically alongside the host.
//!
//! # Tasks
//! - TTL Cleanup: Removes expired cache entries at a configured interval

mod cleanup;

pub use cleanup::{spawn_cleanup_thread, CleanupHandle};
