//! TTL Cleanup Thread
//!
//! Background thread that periodically removes expired cache entries.

use std::hash::Hash;
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::cache::BoundedCache;

/// Handle to a running cleanup thread.
///
/// Dropping the handle stops the thread and waits for it to exit.
#[derive(Debug)]
pub struct CleanupHandle {
    stop: Option<Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl CleanupHandle {
    /// Signals the thread to stop and waits for it.
    pub fn stop(mut self) {
        self.shutdown();
    }

    pub fn is_finished(&self) -> bool {
        self.thread.as_ref().map_or(true, JoinHandle::is_finished)
    }

    fn shutdown(&mut self) {
        // Dropping the sender wakes the thread with a disconnect.
        self.stop.take();
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                warn!("TTL cleanup thread panicked");
            }
        }
    }
}

impl Drop for CleanupHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Spawns a thread that calls `cleanup_expired` on `cache` every `interval`.
///
/// # Example
/// ```
/// use std::sync::Arc;
/// use std::time::Duration;
/// use chat_resilience::{cache::BoundedCache, spawn_cleanup_thread};
///
/// let cache: Arc<BoundedCache<String, String>> =
///     Arc::new(BoundedCache::new(1000, Some(Duration::from_secs(300))));
/// let handle = spawn_cleanup_thread(Arc::clone(&cache), Duration::from_secs(1));
/// // Later, during shutdown:
/// handle.stop();
/// ```
pub fn spawn_cleanup_thread<K, V>(cache: Arc<BoundedCache<K, V>>, interval: Duration) -> CleanupHandle
where
    K: Eq + Hash + Clone + Send + 'static,
    V: Clone + Send + 'static,
{
    let (stop_tx, stop_rx) = mpsc::channel::<()>();

    let thread = thread::Builder::new()
        .name(format!("{}-cleanup", cache.name()))
        .spawn(move || {
            info!(
                cache = %cache.name(),
                interval_ms = interval.as_millis() as u64,
                "Starting TTL cleanup thread"
            );

            loop {
                match stop_rx.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => {
                        let removed = cache.cleanup_expired();
                        debug!(cache = %cache.name(), removed, "TTL cleanup pass");
                    }
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            }

            info!(cache = %cache.name(), "TTL cleanup thread stopped");
        });

    let thread = match thread {
        Ok(handle) => Some(handle),
        Err(err) => {
            warn!(error = %err, "Failed to spawn TTL cleanup thread");
            None
        }
    };

    CleanupHandle {
        stop: Some(stop_tx),
        thread,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use std::time::Instant;

    fn wait_until(deadline: Duration, mut check: impl FnMut() -> bool) -> bool {
        let start = Instant::now();
        while start.elapsed() < deadline {
            if check() {
                return true;
            }
            thread::sleep(Duration::from_millis(5));
        }
        check()
    }

    #[test]
    fn test_cleanup_thread_removes_expired_entries() {
        let clock = ManualClock::new();
        let cache = Arc::new(
            BoundedCache::new(100, Some(Duration::from_secs(60))).with_clock(Arc::new(clock.clone())),
        );
        cache.set("expire_soon".to_string(), "value".to_string());

        let handle = spawn_cleanup_thread(Arc::clone(&cache), Duration::from_millis(10));
        clock.advance(Duration::from_secs(61));

        // Size drops without any get touching the entry
        assert!(wait_until(Duration::from_secs(2), || cache.size() == 0));
        assert_eq!(cache.stats().expired_count, 1);

        handle.stop();
    }

    #[test]
    fn test_cleanup_thread_preserves_valid_entries() {
        let cache = Arc::new(BoundedCache::new(100, Some(Duration::from_secs(3600))));
        cache.set("long_lived".to_string(), "value".to_string());

        let handle = spawn_cleanup_thread(Arc::clone(&cache), Duration::from_millis(10));
        thread::sleep(Duration::from_millis(60));
        handle.stop();

        assert_eq!(cache.get("long_lived"), Some("value".to_string()));
    }

    #[test]
    fn test_cleanup_thread_can_be_stopped() {
        let cache: Arc<BoundedCache<String, String>> =
            Arc::new(BoundedCache::new(10, Some(Duration::from_secs(1))).with_name("files"));

        let handle = spawn_cleanup_thread(cache, Duration::from_secs(3600));
        assert!(!handle.is_finished());

        // Must return promptly even though the interval is an hour
        let start = Instant::now();
        handle.stop();
        assert!(start.elapsed() < Duration::from_secs(5));
    }
}
