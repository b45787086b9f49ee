//! Expired-Entry Sweep Task
//!
//! Background task that periodically purges stale entries from an
//! [`ExpiringCache`]. Reads already drop stale entries lazily; the sweep only
//! bounds memory held by keys nobody asks for again.

use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::ExpiringCache;

/// Spawns a task that calls [`ExpiringCache::purge_expired`] every `interval`.
///
/// The returned handle should be aborted when the owning component shuts down.
///
/// # Example
/// ```ignore
/// let cache = Arc::new(ExpiringCache::new(Duration::from_secs(10))?);
/// let cleanup_handle = spawn_cleanup_task(cache.clone(), Duration::from_secs(1));
/// // Later, during shutdown:
/// cleanup_handle.abort();
/// ```
pub fn spawn_cleanup_task<K, V>(cache: Arc<ExpiringCache<K, V>>, interval: Duration) -> JoinHandle<()>
where
    K: Eq + Hash + Send + 'static,
    V: Clone + Send + 'static,
{
    tokio::spawn(async move {
        info!(interval_ms = interval.as_millis() as u64, "starting expired-entry sweep");

        let mut ticker = tokio::time::interval(interval);
        // The first tick completes immediately
        ticker.tick().await;

        loop {
            ticker.tick().await;

            let removed = cache.purge_expired();
            if removed > 0 {
                info!("sweep removed {} expired entries", removed);
            } else {
                debug!("sweep found no expired entries");
            }
        }
    })
}
