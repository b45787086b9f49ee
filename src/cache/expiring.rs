//! Expiring Cache Module
//!
//! Thread-safe key/value cache with an optional per-cache TTL. Expiry is lazy:
//! a stale entry is removed by the same `get` that discovers it.

use std::collections::HashMap;
use std::hash::Hash;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::cache::{CacheEntry, CacheStats};
use crate::clock::{system_clock, SharedClock};
use crate::error::{Result, ThrottleError};

#[derive(Debug)]
struct Inner<K, V> {
    entries: HashMap<K, CacheEntry<V>>,
    stats: CacheStats,
}

// == Expiring Cache ==
/// A concurrent map whose entries go stale `ttl` after their last write.
///
/// Every operation runs inside a single critical section for the whole
/// instance. The map is not size-bounded; see [`purge_expired`] and
/// [`spawn_cleanup_task`](crate::tasks::spawn_cleanup_task) for reclaiming
/// keys that are never read again.
///
/// [`purge_expired`]: ExpiringCache::purge_expired
#[derive(Debug)]
pub struct ExpiringCache<K, V> {
    ttl: Option<Duration>,
    clock: SharedClock,
    inner: Mutex<Inner<K, V>>,
}

impl<K, V> ExpiringCache<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    // == Constructors ==
    /// Creates a cache whose entries expire `ttl` after being set.
    ///
    /// Fails if `ttl` is zero.
    pub fn new(ttl: Duration) -> Result<Self> {
        Self::with_clock(ttl, system_clock())
    }

    /// Same as [`new`](Self::new) with an injected time source.
    pub fn with_clock(ttl: Duration, clock: SharedClock) -> Result<Self> {
        if ttl.is_zero() {
            return Err(ThrottleError::invalid("ttl must be greater than zero"));
        }
        Ok(Self::build(Some(ttl), clock))
    }

    /// Creates a cache whose entries never expire.
    pub fn without_ttl() -> Self {
        Self::build(None, system_clock())
    }

    fn build(ttl: Option<Duration>, clock: SharedClock) -> Self {
        Self {
            ttl,
            clock,
            inner: Mutex::new(Inner {
                entries: HashMap::new(),
                stats: CacheStats::new(),
            }),
        }
    }

    // == Get ==
    /// Returns a clone of the value if present and fresh.
    ///
    /// A stale entry is removed before returning None; absent and stale keys
    /// are indistinguishable to the caller.
    pub fn get(&self, key: &K) -> Option<V> {
        let mut guard = self.inner.lock();
        let inner = &mut *guard;
        let now = self.clock.now();

        let expired = match inner.entries.get(key) {
            None => {
                inner.stats.record_miss();
                return None;
            }
            Some(entry) => entry.is_expired(now, self.ttl),
        };

        if expired {
            inner.entries.remove(key);
            inner.stats.record_expirations(1);
            inner.stats.record_miss();
            trace!("expired entry removed on read");
            return None;
        }

        inner.stats.record_hit();
        inner.entries.get(key).map(|entry| entry.value.clone())
    }

    // == Set ==
    /// Inserts or overwrites `key`, resetting its insertion time.
    pub fn set(&self, key: K, value: V) {
        let mut inner = self.inner.lock();
        let now = self.clock.now();
        inner.entries.insert(key, CacheEntry::new(value, now));
    }

    // == Remove ==
    /// Removes `key`, returning its value if it was present and fresh.
    pub fn remove(&self, key: &K) -> Option<V> {
        let mut inner = self.inner.lock();
        let now = self.clock.now();
        inner
            .entries
            .remove(key)
            .filter(|entry| !entry.is_expired(now, self.ttl))
            .map(|entry| entry.value)
    }

    // == Purge Expired ==
    /// Removes every stale entry and returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        if self.ttl.is_none() {
            return 0;
        }
        let ttl = self.ttl;
        let mut guard = self.inner.lock();
        let inner = &mut *guard;
        let now = self.clock.now();

        let before = inner.entries.len();
        inner
            .entries
            .retain(|_, entry| !entry.is_expired(now, ttl));
        let removed = before - inner.entries.len();

        inner.stats.record_expirations(removed);
        if removed > 0 {
            debug!(removed, "purged expired entries");
        }
        removed
    }

    // == Clear ==
    pub fn clear(&self) {
        self.inner.lock().entries.clear();
    }

    // == Stats ==
    /// Returns a snapshot of the cache statistics.
    pub fn stats(&self) -> CacheStats {
        let inner = self.inner.lock();
        let mut stats = inner.stats.clone();
        stats.set_total_entries(inner.entries.len());
        stats
    }

    // == Length ==
    /// Number of stored entries, including stale ones not yet read or purged.
    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().entries.is_empty()
    }

    /// The configured time-to-live, None for a non-expiring cache.
    pub fn ttl(&self) -> Option<Duration> {
        self.ttl
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use std::sync::Arc;

    fn manual_cache(ttl_secs: u64) -> (Arc<ManualClock>, ExpiringCache<String, String>) {
        let clock = Arc::new(ManualClock::new());
        let cache = ExpiringCache::with_clock(Duration::from_secs(ttl_secs), clock.clone()).unwrap();
        (clock, cache)
    }

    #[test]
    fn test_zero_ttl_rejected() {
        let result = ExpiringCache::<String, String>::new(Duration::ZERO);
        assert!(matches!(result, Err(ThrottleError::InvalidConfig(_))));
    }

    #[test]
    fn test_get_never_set() {
        let (_, cache) = manual_cache(10);
        assert_eq!(cache.get(&"missing".to_string()), None);
        assert_eq!(cache.stats().misses, 1);
    }

    #[test]
    fn test_set_and_get() {
        let (_, cache) = manual_cache(10);

        cache.set("key1".to_string(), "value1".to_string());

        assert_eq!(cache.get(&"key1".to_string()), Some("value1".to_string()));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_overwrite_resets_insertion_time() {
        let (clock, cache) = manual_cache(10);

        cache.set("key1".to_string(), "v1".to_string());
        clock.advance(Duration::from_secs(8));
        cache.set("key1".to_string(), "v2".to_string());
        clock.advance(Duration::from_secs(8));

        // 16s after the first write but only 8s after the overwrite
        assert_eq!(cache.get(&"key1".to_string()), Some("v2".to_string()));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_get_at_exact_ttl_is_fresh() {
        let (clock, cache) = manual_cache(10);

        cache.set("key1".to_string(), "v".to_string());
        clock.advance(Duration::from_secs(10));

        assert_eq!(cache.get(&"key1".to_string()), Some("v".to_string()));
    }

    #[test]
    fn test_expired_entry_removed_on_read() {
        let (clock, cache) = manual_cache(10);

        cache.set("key1".to_string(), "v".to_string());
        clock.advance(Duration::from_millis(10_001));

        // Stale entry still occupies the map until something reads it
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(&"key1".to_string()), None);
        assert_eq!(cache.len(), 0);

        let stats = cache.stats();
        assert_eq!(stats.expirations, 1);
        assert_eq!(stats.misses, 1);
    }

    #[test]
    fn test_repeated_gets_are_idempotent() {
        let (clock, cache) = manual_cache(10);
        cache.set("key1".to_string(), "v".to_string());

        for _ in 0..5 {
            clock.advance(Duration::from_secs(1));
            assert_eq!(cache.get(&"key1".to_string()), Some("v".to_string()));
        }
        assert_eq!(cache.stats().hits, 5);
    }

    #[test]
    fn test_without_ttl_never_expires() {
        let cache: ExpiringCache<&str, u32> = ExpiringCache::without_ttl();
        cache.set("user:1", 1);

        assert_eq!(cache.ttl(), None);
        assert_eq!(cache.get(&"user:1"), Some(1));
        assert_eq!(cache.purge_expired(), 0);
    }

    #[test]
    fn test_remove() {
        let (clock, cache) = manual_cache(10);
        cache.set("a".to_string(), "1".to_string());
        cache.set("b".to_string(), "2".to_string());

        assert_eq!(cache.remove(&"a".to_string()), Some("1".to_string()));
        assert_eq!(cache.remove(&"a".to_string()), None);

        // A stale entry is dropped but not reported as a value
        clock.advance(Duration::from_secs(11));
        assert_eq!(cache.remove(&"b".to_string()), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_purge_expired() {
        let (clock, cache) = manual_cache(10);

        cache.set("old".to_string(), "v".to_string());
        clock.advance(Duration::from_secs(6));
        cache.set("new".to_string(), "v".to_string());
        clock.advance(Duration::from_secs(6));

        assert_eq!(cache.purge_expired(), 1);
        assert_eq!(cache.len(), 1);
        assert!(cache.get(&"new".to_string()).is_some());
        assert_eq!(cache.stats().expirations, 1);
    }

    #[test]
    fn test_clear() {
        let (_, cache) = manual_cache(10);
        cache.set("a".to_string(), "1".to_string());
        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_concurrent_set_and_get() {
        let cache: Arc<ExpiringCache<usize, usize>> =
            Arc::new(ExpiringCache::new(Duration::from_secs(60)).unwrap());

        let handles: Vec<_> = (0..8)
            .map(|t| {
                let cache = Arc::clone(&cache);
                std::thread::spawn(move || {
                    for i in 0..100 {
                        let key = t * 100 + i;
                        cache.set(key, key * 2);
                        assert_eq!(cache.get(&key), Some(key * 2));
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(cache.len(), 800);
    }
}
