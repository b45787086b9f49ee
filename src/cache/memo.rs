//! LRU Memoizer Module
//!
//! Fixed-capacity memoization keyed by call arguments, evicting the least
//! recently used entry. No TTL.

use std::collections::HashMap;
use std::convert::Infallible;
use std::fmt;
use std::hash::Hash;

use parking_lot::Mutex;
use tracing::trace;

use crate::cache::{CacheStats, LruTracker};
use crate::error::{Result, ThrottleError};

/// Capacity used by [`Memoized::with_default_capacity`].
pub const DEFAULT_MEMO_CAPACITY: usize = 128;

#[derive(Debug)]
struct Inner<K, V> {
    entries: HashMap<K, V>,
    lru: LruTracker<K>,
    stats: CacheStats,
}

impl<K, V> Inner<K, V>
where
    K: Eq + Hash + Clone,
{
    fn lookup(&mut self, key: &K) -> Option<&V> {
        match self.entries.get(key) {
            Some(value) => {
                self.lru.touch(key);
                self.stats.record_hit();
                Some(value)
            }
            None => {
                self.stats.record_miss();
                None
            }
        }
    }

    fn store(&mut self, key: K, value: V, capacity: usize) -> Option<(K, V)> {
        self.lru.touch(&key);
        self.entries.insert(key, value);

        let mut evicted = None;
        if self.entries.len() > capacity {
            if let Some(oldest) = self.lru.evict_oldest() {
                evicted = self.entries.remove(&oldest).map(|v| (oldest, v));
                self.stats.record_eviction();
                trace!("evicted least recently used entry");
            }
        }
        evicted
    }
}

// == LRU Cache ==
/// A bounded, thread-safe memo table.
///
/// The whole of `get_or_compute` runs under one lock, so concurrent callers
/// missing on the same key compute it exactly once. The compute function
/// must not call back into the same cache.
#[derive(Debug)]
pub struct LruCache<K, V> {
    capacity: usize,
    inner: Mutex<Inner<K, V>>,
}

impl<K, V> LruCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    // == Constructor ==
    /// Creates a cache holding at most `capacity` entries.
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(ThrottleError::invalid("capacity must be greater than zero"));
        }
        Ok(Self::build(capacity))
    }

    fn build(capacity: usize) -> Self {
        Self {
            capacity,
            inner: Mutex::new(Inner {
                entries: HashMap::with_capacity(capacity),
                lru: LruTracker::new(),
                stats: CacheStats::new(),
            }),
        }
    }

    // == Get Or Compute ==
    /// Returns the cached value for `key`, computing and storing it on a miss.
    ///
    /// On a hit the key is promoted to most recently used. If `compute` fails
    /// the error is returned and the cache is left untouched.
    pub fn get_or_compute<F, E>(&self, key: K, compute: F) -> std::result::Result<V, E>
    where
        F: FnOnce() -> std::result::Result<V, E>,
    {
        let mut inner = self.inner.lock();

        if let Some(value) = inner.lookup(&key) {
            return Ok(value.clone());
        }

        let value = compute()?;
        inner.store(key, value.clone(), self.capacity);
        Ok(value)
    }

    /// Infallible form of [`get_or_compute`](Self::get_or_compute).
    pub fn get_or_insert_with<F>(&self, key: K, compute: F) -> V
    where
        F: FnOnce() -> V,
    {
        match self.get_or_compute::<_, Infallible>(key, || Ok(compute())) {
            Ok(value) => value,
            Err(never) => match never {},
        }
    }

    // == Get ==
    /// Returns the value for `key`, promoting it to most recently used.
    pub fn get(&self, key: &K) -> Option<V> {
        self.inner.lock().lookup(key).cloned()
    }

    // == Insert ==
    /// Inserts or overwrites `key` as most recently used, returning the
    /// entry evicted to make room, if any.
    pub fn insert(&self, key: K, value: V) -> Option<(K, V)> {
        self.inner.lock().store(key, value, self.capacity)
    }

    /// Checks membership without affecting recency.
    pub fn contains(&self, key: &K) -> bool {
        self.inner.lock().entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.entries.clear();
        inner.lru.clear();
    }

    pub fn stats(&self) -> CacheStats {
        let inner = self.inner.lock();
        let mut stats = inner.stats.clone();
        stats.set_total_entries(inner.entries.len());
        stats
    }
}

// == Memoized ==
/// Wraps a pure function with a bounded LRU memo table.
///
/// ```ignore
/// let square = Memoized::with_default_capacity(|n: &u64| n * n);
/// assert_eq!(square.call(4), 16);
/// assert_eq!(square.call(4), 16); // served from the table
/// ```
pub struct Memoized<K, V, F> {
    cache: LruCache<K, V>,
    func: F,
}

impl<K, V, F> Memoized<K, V, F>
where
    K: Eq + Hash + Clone,
    V: Clone,
    F: Fn(&K) -> V,
{
    pub fn new(capacity: usize, func: F) -> Result<Self> {
        Ok(Self {
            cache: LruCache::new(capacity)?,
            func,
        })
    }

    pub fn with_default_capacity(func: F) -> Self {
        Self {
            cache: LruCache::build(DEFAULT_MEMO_CAPACITY),
            func,
        }
    }

    /// Returns `func(&key)`, computing it at most once while it stays cached.
    pub fn call(&self, key: K) -> V {
        let func = &self.func;
        self.cache.get_or_insert_with(key.clone(), || func(&key))
    }

    /// The backing memo table.
    pub fn cache(&self) -> &LruCache<K, V> {
        &self.cache
    }
}

impl<K, V, F> fmt::Debug for Memoized<K, V, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Memoized")
            .field("capacity", &self.cache.capacity)
            .finish_non_exhaustive()
    }
}
