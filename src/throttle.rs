//! Throttled Cache
//!
//! Puts an [`ExpiringCache`] and a rate governor in front of an expensive or
//! rate-limited operation: cached results are served directly, everything
//! else waits for admission, runs, and reports back.

use std::hash::Hash;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::cache::ExpiringCache;
use crate::config::Config;
use crate::error::{FetchError, Result};
use crate::limiter::{AdaptiveRateConfig, AdaptiveRateController, TokenBucket};

// == Governor ==
/// The admission policy applied to cache misses.
#[derive(Debug)]
pub enum Governor {
    /// Reject immediately when the bucket is empty
    Bucket(TokenBucket),
    /// Block until the adaptive pacer allows the call
    Adaptive(AdaptiveRateController),
}

impl Governor {
    /// Returns false if the call must not proceed.
    fn admit(&self) -> bool {
        match self {
            Governor::Bucket(bucket) => bucket.allow(1),
            Governor::Adaptive(controller) => {
                controller.wait_for_slot();
                true
            }
        }
    }

    fn report(&self, success: bool) {
        if let Governor::Adaptive(controller) = self {
            if success {
                controller.on_success();
            } else {
                controller.on_failure();
            }
        }
    }
}

// == Throttled Cache ==
/// Cache-first, rate-governed access to an external resource.
#[derive(Debug)]
pub struct ThrottledCache<K, V> {
    cache: Arc<ExpiringCache<K, V>>,
    governor: Governor,
}

impl<K, V> ThrottledCache<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    pub fn new(cache: ExpiringCache<K, V>, governor: Governor) -> Self {
        Self {
            cache: Arc::new(cache),
            governor,
        }
    }

    /// Builds a TTL cache paced by an adaptive controller from `config`.
    pub fn from_config(config: &Config) -> Result<Self> {
        config.validate()?;
        let cache = ExpiringCache::new(config.cache_ttl())?;
        let controller = AdaptiveRateController::new(AdaptiveRateConfig::from(config))?;
        Ok(Self::new(cache, Governor::Adaptive(controller)))
    }

    // == Fetch ==
    /// Returns the cached value for `key`, or runs `op` once admitted.
    ///
    /// Hits consume no admission. A successful result is cached before it is
    /// returned; a failed one is not cached and is handed back unchanged.
    /// Either outcome is reported to an adaptive governor.
    pub fn fetch<F, E>(&self, key: K, op: F) -> std::result::Result<V, FetchError<E>>
    where
        F: FnOnce(&K) -> std::result::Result<V, E>,
    {
        if let Some(value) = self.cache.get(&key) {
            debug!("served from cache");
            return Ok(value);
        }

        if !self.governor.admit() {
            return Err(FetchError::Throttled { cost: 1 });
        }

        match op(&key) {
            Ok(value) => {
                self.governor.report(true);
                self.cache.set(key, value.clone());
                Ok(value)
            }
            Err(e) => {
                self.governor.report(false);
                warn!("operation failed, result not cached");
                Err(FetchError::Operation(e))
            }
        }
    }

    pub fn cache(&self) -> &ExpiringCache<K, V> {
        &self.cache
    }

    /// A shared handle to the cache, e.g. for [`spawn_cleanup_task`](crate::tasks::spawn_cleanup_task).
    pub fn shared_cache(&self) -> Arc<ExpiringCache<K, V>> {
        Arc::clone(&self.cache)
    }

    pub fn governor(&self) -> &Governor {
        &self.governor
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use std::cell::Cell;
    use std::time::Duration;

    #[derive(Debug, PartialEq)]
    struct Unavailable;

    fn adaptive_layer() -> (Arc<ManualClock>, ThrottledCache<String, String>) {
        let clock = Arc::new(ManualClock::new());
        let cache = ExpiringCache::with_clock(Duration::from_secs(10), clock.clone()).unwrap();
        let controller =
            AdaptiveRateController::with_clock(AdaptiveRateConfig::default(), clock.clone())
                .unwrap();
        (clock, ThrottledCache::new(cache, Governor::Adaptive(controller)))
    }

    fn controller(layer: &ThrottledCache<String, String>) -> &AdaptiveRateController {
        match layer.governor() {
            Governor::Adaptive(controller) => controller,
            Governor::Bucket(_) => unreachable!("test layer uses an adaptive governor"),
        }
    }

    #[test]
    fn test_miss_then_hit() {
        let (_, layer) = adaptive_layer();
        let calls = Cell::new(0);

        let fetch = |key: &String| -> std::result::Result<String, Unavailable> {
            calls.set(calls.get() + 1);
            Ok(format!("data for {}", key))
        };

        let first = layer.fetch("https://api.example.com/data".to_string(), fetch);
        let second = layer.fetch("https://api.example.com/data".to_string(), fetch);

        assert_eq!(first.unwrap(), "data for https://api.example.com/data");
        assert_eq!(second.unwrap(), "data for https://api.example.com/data");
        assert_eq!(calls.get(), 1);
        assert_eq!(layer.cache().stats().hits, 1);
    }

    #[test]
    fn test_success_raises_rate() {
        let (_, layer) = adaptive_layer();

        let _ = layer.fetch("a".to_string(), |_| Ok::<_, Unavailable>("1".to_string()));

        assert!((controller(&layer).exact_rate() - 1.1).abs() < 1e-9);
    }

    #[test]
    fn test_failure_not_cached_and_lowers_rate() {
        let (_, layer) = adaptive_layer();
        for _ in 0..5 {
            controller(&layer).on_success();
        }
        let before = controller(&layer).exact_rate();

        let result = layer.fetch("a".to_string(), |_| Err::<String, _>(Unavailable));

        assert!(matches!(result, Err(FetchError::Operation(Unavailable))));
        assert!(layer.cache().is_empty());
        assert!(controller(&layer).exact_rate() < before);
    }

    #[test]
    fn test_misses_are_paced() {
        let (clock, layer) = adaptive_layer();

        for key in ["a", "b", "c"] {
            layer
                .fetch(key.to_string(), |_| Err::<String, _>(Unavailable))
                .unwrap_err();
        }

        // Failures keep the rate at 1/s, so the 2nd and 3rd calls each wait 1s
        assert_eq!(clock.elapsed(), Duration::from_secs(2));
    }

    #[test]
    fn test_expired_entry_refetched() {
        let (clock, layer) = adaptive_layer();
        let calls = Cell::new(0);
        let fetch = |_: &String| -> std::result::Result<String, Unavailable> {
            calls.set(calls.get() + 1);
            Ok("v".to_string())
        };

        layer.fetch("k".to_string(), fetch).unwrap();
        clock.advance(Duration::from_secs(11));
        layer.fetch("k".to_string(), fetch).unwrap();

        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn test_bucket_governor_throttles() {
        let clock = Arc::new(ManualClock::new());
        let cache = ExpiringCache::with_clock(Duration::from_secs(10), clock.clone()).unwrap();
        let bucket = TokenBucket::with_clock(1.0, 2, clock.clone()).unwrap();
        let layer: ThrottledCache<u32, u32> = ThrottledCache::new(cache, Governor::Bucket(bucket));

        let ok = |k: &u32| Ok::<u32, Unavailable>(k * 2);
        assert_eq!(layer.fetch(1, ok).unwrap(), 2);
        assert_eq!(layer.fetch(2, ok).unwrap(), 4);

        let result = layer.fetch(3, ok);
        assert!(matches!(result, Err(FetchError::Throttled { cost: 1 })));

        // Cached keys still resolve while the bucket is empty
        assert_eq!(layer.fetch(1, ok).unwrap(), 2);

        clock.advance(Duration::from_secs(1));
        assert_eq!(layer.fetch(3, ok).unwrap(), 6);
    }

    #[test]
    fn test_from_config() {
        let layer: ThrottledCache<String, String> =
            ThrottledCache::from_config(&Config::default()).unwrap();
        assert_eq!(layer.cache().ttl(), Some(Duration::from_secs(10)));
        assert!(matches!(layer.governor(), Governor::Adaptive(_)));

        let bad = Config {
            cache_ttl_secs: 0,
            ..Config::default()
        };
        assert!(ThrottledCache::<String, String>::from_config(&bad).is_err());
    }
}
