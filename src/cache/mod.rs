//! Cache Module
//!
//! Provides an in-memory cache with lazy TTL expiration and a bounded LRU
//! memoizer.

mod entry;
mod expiring;
mod lru;
mod memo;
mod stats;


// Re-export public types
pub use entry::CacheEntry;
pub use expiring::ExpiringCache;
pub use lru::LruTracker;
pub use memo::{LruCache, Memoized, DEFAULT_MEMO_CAPACITY};
pub use stats::CacheStats;
