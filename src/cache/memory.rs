//! In-memory LRU tier of the claim cache.
//!
//! Mirrors every durable write so the process can serve repeat claims even
//! when the durable store is unavailable, and keeps the full source list
//! (which the durable tier intentionally drops) for same-process reuse.

use super::CachedClaim;
use lru::LruCache;
use parking_lot::Mutex;
use std::num::NonZeroUsize;
use std::sync::Arc;

/// Default capacity of the in-memory mirror.
const DEFAULT_CAPACITY: usize = 10_000;

/// LRU cache keyed by claim hash.
#[derive(Clone)]
pub struct MemoryCache {
    inner: Arc<Mutex<LruCache<String, CachedClaim>>>,
    stats: Arc<Mutex<MemoryCacheStats>>,
}

/// Cache statistics for monitoring.
#[derive(Debug, Default, Clone)]
pub struct MemoryCacheStats {
    /// Number of cache hits.
    pub hits: u64,
    /// Number of cache misses.
    pub misses: u64,
    /// Number of entries added.
    pub additions: u64,
}

impl MemoryCacheStats {
    /// Calculate hit rate as a percentage.
    #[must_use]
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            (self.hits as f64 / total as f64) * 100.0
        }
    }
}

impl MemoryCache {
    /// Create a new cache with default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Create a new cache with the specified capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let cap = NonZeroUsize::new(capacity.max(1)).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner: Arc::new(Mutex::new(LruCache::new(cap))),
            stats: Arc::new(Mutex::new(MemoryCacheStats::default())),
        }
    }

    /// Fetch a cached claim by hash, marking it most recently used.
    pub fn get(&self, claim_hash: &str) -> Option<CachedClaim> {
        let mut cache = self.inner.lock();
        let found = cache.get(claim_hash).cloned();

        let mut stats = self.stats.lock();
        if found.is_some() {
            stats.hits += 1;
        } else {
            stats.misses += 1;
        }

        found
    }

    /// Insert or replace a cached claim.
    pub fn put(&self, claim_hash: String, claim: CachedClaim) {
        let mut cache = self.inner.lock();
        cache.put(claim_hash, claim);

        let mut stats = self.stats.lock();
        stats.additions += 1;
    }

    /// Get current cache statistics.
    #[must_use]
    pub fn stats(&self) -> MemoryCacheStats {
        self.stats.lock().clone()
    }

    /// Get the current number of entries in the cache.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    /// Check if the cache is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    /// Clear all entries from the cache.
    pub fn clear(&self) {
        self.inner.lock().clear();
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new()
    }
}
