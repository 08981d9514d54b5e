//! Two-tier cache of prior claim verifications.
//!
//! The durable tier survives restarts but deliberately stores no source
//! lists; the in-memory tier mirrors every write and keeps sources for
//! same-process reuse. Lookups consult the durable tier first and fall back
//! to memory, so a broken database degrades rather than disables caching.

mod memory;

pub use memory::{MemoryCache, MemoryCacheStats};

use crate::storage::Store;
use crate::verify::scorer::Confidence;
use crate::verify::SourceRef;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::debug;

/// A previously computed claim verification.
#[derive(Debug, Clone)]
pub struct CachedClaim {
    /// Credibility score.
    pub credibility: u8,
    /// Confidence label.
    pub confidence: Confidence,
    /// Number of sources the original verification saw.
    pub source_count: u32,
    /// Sources, retained only by the in-memory tier.
    pub sources: Vec<SourceRef>,
}

/// Cache key: hash of the case-folded claim text, so identical claims hit
/// regardless of capitalization.
#[must_use]
pub fn claim_key(claim: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(claim.to_lowercase().as_bytes());
    hex::encode(hasher.finalize())
}

/// Two-tier claim verification cache.
pub struct ClaimCache {
    store: Arc<Store>,
    memory: MemoryCache,
}

impl ClaimCache {
    /// Create a cache over the given durable store.
    #[must_use]
    pub fn new(store: Arc<Store>, memory_capacity: usize) -> Self {
        Self {
            store,
            memory: MemoryCache::with_capacity(memory_capacity),
        }
    }

    /// Look up a claim. Durable tier first (refreshing its last-used stamp),
    /// then the in-memory mirror. Durable failures degrade to memory.
    pub fn lookup(&self, claim: &str) -> Option<CachedClaim> {
        let key = claim_key(claim);

        match self.store.cache_get(&key) {
            Ok(Some(row)) => {
                // Durable rows carry no sources; recover them from the
                // mirror when this process scored the claim itself.
                let sources = self
                    .memory
                    .get(&key)
                    .map(|cached| cached.sources)
                    .unwrap_or_default();
                return Some(CachedClaim {
                    credibility: row.credibility,
                    confidence: row.confidence,
                    source_count: row.source_count,
                    sources,
                });
            }
            Ok(None) => {}
            Err(e) => debug!("Durable cache lookup failed, trying memory: {e}"),
        }

        self.memory.get(&key)
    }

    /// Store a verification in both tiers. Sources go to memory only.
    pub fn store(
        &self,
        claim: &str,
        credibility: u8,
        confidence: Confidence,
        sources: Vec<SourceRef>,
    ) {
        let key = claim_key(claim);
        let source_count = u32::try_from(sources.len()).unwrap_or(u32::MAX);

        if let Err(e) = self
            .store
            .cache_put(&key, credibility, confidence, source_count)
        {
            debug!("Durable cache store failed, memory tier only: {e}");
        }

        self.memory.put(
            key,
            CachedClaim {
                credibility,
                confidence,
                source_count,
                sources,
            },
        );
    }

    /// Purge durable entries unused for more than `max_age_days`. Returns
    /// the number of rows removed; durable failures purge nothing.
    pub fn purge_stale(&self, max_age_days: u32) -> usize {
        match self.store.purge_stale_cache(max_age_days) {
            Ok(deleted) => deleted,
            Err(e) => {
                debug!("Cache sweep failed: {e}");
                0
            }
        }
    }

    /// In-memory tier statistics.
    #[must_use]
    pub fn memory_stats(&self) -> MemoryCacheStats {
        self.memory.stats()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cache() -> ClaimCache {
        let store = Arc::new(Store::open_in_memory().expect("store"));
        ClaimCache::new(store, 100)
    }

    #[test]
    fn key_is_case_insensitive() {
        assert_eq!(claim_key("The Earth Is Round"), claim_key("the earth is round"));
        assert_ne!(claim_key("one claim"), claim_key("another claim"));
    }

    #[test]
    fn round_trip_ignores_case() {
        let cache = cache();
        cache.store("The Earth Is Round", 72, Confidence::High, sample_sources(3));

        let hit = cache.lookup("the earth is ROUND").expect("hit");
        assert_eq!(hit.credibility, 72);
        assert_eq!(hit.confidence, Confidence::High);
        assert_eq!(hit.source_count, 3);
    }

    #[test]
    fn sources_survive_in_memory_only() {
        let cache = cache();
        cache.store("claim", 60, Confidence::Medium, sample_sources(2));

        let hit = cache.lookup("claim").expect("hit");
        assert_eq!(hit.sources.len(), 2);
        assert_eq!(hit.source_count, 2);
    }

    #[test]
    fn miss_for_unknown_claim() {
        assert!(cache().lookup("never stored").is_none());
    }

    #[test]
    fn store_is_an_idempotent_upsert() {
        let cache = cache();
        cache.store("claim", 40, Confidence::Low, Vec::new());
        cache.store("claim", 80, Confidence::High, sample_sources(1));

        let hit = cache.lookup("claim").expect("hit");
        assert_eq!(hit.credibility, 80);
        assert_eq!(hit.confidence, Confidence::High);
    }

    fn sample_sources(n: usize) -> Vec<SourceRef> {
        (0..n)
            .map(|i| SourceRef {
                title: format!("Article {i}"),
                source: format!("Outlet {i}"),
                url: format!("https://example.com/{i}"),
            })
            .collect()
    }
}
