//! Cache efficiency accounting

use serde::{Deserialize, Serialize};

/// Running counters over cache lookups.
///
/// Invariants, maintained by construction: `hits + misses == total_requests`
/// and `hits == memory_hits + similarity_hits`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheStats {
    /// Lookups satisfied from the cache (exact or similarity)
    pub hits: u64,
    /// Lookups that found nothing usable
    pub misses: u64,
    /// Hits satisfied by the identical derived key
    pub memory_hits: u64,
    /// Hits satisfied by a near-duplicate match
    pub similarity_hits: u64,
    /// Approximate tokens saved by not re-generating
    pub total_saved: u64,
    /// Total lookups observed
    pub total_requests: u64,
}

impl CacheStats {
    /// Records an exact-key hit worth `tokens_saved`
    pub fn record_exact_hit(&mut self, tokens_saved: u64) {
        self.hits += 1;
        self.memory_hits += 1;
        self.total_saved = self.total_saved.saturating_add(tokens_saved);
        self.total_requests += 1;
    }

    /// Records a similarity hit worth `tokens_saved`
    pub fn record_similarity_hit(&mut self, tokens_saved: u64) {
        self.hits += 1;
        self.similarity_hits += 1;
        self.total_saved = self.total_saved.saturating_add(tokens_saved);
        self.total_requests += 1;
    }

    /// Records a miss
    pub fn record_miss(&mut self) {
        self.misses += 1;
        self.total_requests += 1;
    }

    /// Fraction of requests satisfied from the cache; 0.0 before any request
    pub fn hit_rate(&self) -> f64 {
        if self.total_requests == 0 {
            return 0.0;
        }

        self.hits as f64 / self.total_requests as f64
    }

    /// Zeroes every counter
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Builds an external snapshot including the current store size
    pub fn snapshot(&self, size: usize) -> ResponseCacheStats {
        ResponseCacheStats {
            hits: self.hits,
            misses: self.misses,
            memory_hits: self.memory_hits,
            similarity_hits: self.similarity_hits,
            total_saved: self.total_saved,
            total_requests: self.total_requests,
            hit_rate: self.hit_rate(),
            size,
        }
    }
}

/// Point-in-time view of cache efficiency, as returned by `stats()`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResponseCacheStats {
    pub hits: u64,
    pub misses: u64,
    pub memory_hits: u64,
    pub similarity_hits: u64,
    pub total_saved: u64,
    pub total_requests: u64,
    /// `hits / total_requests`, 0.0 when no requests have been observed
    pub hit_rate: f64,
    /// Number of live entries at snapshot time
    pub size: usize,
}
