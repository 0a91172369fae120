//! LLM Response Cache
//!
//! A single-process, in-memory cache for generative-text responses:
//! - Deterministic key derivation from (prompt, model, options)
//! - Capacity-bounded storage with least-recently-used eviction
//! - Per-entry TTL enforced lazily at lookup time
//! - Lexical near-duplicate matching (token-set Jaccard) on exact-key misses
//! - Hit/miss accounting with an approximate tokens-saved measure
//!
//! The cache never talks to an upstream provider itself: callers look up
//! first, invoke their provider on a miss, and feed the fresh response back
//! through [`ResponseCache::set`].

pub mod domain;
pub mod infrastructure;

pub use domain::cache::{
    CacheStats, CachedResponse, HitSource, KeyDeriver, RequestOptions, ResponseCache,
    ResponseCacheConfig, ResponseCacheStats, ResponseEntry, SetOptions,
};
pub use domain::DomainError;
pub use infrastructure::cache::{
    CacheFactory, Clock, InMemoryResponseCache, ManualClock, SystemClock,
};
