//! In-memory response cache engine
//!
//! Wires key derivation, the LRU store, lazy TTL expiration, the
//! near-duplicate scan, stats accounting and invalidation behind a single
//! mutex. Every public operation locks once, does pure in-memory work and
//! releases; nothing awaits or performs I/O while the lock is held.

use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use tracing::debug;

use crate::domain::cache::{
    prompt_hash, prompt_similarity, CacheStats, CachedResponse, HitSource, KeyDeriver,
    RequestOptions, ResponseCache, ResponseCacheConfig, ResponseCacheStats, ResponseEntry,
    SetOptions,
};
use crate::domain::DomainError;

use super::clock::{Clock, SystemClock};
use super::compression::{compress_response, decompress_response};
use super::lru::LruStore;

#[derive(Debug)]
struct CacheInner {
    store: LruStore,
    stats: CacheStats,
}

/// Single-process in-memory response cache with LRU eviction, lazy TTL
/// expiration and lexical similarity matching
#[derive(Debug)]
pub struct InMemoryResponseCache {
    inner: Mutex<CacheInner>,
    keys: KeyDeriver,
    config: ResponseCacheConfig,
    clock: Arc<dyn Clock>,
}

enum ExactLookup {
    Absent,
    Expired,
    Live,
}

impl InMemoryResponseCache {
    /// Creates a cache with default configuration
    pub fn new() -> Self {
        Self::with_config(ResponseCacheConfig::default())
    }

    /// Creates a cache with the given configuration. Out-of-range values
    /// are coerced rather than rejected: capacity is floored at 1 and the
    /// similarity threshold clamped to 0.0..=1.0.
    pub fn with_config(config: ResponseCacheConfig) -> Self {
        Self::with_config_and_clock(config, Arc::new(SystemClock))
    }

    /// Creates a cache with an injected time source (simulated-time tests)
    pub fn with_config_and_clock(mut config: ResponseCacheConfig, clock: Arc<dyn Clock>) -> Self {
        config.max_entries = config.max_entries.max(1);
        config.similarity_threshold = config.similarity_threshold.clamp(0.0, 1.0);
        config.normalized_prefix_chars = config.normalized_prefix_chars.max(1);

        Self {
            inner: Mutex::new(CacheInner {
                store: LruStore::new(config.max_entries),
                stats: CacheStats::default(),
            }),
            keys: KeyDeriver::new(config.normalized_prefix_chars),
            config,
            clock,
        }
    }

    /// The active configuration
    pub fn config(&self) -> &ResponseCacheConfig {
        &self.config
    }

    fn lock(&self) -> Result<MutexGuard<'_, CacheInner>, DomainError> {
        self.inner
            .lock()
            .map_err(|_| DomainError::cache("cache lock poisoned"))
    }

    /// Rough cost proxy when the caller supplies none: ~4 chars per token
    fn estimate_tokens(response: &str) -> u64 {
        (response.chars().count() as u64).div_ceil(4)
    }

    fn materialize(entry: &ResponseEntry) -> Result<String, DomainError> {
        if entry.compressed() {
            decompress_response(entry.response())
        } else {
            Ok(entry.response().to_string())
        }
    }
}

impl Default for InMemoryResponseCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ResponseCache for InMemoryResponseCache {
    async fn get(
        &self,
        prompt: &str,
        model: &str,
        options: &RequestOptions,
    ) -> Result<Option<CachedResponse>, DomainError> {
        if !self.config.enabled {
            return Ok(None);
        }

        let key = self.keys.derive(prompt, model, options);
        let now = self.clock.now_ms();

        let mut guard = self.lock()?;
        let inner = &mut *guard;

        let exact = match inner.store.peek(&key) {
            None => ExactLookup::Absent,
            Some(entry) if entry.is_expired(now) => ExactLookup::Expired,
            Some(_) => ExactLookup::Live,
        };

        match exact {
            ExactLookup::Live => {
                if let Some(entry) = inner.store.get_mut(&key) {
                    entry.record_access(now);
                    let response = Self::materialize(entry)?;
                    let tokens = entry.token_count();
                    let cached = CachedResponse {
                        response,
                        source: HitSource::Exact,
                        key: key.clone(),
                        cached_at: entry.created_at(),
                        access_count: entry.access_count(),
                    };
                    inner.stats.record_exact_hit(tokens);
                    return Ok(Some(cached));
                }
            }
            ExactLookup::Expired => {
                inner.store.remove(&key);
                debug!(key = %key, "removed expired entry on lookup");
            }
            ExactLookup::Absent => {}
        }

        if self.config.similarity_enabled {
            let normalized = self.keys.normalize(prompt);
            let threshold = self.config.similarity_threshold;

            // Most-recent first, stopping at the first qualifying candidate;
            // bounds the scan to one pass over live entries.
            let mut matched: Option<(String, f32)> = None;
            for (candidate_key, entry) in inner.store.iter_recent() {
                if entry.model() != model || entry.is_expired(now) {
                    continue;
                }

                let score = prompt_similarity(&normalized, entry.normalized_prompt());
                if score >= threshold {
                    matched = Some((candidate_key.to_string(), score));
                    break;
                }
            }

            if let Some((candidate_key, score)) = matched {
                if let Some(entry) = inner.store.get_mut(&candidate_key) {
                    entry.record_access(now);
                    let response = Self::materialize(entry)?;
                    let tokens = entry.token_count();
                    let cached = CachedResponse {
                        response,
                        source: HitSource::Similarity,
                        key: candidate_key.clone(),
                        cached_at: entry.created_at(),
                        access_count: entry.access_count(),
                    };
                    inner.stats.record_similarity_hit(tokens);
                    debug!(key = %candidate_key, similarity = score, "similarity hit");
                    return Ok(Some(cached));
                }
            }
        }

        inner.stats.record_miss();
        Ok(None)
    }

    async fn set(
        &self,
        prompt: &str,
        model: &str,
        response: &str,
        set_options: SetOptions,
    ) -> Result<(), DomainError> {
        if !self.config.enabled {
            return Ok(());
        }

        let key = self.keys.derive(prompt, model, &set_options.request_options);
        let now = self.clock.now_ms();
        let ttl_ms = set_options.ttl_ms.unwrap_or(self.config.default_ttl_ms);
        let token_count = set_options
            .token_count
            .unwrap_or_else(|| Self::estimate_tokens(response));

        let (payload, compressed) = match self.config.compress_above_bytes {
            Some(threshold) if response.len() >= threshold => (compress_response(response)?, true),
            _ => (response.to_string(), false),
        };

        let mut entry = ResponseEntry::new(key.clone(), payload, model, now, ttl_ms)
            .with_prompt_hash(prompt_hash(prompt))
            .with_normalized_prompt(self.keys.normalize(prompt))
            .with_token_count(token_count)
            .with_compressed(compressed)
            .with_tag("prompt_length", prompt.chars().count().to_string())
            .with_tag("response_length", response.chars().count().to_string());

        for (tag, value) in &set_options.tags {
            entry = entry.with_tag(tag.clone(), value.clone());
        }

        let mut guard = self.lock()?;
        if let Some((evicted_key, _)) = guard.store.insert(key, entry) {
            debug!(key = %evicted_key, "evicted least recently used entry");
        }

        Ok(())
    }

    async fn invalidate(&self, pattern: Option<&str>) -> Result<usize, DomainError> {
        let mut guard = self.lock()?;

        let removed = match pattern {
            None => {
                let count = guard.store.len();
                guard.store.clear();
                count
            }
            Some(pattern) => {
                let matcher = PatternMatcher::new(pattern);
                let matching: Vec<String> = guard
                    .store
                    .iter_recent()
                    .filter(|(key, entry)| {
                        matcher.matches(key)
                            || entry.metadata().values().any(|value| matcher.matches(value))
                    })
                    .map(|(key, _)| key.to_string())
                    .collect();

                for key in &matching {
                    guard.store.remove(key);
                }

                matching.len()
            }
        };

        if removed > 0 {
            debug!(removed, "invalidated cache entries");
        }

        Ok(removed)
    }

    async fn cleanup(&self) -> Result<usize, DomainError> {
        let now = self.clock.now_ms();
        let mut guard = self.lock()?;

        let expired: Vec<String> = guard
            .store
            .iter_recent()
            .filter(|(_, entry)| entry.is_expired(now))
            .map(|(key, _)| key.to_string())
            .collect();

        for key in &expired {
            guard.store.remove(key);
        }

        if !expired.is_empty() {
            debug!(removed = expired.len(), "removed expired entries");
        }

        Ok(expired.len())
    }

    async fn stats(&self) -> Result<ResponseCacheStats, DomainError> {
        let guard = self.lock()?;
        Ok(guard.stats.snapshot(guard.store.len()))
    }

    async fn reset_stats(&self) -> Result<(), DomainError> {
        self.lock()?.stats.reset();
        Ok(())
    }

    async fn clear(&self) -> Result<(), DomainError> {
        let mut guard = self.lock()?;
        guard.store.clear();
        guard.stats.reset();
        Ok(())
    }
}

/// Invalidation pattern: `*` expands to `.*` and the result is evaluated as
/// a regex; an unparsable pattern degrades to substring containment so the
/// operation stays total.
enum PatternMatcher {
    Regex(regex::Regex),
    Substring(String),
}

impl PatternMatcher {
    fn new(pattern: &str) -> Self {
        let expanded = pattern.replace('*', ".*");
        match regex::Regex::new(&expanded) {
            Ok(re) => Self::Regex(re),
            Err(_) => Self::Substring(pattern.to_string()),
        }
    }

    fn matches(&self, text: &str) -> bool {
        match self {
            Self::Regex(re) => re.is_match(text),
            Self::Substring(needle) => text.contains(needle),
        }
    }
}
