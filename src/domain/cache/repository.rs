//! Response cache trait and lookup types

use std::collections::BTreeMap;
use std::fmt::Debug;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::DomainError;

use super::stats::ResponseCacheStats;

/// Opaque generation options supplied by the caller (temperature, length
/// hints, ...). The cache never interprets them; they only participate in
/// key derivation, canonically ordered.
pub type RequestOptions = BTreeMap<String, String>;

/// How a lookup was satisfied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HitSource {
    /// The identical derived key was present and live
    Exact,
    /// A near-duplicate prompt under the same model qualified
    Similarity,
}

impl std::fmt::Display for HitSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HitSource::Exact => write!(f, "exact"),
            HitSource::Similarity => write!(f, "similarity"),
        }
    }
}

/// A successful lookup result
#[derive(Debug, Clone)]
pub struct CachedResponse {
    /// The cached payload, already reversed out of any reduced form
    pub response: String,
    /// Whether this was an exact or a similarity hit
    pub source: HitSource,
    /// Canonical key of the entry that satisfied the lookup
    pub key: String,
    /// Unix-millis timestamp the entry was created
    pub cached_at: u64,
    /// Reads of this entry including this one
    pub access_count: u64,
}

/// Per-call options for `set()`
#[derive(Debug, Clone, Default)]
pub struct SetOptions {
    /// The generation options of the request being cached; must match the
    /// options later passed to `get` for the keys to line up
    pub request_options: RequestOptions,
    /// Cost proxy for the response; estimated from its length when absent
    pub token_count: Option<u64>,
    /// Overrides the configured default TTL. Zero or negative is legal and
    /// makes the entry expire on its next read.
    pub ttl_ms: Option<i64>,
    /// Free-form tags recorded on the entry for pattern invalidation
    /// (originating feature, owning project, ...)
    pub tags: BTreeMap<String, String>,
}

impl SetOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the generation options used for key derivation
    pub fn with_request_options(mut self, options: RequestOptions) -> Self {
        self.request_options = options;
        self
    }

    /// Adds a single generation option
    pub fn with_request_option(
        mut self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.request_options.insert(name.into(), value.into());
        self
    }

    /// Sets the token-count cost proxy
    pub fn with_token_count(mut self, token_count: u64) -> Self {
        self.token_count = Some(token_count);
        self
    }

    /// Overrides the TTL for this entry
    pub fn with_ttl_ms(mut self, ttl_ms: i64) -> Self {
        self.ttl_ms = Some(ttl_ms);
        self
    }

    /// Adds an invalidation tag
    pub fn with_tag(mut self, tag: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(tag.into(), value.into());
        self
    }
}

/// Contract for a generative-text response cache.
///
/// Every steady-state operation is total: a failed lookup is a miss, never
/// an error. The trait is async for uniformity with the surrounding stack,
/// but implementations perform pure in-memory work and never await.
#[async_trait]
pub trait ResponseCache: Send + Sync + Debug {
    /// Looks up a response for `(prompt, model, options)`.
    ///
    /// On an exact-key miss, implementations may scan live same-model
    /// entries for a near-duplicate prompt. Any hit refreshes recency and
    /// updates the stats counters.
    async fn get(
        &self,
        prompt: &str,
        model: &str,
        options: &RequestOptions,
    ) -> Result<Option<CachedResponse>, DomainError>;

    /// Inserts (or replaces) the response for `(prompt, model, options)`.
    /// May evict the least-recently-used entry when at capacity.
    async fn set(
        &self,
        prompt: &str,
        model: &str,
        response: &str,
        set_options: SetOptions,
    ) -> Result<(), DomainError>;

    /// Removes matching entries and returns how many were removed.
    ///
    /// `None` clears everything. `Some(pattern)` removes entries whose key
    /// or metadata tag values contain the pattern or match it as a
    /// `*`-glob, never looking at the response body. Completes before
    /// returning.
    async fn invalidate(&self, pattern: Option<&str>) -> Result<usize, DomainError>;

    /// Proactively removes all currently expired entries, returning the
    /// count removed. Intended for an external periodic scheduler; lazy
    /// expiration on `get` keeps memory bounded even if this is never
    /// called.
    async fn cleanup(&self) -> Result<usize, DomainError>;

    /// Snapshot of hit/miss accounting plus the current size
    async fn stats(&self) -> Result<ResponseCacheStats, DomainError>;

    /// Zeroes the stats counters without touching stored entries
    async fn reset_stats(&self) -> Result<(), DomainError>;

    /// Drops all entries and resets stats (full reset / test isolation)
    async fn clear(&self) -> Result<(), DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_source_display() {
        assert_eq!(HitSource::Exact.to_string(), "exact");
        assert_eq!(HitSource::Similarity.to_string(), "similarity");
    }

    #[test]
    fn test_hit_source_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&HitSource::Similarity).unwrap(),
            r#""similarity""#
        );
    }

    #[test]
    fn test_set_options_builder() {
        let options = SetOptions::new()
            .with_token_count(256)
            .with_ttl_ms(-1)
            .with_tag("project", "novel-42");

        assert_eq!(options.token_count, Some(256));
        assert_eq!(options.ttl_ms, Some(-1));
        assert_eq!(options.tags.get("project"), Some(&"novel-42".to_string()));
    }
}
