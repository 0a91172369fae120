//! Cached response entry

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One cached generative-text response.
///
/// Created only by a `set()` call, mutated only by a successful lookup
/// (recency bookkeeping), and destroyed by eviction, lazy expiration or
/// explicit invalidation. Timestamps are unix-epoch milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseEntry {
    /// Canonical cache key, unique per entry
    key: String,
    /// Fingerprint of the raw, unnormalized prompt - diagnostics only
    prompt_hash: u32,
    /// Truncated normalized prompt, retained for similarity matching
    normalized_prompt: String,
    /// The cached payload; base64 deflate when `compressed` is set
    response: String,
    /// Identifier of the generation model this response came from
    model: String,
    /// Approximate output size, used for savings accounting
    token_count: u64,
    /// When this entry was created
    created_at: u64,
    /// When this entry expires
    expires_at: u64,
    /// Number of successful reads
    access_count: u64,
    /// When this entry was last read
    last_accessed_at: u64,
    /// Whether `response` is stored in reduced form needing reversal
    compressed: bool,
    /// Free-form tags, used only for pattern-based invalidation
    metadata: BTreeMap<String, String>,
}

impl ResponseEntry {
    /// Creates a new entry. `expires_at` saturates around `now_ms`, so a
    /// zero or negative TTL produces an entry that is already stale on its
    /// next read rather than an error.
    pub fn new(
        key: impl Into<String>,
        response: impl Into<String>,
        model: impl Into<String>,
        now_ms: u64,
        ttl_ms: i64,
    ) -> Self {
        Self {
            key: key.into(),
            prompt_hash: 0,
            normalized_prompt: String::new(),
            response: response.into(),
            model: model.into(),
            token_count: 0,
            created_at: now_ms,
            expires_at: now_ms.saturating_add_signed(ttl_ms),
            access_count: 0,
            last_accessed_at: now_ms,
            compressed: false,
            metadata: BTreeMap::new(),
        }
    }

    /// Sets the raw-prompt fingerprint
    pub fn with_prompt_hash(mut self, hash: u32) -> Self {
        self.prompt_hash = hash;
        self
    }

    /// Sets the normalized prompt used by similarity matching
    pub fn with_normalized_prompt(mut self, normalized: impl Into<String>) -> Self {
        self.normalized_prompt = normalized.into();
        self
    }

    /// Sets the token-count cost proxy
    pub fn with_token_count(mut self, token_count: u64) -> Self {
        self.token_count = token_count;
        self
    }

    /// Marks the payload as stored in reduced form
    pub fn with_compressed(mut self, compressed: bool) -> Self {
        self.compressed = compressed;
        self
    }

    /// Adds a metadata tag
    pub fn with_tag(mut self, tag: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(tag.into(), value.into());
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn prompt_hash(&self) -> u32 {
        self.prompt_hash
    }

    pub fn normalized_prompt(&self) -> &str {
        &self.normalized_prompt
    }

    pub fn response(&self) -> &str {
        &self.response
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn token_count(&self) -> u64 {
        self.token_count
    }

    pub fn created_at(&self) -> u64 {
        self.created_at
    }

    pub fn expires_at(&self) -> u64 {
        self.expires_at
    }

    pub fn access_count(&self) -> u64 {
        self.access_count
    }

    pub fn last_accessed_at(&self) -> u64 {
        self.last_accessed_at
    }

    pub fn compressed(&self) -> bool {
        self.compressed
    }

    pub fn metadata(&self) -> &BTreeMap<String, String> {
        &self.metadata
    }

    /// Whether this entry is stale at `now_ms`
    pub fn is_expired(&self, now_ms: u64) -> bool {
        now_ms >= self.expires_at
    }

    /// Records a successful read: bumps the access count and refreshes the
    /// last-accessed timestamp.
    pub fn record_access(&mut self, now_ms: u64) {
        self.access_count = self.access_count.saturating_add(1);
        self.last_accessed_at = now_ms;
    }
}
