//! Response cache configuration

use serde::{Deserialize, Serialize};

use super::key::DEFAULT_NORMALIZED_PREFIX_CHARS;

/// Configuration for the response cache
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseCacheConfig {
    /// Whether caching is enabled; when off, every lookup misses silently
    /// and `set` is a no-op
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Maximum number of entries; values below 1 are coerced to 1
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,

    /// Default time-to-live in milliseconds for entries set without an
    /// explicit TTL
    #[serde(default = "default_ttl_ms")]
    pub default_ttl_ms: i64,

    /// Whether exact-key misses fall back to a near-duplicate scan
    #[serde(default = "default_enabled")]
    pub similarity_enabled: bool,

    /// Minimum Jaccard similarity for a near-duplicate hit (0.0 to 1.0)
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f32,

    /// Bounded prefix length (characters) of the normalized prompt used for
    /// key derivation and similarity matching
    #[serde(default = "default_prefix_chars")]
    pub normalized_prefix_chars: usize,

    /// Store responses at or above this many bytes in reduced (deflate)
    /// form; `None` disables payload reduction
    #[serde(default)]
    pub compress_above_bytes: Option<usize>,
}

fn default_enabled() -> bool {
    true
}

fn default_max_entries() -> usize {
    500
}

fn default_ttl_ms() -> i64 {
    24 * 60 * 60 * 1000 // 24 hours
}

fn default_similarity_threshold() -> f32 {
    0.85
}

fn default_prefix_chars() -> usize {
    DEFAULT_NORMALIZED_PREFIX_CHARS
}

impl Default for ResponseCacheConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            max_entries: default_max_entries(),
            default_ttl_ms: default_ttl_ms(),
            similarity_enabled: default_enabled(),
            similarity_threshold: default_similarity_threshold(),
            normalized_prefix_chars: default_prefix_chars(),
            compress_above_bytes: None,
        }
    }
}

impl ResponseCacheConfig {
    /// Creates a config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether caching is enabled
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Sets the maximum number of entries (floored at 1)
    pub fn with_max_entries(mut self, max: usize) -> Self {
        self.max_entries = max.max(1);
        self
    }

    /// Sets the default TTL in milliseconds
    pub fn with_default_ttl_ms(mut self, ttl_ms: i64) -> Self {
        self.default_ttl_ms = ttl_ms;
        self
    }

    /// Sets whether the near-duplicate scan runs on exact-key misses
    pub fn with_similarity_enabled(mut self, enabled: bool) -> Self {
        self.similarity_enabled = enabled;
        self
    }

    /// Sets the similarity threshold, clamped to 0.0..=1.0
    pub fn with_similarity_threshold(mut self, threshold: f32) -> Self {
        self.similarity_threshold = threshold.clamp(0.0, 1.0);
        self
    }

    /// Sets the normalized prompt prefix length (floored at 1)
    pub fn with_normalized_prefix_chars(mut self, chars: usize) -> Self {
        self.normalized_prefix_chars = chars.max(1);
        self
    }

    /// Enables payload reduction for responses at or above `bytes`
    pub fn with_compress_above_bytes(mut self, bytes: usize) -> Self {
        self.compress_above_bytes = Some(bytes);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ResponseCacheConfig::default();

        assert!(config.enabled);
        assert_eq!(config.max_entries, 500);
        assert_eq!(config.default_ttl_ms, 86_400_000);
        assert!(config.similarity_enabled);
        assert!((config.similarity_threshold - 0.85).abs() < 0.001);
        assert_eq!(config.normalized_prefix_chars, 500);
        assert!(config.compress_above_bytes.is_none());
    }

    #[test]
    fn test_config_builder() {
        let config = ResponseCacheConfig::new()
            .with_enabled(false)
            .with_max_entries(100)
            .with_default_ttl_ms(60_000)
            .with_similarity_enabled(false)
            .with_similarity_threshold(0.9)
            .with_normalized_prefix_chars(200)
            .with_compress_above_bytes(4096);

        assert!(!config.enabled);
        assert_eq!(config.max_entries, 100);
        assert_eq!(config.default_ttl_ms, 60_000);
        assert!(!config.similarity_enabled);
        assert!((config.similarity_threshold - 0.9).abs() < 0.001);
        assert_eq!(config.normalized_prefix_chars, 200);
        assert_eq!(config.compress_above_bytes, Some(4096));
    }

    #[test]
    fn test_invalid_values_coerced() {
        let config = ResponseCacheConfig::new()
            .with_max_entries(0)
            .with_similarity_threshold(1.5)
            .with_normalized_prefix_chars(0);

        assert_eq!(config.max_entries, 1);
        assert!((config.similarity_threshold - 1.0).abs() < 0.001);
        assert_eq!(config.normalized_prefix_chars, 1);

        let config = ResponseCacheConfig::new().with_similarity_threshold(-0.5);
        assert!(config.similarity_threshold.abs() < 0.001);
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let config: ResponseCacheConfig = serde_json::from_str("{}").unwrap();
        assert!(config.enabled);
        assert_eq!(config.max_entries, 500);

        let config: ResponseCacheConfig =
            serde_json::from_str(r#"{"max_entries": 10, "similarity_threshold": 0.7}"#).unwrap();
        assert_eq!(config.max_entries, 10);
        assert!((config.similarity_threshold - 0.7).abs() < 0.001);
    }
}
