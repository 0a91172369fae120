//! Response cache construction
//!
//! Call sites depend on `Arc<dyn ResponseCache>`; the factory is the one
//! place that names the concrete engine. `shared()` hands out a single
//! process-wide instance for hosts that want every feature to hit the same
//! cache.

use std::sync::Arc;

use once_cell::sync::OnceCell;
use tracing::info;

use crate::domain::cache::{ResponseCache, ResponseCacheConfig};
use crate::domain::DomainError;

use super::clock::Clock;
use super::in_memory::InMemoryResponseCache;

static SHARED: OnceCell<Arc<InMemoryResponseCache>> = OnceCell::new();

/// Factory for creating response cache instances
#[derive(Debug, Default)]
pub struct CacheFactory;

impl CacheFactory {
    /// Creates a new cache factory
    pub fn new() -> Self {
        Self
    }

    /// Creates a cache instance from configuration
    pub fn create(&self, config: ResponseCacheConfig) -> Arc<dyn ResponseCache> {
        info!(
            max_entries = config.max_entries,
            default_ttl_ms = config.default_ttl_ms,
            similarity_enabled = config.similarity_enabled,
            "creating response cache"
        );
        Arc::new(InMemoryResponseCache::with_config(config))
    }

    /// Creates a cache instance with an injected time source
    pub fn create_with_clock(
        &self,
        config: ResponseCacheConfig,
        clock: Arc<dyn Clock>,
    ) -> Arc<dyn ResponseCache> {
        Arc::new(InMemoryResponseCache::with_config_and_clock(config, clock))
    }

    /// Creates configuration from environment variables, falling back to the
    /// defaults for anything unset or unparsable.
    pub fn config_from_env(&self) -> Result<ResponseCacheConfig, DomainError> {
        let mut config = ResponseCacheConfig::default();

        if let Ok(enabled) = std::env::var("RESPONSE_CACHE_ENABLED") {
            config.enabled = enabled
                .parse()
                .map_err(|_| DomainError::configuration("RESPONSE_CACHE_ENABLED must be a bool"))?;
        }

        if let Some(max_entries) = env_parse("RESPONSE_CACHE_MAX_ENTRIES")? {
            config = config.with_max_entries(max_entries);
        }

        if let Some(ttl_ms) = env_parse("RESPONSE_CACHE_DEFAULT_TTL_MS")? {
            config = config.with_default_ttl_ms(ttl_ms);
        }

        if let Some(threshold) = env_parse("RESPONSE_CACHE_SIMILARITY_THRESHOLD")? {
            config = config.with_similarity_threshold(threshold);
        }

        Ok(config)
    }

    /// Returns the process-wide shared cache, creating it from `config` on
    /// first use. Later calls return the existing instance and ignore their
    /// argument.
    pub fn shared(&self, config: ResponseCacheConfig) -> Arc<dyn ResponseCache> {
        SHARED
            .get_or_init(|| Arc::new(InMemoryResponseCache::with_config(config)))
            .clone()
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Result<Option<T>, DomainError> {
    match std::env::var(name) {
        Ok(raw) => raw
            .parse()
            .map(Some)
            .map_err(|_| DomainError::configuration(format!("Invalid value for {}", name))),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::cache::{RequestOptions, SetOptions};

    #[tokio::test]
    async fn test_factory_create_round_trip() {
        let factory = CacheFactory::new();
        let cache = factory.create(ResponseCacheConfig::default());

        cache
            .set("prompt", "m1", "response", SetOptions::new())
            .await
            .unwrap();

        let hit = cache
            .get("prompt", "m1", &RequestOptions::new())
            .await
            .unwrap();
        assert_eq!(hit.map(|h| h.response), Some("response".to_string()));
    }

    #[test]
    fn test_shared_is_idempotent() {
        let factory = CacheFactory::new();

        let first = factory.shared(ResponseCacheConfig::default());
        let second = factory.shared(ResponseCacheConfig::new().with_max_entries(7));

        assert!(Arc::ptr_eq(&first, &second));

        // The shared instance is usable outside an async context too
        tokio_test::block_on(async {
            first
                .set("shared prompt", "m1", "R", SetOptions::new())
                .await
                .unwrap();
            assert!(second
                .get("shared prompt", "m1", &RequestOptions::new())
                .await
                .unwrap()
                .is_some());
        });
    }

    #[test]
    fn test_config_from_env_defaults() {
        // None of the cache env vars are set in the test environment
        let factory = CacheFactory::new();
        let config = factory.config_from_env().unwrap();

        assert!(config.enabled);
        assert_eq!(config.max_entries, 500);
    }
}
