//! Cache domain - data model, key derivation and lookup contract
//!
//! Pure in-memory logic: nothing here performs I/O. The engine that wires
//! these pieces together lives in `infrastructure::cache`.

mod config;
mod entry;
mod key;
mod repository;
mod similarity;
mod stats;

pub use config::ResponseCacheConfig;
pub use entry::ResponseEntry;
pub use key::{fnv1a_32, normalize_prompt, prompt_hash, KeyDeriver};
pub use repository::{CachedResponse, HitSource, RequestOptions, ResponseCache, SetOptions};
pub use similarity::{compact, jaccard_similarity, prompt_similarity, token_set};
pub use stats::{CacheStats, ResponseCacheStats};
