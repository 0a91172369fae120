//! Cache key derivation
//!
//! A key is derived from the semantically relevant parts of a request:
//! the model id, a normalized bounded prefix of the prompt, and the caller's
//! generation options serialized in a canonical (sorted) form. The same
//! (prompt, model, options) always yields the same key, across processes,
//! which rules out the randomly-seeded std hasher.

use super::repository::RequestOptions;

/// Default bounded prefix length (in characters) of the normalized prompt
/// that participates in key derivation and similarity matching. Prompts
/// differing only beyond this prefix collapse to the same key; that is an
/// accepted precision/cost trade-off.
pub const DEFAULT_NORMALIZED_PREFIX_CHARS: usize = 500;

const FNV_OFFSET_BASIS: u32 = 0x811c_9dc5;
const FNV_PRIME: u32 = 0x0100_0193;

/// 32-bit FNV-1a over a byte slice. Fast, non-cryptographic, seed-stable.
pub fn fnv1a_32(bytes: &[u8]) -> u32 {
    let mut hash = FNV_OFFSET_BASIS;
    for byte in bytes {
        hash ^= u32::from(*byte);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

/// Secondary fingerprint of the raw, unnormalized prompt. Diagnostics only.
pub fn prompt_hash(prompt: &str) -> u32 {
    fnv1a_32(prompt.as_bytes())
}

/// Normalizes prompt text for key derivation and similarity matching:
/// case-folds, collapses runs of whitespace to a single space, strips
/// characters that are neither letters nor digits, and truncates to a
/// bounded prefix of `max_chars` characters.
pub fn normalize_prompt(prompt: &str, max_chars: usize) -> String {
    let mut out = String::with_capacity(prompt.len().min(max_chars * 4));
    let mut pending_space = false;
    let mut written = 0usize;

    for c in prompt.chars() {
        if written >= max_chars {
            break;
        }

        if c.is_whitespace() {
            pending_space = !out.is_empty();
            continue;
        }

        if !c.is_alphanumeric() {
            continue;
        }

        if pending_space {
            out.push(' ');
            pending_space = false;
            written += 1;

            if written >= max_chars {
                break;
            }
        }

        for lower in c.to_lowercase() {
            out.push(lower);
        }
        written += 1;
    }

    out
}

/// Derives canonical cache keys from raw requests
#[derive(Debug, Clone)]
pub struct KeyDeriver {
    prefix_chars: usize,
}

impl Default for KeyDeriver {
    fn default() -> Self {
        Self::new(DEFAULT_NORMALIZED_PREFIX_CHARS)
    }
}

impl KeyDeriver {
    /// Creates a deriver with the given normalized-prefix length. A zero
    /// length is coerced to 1 so the empty prompt still yields a valid key.
    pub fn new(prefix_chars: usize) -> Self {
        Self {
            prefix_chars: prefix_chars.max(1),
        }
    }

    /// The bounded prefix length used for normalization
    pub fn prefix_chars(&self) -> usize {
        self.prefix_chars
    }

    /// Normalizes a prompt with this deriver's prefix bound
    pub fn normalize(&self, prompt: &str) -> String {
        normalize_prompt(prompt, self.prefix_chars)
    }

    /// Derives the canonical key for a request.
    ///
    /// The key is rendered as `model:xxxxxxxx` - the model segment is kept
    /// visible so model-scoped pattern invalidation has something to match.
    pub fn derive(&self, prompt: &str, model: &str, options: &RequestOptions) -> String {
        let normalized = self.normalize(prompt);
        // BTreeMap iteration order makes the serialized options canonical.
        let serialized_options = serde_json::to_string(options).unwrap_or_default();
        let material = format!("{}:{}:{}", model, normalized, serialized_options);
        format!("{}:{:08x}", model, fnv1a_32(material.as_bytes()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(pairs: &[(&str, &str)]) -> RequestOptions {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_fnv1a_known_vectors() {
        // Published FNV-1a 32-bit test vectors
        assert_eq!(fnv1a_32(b""), 0x811c9dc5);
        assert_eq!(fnv1a_32(b"a"), 0xe40c292c);
        assert_eq!(fnv1a_32(b"foobar"), 0xbf9cf968);
    }

    #[test]
    fn test_normalize_case_folds_and_collapses_whitespace() {
        assert_eq!(normalize_prompt("  Hello   WORLD  ", 500), "hello world");
        assert_eq!(normalize_prompt("a\t\nb", 500), "a b");
    }

    #[test]
    fn test_normalize_strips_punctuation() {
        assert_eq!(normalize_prompt("write, chapter #1!", 500), "write chapter 1");
    }

    #[test]
    fn test_normalize_keeps_korean() {
        assert_eq!(normalize_prompt("소설 챕터 1 써줘", 500), "소설 챕터 1 써줘");
    }

    #[test]
    fn test_normalize_truncates_to_prefix() {
        assert_eq!(normalize_prompt("abcdefgh", 5), "abcde");
        // The space counts toward the bound
        assert_eq!(normalize_prompt("ab cd", 3), "ab ");
    }

    #[test]
    fn test_normalize_empty() {
        assert_eq!(normalize_prompt("", 500), "");
        assert_eq!(normalize_prompt("!!!", 500), "");
    }

    #[test]
    fn test_derive_is_deterministic() {
        let deriver = KeyDeriver::default();
        let opts = options(&[("temperature", "0.7")]);
        let k1 = deriver.derive("Write chapter one", "m1", &opts);
        let k2 = deriver.derive("Write chapter one", "m1", &opts);
        assert_eq!(k1, k2);
    }

    #[test]
    fn test_derive_model_prefix_visible() {
        let deriver = KeyDeriver::default();
        let key = deriver.derive("prompt", "gpt-4", &RequestOptions::new());
        assert!(key.starts_with("gpt-4:"));
    }

    #[test]
    fn test_derive_differs_by_model_and_options() {
        let deriver = KeyDeriver::default();
        let empty = RequestOptions::new();
        let base = deriver.derive("prompt", "m1", &empty);
        assert_ne!(base, deriver.derive("prompt", "m2", &empty));
        assert_ne!(
            base,
            deriver.derive("prompt", "m1", &options(&[("temperature", "0.9")]))
        );
    }

    #[test]
    fn test_derive_normalization_equivalence() {
        let deriver = KeyDeriver::default();
        let empty = RequestOptions::new();
        assert_eq!(
            deriver.derive("Write  Chapter One", "m1", &empty),
            deriver.derive("write chapter one", "m1", &empty)
        );
    }

    #[test]
    fn test_derive_empty_prompt_valid() {
        let deriver = KeyDeriver::default();
        let key = deriver.derive("", "m1", &RequestOptions::new());
        assert!(key.starts_with("m1:"));
        assert_eq!(key.len(), "m1:".len() + 8);
    }

    #[test]
    fn test_prompts_collapse_beyond_prefix() {
        let deriver = KeyDeriver::new(5);
        let empty = RequestOptions::new();
        assert_eq!(
            deriver.derive("hello world", "m1", &empty),
            deriver.derive("hello there", "m1", &empty)
        );
    }

    #[test]
    fn test_prompt_hash_tracks_raw_text() {
        assert_ne!(prompt_hash("Hello"), prompt_hash("hello"));
        assert_eq!(prompt_hash("Hello"), prompt_hash("Hello"));
    }
}
