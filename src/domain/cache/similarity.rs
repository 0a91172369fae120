//! Lexical near-duplicate matching
//!
//! Similarity is token-set Jaccard over normalized prompt text. The metric
//! is deliberately lexical, not semantic: it trades some false positives (a
//! "close enough" prompt returning a cached response) for never needing an
//! embedding call on the lookup path.

use std::collections::HashSet;

/// Splits a normalized prompt into its whitespace-delimited token set.
pub fn token_set(normalized: &str) -> HashSet<&str> {
    normalized.split_whitespace().collect()
}

/// The normalized prompt with all spacing removed. Spacing variants of the
/// same text (common in Korean, where word spacing is inconsistent) compact
/// to identical strings.
pub fn compact(normalized: &str) -> String {
    normalized.split_whitespace().collect()
}

/// Jaccard similarity `|A ∩ B| / |A ∪ B|` over two token sets.
/// Two empty sets are treated as identical.
pub fn jaccard_similarity(a: &HashSet<&str>, b: &HashSet<&str>) -> f32 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }

    let intersection = a.intersection(b).count();
    let union = a.len() + b.len() - intersection;

    if union == 0 {
        return 0.0;
    }

    intersection as f32 / union as f32
}

/// Similarity between two normalized prompts.
///
/// Spacing-only variants compact to the same string and score 1.0 before
/// the token comparison; everything else is plain token-set Jaccard.
pub fn prompt_similarity(a: &str, b: &str) -> f32 {
    if compact(a) == compact(b) {
        return 1.0;
    }

    jaccard_similarity(&token_set(a), &token_set(b))
}
