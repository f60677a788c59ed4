//! Two-tier response cache
//!
//! Tier one ([`ExactMatchCache`]) matches on a canonical hash of the
//! normalized message plus captured context. Tier two ([`SemanticCache`])
//! matches paraphrases of already-answered messages within the same context
//! by embedding similarity. Both tiers are in-memory and bounded.

use std::collections::BTreeMap;

use serde::Serialize;
use sha2::{Digest, Sha256};

pub mod exact;
pub mod semantic;

pub use exact::{ExactCacheStats, ExactMatchCache};
pub use semantic::{SemanticCache, SemanticCacheStats};

/// Canonical cache key over a normalized message and its context.
///
/// The message is trimmed and lowercased so trivial formatting differences
/// collapse to the same key. Empty context values are dropped before
/// hashing, and the map ordering makes the serialization deterministic.
pub fn cache_key(message: &str, context: &BTreeMap<String, String>) -> String {
    let normalized = message.trim().to_lowercase();
    let filtered: BTreeMap<&String, &String> = context
        .iter()
        .filter(|(_, value)| !value.trim().is_empty())
        .collect();

    let canonical = serde_json::json!({
        "context": filtered,
        "message": normalized,
    });

    hex::encode(Sha256::digest(canonical.to_string().as_bytes()))
}

/// Hash of the context alone, used to partition the semantic tier.
///
/// Semantic matches are only valid between messages captured under the
/// same situation, so candidates from other contexts are never compared.
pub fn context_hash(context: &BTreeMap<String, String>) -> String {
    let filtered: BTreeMap<&String, &String> = context
        .iter()
        .filter(|(_, value)| !value.trim().is_empty())
        .collect();

    let canonical = serde_json::json!({ "context": filtered });

    hex::encode(Sha256::digest(canonical.to_string().as_bytes()))
}

/// Rolled-up view across both tiers.
///
/// A request only reaches the semantic tier after missing the exact tier,
/// so the combined miss count is the semantic tier's.
#[derive(Debug, Clone, Serialize)]
pub struct CombinedStats {
    pub hits: u64,
    pub misses: u64,
    pub hit_rate: f32,
}

/// Combined statistics across both cache tiers
#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    pub exact: ExactCacheStats,
    pub semantic: SemanticCacheStats,
    pub combined: CombinedStats,
}

impl CacheStats {
    pub fn new(exact: ExactCacheStats, semantic: SemanticCacheStats) -> Self {
        let hits = exact.hits + semantic.hits;
        let misses = semantic.misses;
        let total = hits + misses;
        let hit_rate = if total == 0 {
            0.0
        } else {
            hits as f32 / total as f32
        };

        Self {
            exact,
            semantic,
            combined: CombinedStats {
                hits,
                misses,
                hit_rate,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_key_normalizes_message() {
        let ctx = context(&[("pain", "price")]);

        assert_eq!(
            cache_key("  Too Expensive  ", &ctx),
            cache_key("too expensive", &ctx)
        );
    }

    #[test]
    fn test_key_ignores_empty_context_values() {
        let with_empty = context(&[("pain", "price"), ("objection", ""), ("budget", "  ")]);
        let without = context(&[("pain", "price")]);

        assert_eq!(
            cache_key("too expensive", &with_empty),
            cache_key("too expensive", &without)
        );
    }

    #[test]
    fn test_key_is_context_sensitive() {
        let a = context(&[("pain", "price")]);
        let b = context(&[("pain", "quality")]);

        assert_ne!(cache_key("too expensive", &a), cache_key("too expensive", &b));
    }

    #[test]
    fn test_context_hash_ignores_message() {
        let ctx = context(&[("pain", "price")]);

        // Same context partitions together regardless of the message
        assert_eq!(context_hash(&ctx), context_hash(&ctx));
        assert_ne!(context_hash(&ctx), context_hash(&context(&[])));
    }
}
