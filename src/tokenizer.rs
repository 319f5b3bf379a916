//! Tokenizer (C1): model-faithful token counting.
//!
//! Grounded in the enrichment pack's `mylinyuzhi-codex/codex-rs/retrieval`
//! stack, which depends on `tiktoken-rs` for the same purpose. Resolves
//! the spec's Open Question ("the source's token counter is an
//! estimator... this specification requires a real tokenizer") by using
//! a real BPE table, falling back to a byte-length estimator only when
//! the table cannot be constructed, with an explicit `degraded` flag.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tiktoken_rs::CoreBPE;

const SHARD_COUNT: usize = 16;

fn shard_index(text: &str) -> usize {
    let mut hasher_byte: u8 = 0;
    for b in text.as_bytes() {
        hasher_byte = hasher_byte.wrapping_add(*b);
    }
    (hasher_byte as usize) % SHARD_COUNT
}

/// Selects a BPE table by declared model family (spec.md §4.1).
fn bpe_for_family(model_family: &str) -> Option<CoreBPE> {
    match model_family {
        "gpt-4o" | "gpt-4o-mini" | "o1" | "o200k" => tiktoken_rs::o200k_base().ok(),
        _ => tiktoken_rs::cl100k_base().ok(),
    }
}

/// Process-wide token counter, memoized and sharded by text hash (spec.md
/// §9: "shard its internal map by hash to reduce contention").
pub struct Tokenizer {
    model_family: String,
    bpe: Option<Arc<CoreBPE>>,
    cache: Vec<Mutex<HashMap<u64, u32>>>,
    degraded: bool,
}

impl Tokenizer {
    pub fn new(model_family: &str) -> Self {
        let bpe = bpe_for_family(model_family);
        let degraded = bpe.is_none();
        Self {
            model_family: model_family.to_string(),
            bpe: bpe.map(Arc::new),
            cache: (0..SHARD_COUNT).map(|_| Mutex::new(HashMap::new())).collect(),
            degraded,
        }
    }

    pub fn model_family(&self) -> &str {
        &self.model_family
    }

    /// True when the real BPE table could not be constructed and the
    /// byte-length estimator is in use instead.
    pub fn degraded(&self) -> bool {
        self.degraded
    }

    fn text_hash(text: &str) -> u64 {
        use std::hash::{Hash, Hasher};
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        text.hash(&mut hasher);
        hasher.finish()
    }

    /// Count tokens in `text`. Total: never fails.
    pub fn count(&self, text: &str) -> u32 {
        let shard = &self.cache[shard_index(text)];
        let key = Self::text_hash(text);

        if let Some(hit) = shard.lock().unwrap().get(&key) {
            return *hit;
        }

        let count = match &self.bpe {
            Some(bpe) => bpe.encode_with_special_tokens(text).len() as u32,
            None => estimate_tokens(text),
        };

        shard.lock().unwrap().insert(key, count);
        count
    }

    pub fn count_batch(&self, texts: &[String]) -> u32 {
        texts.iter().map(|t| self.count(t)).sum()
    }
}

/// Fallback estimator used only when the BPE table is unavailable.
fn estimate_tokens(text: &str) -> u32 {
    ((text.len() + 3) / 4) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn count_is_deterministic() {
        let tok = Tokenizer::new("gpt-4");
        let a = tok.count("the quick brown fox");
        let b = tok.count("the quick brown fox");
        assert_eq!(a, b);
    }

    #[test]
    fn count_batch_sums_individual_counts() {
        let tok = Tokenizer::new("gpt-4");
        let texts = vec!["hello".to_string(), "world".to_string()];
        let batch = tok.count_batch(&texts);
        let sum = tok.count("hello") + tok.count("world");
        assert_eq!(batch, sum);
    }

    #[test]
    fn unknown_family_falls_back_to_cl100k() {
        let tok = Tokenizer::new("some-unknown-model");
        assert!(!tok.degraded());
        assert!(tok.count("hello world") > 0);
    }

    #[test]
    fn estimator_is_proportional_to_length() {
        assert_eq!(estimate_tokens(""), 0);
        assert!(estimate_tokens("abcdefgh") >= 2);
    }
}
