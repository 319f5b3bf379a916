//! Retrievers (C8): semantic, lexical, dependency, and recent-edits
//! candidate producers.
//!
//! The `Retriever` trait generalizes the teacher's orphaned
//! `traits.rs::Connector` trait (name/description/scan shape) into the
//! retrieval domain, per spec.md §9's design note: "map this to a
//! `Retriever` trait... plus an enum discriminator for telemetry."
//! `retrieve` is infallible at the trait boundary — internal errors are
//! caught and logged (§7 "Recover locally: Single retriever failure ->
//! empty list"), so the façade's concurrent `join_all` over all four
//! retrievers can never be poisoned by one failing.

pub mod dependency;
pub mod lexical;
pub mod recent;
pub mod semantic;

use async_trait::async_trait;

use crate::models::{Candidate, Intent, Method};

/// Shared request contract for all retrievers (spec.md §4.8). `intent`
/// is threaded through from the façade so the dependency retriever can
/// decide whether to include reverse dependencies.
#[derive(Debug, Clone)]
pub struct RetrieveRequest {
    pub text: String,
    pub limit: u32,
    pub min_score: Option<f64>,
    pub file_patterns: Option<Vec<String>>,
    pub languages: Option<Vec<String>>,
    pub intent: Intent,
}

#[async_trait]
pub trait Retriever: Send + Sync {
    fn method(&self) -> Method;

    /// Produce scored candidates for `req`, sorted by `score` descending.
    /// May return fewer than `req.limit`, including zero. Never returns
    /// an `Err` — internal failures are logged and yield an empty list.
    async fn retrieve(&self, req: &RetrieveRequest) -> Vec<Candidate>;
}

/// Apply the shared post-hoc file/language filters (spec.md §4.8
/// "Semantic": "Apply file/language filters post-hoc").
pub fn apply_filters(mut candidates: Vec<Candidate>, req: &RetrieveRequest) -> Vec<Candidate> {
    if let Some(patterns) = &req.file_patterns {
        if !patterns.is_empty() {
            let set = build_globset(patterns);
            candidates.retain(|c| set.is_match(&c.chunk.file_path));
        }
    }
    if let Some(languages) = &req.languages {
        if !languages.is_empty() {
            candidates.retain(|c| languages.iter().any(|l| l == &c.chunk.language));
        }
    }
    candidates
}

fn build_globset(patterns: &[String]) -> globset::GlobSet {
    let mut builder = globset::GlobSetBuilder::new();
    for pattern in patterns {
        if let Ok(glob) = globset::Glob::new(pattern) {
            builder.add(glob);
        }
    }
    builder.build().unwrap_or_else(|_| globset::GlobSetBuilder::new().build().unwrap())
}

/// Symbol identifiers (CamelCase or snake_case tokens) extracted from
/// query text, minus a fixed stopword list. Shared by the dependency and
/// recent-edits retrievers.
pub fn extract_symbol_tokens(text: &str) -> Vec<String> {
    const STOPWORDS: &[&str] = &[
        "the", "a", "an", "is", "are", "was", "were", "does", "do", "did", "why", "how", "what",
        "with", "for", "and", "or", "not", "to", "of", "in", "on", "at", "this", "that", "it",
    ];

    text.split(|c: char| !c.is_alphanumeric() && c != '_')
        .filter(|t| !t.is_empty())
        .filter(|t| !STOPWORDS.contains(&t.to_lowercase().as_str()))
        .map(|t| t.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_symbol_tokens_drops_stopwords() {
        let tokens = extract_symbol_tokens("why does test_login fail?");
        assert!(!tokens.iter().any(|t| t.eq_ignore_ascii_case("why")));
        assert!(tokens.iter().any(|t| t == "test_login"));
    }

    #[test]
    fn apply_filters_restricts_by_language() {
        use crate::models::{Chunk, Method};
        let chunk_rs = Chunk::new("a.rs".into(), "x".into(), None, "rust".into(), None, None, 0);
        let chunk_py = Chunk::new("b.py".into(), "x".into(), None, "python".into(), None, None, 0);
        let candidates = vec![
            Candidate { chunk: chunk_rs, score: 1.0, method: Method::Semantic, raw_score: 1.0, matched_terms: None, dep_depth: None },
            Candidate { chunk: chunk_py, score: 1.0, method: Method::Semantic, raw_score: 1.0, matched_terms: None, dep_depth: None },
        ];
        let req = RetrieveRequest {
            text: "x".into(),
            limit: 10,
            min_score: None,
            file_patterns: None,
            languages: Some(vec!["rust".into()]),
            intent: crate::models::Intent::Explain,
        };
        let filtered = apply_filters(candidates, &req);
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].chunk.language, "rust");
    }
}
