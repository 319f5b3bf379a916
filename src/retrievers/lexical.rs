//! Lexical retriever: sanitize the query, issue an FTS phrase-or-terms
//! query, normalize BM25 (spec.md §4.8 "Lexical").

use async_trait::async_trait;
use std::sync::Arc;

use crate::metadata_store::{normalize_bm25, MetadataStore};
use crate::models::{Candidate, Method};

use super::{apply_filters, Retriever, RetrieveRequest};

const DEFAULT_MIN_SCORE: f64 = 0.1;

pub struct LexicalRetriever {
    metadata_store: Arc<MetadataStore>,
}

impl LexicalRetriever {
    pub fn new(metadata_store: Arc<MetadataStore>) -> Self {
        Self { metadata_store }
    }
}

/// Strip non-word characters and split into case-folded terms.
fn sanitize_terms(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric() && c != '_')
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
        .collect()
}

/// Build the FTS5 MATCH query: phrase preferred, terms as fallback.
/// For multi-term queries: `"t1 t2 ... tn" OR t1 OR t2 OR ... OR tn`.
fn build_fts_query(terms: &[String]) -> String {
    if terms.is_empty() {
        return String::new();
    }
    if terms.len() == 1 {
        return terms[0].clone();
    }
    let phrase = format!("\"{}\"", terms.join(" "));
    let ors = terms.join(" OR ");
    format!("{} OR {}", phrase, ors)
}

#[async_trait]
impl Retriever for LexicalRetriever {
    fn method(&self) -> Method {
        Method::Lexical
    }

    async fn retrieve(&self, req: &RetrieveRequest) -> Vec<Candidate> {
        let terms = sanitize_terms(&req.text);
        if terms.is_empty() {
            return Vec::new();
        }
        let fts_query = build_fts_query(&terms);

        let hits = match self.metadata_store.full_text_search(&fts_query, req.limit).await {
            Ok(h) => h,
            Err(e) => {
                // FTS tokenization failure -> fall back to whitespace split (spec.md §7).
                tracing::warn!("lexical retriever: FTS query failed, falling back: {e}");
                let fallback_query = terms.join(" OR ");
                match self.metadata_store.full_text_search(&fallback_query, req.limit).await {
                    Ok(h) => h,
                    Err(e2) => {
                        tracing::warn!("lexical retriever: fallback FTS query also failed: {e2}");
                        return Vec::new();
                    }
                }
            }
        };

        let min_score = req.min_score.unwrap_or(DEFAULT_MIN_SCORE);
        let mut candidates = Vec::new();
        for (chunk_id, bm25_raw, matched_terms) in hits {
            let score = normalize_bm25(bm25_raw);
            if score < min_score {
                continue;
            }
            let chunk = match self.metadata_store.get(&chunk_id).await {
                Ok(Some(c)) => c,
                _ => continue,
            };
            candidates.push(Candidate {
                chunk,
                score,
                method: Method::Lexical,
                raw_score: bm25_raw,
                matched_terms: Some(matched_terms),
                dep_depth: None,
            });
        }

        candidates.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        apply_filters(candidates, req)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_strips_punctuation_and_lowercases() {
        let terms = sanitize_terms("why does Test_Login fail?!");
        assert_eq!(terms, vec!["why", "does", "test_login", "fail"]);
    }

    #[test]
    fn fts_query_prefers_phrase_with_term_fallback() {
        let terms = vec!["login".to_string(), "flow".to_string()];
        let q = build_fts_query(&terms);
        assert_eq!(q, "\"login flow\" OR login OR flow");
    }

    #[test]
    fn single_term_has_no_phrase_wrapper() {
        let terms = vec!["login".to_string()];
        assert_eq!(build_fts_query(&terms), "login");
    }
}
