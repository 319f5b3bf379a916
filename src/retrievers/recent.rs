//! Recent-edits retriever: query the metadata store's 24h recency
//! window, score by exponential decay, post-filter by coarse keyword
//! match (spec.md §4.8 "Recent edits").

use async_trait::async_trait;
use std::sync::Arc;

use crate::metadata_store::MetadataStore;
use crate::models::{Candidate, Method};

use super::{apply_filters, Retriever, RetrieveRequest};

const WINDOW_HOURS: i64 = 24;
const DECAY_RATE: f64 = 0.5;
const MIN_TOKEN_LEN: usize = 3;

pub struct RecentEditsRetriever {
    metadata_store: Arc<MetadataStore>,
    now_unix: i64,
}

impl RecentEditsRetriever {
    pub fn new(metadata_store: Arc<MetadataStore>, now_unix: i64) -> Self {
        Self {
            metadata_store,
            now_unix,
        }
    }
}

fn coarse_match(query: &str, content: &str, file_path: &str) -> bool {
    let haystack_content = content.to_lowercase();
    let haystack_path = file_path.to_lowercase();
    query
        .split(|c: char| !c.is_alphanumeric() && c != '_')
        .filter(|t| t.len() >= MIN_TOKEN_LEN)
        .map(|t| t.to_lowercase())
        .any(|t| haystack_content.contains(&t) || haystack_path.contains(&t))
}

#[async_trait]
impl Retriever for RecentEditsRetriever {
    fn method(&self) -> Method {
        Method::RecentEdits
    }

    async fn retrieve(&self, req: &RetrieveRequest) -> Vec<Candidate> {
        let window_start = self.now_unix - WINDOW_HOURS * 3600;
        let hits = match self.metadata_store.recent(window_start, req.limit.max(64)).await {
            Ok(h) => h,
            Err(e) => {
                tracing::warn!("recent-edits retriever: query failed: {e}");
                return Vec::new();
            }
        };

        let mut candidates = Vec::new();
        for chunk in hits {
            if !coarse_match(&req.text, &chunk.content, &chunk.file_path) {
                continue;
            }
            let age_hours = (self.now_unix - chunk.last_modified) as f64 / 3600.0;
            let score = (-DECAY_RATE * age_hours.max(0.0)).exp().clamp(0.0, 1.0);
            if let Some(min_score) = req.min_score {
                if score < min_score {
                    continue;
                }
            }
            candidates.push(Candidate {
                raw_score: score,
                chunk,
                score,
                method: Method::RecentEdits,
                matched_terms: None,
                dep_depth: None,
            });
        }

        candidates.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        candidates.truncate(req.limit as usize);
        apply_filters(candidates, req)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata_store::MetadataStore;
    use crate::migrate::run_migrations;
    use crate::models::{Chunk, Intent, LineRange, SymbolType};

    async fn setup() -> Arc<MetadataStore> {
        let pool = sqlx::SqlitePool::connect("sqlite::memory:").await.unwrap();
        run_migrations(&pool).await.unwrap();
        Arc::new(MetadataStore::new(pool))
    }

    fn mk(path: &str, content: &str, last_modified: i64) -> Chunk {
        Chunk::new(
            path.to_string(),
            content.to_string(),
            Some(LineRange { start: 1, end: 1 }),
            "rust".into(),
            Some("foo".into()),
            Some(SymbolType::Function),
            last_modified,
        )
    }

    fn req(text: &str) -> RetrieveRequest {
        RetrieveRequest {
            text: text.to_string(),
            limit: 10,
            min_score: None,
            file_patterns: None,
            languages: None,
            intent: Intent::BugFix,
        }
    }

    #[tokio::test]
    async fn recent_chunk_within_window_and_matching_keyword_is_returned() {
        let store = setup().await;
        let now = 1_000_000i64;
        store.upsert(&mk("login.rs", "fn validateLogin() {}", now - 3600)).await.unwrap();
        let retriever = RecentEditsRetriever::new(store, now);
        let candidates = retriever.retrieve(&req("why does login fail")).await;
        assert_eq!(candidates.len(), 1);
        assert!(candidates[0].score > 0.0 && candidates[0].score <= 1.0);
    }

    #[tokio::test]
    async fn chunk_outside_window_is_excluded() {
        let store = setup().await;
        let now = 1_000_000i64;
        store.upsert(&mk("old.rs", "fn loginHandler() {}", now - 25 * 3600)).await.unwrap();
        let retriever = RecentEditsRetriever::new(store, now);
        let candidates = retriever.retrieve(&req("login")).await;
        assert!(candidates.is_empty());
    }

    #[tokio::test]
    async fn non_matching_keyword_is_filtered_out() {
        let store = setup().await;
        let now = 1_000_000i64;
        store.upsert(&mk("unrelated.rs", "fn computeTotals() {}", now - 60)).await.unwrap();
        let retriever = RecentEditsRetriever::new(store, now);
        let candidates = retriever.retrieve(&req("login flow")).await;
        assert!(candidates.is_empty());
    }

    #[tokio::test]
    async fn score_decays_with_age() {
        let store = setup().await;
        let now = 1_000_000i64;
        store.upsert(&mk("a.rs", "fn loginNow() {}", now)).await.unwrap();
        store.upsert(&mk("b.rs", "fn loginOld() {}", now - 10 * 3600)).await.unwrap();
        let retriever = RecentEditsRetriever::new(store, now);
        let candidates = retriever.retrieve(&req("login")).await;
        assert_eq!(candidates[0].chunk.file_path, "a.rs");
    }
}
