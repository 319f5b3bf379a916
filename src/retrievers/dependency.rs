//! Dependency retriever: BFS over the import/call graph seeded from
//! symbol identifiers in the query (spec.md §4.8 "Dependency").
//!
//! The BFS shape (seed symbols, walk to a bounded depth, dedupe keeping
//! the shallowest hit) is grounded in the enrichment pack's
//! `mylinyuzhi-codex/codex-rs/retrieval/src/repomap/graph.rs`, adapted
//! from PageRank-edge-weighting to the spec's exact `0.7^depth` decay
//! and depth-3 bound (spec.md §9 Open Questions: "imports + direct
//! calls, walked up to depth 3, both directions on `refactor`/
//! `bug_fix`").

use async_trait::async_trait;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use crate::metadata_store::MetadataStore;
use crate::models::{Candidate, Intent, Method};

use super::{apply_filters, extract_symbol_tokens, Retriever, RetrieveRequest};

const MAX_DEPTH: u32 = 3;
const DEPTH_DECAY: f64 = 0.7;

pub struct DependencyRetriever {
    metadata_store: Arc<MetadataStore>,
}

impl DependencyRetriever {
    pub fn new(metadata_store: Arc<MetadataStore>) -> Self {
        Self { metadata_store }
    }
}

#[async_trait]
impl Retriever for DependencyRetriever {
    fn method(&self) -> Method {
        Method::Dependency
    }

    async fn retrieve(&self, req: &RetrieveRequest) -> Vec<Candidate> {
        let seeds = extract_symbol_tokens(&req.text);
        if seeds.is_empty() {
            return Vec::new();
        }

        let bidirectional = matches!(req.intent, Intent::Refactor | Intent::BugFix);

        // chunk_id -> shallowest depth seen.
        let mut best_depth: HashMap<String, u32> = HashMap::new();
        let mut queue: VecDeque<(String, u32)> = VecDeque::new();
        let mut visited_symbols: HashSet<String> = HashSet::new();

        for seed in &seeds {
            let hits = match self.metadata_store.by_symbol(seed).await {
                Ok(h) => h,
                Err(e) => {
                    tracing::warn!("dependency retriever: symbol lookup failed: {e}");
                    continue;
                }
            };
            for chunk in hits {
                best_depth.entry(chunk.chunk_id.clone()).or_insert(0);
                queue.push_back((chunk.chunk_id, 0));
            }
            visited_symbols.insert(seed.clone());
        }

        while let Some((chunk_id, depth)) = queue.pop_front() {
            if depth >= MAX_DEPTH {
                continue;
            }

            let referenced_symbols = match self.metadata_store.deps_of(&chunk_id).await {
                Ok(s) => s,
                Err(e) => {
                    tracing::warn!("dependency retriever: deps_of failed: {e}");
                    Vec::new()
                }
            };

            let mut neighbor_symbols = referenced_symbols;
            if bidirectional {
                if let Some(chunk) = match self.metadata_store.get(&chunk_id).await {
                    Ok(c) => c,
                    Err(_) => None,
                } {
                    if let Some(name) = chunk.symbol_name {
                        if let Ok(dependents) = self.metadata_store.dependents_of(&name).await {
                            for dep_chunk in dependents {
                                let next_depth = depth + 1;
                                let improved = best_depth
                                    .get(&dep_chunk.chunk_id)
                                    .map(|&d| next_depth < d)
                                    .unwrap_or(true);
                                if improved {
                                    best_depth.insert(dep_chunk.chunk_id.clone(), next_depth);
                                    queue.push_back((dep_chunk.chunk_id, next_depth));
                                }
                            }
                        }
                    }
                }
            }

            for symbol in neighbor_symbols.drain(..) {
                if !visited_symbols.insert(symbol.clone()) {
                    continue;
                }
                let hits = match self.metadata_store.by_symbol(&symbol).await {
                    Ok(h) => h,
                    Err(_) => continue,
                };
                for chunk in hits {
                    let next_depth = depth + 1;
                    let improved = best_depth
                        .get(&chunk.chunk_id)
                        .map(|&d| next_depth < d)
                        .unwrap_or(true);
                    if improved {
                        best_depth.insert(chunk.chunk_id.clone(), next_depth);
                        queue.push_back((chunk.chunk_id, next_depth));
                    }
                }
            }
        }

        let mut candidates = Vec::new();
        for (chunk_id, depth) in best_depth {
            let chunk = match self.metadata_store.get(&chunk_id).await {
                Ok(Some(c)) => c,
                _ => continue,
            };
            let score = DEPTH_DECAY.powi(depth as i32);
            candidates.push(Candidate {
                chunk,
                score,
                method: Method::Dependency,
                raw_score: depth as f64,
                matched_terms: None,
                dep_depth: Some(depth),
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
    use crate::models::{Chunk, LineRange, SymbolType};

    async fn setup() -> Arc<MetadataStore> {
        let pool = sqlx::SqlitePool::connect("sqlite::memory:").await.unwrap();
        run_migrations(&pool).await.unwrap();
        Arc::new(MetadataStore::new(pool))
    }

    fn mk(path: &str, symbol: &str) -> Chunk {
        Chunk::new(
            path.to_string(),
            format!("fn {}() {{}}", symbol),
            Some(LineRange { start: 1, end: 1 }),
            "rust".into(),
            Some(symbol.to_string()),
            Some(SymbolType::Function),
            0,
        )
    }

    #[tokio::test]
    async fn empty_query_yields_no_candidates() {
        let store = setup().await;
        let retriever = DependencyRetriever::new(store);
        let req = RetrieveRequest {
            text: "the a an".into(),
            limit: 10,
            min_score: None,
            file_patterns: None,
            languages: None,
            intent: Intent::Explain,
        };
        assert!(retriever.retrieve(&req).await.is_empty());
    }

    #[tokio::test]
    async fn direct_hit_scores_depth_zero() {
        let store = setup().await;
        let chunk = mk("a.rs", "handleLogin");
        store.upsert(&chunk).await.unwrap();
        let retriever = DependencyRetriever::new(store);
        let req = RetrieveRequest {
            text: "handleLogin".into(),
            limit: 10,
            min_score: None,
            file_patterns: None,
            languages: None,
            intent: Intent::Explain,
        };
        let candidates = retriever.retrieve(&req).await;
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].score, 1.0);
        assert_eq!(candidates[0].dep_depth, Some(0));
    }

    #[tokio::test]
    async fn one_hop_scores_per_decay_formula() {
        let store = setup().await;
        let seed = mk("a.rs", "handleLogin");
        let callee = mk("b.rs", "validateUser");
        store.upsert(&seed).await.unwrap();
        store.upsert(&callee).await.unwrap();
        store.add_dep(&seed.chunk_id, "validateUser", "call").await.unwrap();

        let retriever = DependencyRetriever::new(store);
        let req = RetrieveRequest {
            text: "handleLogin".into(),
            limit: 10,
            min_score: None,
            file_patterns: None,
            languages: None,
            intent: Intent::Explain,
        };
        let candidates = retriever.retrieve(&req).await;
        let callee_candidate = candidates.iter().find(|c| c.chunk.symbol_name.as_deref() == Some("validateUser")).unwrap();
        assert!((callee_candidate.score - 0.7).abs() < 1e-9);
    }
}
