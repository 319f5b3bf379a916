//! Semantic retriever: embed the query, search the vector store, rescale
//! to `[0,1]`, drop below `min_score` (spec.md §4.8 "Semantic").

use async_trait::async_trait;
use std::sync::Arc;

use crate::embedding::EmbeddingProvider;
use crate::metadata_store::MetadataStore;
use crate::models::{Candidate, Method};
use crate::vector_store::VectorStore;

use super::{apply_filters, Retriever, RetrieveRequest};

const DEFAULT_MIN_SCORE: f64 = 0.5;

pub struct SemanticRetriever {
    vector_store: Arc<VectorStore>,
    metadata_store: Arc<MetadataStore>,
    embedding_provider: Arc<dyn EmbeddingProvider>,
}

impl SemanticRetriever {
    pub fn new(
        vector_store: Arc<VectorStore>,
        metadata_store: Arc<MetadataStore>,
        embedding_provider: Arc<dyn EmbeddingProvider>,
    ) -> Self {
        Self {
            vector_store,
            metadata_store,
            embedding_provider,
        }
    }
}

#[async_trait]
impl Retriever for SemanticRetriever {
    fn method(&self) -> Method {
        Method::Semantic
    }

    async fn retrieve(&self, req: &RetrieveRequest) -> Vec<Candidate> {
        let query_vec = match self.embedding_provider.embed(&req.text).await {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!("semantic retriever: embedding failed: {e}");
                return Vec::new();
            }
        };

        let hits = match self.vector_store.search(&query_vec, req.limit).await {
            Ok(h) => h,
            Err(e) => {
                tracing::warn!("semantic retriever: vector search failed: {e}");
                return Vec::new();
            }
        };

        let min_score = req.min_score.unwrap_or(DEFAULT_MIN_SCORE);
        let mut candidates = Vec::new();
        for (chunk_id, raw_cosine) in hits {
            // Affine rescale [-1,1] -> [0,1] (spec.md §4.2).
            let score = (raw_cosine as f64 + 1.0) / 2.0;
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
                method: Method::Semantic,
                raw_score: raw_cosine as f64,
                matched_terms: None,
                dep_depth: None,
            });
        }

        candidates.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        apply_filters(candidates, req)
    }
}
