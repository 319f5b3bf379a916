//! Vector store (C2): persist and query fixed-dimensional embeddings by
//! approximate cosine similarity.
//!
//! Grounded in the teacher's `embedding/mod.rs` (`vec_to_blob`/
//! `blob_to_vec` little-endian f32 codec, `cosine_similarity`) and
//! `search.rs::fetch_vector_candidates` (brute-force scan pattern). The
//! specification explicitly permits an approximate store; brute-force
//! exact cosine is a conformant, simply non-scaling, implementation —
//! identical to what the teacher already ships.

use anyhow::Result;
use sqlx::{Row, SqlitePool};

/// Encode a float vector as a BLOB (little-endian f32 bytes).
pub fn vec_to_blob(vec: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(vec.len() * 4);
    for &v in vec {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    bytes
}

/// Decode a BLOB back into a float vector.
pub fn blob_to_vec(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}

/// Compute cosine similarity between two embedding vectors. Returns
/// `0.0` for empty vectors or mismatched lengths.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < f32::EPSILON {
        return 0.0;
    }
    dot / denom
}

/// Normalize a vector to unit length (invariant 3: "Vectors are
/// unit-norm; cosine similarity reduces to dot product").
pub fn normalize(vec: &[f32]) -> Vec<f32> {
    let norm: f32 = vec.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm < f32::EPSILON {
        return vec.to_vec();
    }
    vec.iter().map(|v| v / norm).collect()
}

pub struct VectorStore {
    pool: SqlitePool,
}

impl VectorStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn upsert(&self, chunk_id: &str, vector: &[f32]) -> Result<()> {
        let unit = normalize(vector);
        let blob = vec_to_blob(&unit);
        sqlx::query(
            "INSERT INTO embeddings (chunk_id, vector_blob, dims) VALUES (?, ?, ?) \
             ON CONFLICT(chunk_id) DO UPDATE SET vector_blob = excluded.vector_blob, dims = excluded.dims",
        )
        .bind(chunk_id)
        .bind(blob)
        .bind(unit.len() as i64)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn delete(&self, chunk_id: &str) -> Result<()> {
        sqlx::query("DELETE FROM embeddings WHERE chunk_id = ?")
            .bind(chunk_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Brute-force cosine scan, returning up to `k` records ordered by
    /// similarity descending. Similarities are raw `[-1,1]`; the caller
    /// (the semantic retriever) applies the `(s+1)/2` affine rescale.
    pub async fn search(&self, query_vec: &[f32], k: u32) -> Result<Vec<(String, f32)>> {
        let query_unit = normalize(query_vec);
        let rows = sqlx::query("SELECT chunk_id, vector_blob FROM embeddings")
            .fetch_all(&self.pool)
            .await?;

        let mut scored: Vec<(String, f32)> = rows
            .into_iter()
            .map(|r| {
                let chunk_id: String = r.get("chunk_id");
                let blob: Vec<u8> = r.get("vector_blob");
                let vector = blob_to_vec(&blob);
                let score = cosine_similarity(&query_unit, &vector);
                (chunk_id, score)
            })
            .collect();

        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k as usize);
        Ok(scored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migrate::run_migrations;

    #[test]
    fn vec_blob_roundtrip() {
        let v = vec![1.0f32, -2.5, 3.125, 0.0];
        let blob = vec_to_blob(&v);
        assert_eq!(blob_to_vec(&blob), v);
    }

    #[test]
    fn cosine_identical_is_one() {
        let v = vec![1.0, 2.0, 3.0];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_orthogonal_is_zero() {
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
    }

    #[test]
    fn normalize_produces_unit_vector() {
        let v = normalize(&[3.0, 4.0]);
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn search_orders_by_similarity_descending() {
        let pool = sqlx::SqlitePool::connect("sqlite::memory:").await.unwrap();
        run_migrations(&pool).await.unwrap();
        let store = VectorStore::new(pool);

        store.upsert("a", &[1.0, 0.0]).await.unwrap();
        store.upsert("b", &[0.0, 1.0]).await.unwrap();
        store.upsert("c", &[0.9, 0.1]).await.unwrap();

        let results = store.search(&[1.0, 0.0], 3).await.unwrap();
        assert_eq!(results[0].0, "a");
        assert_eq!(results[1].0, "c");
        assert_eq!(results[2].0, "b");
    }

    #[tokio::test]
    async fn delete_removes_from_search() {
        let pool = sqlx::SqlitePool::connect("sqlite::memory:").await.unwrap();
        run_migrations(&pool).await.unwrap();
        let store = VectorStore::new(pool);
        store.upsert("a", &[1.0, 0.0]).await.unwrap();
        store.delete("a").await.unwrap();
        let results = store.search(&[1.0, 0.0], 3).await.unwrap();
        assert!(results.is_empty());
    }
}
