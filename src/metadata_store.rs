//! Metadata store (C3): chunk persistence, full-text (BM25) search, and
//! recency/symbol queries.
//!
//! Grounded in the teacher's `search.rs::fetch_keyword_candidates` (FTS5
//! query shape) and `ingest.rs::replace_chunks` (explicit dual-write to
//! the base table and the FTS index — no triggers, matching the
//! teacher's existing approach).

use anyhow::Result;
use sqlx::{Row, SqlitePool};

use crate::models::{Chunk, LineRange, SymbolType};

/// BM25 normalization constant (spec.md §4.3, fixed — not configurable).
pub const K_NORM: f64 = 10.0;

pub struct MetadataStore {
    pool: SqlitePool,
}

fn tokenize_identifier_split(content: &str) -> String {
    // Identifier-split, case-folded tokens for BM25 (spec.md §3 "Metadata record").
    let mut tokens = Vec::new();
    for word in content.split(|c: char| !c.is_alphanumeric()) {
        if word.is_empty() {
            continue;
        }
        // Split camelCase / PascalCase boundaries too, so `getUserName`
        // contributes `get`, `user`, `name` as independent FTS tokens.
        let mut current = String::new();
        let mut prev_lower = false;
        for ch in word.chars() {
            if ch.is_uppercase() && prev_lower {
                if !current.is_empty() {
                    tokens.push(current.to_lowercase());
                }
                current = String::new();
            }
            prev_lower = ch.is_lowercase();
            current.push(ch);
        }
        if !current.is_empty() {
            tokens.push(current.to_lowercase());
        }
    }
    tokens.join(" ")
}

fn symbol_type_to_str(t: Option<SymbolType>) -> Option<&'static str> {
    t.map(|t| match t {
        SymbolType::File => "file",
        SymbolType::Module => "module",
        SymbolType::Class => "class",
        SymbolType::Function => "function",
        SymbolType::Method => "method",
        SymbolType::Interface => "interface",
        SymbolType::Type => "type",
        SymbolType::Constant => "constant",
        SymbolType::Block => "block",
    })
}

fn symbol_type_from_str(s: Option<String>) -> Option<SymbolType> {
    s.and_then(|s| match s.as_str() {
        "file" => Some(SymbolType::File),
        "module" => Some(SymbolType::Module),
        "class" => Some(SymbolType::Class),
        "function" => Some(SymbolType::Function),
        "method" => Some(SymbolType::Method),
        "interface" => Some(SymbolType::Interface),
        "type" => Some(SymbolType::Type),
        "constant" => Some(SymbolType::Constant),
        "block" => Some(SymbolType::Block),
        _ => None,
    })
}

impl MetadataStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn upsert(&self, chunk: &Chunk) -> Result<()> {
        let (line_start, line_end) = match chunk.line_range {
            Some(r) => (Some(r.start as i64), Some(r.end as i64)),
            None => (None, None),
        };

        sqlx::query(
            r#"
            INSERT INTO chunks
                (chunk_id, file_path, content, line_start, line_end, language,
                 symbol_name, symbol_type, last_modified, content_hash)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(chunk_id) DO UPDATE SET
                file_path = excluded.file_path,
                content = excluded.content,
                line_start = excluded.line_start,
                line_end = excluded.line_end,
                language = excluded.language,
                symbol_name = excluded.symbol_name,
                symbol_type = excluded.symbol_type,
                last_modified = excluded.last_modified,
                content_hash = excluded.content_hash
            "#,
        )
        .bind(&chunk.chunk_id)
        .bind(&chunk.file_path)
        .bind(&chunk.content)
        .bind(line_start)
        .bind(line_end)
        .bind(&chunk.language)
        .bind(&chunk.symbol_name)
        .bind(symbol_type_to_str(chunk.symbol_type))
        .bind(chunk.last_modified)
        .bind(&chunk.content_hash)
        .execute(&self.pool)
        .await?;

        // Dual-write: keep the FTS index in sync explicitly (no triggers).
        sqlx::query("DELETE FROM chunks_fts WHERE chunk_id = ?")
            .bind(&chunk.chunk_id)
            .execute(&self.pool)
            .await?;
        let tokens = tokenize_identifier_split(&chunk.content);
        sqlx::query("INSERT INTO chunks_fts (chunk_id, tokens) VALUES (?, ?)")
            .bind(&chunk.chunk_id)
            .bind(tokens)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    pub async fn delete(&self, chunk_id: &str) -> Result<()> {
        sqlx::query("DELETE FROM chunks WHERE chunk_id = ?")
            .bind(chunk_id)
            .execute(&self.pool)
            .await?;
        sqlx::query("DELETE FROM chunks_fts WHERE chunk_id = ?")
            .bind(chunk_id)
            .execute(&self.pool)
            .await?;
        sqlx::query("DELETE FROM deps WHERE src_chunk_id = ?")
            .bind(chunk_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Delete every chunk belonging to a file (file-delete event, spec.md §4.5).
    pub async fn delete_by_file(&self, file_path: &str) -> Result<Vec<String>> {
        let rows: Vec<(String,)> = sqlx::query_as("SELECT chunk_id FROM chunks WHERE file_path = ?")
            .bind(file_path)
            .fetch_all(&self.pool)
            .await?;
        for (chunk_id,) in &rows {
            self.delete(chunk_id).await?;
        }
        Ok(rows.into_iter().map(|(id, )| id).collect())
    }

    pub async fn get(&self, chunk_id: &str) -> Result<Option<Chunk>> {
        let row = sqlx::query(
            "SELECT chunk_id, file_path, content, line_start, line_end, language, \
             symbol_name, symbol_type, last_modified, content_hash FROM chunks WHERE chunk_id = ?",
        )
        .bind(chunk_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| row_to_chunk(&r)))
    }

    /// Full-text search over identifier-split tokens, BM25-ranked.
    pub async fn full_text_search(
        &self,
        query: &str,
        k: u32,
    ) -> Result<Vec<(String, f64, Vec<String>)>> {
        let rows = sqlx::query(
            r#"
            SELECT c.chunk_id, bm25(chunks_fts) AS score, f.tokens
            FROM chunks_fts f
            JOIN chunks c ON c.chunk_id = f.chunk_id
            WHERE chunks_fts MATCH ?
            ORDER BY score
            LIMIT ?
            "#,
        )
        .bind(query)
        .bind(k as i64)
        .fetch_all(&self.pool)
        .await?;

        let query_terms: std::collections::HashSet<String> = query
            .split_whitespace()
            .map(|s| s.trim_matches('"').to_lowercase())
            .collect();

        Ok(rows
            .into_iter()
            .map(|r| {
                let chunk_id: String = r.get("chunk_id");
                // FTS5 bm25() returns a negative-is-better score; flip sign
                // so larger means more relevant, matching spec.md's
                // "BM25 scores are unbounded-positive" convention.
                let raw: f64 = r.get("score");
                let bm25 = -raw;
                let tokens: String = r.get("tokens");
                let matched: Vec<String> = tokens
                    .split_whitespace()
                    .filter(|t| query_terms.contains(*t))
                    .map(|t| t.to_string())
                    .collect();
                (chunk_id, bm25.max(0.0), matched)
            })
            .collect())
    }

    /// Chunks with `last_modified >= before`, ordered by `last_modified` descending.
    pub async fn recent(&self, before: i64, k: u32) -> Result<Vec<Chunk>> {
        let rows = sqlx::query(
            "SELECT chunk_id, file_path, content, line_start, line_end, language, \
             symbol_name, symbol_type, last_modified, content_hash FROM chunks \
             WHERE last_modified >= ? ORDER BY last_modified DESC LIMIT ?",
        )
        .bind(before)
        .bind(k as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(row_to_chunk).collect())
    }

    /// Exact symbol lookup for dependency seeding.
    pub async fn by_symbol(&self, name: &str) -> Result<Vec<Chunk>> {
        let rows = sqlx::query(
            "SELECT chunk_id, file_path, content, line_start, line_end, language, \
             symbol_name, symbol_type, last_modified, content_hash FROM chunks \
             WHERE symbol_name = ?",
        )
        .bind(name)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(row_to_chunk).collect())
    }

    /// `(chunk_id, content_hash)` pairs for a file, used by the indexer to
    /// diff a freshly re-chunked file against what's already stored
    /// without pulling full chunk content over the wire.
    pub async fn chunk_identity_for_file(&self, file_path: &str) -> Result<Vec<(String, String)>> {
        let rows: Vec<(String, String)> =
            sqlx::query_as("SELECT chunk_id, content_hash FROM chunks WHERE file_path = ?")
                .bind(file_path)
                .fetch_all(&self.pool)
                .await?;
        Ok(rows)
    }

    /// Distinct indexed file paths with each file's most recent
    /// `last_modified`, used for startup reconciliation against the
    /// filesystem (spec.md §6 "replay missed changes").
    pub async fn all_file_paths(&self) -> Result<std::collections::HashMap<String, i64>> {
        let rows: Vec<(String, i64)> =
            sqlx::query_as("SELECT file_path, MAX(last_modified) FROM chunks GROUP BY file_path")
                .fetch_all(&self.pool)
                .await?;
        Ok(rows.into_iter().collect())
    }

    /// Record a dependency edge: `src_chunk_id` references `dst_symbol_name`.
    pub async fn add_dep(&self, src_chunk_id: &str, dst_symbol_name: &str, kind: &str) -> Result<()> {
        sqlx::query("INSERT INTO deps (src_chunk_id, dst_symbol_name, kind) VALUES (?, ?, ?)")
            .bind(src_chunk_id)
            .bind(dst_symbol_name)
            .bind(kind)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Symbols referenced by a given chunk (outgoing edges for BFS).
    pub async fn deps_of(&self, src_chunk_id: &str) -> Result<Vec<String>> {
        let rows: Vec<(String,)> =
            sqlx::query_as("SELECT dst_symbol_name FROM deps WHERE src_chunk_id = ?")
                .bind(src_chunk_id)
                .fetch_all(&self.pool)
                .await?;
        Ok(rows.into_iter().map(|(s, )| s).collect())
    }

    /// Chunks whose symbol depends on `symbol_name` (incoming edges, for
    /// reverse-dependency walks on `refactor`/`bug_fix`).
    pub async fn dependents_of(&self, symbol_name: &str) -> Result<Vec<Chunk>> {
        let rows = sqlx::query(
            "SELECT c.chunk_id, c.file_path, c.content, c.line_start, c.line_end, c.language, \
             c.symbol_name, c.symbol_type, c.last_modified, c.content_hash \
             FROM chunks c JOIN deps d ON d.src_chunk_id = c.chunk_id \
             WHERE d.dst_symbol_name = ?",
        )
        .bind(symbol_name)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(row_to_chunk).collect())
    }
}

fn row_to_chunk(r: &sqlx::sqlite::SqliteRow) -> Chunk {
    let line_start: Option<i64> = r.get("line_start");
    let line_end: Option<i64> = r.get("line_end");
    let line_range = match (line_start, line_end) {
        (Some(s), Some(e)) => Some(LineRange {
            start: s as u32,
            end: e as u32,
        }),
        _ => None,
    };
    Chunk {
        chunk_id: r.get("chunk_id"),
        file_path: r.get("file_path"),
        content: r.get("content"),
        line_range,
        language: r.get("language"),
        symbol_name: r.get("symbol_name"),
        symbol_type: symbol_type_from_str(r.get("symbol_type")),
        last_modified: r.get("last_modified"),
        content_hash: r.get("content_hash"),
    }
}

/// Normalize an unbounded-positive BM25 score into `[0,1]` per spec.md §4.3.
pub fn normalize_bm25(score: f64) -> f64 {
    score / (score + K_NORM)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migrate::run_migrations;

    async fn setup() -> MetadataStore {
        let pool = sqlx::SqlitePool::connect("sqlite::memory:").await.unwrap();
        run_migrations(&pool).await.unwrap();
        MetadataStore::new(pool)
    }

    fn mk_chunk(path: &str, content: &str, last_modified: i64) -> Chunk {
        Chunk::new(
            path.to_string(),
            content.to_string(),
            Some(LineRange { start: 1, end: 5 }),
            "rust".to_string(),
            Some("foo".to_string()),
            Some(SymbolType::Function),
            last_modified,
        )
    }

    #[tokio::test]
    async fn upsert_and_get_roundtrip() {
        let store = setup().await;
        let chunk = mk_chunk("a.rs", "fn foo() {}", 100);
        store.upsert(&chunk).await.unwrap();
        let fetched = store.get(&chunk.chunk_id).await.unwrap().unwrap();
        assert_eq!(fetched.file_path, "a.rs");
    }

    #[tokio::test]
    async fn full_text_search_finds_identifier_tokens() {
        let store = setup().await;
        let chunk = mk_chunk("a.rs", "fn getUserName() { return 1; }", 100);
        store.upsert(&chunk).await.unwrap();
        let results = store.full_text_search("user name", 10).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].0, chunk.chunk_id);
    }

    #[tokio::test]
    async fn recent_orders_descending() {
        let store = setup().await;
        let c1 = mk_chunk("a.rs", "fn a() {}", 100);
        let c2 = mk_chunk("b.rs", "fn b() {}", 200);
        store.upsert(&c1).await.unwrap();
        store.upsert(&c2).await.unwrap();
        let results = store.recent(0, 10).await.unwrap();
        assert_eq!(results[0].file_path, "b.rs");
        assert_eq!(results[1].file_path, "a.rs");
    }

    #[tokio::test]
    async fn by_symbol_exact_match() {
        let store = setup().await;
        let chunk = mk_chunk("a.rs", "fn foo() {}", 100);
        store.upsert(&chunk).await.unwrap();
        let results = store.by_symbol("foo").await.unwrap();
        assert_eq!(results.len(), 1);
        let none = store.by_symbol("bar").await.unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn delete_removes_from_fts_too() {
        let store = setup().await;
        let chunk = mk_chunk("a.rs", "fn foo() {}", 100);
        store.upsert(&chunk).await.unwrap();
        store.delete(&chunk.chunk_id).await.unwrap();
        assert!(store.get(&chunk.chunk_id).await.unwrap().is_none());
        let results = store.full_text_search("foo", 10).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn chunk_identity_for_file_reports_hash_pairs() {
        let store = setup().await;
        let chunk = mk_chunk("a.rs", "fn foo() {}", 100);
        store.upsert(&chunk).await.unwrap();
        let identity = store.chunk_identity_for_file("a.rs").await.unwrap();
        assert_eq!(identity, vec![(chunk.chunk_id.clone(), chunk.content_hash.clone())]);
        assert!(store.chunk_identity_for_file("b.rs").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn all_file_paths_tracks_latest_last_modified() {
        let store = setup().await;
        store.upsert(&mk_chunk("a.rs", "fn a() {}", 100)).await.unwrap();
        store.upsert(&mk_chunk("a.rs", "fn a2() {}", 200)).await.unwrap();
        store.upsert(&mk_chunk("b.rs", "fn b() {}", 50)).await.unwrap();
        let paths = store.all_file_paths().await.unwrap();
        assert_eq!(paths.get("a.rs"), Some(&200));
        assert_eq!(paths.get("b.rs"), Some(&50));
    }

    #[test]
    fn bm25_normalization_maps_into_unit_interval() {
        assert_eq!(normalize_bm25(0.0), 0.0);
        assert!(normalize_bm25(10.0) - 0.5 < 1e-9);
        assert!(normalize_bm25(1000.0) < 1.0);
    }
}
