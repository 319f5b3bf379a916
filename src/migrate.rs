//! Schema migrations.
//!
//! Grounded in the teacher's `migrate.rs`: idempotent `CREATE TABLE IF
//! NOT EXISTS` statements plus an explicit existence check for the FTS5
//! virtual table (FTS5 `CREATE VIRTUAL TABLE IF NOT EXISTS` is not
//! portable across SQLite builds the same way regular tables are).
//!
//! Table layout follows spec.md §6 "Store layout on disk": `chunks`,
//! `chunks_fts`, `deps`, plus an `embeddings` table for the vector store
//! (C2) and an `index_header` table for the startup staleness check
//! (C4/C5 "Startup").

use anyhow::Result;
use sqlx::SqlitePool;

pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS chunks (
            chunk_id TEXT PRIMARY KEY,
            file_path TEXT NOT NULL,
            content TEXT NOT NULL,
            line_start INTEGER,
            line_end INTEGER,
            language TEXT NOT NULL,
            symbol_name TEXT,
            symbol_type TEXT,
            last_modified INTEGER NOT NULL,
            content_hash TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_chunks_file_path ON chunks(file_path)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_chunks_last_modified ON chunks(last_modified)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_chunks_symbol_name ON chunks(symbol_name)")
        .execute(pool)
        .await?;

    let fts_exists: Option<(String,)> =
        sqlx::query_as("SELECT name FROM sqlite_master WHERE type='table' AND name='chunks_fts'")
            .fetch_optional(pool)
            .await?;
    if fts_exists.is_none() {
        sqlx::query(
            "CREATE VIRTUAL TABLE chunks_fts USING fts5(chunk_id UNINDEXED, tokens)",
        )
        .execute(pool)
        .await?;
    }

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS deps (
            src_chunk_id TEXT NOT NULL,
            dst_symbol_name TEXT NOT NULL,
            kind TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_deps_dst_symbol ON deps(dst_symbol_name)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_deps_src_chunk ON deps(src_chunk_id)")
        .execute(pool)
        .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS embeddings (
            chunk_id TEXT PRIMARY KEY,
            vector_blob BLOB NOT NULL,
            dims INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS index_header (
            id INTEGER PRIMARY KEY CHECK (id = 0),
            schema_version INTEGER NOT NULL,
            tokenizer_family TEXT NOT NULL,
            embedding_model TEXT,
            embedding_dims INTEGER,
            workspace_root_hash TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
