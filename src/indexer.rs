//! Indexer (C5): traverse the workspace, chunk files into symbol-scoped
//! spans, and keep the vector and metadata stores in sync on file change
//! (spec.md §4.5).
//!
//! Traversal and the inclusion policy's default excludes are grounded in
//! the teacher's `connector_fs.rs::scan_filesystem` (`WalkDir` + `globset`
//! include/exclude patterns, `.git`/`target`/`node_modules` always
//! excluded). File-change coalescing uses `notify` +
//! `notify-debouncer-mini`, the watcher stack the teacher itself has no
//! equivalent of — the teacher's connectors are pull/`sync`-driven, not
//! watched — so this part is enrichment from the wider retrieval pack
//! rather than a direct teacher pattern (see DESIGN.md).

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::Result;
use globset::{Glob, GlobSet, GlobSetBuilder};
use once_cell::sync::Lazy;
use regex::Regex;
use sqlx::{Row, SqlitePool};
use tokio::sync::Semaphore;
use walkdir::WalkDir;

use crate::chunker::{chunk_spans, extract_lines};
use crate::config::{Config, IndexConfig};
use crate::embedding::EmbeddingProvider;
use crate::metadata_store::MetadataStore;
use crate::models::Chunk;
use crate::vector_store::VectorStore;

const MAX_FILE_BYTES: u64 = 1024 * 1024;
const UNKNOWN_LANG_BYTE_CAP: u64 = 64 * 1024;
const BINARY_SNIFF_BYTES: usize = 8 * 1024;
const SCHEMA_VERSION: i64 = 1;

/// Kind of a file-change notification (spec.md §4.5 "Incremental update"
/// and §6 "`on_file_change(path, kind)`").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Created,
    Modified,
    Deleted,
}

/// Map a file extension to a lowercase language identifier, or `None`
/// when unrecognized (spec.md §3 "language (lowercase identifier)").
pub fn detect_language(path: &Path) -> Option<&'static str> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("rs") => Some("rust"),
        Some("py") => Some("python"),
        Some("rb") => Some("ruby"),
        Some("js" | "mjs" | "cjs") => Some("javascript"),
        Some("jsx") => Some("jsx"),
        Some("ts" | "mts" | "cts") => Some("typescript"),
        Some("tsx") => Some("tsx"),
        Some("go") => Some("go"),
        Some("java") => Some("java"),
        Some("c" | "h") => Some("c"),
        Some("cc" | "cpp" | "cxx" | "hpp" | "hh") => Some("cpp"),
        Some("cs") => Some("csharp"),
        Some("kt" | "kts") => Some("kotlin"),
        Some("scala") => Some("scala"),
        Some("swift") => Some("swift"),
        Some("php") => Some("php"),
        Some("md" | "markdown") => Some("markdown"),
        _ => None,
    }
}

/// Inclusion/exclusion classification result for one candidate path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Include,
    ExcludeGlob,
    ExcludeTooLarge,
    ExcludeBinary,
    ExcludeUnknownLanguageTooLarge,
}

fn default_excludes() -> Vec<String> {
    vec![
        "**/.git/**".to_string(),
        "**/target/**".to_string(),
        "**/node_modules/**".to_string(),
        "**/.context-engine/**".to_string(),
    ]
}

fn build_globset(patterns: &[String]) -> GlobSet {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        if let Ok(glob) = Glob::new(pattern) {
            builder.add(glob);
        }
    }
    builder.build().unwrap_or_else(|_| GlobSetBuilder::new().build().unwrap())
}

/// Null-byte-in-first-8KiB binary heuristic (spec.md §4.5 "Inclusion
/// policy").
fn looks_binary(bytes: &[u8]) -> bool {
    bytes.iter().take(BINARY_SNIFF_BYTES).any(|&b| b == 0)
}

/// Classify one candidate file against the inclusion policy. `rel_path`
/// is workspace-relative with forward slashes (spec.md §3 "forward-slash
/// normalized").
fn classify_for_indexing(
    rel_path: &str,
    size: u64,
    content_head: &[u8],
    language: Option<&str>,
    include_set: &GlobSet,
    exclude_set: &GlobSet,
) -> Classification {
    if exclude_set.is_match(rel_path) {
        return Classification::ExcludeGlob;
    }
    if !include_set.is_match(rel_path) {
        return Classification::ExcludeGlob;
    }
    if size > MAX_FILE_BYTES {
        return Classification::ExcludeTooLarge;
    }
    if looks_binary(content_head) {
        return Classification::ExcludeBinary;
    }
    if language.is_none() && size > UNKNOWN_LANG_BYTE_CAP {
        return Classification::ExcludeUnknownLanguageTooLarge;
    }
    Classification::Include
}

fn to_forward_slash(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy().to_string())
        .collect::<Vec<_>>()
        .join("/")
}

fn now_unix() -> i64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs() as i64
}

/// Identifier-call extraction: `name(` not preceded by `fn`/`def`/`class`
/// etc (a definition, not a call). Deliberately approximate — a full
/// reference resolver is out of scope; false positives only widen the
/// dependency retriever's BFS frontier, they don't break correctness.
static CALL_SIG: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b([A-Za-z_][A-Za-z0-9_]*)\s*\(").unwrap());
static IMPORT_RUST: Lazy<Regex> = Lazy::new(|| Regex::new(r"use\s+[\w:]*::([A-Za-z_][A-Za-z0-9_]*)").unwrap());
static IMPORT_PY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"from\s+[\w.]+\s+import\s+([A-Za-z_][A-Za-z0-9_]*)|import\s+([A-Za-z_][A-Za-z0-9_]*)").unwrap());
static IMPORT_JS: Lazy<Regex> = Lazy::new(|| Regex::new(r#"import\s+.*?\bfrom\s+['"]([^'"]+)['"]"#).unwrap());

const CONTROL_FLOW_KEYWORDS: &[&str] = &[
    "if", "else", "for", "while", "match", "switch", "return", "break", "continue", "fn", "def",
    "function", "class", "struct", "enum", "impl", "trait", "let", "const", "var", "new", "try",
    "catch", "finally", "async", "await", "yield", "throw", "super", "this", "self",
];

/// Symbols a chunk's content references: call targets and imported
/// names, filtered against a control-flow stopword list (spec.md §4.8
/// "Dependency" relies on `deps` rows populated here).
fn extract_dep_symbols(content: &str, language: &str) -> Vec<(String, String)> {
    let mut out = Vec::new();

    for caps in CALL_SIG.captures_iter(content) {
        let name = &caps[1];
        if CONTROL_FLOW_KEYWORDS.contains(&name) {
            continue;
        }
        out.push((name.to_string(), "call".to_string()));
    }

    match language {
        "rust" => {
            for caps in IMPORT_RUST.captures_iter(content) {
                out.push((caps[1].to_string(), "import".to_string()));
            }
        }
        "python" => {
            for caps in IMPORT_PY.captures_iter(content) {
                let name = caps.get(1).or_else(|| caps.get(2)).unwrap().as_str();
                out.push((name.to_string(), "import".to_string()));
            }
        }
        "javascript" | "typescript" | "jsx" | "tsx" => {
            for caps in IMPORT_JS.captures_iter(content) {
                out.push((caps[1].to_string(), "import".to_string()));
            }
        }
        _ => {}
    }

    out
}

/// Per-file indexing result, used by `index_file`'s caller to log diff
/// counts (spec.md §2.1 "indexer lifecycle... logged at info/debug").
#[derive(Debug, Default)]
pub struct IndexDiff {
    pub upserted: usize,
    pub deleted: usize,
}

pub struct Indexer {
    workspace_root: PathBuf,
    index_config: IndexConfig,
    metadata_store: Arc<MetadataStore>,
    vector_store: Arc<VectorStore>,
    embedding_provider: Arc<dyn EmbeddingProvider>,
    include_set: GlobSet,
    exclude_set: GlobSet,
    pool: SqlitePool,
    in_flight: Arc<AtomicUsize>,
}

impl Indexer {
    pub fn new(
        config: &Config,
        pool: SqlitePool,
        metadata_store: Arc<MetadataStore>,
        vector_store: Arc<VectorStore>,
        embedding_provider: Arc<dyn EmbeddingProvider>,
    ) -> Self {
        let mut excludes = default_excludes();
        excludes.extend(config.index.exclude_globs.clone());
        Self {
            workspace_root: config.workspace_root.clone(),
            index_config: config.index.clone(),
            metadata_store,
            vector_store,
            embedding_provider,
            include_set: build_globset(&config.index.include_globs),
            exclude_set: build_globset(&excludes),
            pool,
            in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Number of files currently being processed by `index_file` (exposed
    /// for `/health`-style diagnostics).
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(AtomicOrdering::Relaxed)
    }

    async fn read_header_async(&self) -> Result<Option<IndexHeader>> {
        let row = sqlx::query(
            "SELECT schema_version, tokenizer_family, embedding_model, embedding_dims, workspace_root_hash \
             FROM index_header WHERE id = 0",
        )
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|r| IndexHeader {
            schema_version: r.get("schema_version"),
            tokenizer_family: r.get("tokenizer_family"),
            embedding_model: r.get("embedding_model"),
            embedding_dims: r.get("embedding_dims"),
            workspace_root_hash: r.get("workspace_root_hash"),
        }))
    }

    async fn write_header(&self, header: &IndexHeader) -> Result<()> {
        sqlx::query(
            "INSERT INTO index_header (id, schema_version, tokenizer_family, embedding_model, embedding_dims, workspace_root_hash) \
             VALUES (0, ?, ?, ?, ?, ?) \
             ON CONFLICT(id) DO UPDATE SET \
                schema_version = excluded.schema_version, \
                tokenizer_family = excluded.tokenizer_family, \
                embedding_model = excluded.embedding_model, \
                embedding_dims = excluded.embedding_dims, \
                workspace_root_hash = excluded.workspace_root_hash",
        )
        .bind(header.schema_version)
        .bind(&header.tokenizer_family)
        .bind(&header.embedding_model)
        .bind(header.embedding_dims)
        .bind(&header.workspace_root_hash)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn clear_index(&self) -> Result<()> {
        sqlx::query("DELETE FROM chunks").execute(&self.pool).await?;
        sqlx::query("DELETE FROM chunks_fts").execute(&self.pool).await?;
        sqlx::query("DELETE FROM deps").execute(&self.pool).await?;
        sqlx::query("DELETE FROM embeddings").execute(&self.pool).await?;
        Ok(())
    }

    fn workspace_root_hash(&self) -> String {
        Chunk::content_hash_of(&self.workspace_root.display().to_string())
    }

    /// Startup reconciliation (spec.md §4.5 "Startup"): compare the
    /// stored index header against the current tokenizer/embedding
    /// identity and schema version. On any mismatch, drop the index and
    /// do a full reindex; otherwise replay missed changes by diffing the
    /// filesystem's mtimes against what's indexed.
    pub async fn startup(&self, tokenizer_family: &str) -> Result<()> {
        let identity = self.embedding_provider.identity();
        let current = IndexHeader {
            schema_version: SCHEMA_VERSION,
            tokenizer_family: tokenizer_family.to_string(),
            embedding_model: Some(identity.model.clone()),
            embedding_dims: Some(identity.dimension as i64),
            workspace_root_hash: self.workspace_root_hash(),
        };

        let stale = match self.read_header_async().await? {
            Some(existing) => {
                existing.schema_version != current.schema_version
                    || existing.tokenizer_family != current.tokenizer_family
                    || existing.embedding_model != current.embedding_model
                    || existing.embedding_dims != current.embedding_dims
                    || existing.workspace_root_hash != current.workspace_root_hash
            }
            None => true,
        };

        if stale {
            tracing::info!("index header stale or absent, dropping index for a full reindex");
            self.clear_index().await?;
            self.write_header(&current).await?;
            self.full_reindex().await?;
        } else {
            tracing::info!("index header matches, reconciling against filesystem state");
            self.reconcile().await?;
        }

        Ok(())
    }

    /// Walk the workspace and index every included file, bounded by
    /// `index.worker_count` concurrent workers (spec.md §4.5
    /// "Concurrency").
    pub async fn full_reindex(&self) -> Result<()> {
        let files = self.walk_included_files();
        tracing::info!(count = files.len(), "full reindex: walking workspace");
        self.index_files_bounded(files).await
    }

    /// Diff indexed file paths against the filesystem's current mtimes;
    /// re-index anything whose mtime is newer than what's stored, and
    /// remove chunks for files that no longer exist (spec.md §4.5
    /// "Startup... replay missed changes").
    pub async fn reconcile(&self) -> Result<()> {
        let indexed = self.metadata_store.all_file_paths().await?;
        let on_disk: HashMap<String, i64> = self
            .walk_included_files()
            .into_iter()
            .filter_map(|abs| {
                let rel = to_forward_slash(abs.strip_prefix(&self.workspace_root).ok()?);
                let mtime = std::fs::metadata(&abs).ok()?.modified().ok()?;
                let secs = mtime.duration_since(UNIX_EPOCH).unwrap_or_default().as_secs() as i64;
                Some((rel, secs))
            })
            .collect();

        let mut to_reindex = Vec::new();
        for (path, mtime) in &on_disk {
            match indexed.get(path) {
                Some(&stored) if stored >= *mtime => {}
                _ => to_reindex.push(self.workspace_root.join(path)),
            }
        }
        for path in indexed.keys() {
            if !on_disk.contains_key(path) {
                self.remove_file(path).await?;
            }
        }

        tracing::info!(count = to_reindex.len(), "reconcile: replaying missed changes");
        self.index_files_bounded(to_reindex).await
    }

    fn walk_included_files(&self) -> Vec<PathBuf> {
        let mut files = Vec::new();
        for entry in WalkDir::new(&self.workspace_root).follow_links(false) {
            let entry = match entry {
                Ok(e) => e,
                Err(_) => continue,
            };
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            let rel = match path.strip_prefix(&self.workspace_root) {
                Ok(r) => to_forward_slash(r),
                Err(_) => continue,
            };
            let size = std::fs::metadata(path).map(|m| m.len()).unwrap_or(0);
            let head = read_head(path, BINARY_SNIFF_BYTES);
            let language = detect_language(path);
            let classification =
                classify_for_indexing(&rel, size, &head, language, &self.include_set, &self.exclude_set);
            if classification == Classification::Include {
                files.push(path.to_path_buf());
            }
        }
        files.sort();
        files
    }

    async fn index_files_bounded(&self, files: Vec<PathBuf>) -> Result<()> {
        let semaphore = Arc::new(Semaphore::new(self.index_config.worker_count.max(1)));
        let mut handles = Vec::with_capacity(files.len());

        for path in files {
            let permit = semaphore.clone().acquire_owned().await?;
            let workspace_root = self.workspace_root.clone();
            let rel = to_forward_slash(path.strip_prefix(&workspace_root).unwrap_or(&path));
            let metadata_store = self.metadata_store.clone();
            let vector_store = self.vector_store.clone();
            let embedding_provider = self.embedding_provider.clone();
            let pool = self.pool.clone();
            let in_flight = self.in_flight.clone();

            in_flight.fetch_add(1, AtomicOrdering::Relaxed);
            handles.push(tokio::spawn(async move {
                let _permit = permit;
                let result =
                    index_one_file(&pool, &metadata_store, &vector_store, embedding_provider.as_ref(), &path, &rel)
                        .await;
                in_flight.fetch_sub(1, AtomicOrdering::Relaxed);
                if let Err(e) = &result {
                    tracing::warn!(file = %rel, error = %e, "indexing file failed");
                }
                result
            }));
        }

        for handle in handles {
            let _ = handle.await;
        }
        Ok(())
    }

    /// Index (or re-index) a single file by absolute path, diffing
    /// against existing chunks by `content_hash` (spec.md §4.5
    /// "Incremental update").
    pub async fn index_file(&self, abs_path: &Path) -> Result<IndexDiff> {
        let rel = to_forward_slash(abs_path.strip_prefix(&self.workspace_root).unwrap_or(abs_path));
        index_one_file(&self.pool, &self.metadata_store, &self.vector_store, self.embedding_provider.as_ref(), abs_path, &rel)
            .await
    }

    /// Remove every chunk belonging to `rel_path` (file-delete event,
    /// spec.md §4.5 "A file delete triggers deletion of all chunks whose
    /// `file_path` matches").
    pub async fn remove_file(&self, rel_path: &str) -> Result<()> {
        let removed = self.metadata_store.delete_by_file(rel_path).await?;
        for chunk_id in removed {
            self.vector_store.delete(&chunk_id).await?;
        }
        Ok(())
    }

    /// Debounced file-watcher entry point (spec.md §4.5 "coalesce within
    /// a debounce window of 200 ms per file"). Watches `workspace_root`
    /// and dispatches coalesced changes to `on_file_change`.
    pub async fn watch(self: Arc<Self>) -> Result<()> {
        use notify_debouncer_mini::{new_debouncer, DebounceEventResult};

        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let debounce = std::time::Duration::from_millis(self.index_config.debounce_ms);

        let mut debouncer = new_debouncer(debounce, move |result: DebounceEventResult| {
            if let Ok(events) = result {
                let _ = tx.send(events);
            }
        })?;
        debouncer
            .watcher()
            .watch(&self.workspace_root, notify::RecursiveMode::Recursive)?;

        while let Some(events) = rx.recv().await {
            for event in events {
                let rel = to_forward_slash(event.path.strip_prefix(&self.workspace_root).unwrap_or(&event.path));
                let kind = if event.path.exists() { ChangeKind::Modified } else { ChangeKind::Deleted };
                if let Err(e) = self.on_file_change(&event.path, &rel, kind).await {
                    tracing::warn!(file = %rel, error = %e, "on_file_change failed");
                }
            }
        }

        // `debouncer` must outlive the receive loop; dropping it here (at
        // function end) stops the underlying OS watch.
        drop(debouncer);
        Ok(())
    }

    /// Handle one coalesced file-change notification (spec.md §6
    /// "`on_file_change(path, kind)`").
    pub async fn on_file_change(&self, abs_path: &Path, rel_path: &str, kind: ChangeKind) -> Result<IndexDiff> {
        match kind {
            ChangeKind::Deleted => {
                self.remove_file(rel_path).await?;
                Ok(IndexDiff { upserted: 0, deleted: 1 })
            }
            ChangeKind::Created | ChangeKind::Modified => self.index_file(abs_path).await,
        }
    }
}

struct IndexHeader {
    schema_version: i64,
    tokenizer_family: String,
    embedding_model: Option<String>,
    embedding_dims: Option<i64>,
    workspace_root_hash: String,
}

fn read_head(path: &Path, n: usize) -> Vec<u8> {
    use std::io::Read;
    let mut buf = vec![0u8; n];
    match std::fs::File::open(path) {
        Ok(mut f) => {
            let read = f.read(&mut buf).unwrap_or(0);
            buf.truncate(read);
            buf
        }
        Err(_) => Vec::new(),
    }
}

/// Free function so it can run inside a spawned task without borrowing
/// `&Indexer` across an await boundary.
async fn index_one_file(
    pool: &SqlitePool,
    metadata_store: &Arc<MetadataStore>,
    vector_store: &Arc<VectorStore>,
    embedding_provider: &dyn EmbeddingProvider,
    abs_path: &Path,
    rel_path: &str,
) -> Result<IndexDiff> {
    let content = match std::fs::read_to_string(abs_path) {
        Ok(c) => c,
        Err(e) => {
            tracing::warn!(file = %rel_path, error = %e, "skipping unreadable file");
            return Ok(IndexDiff::default());
        }
    };
    if content.is_empty() {
        return Ok(IndexDiff::default());
    }

    let language = detect_language(abs_path).unwrap_or("text");
    let mtime = now_unix();
    let spans = chunk_spans(&content, language);

    let mut fresh_chunks = Vec::with_capacity(spans.len());
    for span in spans {
        let text = extract_lines(&content, span.line_range);
        if text.trim().is_empty() {
            continue;
        }
        fresh_chunks.push(Chunk::new(
            rel_path.to_string(),
            text,
            Some(span.line_range),
            language.to_string(),
            span.symbol_name,
            span.symbol_type,
            mtime,
        ));
    }

    let existing = metadata_store.chunk_identity_for_file(rel_path).await?;
    let existing_ids: HashMap<String, String> = existing.into_iter().collect();
    let fresh_ids: std::collections::HashSet<&str> =
        fresh_chunks.iter().map(|c| c.chunk_id.as_str()).collect();

    let mut diff = IndexDiff::default();

    for (chunk_id, _) in existing_ids.iter() {
        if !fresh_ids.contains(chunk_id.as_str()) {
            metadata_store.delete(chunk_id).await?;
            vector_store.delete(chunk_id).await?;
            sqlx::query("DELETE FROM deps WHERE src_chunk_id = ?").bind(chunk_id).execute(pool).await?;
            diff.deleted += 1;
        }
    }

    for chunk in &fresh_chunks {
        if existing_ids.contains_key(&chunk.chunk_id) {
            continue;
        }
        metadata_store.upsert(chunk).await?;
        diff.upserted += 1;

        if let Ok(vector) = embedding_provider.embed(&chunk.content).await {
            let _ = vector_store.upsert(&chunk.chunk_id, &vector).await;
        }

        sqlx::query("DELETE FROM deps WHERE src_chunk_id = ?").bind(&chunk.chunk_id).execute(pool).await?;
        for (symbol, kind) in extract_dep_symbols(&chunk.content, language) {
            metadata_store.add_dep(&chunk.chunk_id, &symbol, &kind).await?;
        }
    }

    Ok(diff)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_known_languages() {
        assert_eq!(detect_language(Path::new("a.rs")), Some("rust"));
        assert_eq!(detect_language(Path::new("a.py")), Some("python"));
        assert_eq!(detect_language(Path::new("a.unknown")), None);
    }

    #[test]
    fn classify_rejects_oversized_file() {
        let include = build_globset(&["**/*".to_string()]);
        let exclude = build_globset(&default_excludes());
        let result = classify_for_indexing("a.rs", MAX_FILE_BYTES + 1, b"fn main() {}", Some("rust"), &include, &exclude);
        assert_eq!(result, Classification::ExcludeTooLarge);
    }

    #[test]
    fn classify_rejects_binary_heuristic() {
        let include = build_globset(&["**/*".to_string()]);
        let exclude = build_globset(&default_excludes());
        let content = b"abc\0def";
        let result = classify_for_indexing("a.bin", content.len() as u64, content, None, &include, &exclude);
        assert_eq!(result, Classification::ExcludeBinary);
    }

    #[test]
    fn classify_rejects_unknown_language_over_cap() {
        let include = build_globset(&["**/*".to_string()]);
        let exclude = build_globset(&default_excludes());
        let result = classify_for_indexing("a.xyz", UNKNOWN_LANG_BYTE_CAP + 1, b"text", None, &include, &exclude);
        assert_eq!(result, Classification::ExcludeUnknownLanguageTooLarge);
    }

    #[test]
    fn classify_excludes_vendored_directories() {
        let include = build_globset(&["**/*".to_string()]);
        let exclude = build_globset(&default_excludes());
        let result = classify_for_indexing("node_modules/pkg/index.js", 10, b"x", Some("javascript"), &include, &exclude);
        assert_eq!(result, Classification::ExcludeGlob);
    }

    #[test]
    fn classify_includes_ordinary_source_file() {
        let include = build_globset(&["**/*".to_string()]);
        let exclude = build_globset(&default_excludes());
        let result = classify_for_indexing("src/main.rs", 10, b"fn main() {}", Some("rust"), &include, &exclude);
        assert_eq!(result, Classification::Include);
    }

    #[test]
    fn extract_dep_symbols_finds_calls_and_rust_imports() {
        let content = "use std::collections::HashMap;\nfn foo() { bar(); if baz() { qux(); } }";
        let deps = extract_dep_symbols(content, "rust");
        let names: Vec<&str> = deps.iter().map(|(n, _)| n.as_str()).collect();
        assert!(names.contains(&"bar"));
        assert!(names.contains(&"qux"));
        assert!(names.contains(&"HashMap"));
        assert!(!names.contains(&"if"));
        assert!(!names.contains(&"fn"));
    }

    #[test]
    fn extract_dep_symbols_finds_python_imports() {
        let content = "from foo.bar import Baz\nimport os\n";
        let deps = extract_dep_symbols(content, "python");
        let names: Vec<&str> = deps.iter().map(|(n, _)| n.as_str()).collect();
        assert!(names.contains(&"Baz"));
        assert!(names.contains(&"os"));
    }
}
