//! Core data model: [`Chunk`], [`Candidate`], [`Intent`], [`ContextItem`],
//! [`ContextResult`], and the closed enumerations they depend on.
//!
//! Closed enumerations replace the source's string-typed intent/method
//! tags (spec.md §9 design note: "Intent and method names become closed
//! enumerations, not string-typed").

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Inclusive, 1-based line range. Absent (`None`) only for whole-file chunks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineRange {
    pub start: u32,
    pub end: u32,
}

/// One of the closed set of symbol kinds a chunk may represent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SymbolType {
    File,
    Module,
    Class,
    Function,
    Method,
    Interface,
    Type,
    Constant,
    Block,
}

/// The atomic unit of indexed code (spec.md §3 "Chunk").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub chunk_id: String,
    pub file_path: String,
    pub content: String,
    pub line_range: Option<LineRange>,
    pub language: String,
    pub symbol_name: Option<String>,
    pub symbol_type: Option<SymbolType>,
    /// Monotonic timestamp, seconds since epoch. Recency math elsewhere
    /// (ranker.rs, retrievers/recent.rs) assumes this unit.
    pub last_modified: i64,
    pub content_hash: String,
}

impl Chunk {
    /// Compute `chunk_id` per invariant 1: hash of
    /// `(file_path, line_range, content_hash)`.
    pub fn compute_id(file_path: &str, line_range: Option<LineRange>, content_hash: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(file_path.as_bytes());
        match line_range {
            Some(r) => {
                hasher.update(r.start.to_le_bytes());
                hasher.update(r.end.to_le_bytes());
            }
            None => hasher.update([0xffu8; 8]),
        }
        hasher.update(content_hash.as_bytes());
        hex::encode(hasher.finalize())
    }

    pub fn content_hash_of(content: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(content.as_bytes());
        hex::encode(hasher.finalize())
    }

    pub fn new(
        file_path: String,
        content: String,
        line_range: Option<LineRange>,
        language: String,
        symbol_name: Option<String>,
        symbol_type: Option<SymbolType>,
        last_modified: i64,
    ) -> Self {
        let content_hash = Self::content_hash_of(&content);
        let chunk_id = Self::compute_id(&file_path, line_range, &content_hash);
        Self {
            chunk_id,
            file_path,
            content,
            line_range,
            language,
            symbol_name,
            symbol_type,
            last_modified,
            content_hash,
        }
    }

    /// "Test file" per ranker §4.10: path contains `.test.`, `.spec.`, or a
    /// `__tests__` path segment.
    pub fn is_test_file(&self) -> bool {
        self.file_path.contains(".test.")
            || self.file_path.contains(".spec.")
            || self
                .file_path
                .split('/')
                .any(|seg| seg == "__tests__")
    }
}

/// Retrieval method tag (spec.md §3 "Candidate.method").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Method {
    Semantic,
    Lexical,
    Dependency,
    RecentEdits,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Semantic => "semantic",
            Method::Lexical => "lexical",
            Method::Dependency => "dependency",
            Method::RecentEdits => "recent_edits",
        }
    }
}

/// A chunk plus a retrieval annotation (spec.md §3 "Candidate").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    pub chunk: Chunk,
    /// Normalized score in `[0,1]`.
    pub score: f64,
    pub method: Method,
    /// Method-native, unnormalized score.
    pub raw_score: f64,
    pub matched_terms: Option<Vec<String>>,
    pub dep_depth: Option<u32>,
}

/// Fixed set of task categories inferred from a user request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    Explain,
    BugFix,
    Refactor,
    Generate,
    Test,
}

impl Intent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::Explain => "explain",
            Intent::BugFix => "bug_fix",
            Intent::Refactor => "refactor",
            Intent::Generate => "generate",
            Intent::Test => "test",
        }
    }

    pub const ALL: [Intent; 5] = [
        Intent::Explain,
        Intent::BugFix,
        Intent::Refactor,
        Intent::Generate,
        Intent::Test,
    ];
}

/// The packed output unit (spec.md §3 "ContextItem").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextItem {
    pub name: String,
    pub description: String,
    pub content: String,
}

/// Token allocation across the five fixed prompt sections (spec.md §9:
/// "use a record with five fields, not a hash map").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BudgetAllocation {
    pub system: u32,
    pub context: u32,
    pub task: u32,
    pub input: u32,
    pub output: u32,
}

/// The engine's output for one `query` call (spec.md §3 "ContextResult").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextResult {
    pub items: Vec<ContextItem>,
    pub intent: Intent,
    pub tokens_used: u32,
    pub retrieval_methods: Vec<Method>,
    /// True when the tokenizer fell back to the byte-length estimator
    /// (spec.md §9 Open Questions: "acceptable only as a fallback with an
    /// explicit degradation flag").
    pub degraded_tokenizer: bool,
}

impl ContextResult {
    pub fn empty(intent: Intent) -> Self {
        Self {
            items: Vec::new(),
            intent,
            tokens_used: 0,
            retrieval_methods: Vec::new(),
            degraded_tokenizer: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_id_depends_on_all_three_fields() {
        let a = Chunk::compute_id("a.rs", Some(LineRange { start: 1, end: 2 }), "hash1");
        let b = Chunk::compute_id("a.rs", Some(LineRange { start: 1, end: 2 }), "hash2");
        let c = Chunk::compute_id("b.rs", Some(LineRange { start: 1, end: 2 }), "hash1");
        assert_ne!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn chunk_id_stable_for_identical_inputs() {
        let a = Chunk::compute_id("a.rs", Some(LineRange { start: 1, end: 2 }), "hash1");
        let b = Chunk::compute_id("a.rs", Some(LineRange { start: 1, end: 2 }), "hash1");
        assert_eq!(a, b);
    }

    #[test]
    fn test_file_detection() {
        let mk = |p: &str| Chunk::new(p.to_string(), "x".into(), None, "rust".into(), None, None, 0);
        assert!(mk("src/foo.test.rs").is_test_file());
        assert!(mk("src/foo.spec.ts").is_test_file());
        assert!(mk("src/__tests__/foo.rs").is_test_file());
        assert!(!mk("src/foo.rs").is_test_file());
    }
}
