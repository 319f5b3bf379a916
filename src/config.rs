//! Configuration loading and validation.
//!
//! Mirrors the teacher's `config.rs` shape: a top-level [`Config`] with
//! nested sub-configs, `#[serde(default = "fn")]` defaults for every
//! tunable the specification leaves open, and a [`load_config`] entry
//! point with post-load validation. Values the specification fixes as
//! constants (RRF `k`, BM25 `k_norm`, budget allocator constants,
//! diversity penalty) are never config fields — see the `const` items in
//! `fusion.rs`, `ranker.rs`, and `budget.rs`.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub workspace_root: PathBuf,
    #[serde(default)]
    pub index: IndexConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IndexConfig {
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    #[serde(default = "default_include_globs")]
    pub include_globs: Vec<String>,
    #[serde(default)]
    pub exclude_globs: Vec<String>,
}

fn default_db_path() -> PathBuf {
    PathBuf::from(".context-engine/index.sqlite")
}
fn default_worker_count() -> usize {
    4
}
fn default_debounce_ms() -> u64 {
    200
}
fn default_include_globs() -> Vec<String> {
    vec!["**/*".to_string()]
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            worker_count: default_worker_count(),
            debounce_ms: default_debounce_ms(),
            include_globs: default_include_globs(),
            exclude_globs: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddingConfig {
    #[serde(default = "default_embedding_provider")]
    pub provider: String,
    pub model: Option<String>,
    pub dims: Option<usize>,
    pub url: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

fn default_embedding_provider() -> String {
    "disabled".to_string()
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_max_retries() -> u32 {
    3
}
fn default_batch_size() -> usize {
    64
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_embedding_provider(),
            model: None,
            dims: None,
            url: None,
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
            batch_size: default_batch_size(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RetrievalConfig {
    #[serde(default = "default_model_family")]
    pub tokenizer_model_family: String,
    #[serde(default = "default_semantic_min_score")]
    pub semantic_min_score: f64,
    #[serde(default = "default_lexical_min_score")]
    pub lexical_min_score: f64,
}

fn default_model_family() -> String {
    "gpt-4".to_string()
}
fn default_semantic_min_score() -> f64 {
    0.5
}
fn default_lexical_min_score() -> f64 {
    0.1
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            tokenizer_model_family: default_model_family(),
            semantic_min_score: default_semantic_min_score(),
            lexical_min_score: default_lexical_min_score(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_bind() -> String {
    "127.0.0.1".to_string()
}
fn default_port() -> u16 {
    8420
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
        }
    }
}

/// Load and validate a [`Config`] from a TOML file.
pub fn load_config(path: &std::path::Path) -> Result<Config> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading config file {}", path.display()))?;
    let config: Config = toml::from_str(&raw).context("parsing config TOML")?;

    if !config.workspace_root.exists() {
        bail!(
            "workspace_root does not exist: {}",
            config.workspace_root.display()
        );
    }
    if config.index.worker_count == 0 {
        bail!("index.worker_count must be at least 1");
    }
    if !(0.0..=1.0).contains(&config.retrieval.semantic_min_score) {
        bail!("retrieval.semantic_min_score must be in [0,1]");
    }
    if !(0.0..=1.0).contains(&config.retrieval.lexical_min_score) {
        bail!("retrieval.lexical_min_score must be in [0,1]");
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_fill_in_missing_sections() {
        let dir = tempfile::tempdir().unwrap();
        let toml_path = dir.path().join("config.toml");
        let mut f = std::fs::File::create(&toml_path).unwrap();
        writeln!(f, "workspace_root = \"{}\"", dir.path().display()).unwrap();
        let config = load_config(&toml_path).unwrap();
        assert_eq!(config.index.worker_count, 4);
        assert_eq!(config.embedding.provider, "disabled");
    }

    #[test]
    fn rejects_missing_workspace_root() {
        let dir = tempfile::tempdir().unwrap();
        let toml_path = dir.path().join("config.toml");
        let mut f = std::fs::File::create(&toml_path).unwrap();
        writeln!(f, "workspace_root = \"/nonexistent/path/xyz\"").unwrap();
        assert!(load_config(&toml_path).is_err());
    }
}
