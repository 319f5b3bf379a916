//! # Context Engine
//!
//! A code-aware context engine: incremental indexing, multi-method
//! retrieval, fusion/ranking, and token-budgeted packing for AI coding
//! assistants.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────┐   ┌─────────────┐   ┌───────────┐
//! │  Indexer    │──▶│  Chunker    │──▶│  SQLite   │
//! │ walk+watch  │   │ symbol spans│   │ FTS5+Vec  │
//! └────────────┘   └─────────────┘   └────┬──────┘
//!                                         │
//!                   ┌─────────────────────┤
//!                   ▼                     ▼
//!             ┌───────────┐         ┌───────────┐
//!             │    CLI    │         │   HTTP    │
//!             │   (ctx)   │         │  (serve)  │
//!             └───────────┘         └───────────┘
//! ```
//!
//! ## Query pipeline
//!
//! A call to [`engine::Engine::query`] runs:
//!
//! ```text
//! classify intent → select strategy → retrieve (parallel) → fuse → rank → allocate budget → pack
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing and validation |
//! | [`models`] | Core data types: `Chunk`, `Candidate`, `Intent`, `ContextResult` |
//! | [`error`] | The `EngineError` boundary taxonomy |
//! | [`chunker`] | Symbol-scoped chunking of file content into spans |
//! | [`indexer`] | Workspace traversal, inclusion policy, incremental updates, file watching |
//! | [`tokenizer`] | Model-faithful token counting |
//! | [`vector_store`] | Embedding persistence and brute-force cosine search |
//! | [`metadata_store`] | Chunk persistence, FTS5 keyword search, dependency graph |
//! | [`embedding`] | Embedding provider trait, OpenAI/Ollama implementations |
//! | [`intent`] | Rule-based request-to-intent classification |
//! | [`strategy`] | Intent-to-retrieval-method weighting table |
//! | [`retrievers`] | Semantic, lexical, dependency, and recent-edits retrievers |
//! | [`fusion`] | Reciprocal rank fusion and near-duplicate collapsing |
//! | [`ranker`] | Multi-signal scoring and per-file diversity penalty |
//! | [`budget`] | Token budget allocation across fixed prompt sections |
//! | [`packer`] | Token-budgeted rendering of ranked candidates |
//! | [`engine`] | The façade tying the whole pipeline together |
//! | [`server`] | HTTP surface (Axum) with CORS |
//! | [`db`] | SQLite connection pool with WAL mode |
//! | [`migrate`] | Database schema migrations (idempotent) |
//!
//! ## Configuration
//!
//! The engine is configured via a TOML file. See [`config`] for all
//! available options and [`config::load_config`] for validation rules.

pub mod budget;
pub mod chunker;
pub mod config;
pub mod db;
pub mod embedding;
pub mod engine;
pub mod error;
pub mod fusion;
pub mod indexer;
pub mod intent;
pub mod metadata_store;
pub mod migrate;
pub mod models;
pub mod packer;
pub mod ranker;
pub mod retrievers;
pub mod server;
pub mod strategy;
pub mod tokenizer;
pub mod vector_store;
