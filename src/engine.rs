//! Engine façade (C13): orchestrate the full query pipeline and own the
//! indexer lifecycle (spec.md §4.13, §6 "Engine API").
//!
//! `query` runs the pipeline in the order of spec.md §2:
//! `classify -> strategy -> retrieve (parallel) -> fuse -> rank -> allocate -> pack`.
//! The boundary error taxonomy is [`EngineError`]; everything upstream of
//! it uses `anyhow::Result`, matching the teacher's `server.rs::AppError`
//! pattern of a narrow typed boundary over pervasive internal `anyhow`.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use anyhow::Context as _;
use futures::future::join_all;

use crate::budget;
use crate::chunker;
use crate::config::Config;
use crate::db;
use crate::embedding::{self, EmbeddingProvider};
use crate::error::EngineError;
use crate::fusion;
use crate::indexer::{ChangeKind, Indexer};
use crate::intent;
use crate::metadata_store::MetadataStore;
use crate::models::{Candidate, ContextResult, Intent, Method};
use crate::packer;
use crate::ranker;
use crate::retrievers::dependency::DependencyRetriever;
use crate::retrievers::lexical::LexicalRetriever;
use crate::retrievers::recent::RecentEditsRetriever;
use crate::retrievers::semantic::SemanticRetriever;
use crate::retrievers::{RetrieveRequest, Retriever};
use crate::strategy;
use crate::tokenizer::Tokenizer;
use crate::vector_store::VectorStore;

// Silence the unused-import warning on a file kept for signature parity
// while the indexer is wired through Engine::new.
#[allow(unused_imports)]
use chunker as _chunker_reexport;

/// A single-shot cooperative cancellation flag (spec.md §5 "Cancellation").
/// `tokio-util::CancellationToken` would be a heavier dependency for the
/// same contract the pipeline actually needs: one bit, checked between
/// stages.
#[derive(Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    pub fn cancel(&self) {
        self.0.store(true, AtomicOrdering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(AtomicOrdering::SeqCst)
    }
}

/// Request to [`Engine::query`] (spec.md §6 "Engine API").
#[derive(Debug, Clone)]
pub struct QueryRequest {
    pub input: String,
    pub intent: Option<Intent>,
    pub token_budget: u32,
    pub active_file: Option<String>,
    pub selection: Option<(u32, u32)>,
    pub deadline: Option<Duration>,
}

impl QueryRequest {
    pub fn new(input: impl Into<String>, token_budget: u32) -> Self {
        Self {
            input: input.into(),
            intent: None,
            token_budget,
            active_file: None,
            selection: None,
            deadline: None,
        }
    }
}

fn now_unix() -> i64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs() as i64
}

/// The Context Engine façade (spec.md §4.13). Owns the stores, the
/// indexer, and the tokenizer; exposes `initialize`/`query`/`dispose`.
pub struct Engine {
    config: Config,
    initialized: AtomicBool,
    metadata_store: Arc<MetadataStore>,
    vector_store: Arc<VectorStore>,
    embedding_provider: Arc<dyn EmbeddingProvider>,
    indexer: Arc<Indexer>,
    tokenizer: Tokenizer,
}

impl Engine {
    /// Open the stores and construct the pipeline components. Does not
    /// walk the workspace yet — that happens in [`Engine::initialize`].
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let pool = db::connect(&config.index.db_path)
            .await
            .context("opening index database")?;
        crate::migrate::run_migrations(&pool).await.context("running schema migrations")?;

        let metadata_store = Arc::new(MetadataStore::new(pool.clone()));
        let vector_store = Arc::new(VectorStore::new(pool.clone()));
        let embedding_provider: Arc<dyn EmbeddingProvider> =
            Arc::from(embedding::create_provider(&config.embedding).context("constructing embedding provider")?);
        let tokenizer = Tokenizer::new(&config.retrieval.tokenizer_model_family);

        let indexer = Arc::new(Indexer::new(
            &config,
            pool,
            metadata_store.clone(),
            vector_store.clone(),
            embedding_provider.clone(),
        ));

        Ok(Self {
            config,
            initialized: AtomicBool::new(false),
            metadata_store,
            vector_store,
            embedding_provider,
            indexer,
            tokenizer,
        })
    }

    /// Idempotent: bring the indexer online (spec.md §4.13
    /// "`initialize()` -> idempotent; brings indexer online and opens
    /// stores"). Runs the startup staleness check, then spawns the
    /// background file watcher.
    pub async fn initialize(&self) -> Result<(), EngineError> {
        if self.initialized.swap(true, AtomicOrdering::SeqCst) {
            return Ok(());
        }

        self.indexer
            .startup(self.tokenizer.model_family())
            .await
            .map_err(|e| EngineError::IndexUnavailable(e.to_string()))?;

        let watcher = self.indexer.clone();
        tokio::spawn(async move {
            if let Err(e) = watcher.watch().await {
                tracing::warn!(error = %e, "file watcher exited");
            }
        });

        Ok(())
    }

    /// Idempotent: flush and close (spec.md §4.13). The underlying sqlx
    /// pool closes its connections on drop; this is a no-op placeholder
    /// for symmetry with `initialize`, matching the spec's lifecycle
    /// contract rather than any actual resource this engine needs to
    /// flush explicitly.
    pub async fn dispose(&self) -> Result<(), EngineError> {
        self.initialized.store(false, AtomicOrdering::SeqCst);
        Ok(())
    }

    /// Notification hook for an out-of-band file change (spec.md §6
    /// "`on_file_change(path, kind)`").
    pub async fn on_file_change(&self, path: &Path, kind: ChangeKind) -> Result<(), EngineError> {
        let rel = path
            .strip_prefix(&self.config.workspace_root)
            .unwrap_or(path)
            .to_string_lossy()
            .replace('\\', "/");
        self.indexer
            .on_file_change(path, &rel, kind)
            .await
            .map(|_| ())
            .map_err(|e| EngineError::IndexUnavailable(e.to_string()))
    }

    /// Run the full query pipeline (spec.md §4.13, §2 control flow).
    pub async fn query(&self, request: QueryRequest) -> Result<ContextResult, EngineError> {
        if !self.initialized.load(AtomicOrdering::SeqCst) {
            return Err(EngineError::NotInitialized);
        }
        if request.token_budget == 0 {
            return Err(EngineError::InvalidBudget("token_budget must be > 0".into()));
        }

        let cancel = CancelToken::new();
        let start = Instant::now();

        let (intent, _confidence) = match request.intent {
            Some(i) => (i, 1.0),
            None => intent::classify(&request.input),
        };
        tracing::debug!(intent = intent.as_str(), "classify");

        if cancel.is_cancelled() {
            return Err(EngineError::Cancelled);
        }
        if let Some(deadline) = request.deadline {
            if start.elapsed() > deadline {
                return Err(EngineError::DeadlineExceeded);
            }
        }

        let strategy = strategy::strategy_for(intent);
        tracing::debug!(methods = ?strategy.methods, "strategy");

        let now = now_unix();
        let per_method = self.retrieve_all(&request, intent, &strategy, now).await;

        if let Some(deadline) = request.deadline {
            if start.elapsed() > deadline && per_method.iter().all(|(_, _, c)| c.is_empty()) {
                return Err(EngineError::DeadlineExceeded);
            }
        }

        let retrieval_methods: Vec<Method> =
            per_method.iter().filter(|(_, _, c)| !c.is_empty()).map(|(m, _, _)| *m).collect();

        let fused = fusion::fuse(&per_method);
        tracing::debug!(count = fused.len(), "fuse");

        if fused.is_empty() {
            let mut result = ContextResult::empty(intent);
            result.retrieval_methods = retrieval_methods;
            result.degraded_tokenizer = self.tokenizer.degraded();
            return Ok(result);
        }

        let ranked = ranker::rank(fused, intent, now);
        tracing::debug!(count = ranked.len(), "rank");

        let input_tokens = self.tokenizer.count(&request.input);
        let allocation = budget::allocate(request.token_budget, input_tokens, intent)?;
        tracing::debug!(?allocation, "allocate");

        let (items, tokens_used) = packer::pack(&ranked, allocation.context, &self.tokenizer)?;
        tracing::debug!(tokens_used, "pack");

        Ok(ContextResult {
            items,
            intent,
            tokens_used,
            retrieval_methods,
            degraded_tokenizer: self.tokenizer.degraded(),
        })
    }

    /// Dispatch the strategy's active retrievers concurrently (spec.md §5
    /// "the engine façade dispatches the four retrievers concurrently for
    /// a single query"). Each method gets its own [`RetrieveRequest`] so
    /// the config-driven `semantic_min_score`/`lexical_min_score`
    /// thresholds can differ per method; a single shared request struct
    /// has only one `min_score` slot, which can't hold two distinct
    /// per-method values at once.
    async fn retrieve_all(
        &self,
        request: &QueryRequest,
        intent: Intent,
        strategy: &strategy::Strategy,
        now: i64,
    ) -> Vec<(Method, f64, Vec<Candidate>)> {
        let limit = 50u32;

        let mut futures: Vec<std::pin::Pin<Box<dyn std::future::Future<Output = (Method, f64, Vec<Candidate>)> + Send>>> =
            Vec::new();

        for (method, weight) in &strategy.methods {
            let method = *method;
            let weight = *weight;
            let req = self.build_request(request, intent, method, limit);

            let fut: std::pin::Pin<Box<dyn std::future::Future<Output = (Method, f64, Vec<Candidate>)> + Send>> =
                match method {
                    Method::Semantic => {
                        let retriever =
                            SemanticRetriever::new(self.vector_store.clone(), self.metadata_store.clone(), self.embedding_provider.clone());
                        Box::pin(async move {
                            let candidates = retriever.retrieve(&req).await;
                            (method, weight, candidates)
                        })
                    }
                    Method::Lexical => {
                        let retriever = LexicalRetriever::new(self.metadata_store.clone());
                        Box::pin(async move {
                            let candidates = retriever.retrieve(&req).await;
                            (method, weight, candidates)
                        })
                    }
                    Method::Dependency => {
                        let retriever = DependencyRetriever::new(self.metadata_store.clone());
                        Box::pin(async move {
                            let candidates = retriever.retrieve(&req).await;
                            (method, weight, candidates)
                        })
                    }
                    Method::RecentEdits => {
                        let retriever = RecentEditsRetriever::new(self.metadata_store.clone(), now);
                        Box::pin(async move {
                            let candidates = retriever.retrieve(&req).await;
                            (method, weight, candidates)
                        })
                    }
                };
            futures.push(fut);
        }

        join_all(futures).await
    }

    fn build_request(&self, request: &QueryRequest, intent: Intent, method: Method, limit: u32) -> RetrieveRequest {
        let min_score = match method {
            Method::Semantic => Some(self.config.retrieval.semantic_min_score),
            Method::Lexical => Some(self.config.retrieval.lexical_min_score),
            _ => None,
        };
        RetrieveRequest {
            text: request.input.clone(),
            limit,
            min_score,
            file_patterns: request.active_file.clone().map(|f| vec![f]),
            languages: None,
            intent,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{EmbeddingConfig, IndexConfig, RetrievalConfig, ServerConfig};

    async fn test_engine(workspace_root: &Path) -> Engine {
        let config = Config {
            workspace_root: workspace_root.to_path_buf(),
            index: IndexConfig {
                db_path: workspace_root.join("index.sqlite"),
                ..IndexConfig::default()
            },
            embedding: EmbeddingConfig::default(),
            retrieval: RetrievalConfig::default(),
            server: ServerConfig::default(),
        };
        Engine::new(config).await.unwrap()
    }

    #[tokio::test]
    async fn query_before_initialize_is_not_initialized() {
        let dir = tempfile::tempdir().unwrap();
        let engine = test_engine(dir.path()).await;
        let result = engine.query(QueryRequest::new("explain this", 1000)).await;
        assert!(matches!(result, Err(EngineError::NotInitialized)));
    }

    #[tokio::test]
    async fn zero_budget_is_invalid_even_before_initialize_check() {
        let dir = tempfile::tempdir().unwrap();
        let engine = test_engine(dir.path()).await;
        engine.initialize().await.unwrap();
        let result = engine.query(QueryRequest::new("explain this", 0)).await;
        assert!(matches!(result, Err(EngineError::InvalidBudget(_))));
    }

    #[tokio::test]
    async fn empty_workspace_yields_empty_result_without_error() {
        let dir = tempfile::tempdir().unwrap();
        let engine = test_engine(dir.path()).await;
        engine.initialize().await.unwrap();
        let result = engine.query(QueryRequest::new("explain the login flow", 2000)).await.unwrap();
        assert!(result.items.is_empty());
        assert_eq!(result.tokens_used, 0);
    }

    #[tokio::test]
    async fn indexed_file_is_retrievable_by_lexical_match() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("login.rs"), "fn handleLogin() {\n    validate();\n}\n").unwrap();
        let engine = test_engine(dir.path()).await;
        engine.initialize().await.unwrap();
        let result = engine
            .query(QueryRequest::new("why does handleLogin fail", 2000))
            .await
            .unwrap();
        assert!(!result.items.is_empty(), "expected the indexed function to surface");
    }

    #[tokio::test]
    async fn initialize_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let engine = test_engine(dir.path()).await;
        engine.initialize().await.unwrap();
        engine.initialize().await.unwrap();
    }
}
