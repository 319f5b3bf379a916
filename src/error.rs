//! Boundary error taxonomy for the Context Engine.
//!
//! Internal fallible operations use [`anyhow::Result`] throughout the
//! pipeline; this closed enum is the only error type that crosses the
//! façade boundary ([`crate::engine::Engine`]), matching the error
//! taxonomy in the specification's external interfaces section.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid token budget: {0}")]
    InvalidBudget(String),

    #[error("engine not initialized")]
    NotInitialized,

    #[error("query cancelled")]
    Cancelled,

    #[error("deadline exceeded before retrieval completed")]
    DeadlineExceeded,

    #[error("index unavailable: {0}")]
    IndexUnavailable(String),

    #[error("embedding provider failed: {0}")]
    EmbeddingProviderFailed(String),

    #[error("packing invariant violated: {0}")]
    PackingInvariantViolated(String),
}
