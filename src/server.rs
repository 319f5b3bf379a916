//! HTTP surface (Axum), strictly optional sugar over [`crate::engine::Engine`].
//!
//! Mirrors the teacher's `server.rs`: the same `AppState`/`AppError`/
//! `ErrorBody`/`ErrorDetail` shape, the same permissive CORS layer, and
//! the same `run_server(&config)` entry point, retargeted from the
//! teacher's search/get/sources tool surface to `/query` and
//! `/on_file_change`.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/query` | Run the full retrieval pipeline |
//! | `POST` | `/on_file_change` | Notify the engine of an out-of-band file change |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! # Error contract
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "token_budget must be > 0" } }
//! ```
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted, matching the
//! teacher's posture for browser-based and cross-origin tool clients.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::config::Config;
use crate::engine::{Engine, QueryRequest};
use crate::error::EngineError;
use crate::indexer::ChangeKind;
use crate::models::{ContextResult, Intent};

/// Shared application state passed to all route handlers via Axum's `State` extractor.
#[derive(Clone)]
struct AppState {
    engine: Arc<Engine>,
}

/// Starts the HTTP server, binding to `[server].bind:port` and serving
/// until the process is terminated.
pub async fn run_server(config: &Config, engine: Arc<Engine>) -> anyhow::Result<()> {
    let bind_addr = format!("{}:{}", config.server.bind, config.server.port);

    let state = AppState { engine };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/query", post(handle_query))
        .route("/on_file_change", post(handle_on_file_change))
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(state);

    tracing::info!(%bind_addr, "context engine HTTP server listening");

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request".to_string(),
        message: message.into(),
    }
}

fn not_initialized(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::SERVICE_UNAVAILABLE,
        code: "not_initialized".to_string(),
        message: message.into(),
    }
}

fn internal_error(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "internal".to_string(),
        message: message.into(),
    }
}

impl From<EngineError> for AppError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::InvalidBudget(_) => bad_request(err.to_string()),
            EngineError::NotInitialized => not_initialized(err.to_string()),
            EngineError::Cancelled | EngineError::DeadlineExceeded => AppError {
                status: StatusCode::REQUEST_TIMEOUT,
                code: "deadline_exceeded".to_string(),
                message: err.to_string(),
            },
            EngineError::IndexUnavailable(_)
            | EngineError::EmbeddingProviderFailed(_)
            | EngineError::PackingInvariantViolated(_) => internal_error(err.to_string()),
        }
    }
}

// ============ POST /query ============

#[derive(Deserialize)]
struct QueryRequestBody {
    input: String,
    intent: Option<Intent>,
    token_budget: u32,
    active_file: Option<String>,
    #[serde(default)]
    selection: Option<(u32, u32)>,
    deadline_ms: Option<u64>,
}

async fn handle_query(
    State(state): State<AppState>,
    Json(req): Json<QueryRequestBody>,
) -> Result<Json<ContextResult>, AppError> {
    if req.input.trim().is_empty() {
        return Err(bad_request("input must not be empty"));
    }

    let request = QueryRequest {
        input: req.input,
        intent: req.intent,
        token_budget: req.token_budget,
        active_file: req.active_file,
        selection: req.selection,
        deadline: req.deadline_ms.map(std::time::Duration::from_millis),
    };

    let result = state.engine.query(request).await?;
    Ok(Json(result))
}

// ============ POST /on_file_change ============

#[derive(Deserialize)]
struct OnFileChangeRequest {
    path: String,
    kind: FileChangeKindBody,
}

#[derive(Deserialize)]
#[serde(rename_all = "snake_case")]
enum FileChangeKindBody {
    Created,
    Modified,
    Deleted,
}

impl From<FileChangeKindBody> for ChangeKind {
    fn from(k: FileChangeKindBody) -> Self {
        match k {
            FileChangeKindBody::Created => ChangeKind::Created,
            FileChangeKindBody::Modified => ChangeKind::Modified,
            FileChangeKindBody::Deleted => ChangeKind::Deleted,
        }
    }
}

#[derive(Serialize)]
struct OnFileChangeResponse {
    ok: bool,
}

async fn handle_on_file_change(
    State(state): State<AppState>,
    Json(req): Json<OnFileChangeRequest>,
) -> Result<Json<OnFileChangeResponse>, AppError> {
    if req.path.trim().is_empty() {
        return Err(bad_request("path must not be empty"));
    }

    state
        .engine
        .on_file_change(std::path::Path::new(&req.path), req.kind.into())
        .await?;

    Ok(Json(OnFileChangeResponse { ok: true }))
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
