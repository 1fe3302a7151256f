//! Transport wiring — HTTP/JSON API (axum) and MCP tool server over stdio.
//!
//! Handlers stay thin: they validate and shape parameters, run the memory
//! core under `spawn_blocking`, and translate typed errors into transport
//! responses. A request-local error never takes the daemon down.

use std::sync::{Arc, Mutex};
use std::time::Instant;

use anyhow::Result;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use rmcp::ServiceExt;
use rusqlite::Connection;
use serde::Deserialize;
use tower_http::cors::{Any, CorsLayer};

use crate::capabilities;
use crate::config::EngramConfig;
use crate::db;
use crate::embedding;
use crate::error::EngramError;
use crate::memory::forget::forget;
use crate::memory::recall::{recall, RecallRequest};
use crate::memory::remember::{remember, RememberInput};
use crate::memory::types::ScopeFilter;
use crate::tools::EngramTools;

/// Shared state for both transports.
pub struct AppState {
    pub db: Arc<Mutex<Connection>>,
    pub config: Arc<EngramConfig>,
    started: Instant,
}

impl AppState {
    pub fn uptime_s(&self) -> u64 {
        self.started.elapsed().as_secs()
    }
}

/// Open the database and record the configured embedding model identifier.
pub fn setup_shared_state(config: EngramConfig) -> Result<Arc<AppState>> {
    let db_path = config.resolved_db_path();
    let conn = db::open_database(&db_path)?;
    tracing::info!(db = %db_path.display(), "database ready");

    match db::migrations::get_embedding_model(&conn)? {
        Some(stored) if stored != config.embedding.model => {
            tracing::warn!(
                stored = %stored,
                configured = %config.embedding.model,
                "embedding model changed — stored vectors with a stale dimension \
                 are ignored on read"
            );
        }
        Some(_) => {}
        None => db::migrations::set_embedding_model(&conn, &config.embedding.model)?,
    }

    Ok(Arc::new(AppState {
        db: Arc::new(Mutex::new(conn)),
        config: Arc::new(config),
        started: Instant::now(),
    }))
}

/// Start the HTTP/JSON API server (foreground).
pub async fn serve_http(config: EngramConfig) -> Result<()> {
    let host = config.server.http_host.clone();
    let port = config.server.http_port;
    let bind_addr = format!("{host}:{port}");

    let state = setup_shared_state(config)?;
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(addr = %bind_addr, "HTTP server listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c()
                .await
                .expect("failed to listen for ctrl-c");
            tracing::info!("shutting down HTTP server");
        })
        .await?;

    Ok(())
}

/// Start the MCP tool server over stdio.
pub async fn serve_stdio(config: EngramConfig) -> Result<()> {
    tracing::info!("starting Engram MCP server on stdio");

    let state = setup_shared_state(config)?;
    let tools = EngramTools::new(Arc::clone(&state.db), Arc::clone(&state.config));

    let server = tools.serve(rmcp::transport::stdio()).await?;
    tracing::info!("MCP server running — waiting for client");

    server.waiting().await?;
    tracing::info!("MCP server shut down");
    Ok(())
}

/// Build the HTTP router with all routes and open CORS.
pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/capabilities", get(get_capabilities))
        .route("/remember", post(post_remember))
        .route("/recall", post(post_recall))
        .route("/forget", post(post_forget))
        .route("/context/hydrate", post(post_context_hydrate))
        .fallback(not_found)
        .layer(cors)
        .with_state(state)
}

// ── Request/response shapes ───────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RecallBody {
    query: Option<String>,
    limit: Option<usize>,
    category: Option<String>,
    min_strength: Option<f64>,
    session_id: Option<String>,
    scope_id: Option<String>,
    chat_id: Option<String>,
    thread_id: Option<String>,
    task_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ForgetBody {
    id: String,
    scope_id: Option<String>,
    session_id: Option<String>,
}

#[derive(Debug, serde::Serialize)]
struct ErrorBody {
    error: String,
}

struct ApiError(StatusCode, String);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.0, Json(ErrorBody { error: self.1 })).into_response()
    }
}

impl From<EngramError> for ApiError {
    fn from(err: EngramError) -> Self {
        let status = match &err {
            EngramError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            EngramError::NotFound(_) => StatusCode::NOT_FOUND,
            EngramError::FeatureDisabled(_) => StatusCode::FORBIDDEN,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %err, "request failed");
        }
        ApiError(status, err.to_string())
    }
}

fn bad_json(rejection: JsonRejection) -> ApiError {
    ApiError(StatusCode::BAD_REQUEST, rejection.body_text())
}

fn task_failed(err: tokio::task::JoinError) -> ApiError {
    tracing::error!(error = %err, "blocking task failed");
    ApiError(
        StatusCode::INTERNAL_SERVER_ERROR,
        "internal task failure".into(),
    )
}

/// Translate body scope fields into a filter, honoring the scopes flag:
/// inputs are accepted either way but ignored while the flag is off.
fn scope_filter(config: &EngramConfig, body: &RecallBody) -> ScopeFilter {
    if !config.features.scopes {
        return ScopeFilter::default();
    }
    ScopeFilter {
        scope_id: body.scope_id.clone(),
        chat_id: body.chat_id.clone(),
        thread_id: body.thread_id.clone(),
        task_id: body.task_id.clone(),
    }
}

fn recall_request(config: &EngramConfig, body: &RecallBody, query: String) -> RecallRequest {
    RecallRequest {
        query,
        limit: body.limit.unwrap_or(config.retrieval.default_limit),
        category: body.category.clone(),
        min_strength: body
            .min_strength
            .unwrap_or(config.retrieval.default_min_strength),
        session_id: body.session_id.clone(),
        scope: scope_filter(config, body),
    }
}

// ── Handlers ──────────────────────────────────────────────────────────────────

async fn health(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "uptime_s": state.uptime_s(),
    }))
}

async fn get_capabilities(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let caps = capabilities::current(&state.config.features);
    Json(serde_json::to_value(caps).unwrap_or_default())
}

async fn post_remember(
    State(state): State<Arc<AppState>>,
    body: Result<Json<RememberInput>, JsonRejection>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let Json(input) = body.map_err(bad_json)?;

    let db = Arc::clone(&state.db);
    let config = Arc::clone(&state.config);
    let response = tokio::task::spawn_blocking(move || {
        let provider = embedding::shared_provider(&config.embedding).ok();
        let conn = db.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        remember(&conn, provider.as_deref(), &config, &input)
    })
    .await
    .map_err(task_failed)??;

    Ok(Json(serde_json::to_value(response).map_err(EngramError::from)?))
}

async fn post_recall(
    State(state): State<Arc<AppState>>,
    body: Result<Json<RecallBody>, JsonRejection>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let Json(body) = body.map_err(bad_json)?;
    let query = body
        .query
        .clone()
        .ok_or_else(|| ApiError::from(EngramError::invalid("query is required")))?;

    run_recall(state, body, query).await
}

async fn post_context_hydrate(
    State(state): State<Arc<AppState>>,
    body: Result<Json<RecallBody>, JsonRejection>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if !state.config.features.context_hydration {
        return Err(EngramError::FeatureDisabled("context_hydration").into());
    }
    let Json(body) = body.map_err(bad_json)?;
    let query = body.query.clone().unwrap_or_default();

    run_recall(state, body, query).await
}

async fn run_recall(
    state: Arc<AppState>,
    body: RecallBody,
    query: String,
) -> Result<Json<serde_json::Value>, ApiError> {
    let db = Arc::clone(&state.db);
    let config = Arc::clone(&state.config);
    let response = tokio::task::spawn_blocking(move || {
        let request = recall_request(&config, &body, query);
        let provider = embedding::shared_provider(&config.embedding).ok();
        let conn = db.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        recall(&conn, provider.as_deref(), &config, &request)
    })
    .await
    .map_err(task_failed)??;

    Ok(Json(serde_json::to_value(response).map_err(EngramError::from)?))
}

async fn post_forget(
    State(state): State<Arc<AppState>>,
    body: Result<Json<ForgetBody>, JsonRejection>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let Json(body) = body.map_err(bad_json)?;

    let db = Arc::clone(&state.db);
    let config = Arc::clone(&state.config);
    let response = tokio::task::spawn_blocking(move || {
        let conn = db.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        forget(
            &conn,
            &config.features,
            &body.id,
            body.scope_id.as_deref(),
            body.session_id.as_deref(),
        )
    })
    .await
    .map_err(task_failed)??;

    Ok(Json(serde_json::to_value(response).map_err(EngramError::from)?))
}

async fn not_found() -> ApiError {
    ApiError(StatusCode::NOT_FOUND, "unknown route".into())
}
