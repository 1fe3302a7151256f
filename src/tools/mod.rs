pub mod capabilities;
pub mod forget;
pub mod recall;
pub mod remember;

use capabilities::CapabilitiesParams;
use forget::ForgetParams;
use recall::{ContextHydrateParams, RecallParams};
use remember::RememberParams;
use rmcp::handler::server::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::{tool, tool_handler, tool_router, ServerHandler};
use rusqlite::Connection;
use std::sync::{Arc, Mutex};

use crate::config::EngramConfig;
use crate::embedding;
use crate::memory::recall::RecallRequest;
use crate::memory::remember::RememberInput;
use crate::memory::types::ScopeFilter;

/// The Engram tool handler. Holds shared state (db connection, config) and
/// exposes all tools via the `#[tool_router]` macro. Feature flags are
/// inspected per request, never at startup.
#[derive(Clone)]
pub struct EngramTools {
    tool_router: ToolRouter<Self>,
    db: Arc<Mutex<Connection>>,
    config: Arc<EngramConfig>,
}

#[tool_router]
impl EngramTools {
    pub fn new(db: Arc<Mutex<Connection>>, config: Arc<EngramConfig>) -> Self {
        Self {
            tool_router: Self::tool_router(),
            db,
            config,
        }
    }

    /// Gate scope inputs by the scopes flag: accepted either way, ignored
    /// while disabled.
    fn scope_filter(
        &self,
        scope_id: Option<String>,
        chat_id: Option<String>,
        thread_id: Option<String>,
        task_id: Option<String>,
    ) -> ScopeFilter {
        if !self.config.features.scopes {
            return ScopeFilter::default();
        }
        ScopeFilter {
            scope_id,
            chat_id,
            thread_id,
            task_id,
        }
    }

    async fn run_recall(&self, request: RecallRequest) -> Result<String, String> {
        let db = Arc::clone(&self.db);
        let config = Arc::clone(&self.config);

        let response = tokio::task::spawn_blocking(move || {
            let provider = embedding::shared_provider(&config.embedding).ok();
            let conn = db.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            crate::memory::recall::recall(&conn, provider.as_deref(), &config, &request)
        })
        .await
        .map_err(|e| format!("recall task failed: {e}"))?
        .map_err(|e| e.to_string())?;

        serde_json::to_string(&response).map_err(|e| format!("serialization failed: {e}"))
    }

    /// Persist a memory, with optional idempotent replay and upsert.
    #[tool(
        description = "Persist a short textual memory. Supports idempotency keys for retry-safe writes and upsert=true for create-or-replace."
    )]
    async fn remember(
        &self,
        Parameters(params): Parameters<RememberParams>,
    ) -> Result<String, String> {
        tracing::info!(
            content_len = params.content.len(),
            upsert = params.upsert.unwrap_or(false),
            "remember called"
        );

        let input = RememberInput {
            content: params.content,
            category: params.category,
            scope_id: params.scope_id,
            chat_id: params.chat_id,
            thread_id: params.thread_id,
            task_id: params.task_id,
            metadata: params.metadata,
            idempotency_key: params.idempotency_key,
            upsert: params.upsert.unwrap_or(false),
            session_id: params.session_id,
        };

        let db = Arc::clone(&self.db);
        let config = Arc::clone(&self.config);
        let response = tokio::task::spawn_blocking(move || {
            let provider = embedding::shared_provider(&config.embedding).ok();
            let conn = db.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            crate::memory::remember::remember(&conn, provider.as_deref(), &config, &input)
        })
        .await
        .map_err(|e| format!("remember task failed: {e}"))?
        .map_err(|e| e.to_string())?;

        serde_json::to_string(&response).map_err(|e| format!("serialization failed: {e}"))
    }

    /// Search memories with semantic ranking and FTS fallback.
    #[tool(
        description = "Search memories by natural language query. Returns ranked results; an empty query returns recent memories."
    )]
    async fn recall(
        &self,
        Parameters(params): Parameters<RecallParams>,
    ) -> Result<String, String> {
        tracing::info!(query = %params.query, "recall called");

        let request = RecallRequest {
            query: params.query,
            limit: params.limit.unwrap_or(self.config.retrieval.default_limit),
            category: params.category,
            min_strength: params
                .min_strength
                .unwrap_or(self.config.retrieval.default_min_strength),
            session_id: params.session_id,
            scope: self.scope_filter(
                params.scope_id,
                params.chat_id,
                params.thread_id,
                params.task_id,
            ),
        };
        self.run_recall(request).await
    }

    /// Delete a memory by id, with a scope guard when scopes are enabled.
    #[tool(description = "Delete a memory by id. Returns {id, deleted}.")]
    async fn forget(
        &self,
        Parameters(params): Parameters<ForgetParams>,
    ) -> Result<String, String> {
        tracing::info!(id = %params.id, "forget called");

        let db = Arc::clone(&self.db);
        let config = Arc::clone(&self.config);
        let response = tokio::task::spawn_blocking(move || {
            let conn = db.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            crate::memory::forget::forget(
                &conn,
                &config.features,
                &params.id,
                params.scope_id.as_deref(),
                params.session_id.as_deref(),
            )
        })
        .await
        .map_err(|e| format!("forget task failed: {e}"))?
        .map_err(|e| e.to_string())?;

        serde_json::to_string(&response).map_err(|e| format!("serialization failed: {e}"))
    }

    /// Report feature flags and the available tool set.
    #[tool(description = "Report feature flags, version, and the available tool set.")]
    async fn capabilities(
        &self,
        Parameters(_params): Parameters<CapabilitiesParams>,
    ) -> Result<String, String> {
        let caps = crate::capabilities::current(&self.config.features);
        serde_json::to_string(&caps).map_err(|e| format!("serialization failed: {e}"))
    }

    /// Recall with an optional query, for seeding agent context.
    #[tool(
        description = "Hydrate agent context: a recall whose query is optional (omitted returns recent memories). Requires the context_hydration feature."
    )]
    async fn context_hydrate(
        &self,
        Parameters(params): Parameters<ContextHydrateParams>,
    ) -> Result<String, String> {
        if !self.config.features.context_hydration {
            return Err("feature disabled: context_hydration".to_string());
        }

        let request = RecallRequest {
            query: params.query.unwrap_or_default(),
            limit: params.limit.unwrap_or(self.config.retrieval.default_limit),
            category: params.category,
            min_strength: params
                .min_strength
                .unwrap_or(self.config.retrieval.default_min_strength),
            session_id: params.session_id,
            scope: self.scope_filter(
                params.scope_id,
                params.chat_id,
                params.thread_id,
                params.task_id,
            ),
        };
        self.run_recall(request).await
    }
}

#[tool_handler]
impl ServerHandler for EngramTools {
    fn get_info(&self) -> rmcp::model::ServerInfo {
        rmcp::model::ServerInfo {
            instructions: Some(
                "Engram is a local memory store for coding agents. Use remember to save \
                 memories, recall to search them, forget to delete, and capabilities to \
                 inspect feature flags."
                    .into(),
            ),
            capabilities: rmcp::model::ServerCapabilities::builder()
                .enable_tools()
                .build(),
            ..Default::default()
        }
    }
}
