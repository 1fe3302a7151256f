//! `recall` and `context_hydrate` tool parameter definitions.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the `recall` tool.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct RecallParams {
    /// Natural language query. An empty query returns recent memories.
    #[schemars(description = "Natural language query. Empty returns recent memories.")]
    pub query: String,

    /// Maximum number of results. Defaults to 10.
    #[schemars(description = "Maximum number of results. Defaults to 10.")]
    pub limit: Option<usize>,

    /// Filter by category.
    #[schemars(description = "Filter by category")]
    pub category: Option<String>,

    /// Minimum effective strength (0.0-1.0). Defaults to 0.1.
    #[schemars(description = "Minimum effective strength (0.0-1.0). Defaults to 0.1.")]
    pub min_strength: Option<f64>,

    /// Filter to one isolation scope.
    #[schemars(description = "Filter to one isolation scope")]
    pub scope_id: Option<String>,

    /// Filter to one chat.
    #[schemars(description = "Filter to one chat")]
    pub chat_id: Option<String>,

    /// Filter to one thread.
    #[schemars(description = "Filter to one thread")]
    pub thread_id: Option<String>,

    /// Filter to one task.
    #[schemars(description = "Filter to one task")]
    pub task_id: Option<String>,

    /// Session identifier for metrics attribution.
    #[schemars(description = "Session identifier for metrics attribution")]
    pub session_id: Option<String>,
}

/// Parameters for the `context_hydrate` tool — a recall whose query is optional.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct ContextHydrateParams {
    /// Optional query; omitted means "recent context".
    #[schemars(description = "Optional query; omitted means recent context")]
    pub query: Option<String>,

    /// Maximum number of results. Defaults to 10.
    #[schemars(description = "Maximum number of results. Defaults to 10.")]
    pub limit: Option<usize>,

    /// Filter by category.
    #[schemars(description = "Filter by category")]
    pub category: Option<String>,

    /// Minimum effective strength (0.0-1.0). Defaults to 0.1.
    #[schemars(description = "Minimum effective strength (0.0-1.0). Defaults to 0.1.")]
    pub min_strength: Option<f64>,

    /// Filter to one isolation scope.
    #[schemars(description = "Filter to one isolation scope")]
    pub scope_id: Option<String>,

    /// Filter to one chat.
    #[schemars(description = "Filter to one chat")]
    pub chat_id: Option<String>,

    /// Filter to one thread.
    #[schemars(description = "Filter to one thread")]
    pub thread_id: Option<String>,

    /// Filter to one task.
    #[schemars(description = "Filter to one task")]
    pub task_id: Option<String>,

    /// Session identifier for metrics attribution.
    #[schemars(description = "Session identifier for metrics attribution")]
    pub session_id: Option<String>,
}
