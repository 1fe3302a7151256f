//! `remember` tool parameter definition.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the `remember` tool.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct RememberParams {
    /// The text content to persist.
    #[schemars(description = "The text content to persist")]
    pub content: String,

    /// Optional category hint: 'decision', 'pattern', 'fact', 'preference', or 'insight'.
    #[schemars(
        description = "Optional category hint: 'decision', 'pattern', 'fact', 'preference', 'insight'"
    )]
    pub category: Option<String>,

    /// Isolation scope for this memory. Ignored while the scopes flag is off.
    #[schemars(description = "Isolation scope for this memory")]
    pub scope_id: Option<String>,

    /// Chat this memory belongs to.
    #[schemars(description = "Chat this memory belongs to")]
    pub chat_id: Option<String>,

    /// Thread this memory belongs to.
    #[schemars(description = "Thread this memory belongs to")]
    pub thread_id: Option<String>,

    /// Task this memory belongs to.
    #[schemars(description = "Task this memory belongs to")]
    pub task_id: Option<String>,

    /// Optional JSON metadata blob, interpreted by callers.
    #[schemars(description = "Optional JSON metadata blob")]
    pub metadata: Option<serde_json::Value>,

    /// Stable caller-chosen key for retry-safe writes and upserts.
    #[schemars(description = "Stable caller-chosen key for retry-safe writes and upserts")]
    pub idempotency_key: Option<String>,

    /// If true, replace the existing memory with this idempotency_key (requires one).
    #[schemars(
        description = "If true, replace the existing memory with this idempotency_key. Requires idempotency_key."
    )]
    pub upsert: Option<bool>,

    /// Session identifier for metrics attribution.
    #[schemars(description = "Session identifier for metrics attribution")]
    pub session_id: Option<String>,
}
