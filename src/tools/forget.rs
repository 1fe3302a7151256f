//! `forget` tool parameter definition.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the `forget` tool.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct ForgetParams {
    /// Memory id to delete.
    #[schemars(description = "Memory id to delete")]
    pub id: String,

    /// Scope guard: with scopes enabled, the memory's scope must match.
    /// Omitted matches unscoped memories only.
    #[schemars(
        description = "Scope guard. With scopes enabled, the memory's scope must match; omitted matches unscoped memories only."
    )]
    pub scope_id: Option<String>,

    /// Session identifier for metrics attribution.
    #[schemars(description = "Session identifier for metrics attribution")]
    pub session_id: Option<String>,
}
