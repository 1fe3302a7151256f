//! Runtime capability view.
//!
//! Handlers build this from the live config at request time so flag toggles
//! take effect without a restart. `context_hydrate` is listed only while its
//! flag is on.

use serde::Serialize;

use crate::config::FeatureConfig;

#[derive(Debug, Serialize)]
pub struct Capabilities {
    pub scopes: bool,
    pub idempotency: bool,
    pub context_hydration: bool,
    pub work_items: bool,
    pub version: String,
    pub tools: Vec<String>,
}

/// Build the capability structure for the current feature flags.
pub fn current(features: &FeatureConfig) -> Capabilities {
    let mut tools = vec![
        "remember".to_string(),
        "recall".to_string(),
        "forget".to_string(),
        "capabilities".to_string(),
    ];
    if features.context_hydration {
        tools.push("context_hydrate".to_string());
    }

    Capabilities {
        scopes: features.scopes,
        idempotency: features.idempotency,
        context_hydration: features.context_hydration,
        work_items: features.work_items,
        version: env!("CARGO_PKG_VERSION").to_string(),
        tools,
    }
}
