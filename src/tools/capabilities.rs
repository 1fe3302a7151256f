//! `capabilities` tool parameter definition.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the `capabilities` tool (none).
#[derive(Debug, Default, Serialize, Deserialize, JsonSchema)]
pub struct CapabilitiesParams {}
