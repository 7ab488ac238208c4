//! Host configuration consumed by the enforcer and storage.
//!
//! Example (YAML):
//! ```yaml
//! enabled: true
//! orchestrationLevel: limited
//! maxSubassistantDepth: 1
//! toolPolicy: allow_list
//! allowedTools: ["file:read", "search:*"]
//! ```

use serde::{Deserialize, Serialize};

use super::capability::{OrchestrationLevel, ToolPolicy};
use super::error::CapabilityError;

/// Simplified, flattened capability configuration supplied by the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CapabilitiesConfigShared {
    /// Whether enforcement is active.
    pub enabled: bool,

    /// Level whose orchestration defaults seed the effective set.
    pub orchestration_level: OrchestrationLevel,

    /// Explicit concurrency ceiling, replacing the level default.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_concurrent_subassistants: Option<u32>,

    /// Explicit depth ceiling, replacing the level default.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_subassistant_depth: Option<u32>,

    pub tool_policy: ToolPolicy,

    /// Glob patterns consulted under `allow_list`.
    pub allowed_tools: Vec<String>,

    /// Glob patterns consulted under `deny_list`.
    pub denied_tools: Vec<String>,
}

impl Default for CapabilitiesConfigShared {
    fn default() -> Self {
        Self {
            enabled: true,
            orchestration_level: OrchestrationLevel::Standard,
            max_concurrent_subassistants: None,
            max_subassistant_depth: None,
            tool_policy: ToolPolicy::AllowAll,
            allowed_tools: Vec::new(),
            denied_tools: Vec::new(),
        }
    }
}

impl CapabilitiesConfigShared {
    /// Parse a config from YAML. Malformed enum values are rejected.
    pub fn from_yaml(yaml: &str) -> Result<Self, CapabilityError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Parse a config from JSON. Malformed enum values are rejected.
    pub fn from_json(json: &str) -> Result<Self, CapabilityError> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Configuration for [`CapabilityStorage`](super::CapabilityStorage).
///
/// `enabled` documents intended use; it does not gate storage operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CapabilityStorageConfig {
    pub enabled: bool,
}

impl Default for CapabilityStorageConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}
