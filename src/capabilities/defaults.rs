//! Immutable default data: the baseline capability set, the per-level
//! orchestration table, named presets, and the host-config adapter.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::capability::{
    ApprovalCapabilities, ApprovalLevel, AssistantCapabilitySet, BudgetCapabilities,
    CapabilityScope, CommunicationCapabilities, MemoryCapabilities, ModelCapabilities,
    OrchestrationCapabilities, OrchestrationLevel, PartialCapabilitySet, PartialOrchestration,
    PartialTools, PatternMap, SkillCapabilities, ToolCapabilities, ToolPolicy,
};
use super::config::CapabilitiesConfigShared;
use super::error::CapabilityError;

/// Memory scopes granted by the default set.
pub const DEFAULT_MEMORY_SCOPES: [&str; 3] = ["assistant", "session", "global"];

/// Orchestration fields for each level, indexed by `OrchestrationLevel as usize`.
pub const ORCHESTRATION_DEFAULTS: [OrchestrationCapabilities; 5] = [
    OrchestrationCapabilities {
        level: OrchestrationLevel::None,
        can_spawn_subassistants: false,
        max_concurrent_subassistants: 0,
        max_subassistant_depth: 0,
        can_coordinate_swarms: false,
        max_swarm_size: 0,
        can_delegate: false,
    },
    OrchestrationCapabilities {
        level: OrchestrationLevel::Limited,
        can_spawn_subassistants: true,
        max_concurrent_subassistants: 2,
        max_subassistant_depth: 1,
        can_coordinate_swarms: false,
        max_swarm_size: 0,
        can_delegate: true,
    },
    OrchestrationCapabilities {
        level: OrchestrationLevel::Standard,
        can_spawn_subassistants: true,
        max_concurrent_subassistants: 5,
        max_subassistant_depth: 3,
        can_coordinate_swarms: false,
        max_swarm_size: 0,
        can_delegate: true,
    },
    OrchestrationCapabilities {
        level: OrchestrationLevel::Full,
        can_spawn_subassistants: true,
        max_concurrent_subassistants: 10,
        max_subassistant_depth: 5,
        can_coordinate_swarms: true,
        max_swarm_size: 10,
        can_delegate: true,
    },
    OrchestrationCapabilities {
        level: OrchestrationLevel::Coordinator,
        can_spawn_subassistants: true,
        max_concurrent_subassistants: 20,
        max_subassistant_depth: 10,
        can_coordinate_swarms: true,
        max_swarm_size: 50,
        can_delegate: true,
    },
];

/// Look up the orchestration defaults for `level`.
pub fn orchestration_defaults(level: OrchestrationLevel) -> OrchestrationCapabilities {
    ORCHESTRATION_DEFAULTS[level as usize].clone()
}

/// Baseline used wherever no scope has an opinion.
pub fn default_capability_set() -> AssistantCapabilitySet {
    AssistantCapabilitySet {
        orchestration: orchestration_defaults(OrchestrationLevel::Standard),
        tools: ToolCapabilities {
            policy: ToolPolicy::AllowAll,
            capabilities: PatternMap::new(),
        },
        skills: SkillCapabilities {
            policy: ToolPolicy::AllowAll,
        },
        models: ModelCapabilities::default(),
        approval: ApprovalCapabilities {
            default_level: ApprovalLevel::None,
        },
        communication: CommunicationCapabilities {
            can_send_messages: true,
            can_receive_messages: true,
            can_broadcast: false,
        },
        memory: MemoryCapabilities {
            can_access_global_memory: true,
            can_write_memory: true,
            allowed_memory_scopes: DEFAULT_MEMORY_SCOPES.iter().map(|s| s.to_string()).collect(),
        },
        budget: BudgetCapabilities::default(),
        enabled: true,
    }
}

/// Named, precomputed capability sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapabilityPreset {
    Default,
    Restricted,
    Coordinator,
}

impl CapabilityPreset {
    pub fn as_str(&self) -> &'static str {
        match self {
            CapabilityPreset::Default => "default",
            CapabilityPreset::Restricted => "restricted",
            CapabilityPreset::Coordinator => "coordinator",
        }
    }

    pub fn capabilities(&self) -> AssistantCapabilitySet {
        let mut set = default_capability_set();
        match self {
            CapabilityPreset::Default => {}
            CapabilityPreset::Restricted => {
                set.orchestration = orchestration_defaults(OrchestrationLevel::Limited);
                set.tools.policy = ToolPolicy::RequireApproval;
                set.skills.policy = ToolPolicy::AllowList;
                set.approval.default_level = ApprovalLevel::Require;
                set.memory.can_access_global_memory = false;
                set.memory.allowed_memory_scopes = BTreeSet::from(["assistant".to_string()]);
            }
            CapabilityPreset::Coordinator => {
                set.orchestration = orchestration_defaults(OrchestrationLevel::Coordinator);
                set.communication.can_broadcast = true;
            }
        }
        set
    }
}

impl FromStr for CapabilityPreset {
    type Err = CapabilityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "default" => Ok(CapabilityPreset::Default),
            "restricted" => Ok(CapabilityPreset::Restricted),
            "coordinator" => Ok(CapabilityPreset::Coordinator),
            other => Err(CapabilityError::UnknownPreset(other.to_string())),
        }
    }
}

impl fmt::Display for CapabilityPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fetch a preset by name. Unknown names are an error, never a default.
pub fn get_capability_preset(name: &str) -> Result<AssistantCapabilitySet, CapabilityError> {
    Ok(name.parse::<CapabilityPreset>()?.capabilities())
}

/// Seed values for a scope: only the assistant scope starts from defaults.
pub fn get_default_capabilities(scope: &CapabilityScope) -> PartialCapabilitySet {
    match scope {
        CapabilityScope::Assistant => PartialCapabilitySet::from(&default_capability_set()),
        _ => PartialCapabilitySet::empty(),
    }
}

/// Convert the flattened host configuration into a capability partial.
///
/// Explicit numeric limits in the config replace the level defaults here;
/// narrowing against a baseline is the caller's job.
pub fn config_to_capabilities(config: &CapabilitiesConfigShared) -> PartialCapabilitySet {
    let mut orchestration = orchestration_defaults(config.orchestration_level);
    if let Some(max) = config.max_concurrent_subassistants {
        orchestration.max_concurrent_subassistants = max;
    }
    if let Some(depth) = config.max_subassistant_depth {
        orchestration.max_subassistant_depth = depth;
    }

    let mut patterns = PatternMap::new();
    for tool in &config.allowed_tools {
        patterns.insert(tool.clone(), true);
    }
    for tool in &config.denied_tools {
        patterns.insert(tool.clone(), false);
    }

    PartialCapabilitySet {
        orchestration: Some(PartialOrchestration {
            level: Some(orchestration.level),
            can_spawn_subassistants: Some(orchestration.can_spawn_subassistants),
            max_concurrent_subassistants: Some(orchestration.max_concurrent_subassistants),
            max_subassistant_depth: Some(orchestration.max_subassistant_depth),
            can_coordinate_swarms: Some(orchestration.can_coordinate_swarms),
            max_swarm_size: Some(orchestration.max_swarm_size),
            can_delegate: Some(orchestration.can_delegate),
        }),
        tools: Some(PartialTools {
            policy: Some(config.tool_policy),
            capabilities: patterns,
        }),
        enabled: Some(config.enabled),
        ..Default::default()
    }
}
