//! # Capability Enforcer
//!
//! The runtime guard consulted by the agent loop before it spawns a
//! sub-assistant, calls a tool, delegates, or coordinates a swarm.
//!
//! ```text
//! Agent loop → enforcer.can_use_tool("bash:execute", &ctx)
//!   → effective tool policy: allow_list ["file:read"]
//!   → EnforcementResult { allowed: false, reason: "... not in the allowed list" }
//! ```
//!
//! ## Baseline ceiling
//!
//! The effective orchestration set is the host config restrictively merged
//! (AND / min) against the `standard` level defaults. Configuration can only
//! narrow that baseline: `orchestrationLevel: full` still yields no swarm
//! coordination because `standard` has none.
//!
//! Denials are ordinary results, never errors. Only construction from
//! malformed configuration fails.

use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use super::capability::{OrchestrationCapabilities, OrchestrationLevel, ToolPolicy};
use super::config::CapabilitiesConfigShared;
use super::defaults::{config_to_capabilities, orchestration_defaults, CapabilityPreset};
use super::error::CapabilityError;
use super::pattern::pattern_matches;
use super::resolver::merge_orchestration;

/// Level whose defaults cap every effective orchestration set.
pub const BASELINE_LEVEL: OrchestrationLevel = OrchestrationLevel::Standard;

/// Verdict of a guard check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnforcementResult {
    pub allowed: bool,

    /// Human-readable reason
    pub reason: String,

    #[serde(default)]
    pub warnings: Vec<String>,

    /// Set when execution must pause for external approval.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requires_approval: Option<bool>,
}

impl EnforcementResult {
    pub fn allow(reason: impl Into<String>) -> Self {
        Self {
            allowed: true,
            reason: reason.into(),
            warnings: Vec::new(),
            requires_approval: None,
        }
    }

    pub fn deny(reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            reason: reason.into(),
            warnings: Vec::new(),
            requires_approval: None,
        }
    }

    pub fn with_warning(mut self, warning: impl Into<String>) -> Self {
        self.warnings.push(warning.into());
        self
    }

    pub fn requiring_approval(mut self) -> Self {
        self.requires_approval = Some(true);
        self
    }

    fn disabled() -> Self {
        Self::allow("Capability enforcement is disabled")
    }
}

/// Spawn request details.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpawnRequest {
    /// Depth of the requesting assistant (0 = root).
    pub depth: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_subassistants: Option<u32>,
}

/// Caller context attached to guard checks. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EnforcementContext {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assistant_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub depth: Option<u32>,
}

impl EnforcementContext {
    pub fn for_assistant(assistant_id: impl Into<String>) -> Self {
        Self {
            assistant_id: Some(assistant_id.into()),
            ..Default::default()
        }
    }
}

/// Runtime guard driven by a [`CapabilitiesConfigShared`].
///
/// The `enabled` flag is independent of the config so enforcement can be
/// toggled without rebuilding policy. Effective capabilities are recomputed
/// on each call.
#[derive(Debug)]
pub struct CapabilityEnforcer {
    config: RwLock<CapabilitiesConfigShared>,
    enabled: AtomicBool,
}

impl Default for CapabilityEnforcer {
    fn default() -> Self {
        Self::new(CapabilitiesConfigShared::default())
    }
}

impl CapabilityEnforcer {
    pub fn new(config: CapabilitiesConfigShared) -> Self {
        Self {
            enabled: AtomicBool::new(config.enabled),
            config: RwLock::new(config),
        }
    }

    /// Build from a YAML host config.
    pub fn from_yaml(yaml: &str) -> Result<Self, CapabilityError> {
        Ok(Self::new(CapabilitiesConfigShared::from_yaml(yaml)?))
    }

    /// Build from a named preset's orchestration level and tool policy.
    pub fn from_preset(name: &str) -> Result<Self, CapabilityError> {
        let preset = name.parse::<CapabilityPreset>()?.capabilities();
        Ok(Self::new(CapabilitiesConfigShared {
            orchestration_level: preset.orchestration.level,
            tool_policy: preset.tools.policy,
            ..Default::default()
        }))
    }

    pub fn config(&self) -> CapabilitiesConfigShared {
        self.config.read().clone()
    }

    /// Replace the config in place; the enabled flag follows the new config.
    pub fn update_config(&self, config: CapabilitiesConfigShared) {
        let enabled = config.enabled;
        *self.config.write() = config;
        self.enabled.store(enabled, Ordering::SeqCst);
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    /// Config-derived orchestration narrowed against the baseline level.
    pub fn effective_orchestration(&self) -> OrchestrationCapabilities {
        let derived = config_to_capabilities(&self.config.read());
        let mut effective = orchestration_defaults(BASELINE_LEVEL);
        if let Some(o) = &derived.orchestration {
            merge_orchestration(&mut effective, o);
        }
        effective
    }

    /// Check whether a sub-assistant may be spawned.
    pub fn can_spawn_subassistant(&self, request: &SpawnRequest) -> EnforcementResult {
        if !self.is_enabled() {
            return EnforcementResult::disabled();
        }
        let effective = self.effective_orchestration();

        if !effective.can_spawn_subassistants {
            return denied(EnforcementResult::deny(format!(
                "Spawning sub-assistants is not allowed at orchestration level '{}'",
                effective.level
            )));
        }

        if request.depth >= effective.max_subassistant_depth {
            return denied(EnforcementResult::deny(format!(
                "Maximum sub-assistant depth reached (depth {} >= limit {})",
                request.depth, effective.max_subassistant_depth
            )));
        }

        let max = effective.max_concurrent_subassistants;
        let mut result = match request.active_subassistants {
            Some(active) if active >= max => {
                return denied(EnforcementResult::deny(format!(
                    "Maximum concurrent sub-assistants reached ({} >= limit {})",
                    active, max
                )));
            }
            Some(active) if active + 1 == max => EnforcementResult::allow(
                "Sub-assistant spawn allowed",
            )
            .with_warning(format!(
                "Approaching concurrent sub-assistant limit ({} of {} after this spawn)",
                active + 1,
                max
            )),
            _ => EnforcementResult::allow("Sub-assistant spawn allowed"),
        };
        result.reason = format!("{} (depth {})", result.reason, request.depth);
        log::debug!("Spawn check passed at depth {}", request.depth);
        result
    }

    /// Check whether `name` may be invoked under the configured tool policy.
    ///
    /// `allow_list` consults only `allowed_tools` and `deny_list` only
    /// `denied_tools`; the other list has no effect under either policy.
    pub fn can_use_tool(&self, name: &str, context: &EnforcementContext) -> EnforcementResult {
        if !self.is_enabled() {
            return EnforcementResult::disabled();
        }
        let config = self.config.read();
        let policy = config.tool_policy;
        let listed = |patterns: &[String]| patterns.iter().any(|p| pattern_matches(p, name));
        let in_allowed = policy == ToolPolicy::AllowList && listed(&config.allowed_tools);
        let in_denied = policy == ToolPolicy::DenyList && listed(&config.denied_tools);
        drop(config);

        let result = match policy {
            ToolPolicy::AllowAll => EnforcementResult::allow(format!(
                "Tool '{}' allowed (policy: allow_all)",
                name
            )),
            ToolPolicy::AllowList if in_allowed => {
                EnforcementResult::allow(format!("Tool '{}' is in the allowed list", name))
            }
            ToolPolicy::AllowList => EnforcementResult::deny(format!(
                "Tool '{}' is not in the allowed list",
                name
            )),
            ToolPolicy::DenyList if in_denied => {
                EnforcementResult::deny(format!("Tool '{}' is in the deny list", name))
            }
            ToolPolicy::DenyList => EnforcementResult::allow(format!(
                "Tool '{}' is not in the deny list",
                name
            )),
            ToolPolicy::RequireApproval => EnforcementResult::allow(format!(
                "Tool '{}' requires approval before execution",
                name
            ))
            .requiring_approval(),
        };

        if result.allowed {
            log::debug!(
                "Tool '{}' allowed for {:?}: {}",
                name,
                context.assistant_id,
                result.reason
            );
            result
        } else {
            log::warn!("Tool '{}' denied for {:?}", name, context.assistant_id);
            denied(result)
        }
    }

    /// Delegation is refused only at the `none` level.
    pub fn can_delegate(&self, target_id: &str, context: &EnforcementContext) -> EnforcementResult {
        if !self.is_enabled() {
            return EnforcementResult::disabled();
        }
        let effective = self.effective_orchestration();
        if effective.level == OrchestrationLevel::None || !effective.can_delegate {
            return denied(EnforcementResult::deny(format!(
                "Delegation to '{}' is not allowed at orchestration level '{}'",
                target_id, effective.level
            )));
        }
        log::debug!("Delegation from {:?} to '{}' allowed", context.assistant_id, target_id);
        EnforcementResult::allow(format!("Delegation to '{}' allowed", target_id))
    }

    /// Swarm coordination follows the effective (baseline-capped) set, never
    /// the configured level alone.
    pub fn can_coordinate_swarm(&self, context: &EnforcementContext) -> EnforcementResult {
        if !self.is_enabled() {
            return EnforcementResult::disabled();
        }
        let effective = self.effective_orchestration();
        if !effective.can_coordinate_swarms {
            return denied(EnforcementResult::deny(format!(
                "Swarm coordination is not allowed (configured level '{}', baseline '{}')",
                effective.level, BASELINE_LEVEL
            )));
        }
        log::debug!("Swarm coordination allowed for {:?}", context.assistant_id);
        EnforcementResult::allow(format!(
            "Swarm coordination allowed (max swarm size {})",
            effective.max_swarm_size
        ))
    }
}

fn denied(result: EnforcementResult) -> EnforcementResult {
    log::warn!("Capability check denied: {}", result.reason);
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn enforcer(config: CapabilitiesConfigShared) -> CapabilityEnforcer {
        CapabilityEnforcer::new(config)
    }

    fn ctx() -> EnforcementContext {
        EnforcementContext::for_assistant("assistant-1")
    }

    #[test]
    fn test_full_level_cannot_widen_baseline() {
        let e = enforcer(CapabilitiesConfigShared {
            orchestration_level: OrchestrationLevel::Full,
            max_concurrent_subassistants: Some(50),
            ..Default::default()
        });
        let effective = e.effective_orchestration();
        assert_eq!(effective.level, OrchestrationLevel::Full);
        assert!(!effective.can_coordinate_swarms);
        assert_eq!(effective.max_concurrent_subassistants, 5);
        assert_eq!(effective.max_subassistant_depth, 3);

        let result = e.can_coordinate_swarm(&ctx());
        assert!(!result.allowed);
        assert!(result.reason.contains("not allowed"));
    }

    #[test]
    fn test_coordinator_level_still_capped() {
        let e = enforcer(CapabilitiesConfigShared {
            orchestration_level: OrchestrationLevel::Coordinator,
            ..Default::default()
        });
        assert!(!e.can_coordinate_swarm(&ctx()).allowed);
    }

    #[test]
    fn test_spawn_denied_at_depth_limit() {
        let e = enforcer(CapabilitiesConfigShared {
            max_subassistant_depth: Some(1),
            ..Default::default()
        });
        let result = e.can_spawn_subassistant(&SpawnRequest {
            depth: 1,
            active_subassistants: None,
        });
        assert!(!result.allowed);
        assert!(result.reason.contains("depth"));

        assert!(e.can_spawn_subassistant(&SpawnRequest::default()).allowed);
    }

    #[test]
    fn test_spawn_denied_at_concurrency_limit() {
        let e = enforcer(CapabilitiesConfigShared {
            max_concurrent_subassistants: Some(2),
            ..Default::default()
        });
        let result = e.can_spawn_subassistant(&SpawnRequest {
            depth: 0,
            active_subassistants: Some(2),
        });
        assert!(!result.allowed);
        assert!(result.reason.contains("concurrent"));
    }

    #[test]
    fn test_spawn_warns_one_below_limit() {
        let e = enforcer(CapabilitiesConfigShared {
            max_concurrent_subassistants: Some(2),
            ..Default::default()
        });
        let result = e.can_spawn_subassistant(&SpawnRequest {
            depth: 0,
            active_subassistants: Some(1),
        });
        assert!(result.allowed);
        assert!(!result.warnings.is_empty());

        let relaxed = e.can_spawn_subassistant(&SpawnRequest {
            depth: 0,
            active_subassistants: Some(0),
        });
        assert!(relaxed.allowed);
        assert!(relaxed.warnings.is_empty());
    }

    #[test]
    fn test_spawn_denied_at_none_level() {
        let e = enforcer(CapabilitiesConfigShared {
            orchestration_level: OrchestrationLevel::None,
            ..Default::default()
        });
        let result = e.can_spawn_subassistant(&SpawnRequest::default());
        assert!(!result.allowed);
        assert!(result.reason.contains("not allowed"));
    }

    #[test]
    fn test_allow_list() {
        let e = enforcer(CapabilitiesConfigShared {
            tool_policy: ToolPolicy::AllowList,
            allowed_tools: vec!["file:read".into(), "search:*".into()],
            ..Default::default()
        });
        let denied = e.can_use_tool("bash", &ctx());
        assert!(!denied.allowed);
        assert!(denied.reason.contains("not in the allowed list"));

        assert!(e.can_use_tool("file:read", &ctx()).allowed);
        assert!(e.can_use_tool("search:web", &ctx()).allowed);
    }

    #[test]
    fn test_deny_list() {
        let e = enforcer(CapabilitiesConfigShared {
            tool_policy: ToolPolicy::DenyList,
            denied_tools: vec!["bash:*".into()],
            ..Default::default()
        });
        let result = e.can_use_tool("bash:execute", &ctx());
        assert!(!result.allowed);
        assert!(result.reason.contains("deny list"));
        assert!(e.can_use_tool("file:read", &ctx()).allowed);
    }

    #[test]
    fn test_deny_list_ignores_allowed_tools() {
        let e = enforcer(CapabilitiesConfigShared {
            tool_policy: ToolPolicy::DenyList,
            allowed_tools: vec!["bash:status".into()],
            denied_tools: vec!["bash:*".into()],
            ..Default::default()
        });
        let result = e.can_use_tool("bash:status", &ctx());
        assert!(!result.allowed);
        assert!(result.reason.contains("deny list"));
        assert!(!e.can_use_tool("bash:rm", &ctx()).allowed);
    }

    #[test]
    fn test_allow_list_ignores_denied_tools() {
        let e = enforcer(CapabilitiesConfigShared {
            tool_policy: ToolPolicy::AllowList,
            allowed_tools: vec!["*".into()],
            denied_tools: vec!["bash".into()],
            ..Default::default()
        });
        assert!(e.can_use_tool("bash", &ctx()).allowed);
        assert!(e.can_use_tool("file:read", &ctx()).allowed);
    }

    #[test]
    fn test_allow_all_ignores_both_lists() {
        let e = enforcer(CapabilitiesConfigShared {
            tool_policy: ToolPolicy::AllowAll,
            denied_tools: vec!["bash".into()],
            ..Default::default()
        });
        let result = e.can_use_tool("bash", &ctx());
        assert!(result.allowed);
        assert_eq!(result.requires_approval, None);
    }

    #[test]
    fn test_require_approval_allows_but_flags() {
        let e = enforcer(CapabilitiesConfigShared {
            tool_policy: ToolPolicy::RequireApproval,
            ..Default::default()
        });
        let result = e.can_use_tool("anything", &EnforcementContext::default());
        assert!(result.allowed);
        assert_eq!(result.requires_approval, Some(true));
    }

    #[test]
    fn test_allow_all_never_needs_approval() {
        let result = CapabilityEnforcer::default().can_use_tool("unknown-tool", &ctx());
        assert!(result.allowed);
        assert_eq!(result.requires_approval, None);
    }

    #[test]
    fn test_delegation() {
        assert!(CapabilityEnforcer::default().can_delegate("helper", &ctx()).allowed);
        let limited = enforcer(CapabilitiesConfigShared {
            orchestration_level: OrchestrationLevel::Limited,
            ..Default::default()
        });
        assert!(limited.can_delegate("helper", &ctx()).allowed);

        let none = enforcer(CapabilitiesConfigShared {
            orchestration_level: OrchestrationLevel::None,
            ..Default::default()
        });
        let result = none.can_delegate("helper", &ctx());
        assert!(!result.allowed);
        assert!(result.reason.contains("none"));
    }

    #[test]
    fn test_disabled_enforcer_allows_everything() {
        let e = enforcer(CapabilitiesConfigShared {
            enabled: false,
            orchestration_level: OrchestrationLevel::None,
            tool_policy: ToolPolicy::AllowList,
            max_subassistant_depth: Some(0),
            ..Default::default()
        });
        assert!(!e.is_enabled());

        let results = [
            e.can_spawn_subassistant(&SpawnRequest {
                depth: 9,
                active_subassistants: Some(99),
            }),
            e.can_use_tool("bash", &ctx()),
            e.can_delegate("helper", &ctx()),
            e.can_coordinate_swarm(&ctx()),
        ];
        for result in results {
            assert!(result.allowed);
            assert!(result.reason.contains("disabled"));
            assert!(result.warnings.is_empty());
            assert_eq!(result.requires_approval, None);
        }
    }

    #[test]
    fn test_toggle_enabled_without_rebuilding() {
        let e = enforcer(CapabilitiesConfigShared {
            tool_policy: ToolPolicy::AllowList,
            ..Default::default()
        });
        assert!(!e.can_use_tool("bash", &ctx()).allowed);
        e.set_enabled(false);
        assert!(e.can_use_tool("bash", &ctx()).allowed);
        e.set_enabled(true);
        assert!(!e.can_use_tool("bash", &ctx()).allowed);
        assert_eq!(e.config().tool_policy, ToolPolicy::AllowList);
    }

    #[test]
    fn test_update_config_in_place() {
        let e = CapabilityEnforcer::default();
        e.update_config(CapabilitiesConfigShared {
            orchestration_level: OrchestrationLevel::None,
            ..Default::default()
        });
        assert!(!e.can_delegate("helper", &ctx()).allowed);
    }

    #[test]
    fn test_constructors_reject_misconfiguration() {
        assert!(matches!(
            CapabilityEnforcer::from_preset("root"),
            Err(CapabilityError::UnknownPreset(_))
        ));
        assert!(matches!(
            CapabilityEnforcer::from_yaml("toolPolicy: sometimes\n"),
            Err(CapabilityError::Config(_))
        ));

        let restricted = CapabilityEnforcer::from_preset("restricted").unwrap();
        assert_eq!(restricted.effective_orchestration().level, OrchestrationLevel::Limited);
        assert_eq!(
            restricted.can_use_tool("file:read", &ctx()).requires_approval,
            Some(true)
        );

        let e = CapabilityEnforcer::from_yaml("orchestrationLevel: limited\n").unwrap();
        assert_eq!(e.effective_orchestration().max_concurrent_subassistants, 2);
    }

    #[test]
    fn test_result_serialization() {
        let result = EnforcementResult::allow("ok").requiring_approval();
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["requiresApproval"], serde_json::json!(true));
        let plain = serde_json::to_value(EnforcementResult::deny("no")).unwrap();
        assert!(plain.get("requiresApproval").is_none());
    }
}
