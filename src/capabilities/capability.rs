//! Capability data model.
//!
//! An [`AssistantCapabilitySet`] is the total, always fully populated policy
//! object handed to the agent loop. Each scope contributes a
//! [`PartialCapabilitySet`] in which every field is optional; absence means
//! "no opinion from this scope". The resolver folds partials into a total set.
//!
//! Example partial (YAML):
//! ```yaml
//! orchestration:
//!   level: limited
//!   maxConcurrentSubassistants: 2
//! tools:
//!   policy: deny_list
//!   capabilities:
//!     "bash:*": false
//! enabled: true
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::error::CapabilityError;
use super::pattern;

/// Ordered pattern map: glob pattern → allowed.
///
/// Insertion order is preserved; upserting an existing pattern keeps its
/// original position.
pub type PatternMap = IndexMap<String, bool>;

// ---------------------------------------------------------------------------
// Scopes
// ---------------------------------------------------------------------------

/// Who contributed an override.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum CapabilityScope {
    Assistant,
    Session,
    Organization,
    System,
    /// Any scope name outside the known ordering.
    Other(String),
}

/// Precedence for override fields, lowest first.
///
/// Scopes outside this list are folded before all of these.
pub static SCOPE_PRECEDENCE: [CapabilityScope; 4] = [
    CapabilityScope::Assistant,
    CapabilityScope::Session,
    CapabilityScope::Organization,
    CapabilityScope::System,
];

impl CapabilityScope {
    pub fn as_str(&self) -> &str {
        match self {
            CapabilityScope::Assistant => "assistant",
            CapabilityScope::Session => "session",
            CapabilityScope::Organization => "organization",
            CapabilityScope::System => "system",
            CapabilityScope::Other(name) => name,
        }
    }

    /// Position in [`SCOPE_PRECEDENCE`], or `None` for unknown scopes.
    pub fn precedence(&self) -> Option<usize> {
        SCOPE_PRECEDENCE.iter().position(|s| s == self)
    }
}

impl From<&str> for CapabilityScope {
    fn from(name: &str) -> Self {
        match name {
            "assistant" => CapabilityScope::Assistant,
            "session" => CapabilityScope::Session,
            "organization" => CapabilityScope::Organization,
            "system" => CapabilityScope::System,
            other => CapabilityScope::Other(other.to_string()),
        }
    }
}

impl From<String> for CapabilityScope {
    fn from(name: String) -> Self {
        CapabilityScope::from(name.as_str())
    }
}

impl From<CapabilityScope> for String {
    fn from(scope: CapabilityScope) -> Self {
        scope.as_str().to_string()
    }
}

impl fmt::Display for CapabilityScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Policy enums
// ---------------------------------------------------------------------------

/// Named bundle of spawn/delegate/swarm defaults, most restrictive first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrchestrationLevel {
    None,
    Limited,
    Standard,
    Full,
    Coordinator,
}

impl Default for OrchestrationLevel {
    fn default() -> Self {
        OrchestrationLevel::Standard
    }
}

impl OrchestrationLevel {
    pub const ALL: [OrchestrationLevel; 5] = [
        OrchestrationLevel::None,
        OrchestrationLevel::Limited,
        OrchestrationLevel::Standard,
        OrchestrationLevel::Full,
        OrchestrationLevel::Coordinator,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrchestrationLevel::None => "none",
            OrchestrationLevel::Limited => "limited",
            OrchestrationLevel::Standard => "standard",
            OrchestrationLevel::Full => "full",
            OrchestrationLevel::Coordinator => "coordinator",
        }
    }
}

impl FromStr for OrchestrationLevel {
    type Err = CapabilityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(OrchestrationLevel::None),
            "limited" => Ok(OrchestrationLevel::Limited),
            "standard" => Ok(OrchestrationLevel::Standard),
            "full" => Ok(OrchestrationLevel::Full),
            "coordinator" => Ok(OrchestrationLevel::Coordinator),
            other => Err(CapabilityError::invalid("orchestration level", other)),
        }
    }
}

impl fmt::Display for OrchestrationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Access policy for tools and skills.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolPolicy {
    AllowAll,
    AllowList,
    DenyList,
    RequireApproval,
}

impl Default for ToolPolicy {
    fn default() -> Self {
        ToolPolicy::AllowAll
    }
}

impl ToolPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolPolicy::AllowAll => "allow_all",
            ToolPolicy::AllowList => "allow_list",
            ToolPolicy::DenyList => "deny_list",
            ToolPolicy::RequireApproval => "require_approval",
        }
    }
}

impl FromStr for ToolPolicy {
    type Err = CapabilityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "allow_all" => Ok(ToolPolicy::AllowAll),
            "allow_list" => Ok(ToolPolicy::AllowList),
            "deny_list" => Ok(ToolPolicy::DenyList),
            "require_approval" => Ok(ToolPolicy::RequireApproval),
            other => Err(CapabilityError::invalid("tool policy", other)),
        }
    }
}

impl fmt::Display for ToolPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Default approval requirement for actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalLevel {
    None,
    Require,
}

impl Default for ApprovalLevel {
    fn default() -> Self {
        ApprovalLevel::None
    }
}

impl FromStr for ApprovalLevel {
    type Err = CapabilityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(ApprovalLevel::None),
            "require" => Ok(ApprovalLevel::Require),
            other => Err(CapabilityError::invalid("approval level", other)),
        }
    }
}

/// Category of an [`AssistantCapabilitySet`], used as the key of
/// [`ResolvedCapabilitySet::sources`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapabilityCategory {
    Orchestration,
    Tools,
    Skills,
    Models,
    Approval,
    Communication,
    Memory,
    Budget,
}

// ---------------------------------------------------------------------------
// Total capability set
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrchestrationCapabilities {
    pub level: OrchestrationLevel,
    pub can_spawn_subassistants: bool,
    pub max_concurrent_subassistants: u32,
    pub max_subassistant_depth: u32,
    pub can_coordinate_swarms: bool,
    pub max_swarm_size: u32,
    pub can_delegate: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCapabilities {
    pub policy: ToolPolicy,
    /// Pattern → allowed. Empty means no per-tool opinion.
    #[serde(default)]
    pub capabilities: PatternMap,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillCapabilities {
    pub policy: ToolPolicy,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelCapabilities {
    #[serde(default)]
    pub allowed: PatternMap,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalCapabilities {
    pub default_level: ApprovalLevel,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommunicationCapabilities {
    pub can_send_messages: bool,
    pub can_receive_messages: bool,
    pub can_broadcast: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryCapabilities {
    pub can_access_global_memory: bool,
    pub can_write_memory: bool,
    pub allowed_memory_scopes: BTreeSet<String>,
}

/// Budget ceilings. `None` means unlimited in a total set and "no opinion"
/// in a partial one; both merge identically under `min`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetLimits {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_total_tokens: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_llm_calls: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tool_calls: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_duration_ms: Option<u64>,
}

impl BudgetLimits {
    pub fn is_unlimited(&self) -> bool {
        *self == BudgetLimits::default()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetCapabilities {
    #[serde(default)]
    pub limits: BudgetLimits,
    pub can_override_budget: bool,
}

/// The total policy object. Every field is always defined.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssistantCapabilitySet {
    pub orchestration: OrchestrationCapabilities,
    pub tools: ToolCapabilities,
    pub skills: SkillCapabilities,
    pub models: ModelCapabilities,
    pub approval: ApprovalCapabilities,
    pub communication: CommunicationCapabilities,
    pub memory: MemoryCapabilities,
    pub budget: BudgetCapabilities,
    pub enabled: bool,
}

// ---------------------------------------------------------------------------
// Partial (per-scope) capability set
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PartialOrchestration {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<OrchestrationLevel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub can_spawn_subassistants: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_concurrent_subassistants: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_subassistant_depth: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub can_coordinate_swarms: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_swarm_size: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub can_delegate: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PartialTools {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub policy: Option<ToolPolicy>,
    /// Entries to upsert into the accumulated pattern map.
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub capabilities: PatternMap,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PartialSkills {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub policy: Option<ToolPolicy>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PartialModels {
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub allowed: PatternMap,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PartialApproval {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_level: Option<ApprovalLevel>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PartialCommunication {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub can_send_messages: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub can_receive_messages: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub can_broadcast: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PartialMemory {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub can_access_global_memory: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub can_write_memory: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allowed_memory_scopes: Option<BTreeSet<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PartialBudget {
    #[serde(skip_serializing_if = "BudgetLimits::is_unlimited")]
    pub limits: BudgetLimits,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub can_override_budget: Option<bool>,
}

/// One scope's contribution to a chain. Any subset of fields may be present.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PartialCapabilitySet {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub orchestration: Option<PartialOrchestration>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<PartialTools>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skills: Option<PartialSkills>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub models: Option<PartialModels>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approval: Option<PartialApproval>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub communication: Option<PartialCommunication>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory: Option<PartialMemory>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub budget: Option<PartialBudget>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
}

impl PartialCapabilitySet {
    /// A partial with no opinion on anything.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Parse a partial from YAML.
    pub fn from_yaml(yaml: &str) -> Result<Self, CapabilityError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Parse a partial from a JSON value.
    pub fn from_json_value(value: serde_json::Value) -> Result<Self, CapabilityError> {
        Ok(serde_json::from_value(value)?)
    }
}

impl From<&AssistantCapabilitySet> for PartialCapabilitySet {
    fn from(set: &AssistantCapabilitySet) -> Self {
        let o = &set.orchestration;
        Self {
            orchestration: Some(PartialOrchestration {
                level: Some(o.level),
                can_spawn_subassistants: Some(o.can_spawn_subassistants),
                max_concurrent_subassistants: Some(o.max_concurrent_subassistants),
                max_subassistant_depth: Some(o.max_subassistant_depth),
                can_coordinate_swarms: Some(o.can_coordinate_swarms),
                max_swarm_size: Some(o.max_swarm_size),
                can_delegate: Some(o.can_delegate),
            }),
            tools: Some(PartialTools {
                policy: Some(set.tools.policy),
                capabilities: set.tools.capabilities.clone(),
            }),
            skills: Some(PartialSkills {
                policy: Some(set.skills.policy),
            }),
            models: Some(PartialModels {
                allowed: set.models.allowed.clone(),
            }),
            approval: Some(PartialApproval {
                default_level: Some(set.approval.default_level),
            }),
            communication: Some(PartialCommunication {
                can_send_messages: Some(set.communication.can_send_messages),
                can_receive_messages: Some(set.communication.can_receive_messages),
                can_broadcast: Some(set.communication.can_broadcast),
            }),
            memory: Some(PartialMemory {
                can_access_global_memory: Some(set.memory.can_access_global_memory),
                can_write_memory: Some(set.memory.can_write_memory),
                allowed_memory_scopes: Some(set.memory.allowed_memory_scopes.clone()),
            }),
            budget: Some(PartialBudget {
                limits: set.budget.limits,
                can_override_budget: Some(set.budget.can_override_budget),
            }),
            enabled: Some(set.enabled),
        }
    }
}

// ---------------------------------------------------------------------------
// Resolved capability set
// ---------------------------------------------------------------------------

/// Output of the resolver: a total set, which scope supplied each
/// category's override values, and when it was computed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedCapabilitySet {
    #[serde(flatten)]
    pub capabilities: AssistantCapabilitySet,
    /// Scope that last set an override field of each category. Pattern
    /// upserts and restrictive merges are not recorded.
    pub sources: BTreeMap<CapabilityCategory, String>,
    pub resolved_at: DateTime<Utc>,
}

/// Resources consumed so far, measured against [`BudgetLimits`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetUsage {
    pub total_tokens: u64,
    pub llm_calls: u64,
    pub tool_calls: u64,
    pub duration_ms: u64,
}

/// Remaining headroom per limit; `None` means unlimited.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetRemaining {
    pub total_tokens: Option<u64>,
    pub llm_calls: Option<u64>,
    pub tool_calls: Option<u64>,
    pub duration_ms: Option<u64>,
}

impl BudgetRemaining {
    /// True if any bounded resource has no headroom left.
    pub fn exhausted(&self) -> bool {
        [
            self.total_tokens,
            self.llm_calls,
            self.tool_calls,
            self.duration_ms,
        ]
        .iter()
        .any(|r| *r == Some(0))
    }
}

impl ResolvedCapabilitySet {
    /// Most specific tool pattern verdict for `name`, if any pattern matches.
    pub fn tool_permission(&self, name: &str) -> Option<bool> {
        pattern::lookup(&self.capabilities.tools.capabilities, name)
    }

    /// Most specific model pattern verdict for `model`, if any pattern matches.
    pub fn model_permission(&self, model: &str) -> Option<bool> {
        pattern::lookup(&self.capabilities.models.allowed, model)
    }

    /// Combine the resolved tool policy with the resolved tool pattern map.
    ///
    /// The map carries per-pattern verdicts from every scope, so an explicit
    /// deny is honoured under `allow_all` too. This is stricter than
    /// [`CapabilityEnforcer::can_use_tool`](super::enforcer::CapabilityEnforcer::can_use_tool),
    /// which checks the host config's flat lists and allows everything under
    /// `allow_all`. Callers holding a resolved set should gate on both.
    ///
    /// Under `require_approval` this returns true; the caller must still
    /// gate execution on approval.
    pub fn is_tool_allowed(&self, name: &str) -> bool {
        if !self.capabilities.enabled {
            return false;
        }
        let verdict = self.tool_permission(name);
        match self.capabilities.tools.policy {
            ToolPolicy::AllowList => verdict == Some(true),
            ToolPolicy::AllowAll | ToolPolicy::DenyList | ToolPolicy::RequireApproval => {
                verdict != Some(false)
            }
        }
    }

    /// A model is allowed unless its most specific pattern denies it.
    pub fn is_model_allowed(&self, model: &str) -> bool {
        self.capabilities.enabled && self.model_permission(model) != Some(false)
    }

    pub fn allows_memory_scope(&self, scope: &str) -> bool {
        self.capabilities.memory.allowed_memory_scopes.contains(scope)
    }

    /// Headroom left under the resolved budget limits.
    pub fn remaining_budget(&self, usage: &BudgetUsage) -> BudgetRemaining {
        let limits = &self.capabilities.budget.limits;
        let left = |limit: Option<u64>, used: u64| limit.map(|l| l.saturating_sub(used));
        BudgetRemaining {
            total_tokens: left(limits.max_total_tokens, usage.total_tokens),
            llm_calls: left(limits.max_llm_calls, usage.llm_calls),
            tool_calls: left(limits.max_tool_calls, usage.tool_calls),
            duration_ms: left(limits.max_duration_ms, usage.duration_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_scope_names_round_trip_through_strings() {
        assert_eq!(CapabilityScope::from("system"), CapabilityScope::System);
        assert_eq!(
            CapabilityScope::from("team"),
            CapabilityScope::Other("team".to_string())
        );
        assert_eq!(CapabilityScope::Organization.to_string(), "organization");
        assert_eq!(CapabilityScope::Other("team".into()).precedence(), None);
        assert!(
            CapabilityScope::Assistant.precedence() < CapabilityScope::System.precedence()
        );
    }

    #[test]
    fn test_malformed_enum_values_are_rejected() {
        assert_eq!("full".parse::<OrchestrationLevel>(), Ok(OrchestrationLevel::Full));
        assert!(matches!(
            "godmode".parse::<OrchestrationLevel>(),
            Err(CapabilityError::InvalidValue { field: "orchestration level", .. })
        ));
        assert_eq!("deny_list".parse::<ToolPolicy>(), Ok(ToolPolicy::DenyList));
        assert!("allow_some".parse::<ToolPolicy>().is_err());
        assert!("maybe".parse::<ApprovalLevel>().is_err());
    }

    #[test]
    fn test_partial_from_json_uses_camel_case() {
        let partial = PartialCapabilitySet::from_json_value(json!({
            "orchestration": { "level": "limited", "maxConcurrentSubassistants": 2 },
            "tools": { "capabilities": { "bash:*": false } },
            "enabled": false
        }))
        .unwrap();

        let orch = partial.orchestration.unwrap();
        assert_eq!(orch.level, Some(OrchestrationLevel::Limited));
        assert_eq!(orch.max_concurrent_subassistants, Some(2));
        assert_eq!(orch.max_subassistant_depth, None);
        assert_eq!(partial.tools.unwrap().capabilities.get("bash:*"), Some(&false));
        assert_eq!(partial.enabled, Some(false));
        assert!(partial.skills.is_none());
    }

    #[test]
    fn test_partial_from_yaml_rejects_unknown_policy() {
        let err = PartialCapabilitySet::from_yaml("tools:\n  policy: sometimes\n").unwrap_err();
        assert!(matches!(err, CapabilityError::Config(_)));
    }

    #[test]
    fn test_empty_partial_serializes_to_empty_object() {
        let partial = PartialCapabilitySet::empty();
        assert!(partial.is_empty());
        assert_eq!(serde_json::to_value(&partial).unwrap(), json!({}));
    }

    #[test]
    fn test_resolved_allow_all_honours_explicit_denies() {
        let mut capabilities = crate::capabilities::defaults::default_capability_set();
        capabilities.tools.capabilities.insert("bash:*".to_string(), false);
        let resolved = ResolvedCapabilitySet {
            capabilities,
            sources: BTreeMap::new(),
            resolved_at: Utc::now(),
        };
        assert_eq!(resolved.capabilities.tools.policy, ToolPolicy::AllowAll);
        assert!(!resolved.is_tool_allowed("bash:rm"));
        assert!(resolved.is_tool_allowed("file:read"));
    }

    #[test]
    fn test_budget_remaining_saturates() {
        let remaining = BudgetRemaining {
            total_tokens: Some(0),
            ..Default::default()
        };
        assert!(remaining.exhausted());
        assert!(!BudgetRemaining::default().exhausted());
    }
}
