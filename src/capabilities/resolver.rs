//! Chain resolution: fold per-scope partials into one total capability set.
//!
//! Two merge semantics apply, field by field:
//!
//! - **Override** (`orchestration.level`, `tools.policy`, `skills.policy`,
//!   `approval.defaultLevel`): the highest-precedence scope that sets the
//!   field wins, and is recorded in `sources`.
//! - **Restrictive**: numeric ceilings take the minimum and booleans are
//!   AND-ed, regardless of scope order. A single `false` or a single low
//!   ceiling from any scope is final.
//!
//! Pattern maps (tool capabilities, allowed models) are upserted by pattern
//! key. Glob specificity is resolved at lookup time, not here.

use std::collections::BTreeMap;

use chrono::Utc;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::capability::{
    AssistantCapabilitySet, CapabilityCategory, CapabilityScope, OrchestrationCapabilities,
    PartialCapabilitySet, PartialOrchestration, PatternMap, ResolvedCapabilitySet,
    SCOPE_PRECEDENCE,
};
use super::defaults::default_capability_set;

/// Source label recorded for an ad hoc override folded after the chain.
pub const OVERRIDE_SOURCE: &str = "override";

/// Per-scope partial capability sets awaiting resolution.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CapabilityChain {
    entries: IndexMap<CapabilityScope, PartialCapabilitySet>,
}

impl CapabilityChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, scope: &CapabilityScope) -> Option<&PartialCapabilitySet> {
        self.entries.get(scope)
    }

    pub fn contains(&self, scope: &CapabilityScope) -> bool {
        self.entries.contains_key(scope)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn scopes(&self) -> impl Iterator<Item = &CapabilityScope> {
        self.entries.keys()
    }

    /// Entries in resolution order: unknown scopes first (by name), then the
    /// known scopes in ascending precedence.
    pub fn in_precedence_order(&self) -> Vec<(&CapabilityScope, &PartialCapabilitySet)> {
        let mut unknown: Vec<_> = self
            .entries
            .iter()
            .filter(|(scope, _)| scope.precedence().is_none())
            .collect();
        unknown.sort_by(|a, b| a.0.as_str().cmp(b.0.as_str()));

        let known = SCOPE_PRECEDENCE
            .iter()
            .filter_map(|scope| self.entries.get_key_value(scope));

        unknown.into_iter().chain(known).collect()
    }

    /// Insert or replace a scope's entry in place.
    pub fn insert(&mut self, scope: CapabilityScope, partial: PartialCapabilitySet) {
        self.entries.insert(scope, partial);
    }

    pub fn remove(&mut self, scope: &CapabilityScope) -> Option<PartialCapabilitySet> {
        self.entries.shift_remove(scope)
    }
}

impl FromIterator<(CapabilityScope, PartialCapabilitySet)> for CapabilityChain {
    fn from_iter<I: IntoIterator<Item = (CapabilityScope, PartialCapabilitySet)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// Build a single-entry chain.
pub fn create_capability_chain(
    scope: CapabilityScope,
    partial: PartialCapabilitySet,
) -> CapabilityChain {
    let mut chain = CapabilityChain::new();
    chain.insert(scope, partial);
    chain
}

/// Return a new chain equal to `chain` with `scope`'s entry added or
/// replaced. The argument is left untouched.
pub fn extend_capability_chain(
    chain: &CapabilityChain,
    scope: CapabilityScope,
    partial: PartialCapabilitySet,
) -> CapabilityChain {
    let mut extended = chain.clone();
    extended.insert(scope, partial);
    extended
}

/// Fold a chain into a total, fully populated capability set.
pub fn resolve_capability_chain(chain: &CapabilityChain) -> ResolvedCapabilitySet {
    resolve_with_override(chain, None)
}

/// Resolve `chain`, then fold `override_partial` on top of every scope.
pub fn resolve_with_override(
    chain: &CapabilityChain,
    override_partial: Option<&PartialCapabilitySet>,
) -> ResolvedCapabilitySet {
    let mut capabilities = default_capability_set();
    let mut sources = BTreeMap::new();

    let ordered = chain.in_precedence_order();
    log::debug!(
        "Resolving capability chain: [{}]{}",
        ordered
            .iter()
            .map(|(scope, _)| scope.as_str())
            .collect::<Vec<_>>()
            .join(", "),
        if override_partial.is_some() { " + override" } else { "" }
    );

    for (scope, partial) in ordered {
        apply_partial(&mut capabilities, &mut sources, scope.as_str(), partial);
    }
    if let Some(partial) = override_partial {
        apply_partial(&mut capabilities, &mut sources, OVERRIDE_SOURCE, partial);
    }

    ResolvedCapabilitySet {
        capabilities,
        sources,
        resolved_at: Utc::now(),
    }
}

/// Merge one scope's partial into the accumulator.
fn apply_partial(
    acc: &mut AssistantCapabilitySet,
    sources: &mut BTreeMap<CapabilityCategory, String>,
    source: &str,
    partial: &PartialCapabilitySet,
) {
    let mut record = |category: CapabilityCategory| {
        sources.insert(category, source.to_string());
    };

    if let Some(o) = &partial.orchestration {
        if merge_orchestration(&mut acc.orchestration, o) {
            record(CapabilityCategory::Orchestration);
        }
    }

    if let Some(tools) = &partial.tools {
        upsert(&mut acc.tools.capabilities, &tools.capabilities);
        if let Some(policy) = tools.policy {
            acc.tools.policy = policy;
            record(CapabilityCategory::Tools);
        }
    }

    if let Some(policy) = partial.skills.as_ref().and_then(|s| s.policy) {
        acc.skills.policy = policy;
        record(CapabilityCategory::Skills);
    }

    if let Some(models) = &partial.models {
        upsert(&mut acc.models.allowed, &models.allowed);
    }

    if let Some(level) = partial.approval.as_ref().and_then(|a| a.default_level) {
        acc.approval.default_level = level;
        record(CapabilityCategory::Approval);
    }

    if let Some(c) = &partial.communication {
        let target = &mut acc.communication;
        and(&mut target.can_send_messages, c.can_send_messages);
        and(&mut target.can_receive_messages, c.can_receive_messages);
        and(&mut target.can_broadcast, c.can_broadcast);
    }

    if let Some(m) = &partial.memory {
        let target = &mut acc.memory;
        and(&mut target.can_access_global_memory, m.can_access_global_memory);
        and(&mut target.can_write_memory, m.can_write_memory);
        if let Some(scopes) = &m.allowed_memory_scopes {
            target.allowed_memory_scopes.retain(|s| scopes.contains(s));
        }
    }

    if let Some(b) = &partial.budget {
        let limits = &mut acc.budget.limits;
        min_limit(&mut limits.max_total_tokens, b.limits.max_total_tokens);
        min_limit(&mut limits.max_llm_calls, b.limits.max_llm_calls);
        min_limit(&mut limits.max_tool_calls, b.limits.max_tool_calls);
        min_limit(&mut limits.max_duration_ms, b.limits.max_duration_ms);
        and(&mut acc.budget.can_override_budget, b.can_override_budget);
    }

    and(&mut acc.enabled, partial.enabled);
}

/// Merge an orchestration partial: level overrides, booleans AND, ceilings
/// take the minimum. Returns whether the level was overridden.
///
/// Shared with the enforcer so both paths narrow identically.
pub(crate) fn merge_orchestration(
    target: &mut OrchestrationCapabilities,
    o: &PartialOrchestration,
) -> bool {
    and(&mut target.can_spawn_subassistants, o.can_spawn_subassistants);
    min(&mut target.max_concurrent_subassistants, o.max_concurrent_subassistants);
    min(&mut target.max_subassistant_depth, o.max_subassistant_depth);
    and(&mut target.can_coordinate_swarms, o.can_coordinate_swarms);
    min(&mut target.max_swarm_size, o.max_swarm_size);
    and(&mut target.can_delegate, o.can_delegate);
    match o.level {
        Some(level) => {
            target.level = level;
            true
        }
        None => false,
    }
}

fn and(acc: &mut bool, value: Option<bool>) {
    if let Some(v) = value {
        *acc = *acc && v;
    }
}

fn min(acc: &mut u32, value: Option<u32>) {
    if let Some(v) = value {
        *acc = (*acc).min(v);
    }
}

/// `None` on the accumulator is unlimited, so any concrete value narrows it.
fn min_limit(acc: &mut Option<u64>, value: Option<u64>) {
    if let Some(v) = value {
        *acc = Some(acc.map_or(v, |current| current.min(v)));
    }
}

/// Upsert `entries` into `acc` by pattern; returns whether anything was applied.
fn upsert(acc: &mut PatternMap, entries: &PatternMap) {
    for (pattern, allowed) in entries {
        acc.insert(pattern.clone(), *allowed);
    }
}
