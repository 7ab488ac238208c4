//! # Assistant Capabilities
//!
//! Decides what an assistant or sub-assistant may do: spawn sub-assistants,
//! call tools, delegate, coordinate swarms, spend budget.
//!
//! ## Architecture
//!
//! ```text
//! defaults (static tables, presets)
//!    ├──► resolver   chain of per-scope partials ──► ResolvedCapabilitySet
//!    │       ▲
//!    │    storage    per-entity chain + override (in memory)
//!    │
//!    └──► enforcer   host config ∧ standard baseline ──► EnforcementResult
//! ```
//!
//! ## Scope precedence
//!
//! `assistant < session < organization < system`. Higher scopes win
//! override fields (levels, policies). Restrictive fields (ceilings,
//! booleans) ignore precedence: the strictest contribution wins.
//!
//! ## Resolution Flow
//!
//! 1. Admin UI stores a chain: `storage.set_chain("assistant-7", chain)`
//! 2. Agent loop resolves it: `resolve_capability_chain(&chain)`
//! 3. Guards are consulted per action: `enforcer.can_use_tool("bash", &ctx)`
//! 4. `allowed: false` is a hard stop; `requires_approval` pauses for approval

pub mod capability;
pub mod config;
pub mod defaults;
pub mod enforcer;
pub mod error;
pub mod pattern;
pub mod resolver;
pub mod runtime;
pub mod storage;

pub use capability::{
    ApprovalLevel, AssistantCapabilitySet, BudgetLimits, BudgetRemaining, BudgetUsage,
    CapabilityCategory, CapabilityScope, OrchestrationCapabilities, OrchestrationLevel,
    PartialCapabilitySet, PatternMap, ResolvedCapabilitySet, ToolPolicy, SCOPE_PRECEDENCE,
};
pub use config::{CapabilitiesConfigShared, CapabilityStorageConfig};
pub use defaults::{
    config_to_capabilities, default_capability_set, get_capability_preset,
    get_default_capabilities, orchestration_defaults, CapabilityPreset, ORCHESTRATION_DEFAULTS,
};
pub use enforcer::{CapabilityEnforcer, EnforcementContext, EnforcementResult, SpawnRequest};
pub use error::CapabilityError;
pub use resolver::{
    create_capability_chain, extend_capability_chain, resolve_capability_chain,
    resolve_with_override, CapabilityChain,
};
pub use runtime::CapabilityRuntime;
pub use storage::CapabilityStorage;
