//! # Assistant Capabilities
//!
//! Capability resolution, storage and enforcement for multi-agent
//! orchestration runtimes.
//!
//! The agent loop asks this crate, synchronously and before every action,
//! whether an assistant may spawn a sub-assistant, call a tool, delegate,
//! or coordinate a swarm. Policy is layered per scope (assistant, session,
//! organization, system) and folded into one authoritative set; runtime
//! guards can only narrow the fixed `standard` baseline, never widen it.
//!
//! The crate executes nothing and persists nothing: it answers "is this
//! allowed" and "how much budget remains".

pub mod capabilities;

pub use capabilities::{
    create_capability_chain, extend_capability_chain, resolve_capability_chain,
    AssistantCapabilitySet, CapabilitiesConfigShared, CapabilityChain, CapabilityEnforcer,
    CapabilityError, CapabilityRuntime, CapabilityScope, CapabilityStorage, EnforcementResult,
    PartialCapabilitySet, ResolvedCapabilitySet,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
