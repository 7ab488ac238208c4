//! Capability runtime context.
//!
//! Owns at most one [`CapabilityEnforcer`] and one [`CapabilityStorage`] for a
//! host application. Instances are created lazily on first access, updated
//! in place when accessed again with a new configuration, and torn down by
//! the `reset_*` methods. Hosts pass the runtime (or the `Arc`s it hands out)
//! explicitly; there is no process-wide global.

use std::sync::Arc;

use parking_lot::RwLock;

use super::capability::ResolvedCapabilitySet;
use super::config::{CapabilitiesConfigShared, CapabilityStorageConfig};
use super::enforcer::CapabilityEnforcer;
use super::resolver::resolve_with_override;
use super::storage::CapabilityStorage;

#[derive(Debug, Default)]
pub struct CapabilityRuntime {
    enforcer: RwLock<Option<Arc<CapabilityEnforcer>>>,
    storage: RwLock<Option<Arc<CapabilityStorage>>>,
}

impl CapabilityRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the enforcer, creating it on first access.
    ///
    /// With `Some(config)` an existing enforcer is reconfigured in place, so
    /// previously handed-out `Arc`s observe the new policy.
    pub fn enforcer(&self, config: Option<CapabilitiesConfigShared>) -> Arc<CapabilityEnforcer> {
        let mut slot = self.enforcer.write();
        if let Some(existing) = slot.as_ref() {
            if let Some(config) = config {
                log::info!("Reconfiguring capability enforcer");
                existing.update_config(config);
            }
            return Arc::clone(existing);
        }
        log::info!("Creating capability enforcer");
        let created = Arc::new(CapabilityEnforcer::new(config.unwrap_or_default()));
        *slot = Some(Arc::clone(&created));
        created
    }

    /// Drop the enforcer; the next access builds a fresh one.
    pub fn reset_enforcer(&self) {
        if self.enforcer.write().take().is_some() {
            log::info!("Capability enforcer reset");
        }
    }

    /// Get the storage, creating it on first access.
    pub fn storage(&self, config: Option<CapabilityStorageConfig>) -> Arc<CapabilityStorage> {
        let mut slot = self.storage.write();
        if let Some(existing) = slot.as_ref() {
            if let Some(config) = config {
                existing.update_config(config);
            }
            return Arc::clone(existing);
        }
        log::info!("Creating capability storage");
        let created = Arc::new(CapabilityStorage::new(config.unwrap_or_default()));
        *slot = Some(Arc::clone(&created));
        created
    }

    /// Drop the storage and everything it holds.
    pub fn reset_storage(&self) {
        if let Some(storage) = self.storage.write().take() {
            storage.clear();
            log::info!("Capability storage reset");
        }
    }

    /// Resolve an entity's stored chain with its stored override on top.
    ///
    /// `None` when the entity has neither.
    pub fn resolve_entity(&self, id: &str) -> Option<ResolvedCapabilitySet> {
        let storage = self.storage(None);
        let chain = storage.get_chain(id);
        let override_partial = storage.get_override(id);
        if chain.is_none() && override_partial.is_none() {
            return None;
        }
        Some(resolve_with_override(
            &chain.unwrap_or_default(),
            override_partial.as_ref(),
        ))
    }
}
