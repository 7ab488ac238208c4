//! In-memory repository of per-entity capability overlays.
//!
//! Each entity id has two independent slots: a full [`CapabilityChain`] and a
//! single ad hoc override partial (e.g. an emergency admin restriction).
//! Storage is pure CRUD; merging is the resolver's job. Durable persistence
//! is left to the caller.

use std::collections::{BTreeSet, HashMap};

use parking_lot::RwLock;

use super::capability::PartialCapabilitySet;
use super::config::CapabilityStorageConfig;
use super::resolver::CapabilityChain;

/// Thread-safe keyed store of chains and overrides.
#[derive(Debug, Default)]
pub struct CapabilityStorage {
    config: RwLock<CapabilityStorageConfig>,

    /// Entity id → chain
    chains: RwLock<HashMap<String, CapabilityChain>>,

    /// Entity id → ad hoc override
    overrides: RwLock<HashMap<String, PartialCapabilitySet>>,
}

impl CapabilityStorage {
    pub fn new(config: CapabilityStorageConfig) -> Self {
        Self {
            config: RwLock::new(config),
            chains: RwLock::new(HashMap::new()),
            overrides: RwLock::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> CapabilityStorageConfig {
        self.config.read().clone()
    }

    pub fn update_config(&self, config: CapabilityStorageConfig) {
        *self.config.write() = config;
    }

    /// Store or replace the chain for `id`.
    pub fn set_chain(&self, id: &str, chain: CapabilityChain) {
        log::debug!("Storing capability chain for '{}' ({} scopes)", id, chain.len());
        self.chains.write().insert(id.to_string(), chain);
    }

    pub fn get_chain(&self, id: &str) -> Option<CapabilityChain> {
        self.chains.read().get(id).cloned()
    }

    /// Remove the chain for `id`; true iff one was present.
    pub fn remove_chain(&self, id: &str) -> bool {
        self.chains.write().remove(id).is_some()
    }

    /// Store or replace the override for `id`.
    pub fn set_override(&self, id: &str, partial: PartialCapabilitySet) {
        log::debug!("Storing capability override for '{}'", id);
        self.overrides.write().insert(id.to_string(), partial);
    }

    pub fn get_override(&self, id: &str) -> Option<PartialCapabilitySet> {
        self.overrides.read().get(id).cloned()
    }

    /// Remove the override for `id`; true iff one was present.
    pub fn remove_override(&self, id: &str) -> bool {
        self.overrides.write().remove(id).is_some()
    }

    /// Every id with a chain or an override, each once, sorted.
    pub fn list_entities(&self) -> Vec<String> {
        let chains = self.chains.read();
        let overrides = self.overrides.read();
        chains
            .keys()
            .chain(overrides.keys())
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Number of distinct entities held.
    pub fn len(&self) -> usize {
        self.list_entities().len()
    }

    pub fn is_empty(&self) -> bool {
        self.chains.read().is_empty() && self.overrides.read().is_empty()
    }

    /// Drop every chain and override.
    pub fn clear(&self) {
        self.chains.write().clear();
        self.overrides.write().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::capability::CapabilityScope;
    use crate::capabilities::resolver::create_capability_chain;
    use std::sync::Arc;

    fn org_disabled() -> CapabilityChain {
        create_capability_chain(
            CapabilityScope::Organization,
            PartialCapabilitySet {
                enabled: Some(false),
                ..Default::default()
            },
        )
    }

    #[test]
    fn test_chain_crud() {
        let storage = CapabilityStorage::new(CapabilityStorageConfig::default());
        assert!(storage.get_chain("a1").is_none());
        assert!(!storage.remove_chain("a1"));

        storage.set_chain("a1", org_disabled());
        assert_eq!(storage.get_chain("a1"), Some(org_disabled()));

        storage.set_chain("a1", CapabilityChain::new());
        assert_eq!(storage.get_chain("a1"), Some(CapabilityChain::new()));

        assert!(storage.remove_chain("a1"));
        assert!(!storage.remove_chain("a1"));
        assert!(storage.get_chain("a1").is_none());
    }

    #[test]
    fn test_override_slot_is_independent() {
        let storage = CapabilityStorage::new(CapabilityStorageConfig::default());
        let patch = PartialCapabilitySet {
            enabled: Some(false),
            ..Default::default()
        };

        storage.set_override("a1", patch.clone());
        assert!(storage.get_chain("a1").is_none());
        assert_eq!(storage.get_override("a1"), Some(patch));

        storage.set_chain("a1", org_disabled());
        assert!(storage.remove_override("a1"));
        assert!(storage.get_override("a1").is_none());
        assert!(storage.get_chain("a1").is_some());
    }

    #[test]
    fn test_list_entities_is_a_deduplicated_union() {
        let storage = CapabilityStorage::new(CapabilityStorageConfig::default());
        storage.set_chain("b", CapabilityChain::new());
        storage.set_chain("a", CapabilityChain::new());
        storage.set_override("a", PartialCapabilitySet::empty());
        storage.set_override("c", PartialCapabilitySet::empty());

        assert_eq!(storage.list_entities(), vec!["a", "b", "c"]);
        assert_eq!(storage.len(), 3);

        storage.clear();
        assert!(storage.is_empty());
        assert!(storage.list_entities().is_empty());
    }

    #[test]
    fn test_enabled_flag_does_not_gate_operations() {
        let storage = CapabilityStorage::new(CapabilityStorageConfig { enabled: false });
        storage.set_chain("a1", org_disabled());
        assert!(storage.get_chain("a1").is_some());

        storage.update_config(CapabilityStorageConfig { enabled: true });
        assert!(storage.config().enabled);
    }

    #[test]
    fn test_concurrent_writers() {
        let storage = Arc::new(CapabilityStorage::default());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let storage = Arc::clone(&storage);
                std::thread::spawn(move || {
                    for j in 0..50 {
                        let id = format!("agent-{}-{}", i, j);
                        storage.set_chain(&id, CapabilityChain::new());
                        storage.set_override(&id, PartialCapabilitySet::empty());
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(storage.len(), 400);
    }
}
