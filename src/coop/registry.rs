//! The environment-owned table of live cooperations, keyed by name.

// Layer 1: Standard library imports
// (none)

// Layer 2: Third-party crate imports
use dashmap::DashMap;

// Layer 3: Internal module imports
use super::handle::CoopHandle;

/// Registry of every cooperation currently registered in one environment.
/// Roots (cooperations with no parent) are what `environment.stop()` walks
/// to deregister everything on shutdown.
#[derive(Default)]
pub struct CoopRegistry {
    coops: DashMap<String, CoopHandle>,
}

impl CoopRegistry {
    /// Build an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a newly registered cooperation. Returns `false` (and leaves
    /// the registry unchanged) if the name is already taken.
    pub fn insert(&self, coop: CoopHandle) -> bool {
        if self.coops.contains_key(coop.name()) {
            return false;
        }
        self.coops.insert(coop.name().to_string(), coop);
        true
    }

    /// Look up a cooperation by name.
    pub fn get(&self, name: &str) -> Option<CoopHandle> {
        self.coops.get(name).map(|entry| entry.value().clone())
    }

    /// True if a cooperation with this name is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.coops.contains_key(name)
    }

    /// Remove a cooperation from the registry. Called once it has fully
    /// drained.
    pub fn remove(&self, name: &str) {
        self.coops.remove(name);
    }

    /// Every currently registered root cooperation (no parent). Walked by
    /// `environment.stop()`.
    pub fn roots(&self) -> Vec<CoopHandle> {
        self.coops
            .iter()
            .filter(|entry| entry.value().is_root())
            .map(|entry| entry.value().clone())
            .collect()
    }

    /// Number of cooperations currently registered.
    pub fn len(&self) -> usize {
        self.coops.len()
    }

    /// True if no cooperation is registered.
    pub fn is_empty(&self) -> bool {
        self.coops.is_empty()
    }
}
