//! Shared registry of loaded modules
//!
//! Every loader instance records its results here, keyed by dependency
//! name. [`ModuleRegistry::global`] is the process-wide registry used by
//! [`Initr::new`](crate::module::manager::Initr::new): created empty on
//! first use, written as dependencies finish loading, and cleared only by
//! an explicit [`reset`](ModuleRegistry::reset). Loaders built with an
//! explicit registry share only that registry.
//!
//! Entries are never removed on their own. Loading a name again replaces
//! the previous entry. All unnamed dependencies share the `None` key and
//! therefore replace each other.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::debug;

use crate::module::registry::descriptor::Dependency;
use crate::module::traits::Component;

/// Registry key: the dependency name, `None` for unnamed dependencies
pub type RegistryKey = Option<String>;

/// One loaded dependency
#[derive(Debug, Clone)]
pub struct RegistryEntry {
    /// The dependency as it was loaded
    pub dependency: Dependency,
    /// Instances, in source declaration order
    pub modules: Vec<Arc<dyn Component>>,
    /// Number of elements the instances were built against
    pub element_count: usize,
    /// Unix timestamp (seconds) when the entry was recorded
    pub loaded_at: u64,
}

static GLOBAL: OnceLock<ModuleRegistry> = OnceLock::new();

/// Handle to a registry; clones share the same underlying map
#[derive(Debug, Clone, Default)]
pub struct ModuleRegistry {
    entries: Arc<RwLock<HashMap<RegistryKey, RegistryEntry>>>,
}

impl ModuleRegistry {
    /// Create a new, empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry
    pub fn global() -> ModuleRegistry {
        GLOBAL.get_or_init(ModuleRegistry::new).clone()
    }

    /// Record an entry, returning the one it replaced
    pub fn insert(&self, key: RegistryKey, entry: RegistryEntry) -> Option<RegistryEntry> {
        let previous = self.write().insert(key.clone(), entry);
        if previous.is_some() {
            debug!("Registry entry {:?} replaced", key);
        }
        previous
    }

    /// Entry for a named dependency
    pub fn get(&self, name: &str) -> Option<RegistryEntry> {
        self.read().get(&Some(name.to_string())).cloned()
    }

    /// Entry for a key, including the shared unnamed slot (`None`)
    pub fn get_key(&self, key: Option<&str>) -> Option<RegistryEntry> {
        self.read().get(&key.map(str::to_string)).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.read().contains_key(&Some(name.to_string()))
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Keys currently present
    pub fn keys(&self) -> Vec<RegistryKey> {
        self.read().keys().cloned().collect()
    }

    /// Copy of the current contents
    pub fn snapshot(&self) -> HashMap<RegistryKey, RegistryEntry> {
        self.read().clone()
    }

    /// Remove every entry
    pub fn reset(&self) {
        self.write().clear();
        debug!("Registry reset");
    }

    /// Do both handles point at the same registry?
    pub fn ptr_eq(&self, other: &ModuleRegistry) -> bool {
        Arc::ptr_eq(&self.entries, &other.entries)
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<RegistryKey, RegistryEntry>> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<RegistryKey, RegistryEntry>> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }
}
