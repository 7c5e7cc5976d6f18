//! Backend Registry
//!
//! Central registry of the named backends participating in federation.

use std::collections::HashMap;
use std::sync::Arc;

use crate::engine::traits::Backend;

/// Registry that holds all connected backends, keyed by configured name
pub struct BackendRegistry {
    backends: HashMap<String, Arc<dyn Backend>>,
}

impl BackendRegistry {
    /// Creates a new empty registry
    pub fn new() -> Self {
        Self {
            backends: HashMap::new(),
        }
    }

    /// Registers a backend under its configured name
    pub fn register(&mut self, backend: Arc<dyn Backend>) {
        let name = backend.name().to_string();
        self.backends.insert(name, backend);
    }

    /// Gets a backend by name
    pub fn get(&self, name: &str) -> Option<Arc<dyn Backend>> {
        self.backends.get(name).cloned()
    }

    /// Lists all registered backend names in ascending order
    ///
    /// This is the canonical dispatch order for federated operations.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.backends.keys().cloned().collect();
        names.sort();
        names
    }

    /// Returns the number of registered backends
    pub fn len(&self) -> usize {
        self.backends.len()
    }

    /// Returns true if no backends are registered
    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }
}

impl Default for BackendRegistry {
    fn default() -> Self {
        Self::new()
    }
}
