//! # Backend Registry
//!
//! Maps a backend type name to the factory that builds its module.
//! Created once at start-up and shared by `Arc`.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::config::EvaluatorConfig;
use crate::enumeration::{EnumerationBackendModule, EnumerationCatalog};
use crate::memory::{MemoryBackendModule, MemoryRecordStore};
use crate::observability::Event;

use super::capability::CapabilitySet;
use super::errors::{DispatchError, DispatchResult};
use super::module::BackendModule;

/// Builds a fresh module for each resolve
pub type ModuleFactory = Arc<dyn Fn() -> Box<dyn BackendModule> + Send + Sync>;

/// Registration entry for one backend type
#[derive(Clone)]
pub struct BackendModuleDescriptor {
    pub backend_type: String,
    pub factory: ModuleFactory,
}

impl BackendModuleDescriptor {
    pub fn new<F>(backend_type: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> Box<dyn BackendModule> + Send + Sync + 'static,
    {
        Self {
            backend_type: backend_type.into(),
            factory: Arc::new(factory),
        }
    }
}

impl fmt::Debug for BackendModuleDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendModuleDescriptor")
            .field("backend_type", &self.backend_type)
            .finish_non_exhaustive()
    }
}

/// Registry of backend module factories
#[derive(Default)]
pub struct BackendRegistry {
    factories: RwLock<HashMap<String, ModuleFactory>>,
}

impl BackendRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the in-memory and enumeration backends
    pub fn with_builtin_backends(
        store: Arc<MemoryRecordStore>,
        catalog: Arc<EnumerationCatalog>,
        config: EvaluatorConfig,
    ) -> Self {
        let registry = Self::new();
        registry.register(MemoryBackendModule::descriptor(store, config.clone()));
        registry.register(EnumerationBackendModule::descriptor(catalog, config));
        registry
    }

    /// Register a backend type, replacing any previous registration.
    ///
    /// Returns true if an existing registration was replaced.
    pub fn register(&self, descriptor: BackendModuleDescriptor) -> bool {
        let BackendModuleDescriptor {
            backend_type,
            factory,
        } = descriptor;
        let replaced = self
            .factories
            .write()
            .insert(backend_type.clone(), factory)
            .is_some();

        if replaced {
            warn!(
                target: "backplane::registry",
                event = Event::BackendReplaced.as_str(),
                backend_type = %backend_type,
                "backend type re-registered; previous module replaced"
            );
        } else {
            debug!(
                target: "backplane::registry",
                event = Event::BackendRegistered.as_str(),
                backend_type = %backend_type,
                "backend type registered"
            );
        }
        replaced
    }

    /// Build the module registered for `backend_type`
    pub fn resolve(&self, backend_type: &str) -> DispatchResult<Box<dyn BackendModule>> {
        let factory = self
            .factories
            .read()
            .get(backend_type)
            .cloned()
            .ok_or_else(|| DispatchError::unrecognized_backend_type(backend_type))?;
        // The lock is released before running the factory
        Ok(factory())
    }

    pub fn contains(&self, backend_type: &str) -> bool {
        self.factories.read().contains_key(backend_type)
    }

    /// Registered backend types, sorted
    pub fn backend_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self.factories.read().keys().cloned().collect();
        types.sort();
        types
    }

    pub fn len(&self) -> usize {
        self.factories.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.read().is_empty()
    }

    pub fn unregister(&self, backend_type: &str) -> bool {
        self.factories.write().remove(backend_type).is_some()
    }

    /// Capability set of a registered backend type
    pub fn capabilities(&self, backend_type: &str) -> DispatchResult<CapabilitySet> {
        Ok(self.resolve(backend_type)?.capabilities())
    }
}

impl fmt::Debug for BackendRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendRegistry")
            .field("backend_types", &self.backend_types())
            .finish()
    }
}
