//! Module registry.
//!
//! Maps module names to descriptors. Shared as [`SharedRegistry`]; every
//! mutation happens under the write lock, so dispatch never observes a
//! partially registered module. Nothing here awaits: lifecycle hooks run in
//! [`crate::LifecycleController`] after the lock is released.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::module::{CapabilityModule, ModuleDescriptor, ModuleHandle, ModuleKey};

/// The registry as shared between the dispatcher, the lifecycle controller
/// and the host.
pub type SharedRegistry = Arc<RwLock<ModuleRegistry>>;

struct Entry {
    descriptor: ModuleDescriptor,
    generation: u64,
}

/// Registry of capability modules, keyed by name.
#[derive(Default)]
pub struct ModuleRegistry {
    modules: HashMap<String, Entry>,
    next_generation: u64,
}

impl ModuleRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty registry ready for sharing.
    #[must_use]
    pub fn shared() -> SharedRegistry {
        Arc::new(RwLock::new(Self::new()))
    }

    /// Register a module. A module already registered under the same name is
    /// replaced (last write wins) without running its teardown hook.
    pub fn register(&mut self, descriptor: ModuleDescriptor) -> ModuleHandle {
        self.next_generation = self.next_generation.wrapping_add(1);
        let generation = self.next_generation;
        let name = descriptor.name().to_owned();
        let operations = descriptor.operations().len();

        let replaced = self
            .modules
            .insert(
                name.clone(),
                Entry {
                    descriptor,
                    generation,
                },
            )
            .is_some();

        if replaced {
            info!(module = %name, generation, "Replaced module");
        } else {
            info!(module = %name, generation, operations, "Registered module");
        }
        ModuleHandle::new(name, generation)
    }

    /// Remove a module without running its teardown hook.
    pub fn remove(&mut self, name: &str) -> Option<ModuleDescriptor> {
        self.modules.remove(name).map(|entry| entry.descriptor)
    }

    /// Remove every module, returning the descriptors sorted by name.
    /// Teardown hooks are not run.
    pub fn drain(&mut self) -> Vec<ModuleDescriptor> {
        let mut drained: Vec<ModuleDescriptor> =
            self.modules.drain().map(|(_, entry)| entry.descriptor).collect();
        drained.sort_by(|a, b| a.name().cmp(b.name()));
        debug!(removed = drained.len(), "Registry drained");
        drained
    }

    /// Look a module up by name.
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<ModuleDescriptor> {
        self.modules.get(name).map(|entry| entry.descriptor.clone())
    }

    /// Look a module up as its concrete type.
    #[must_use]
    pub fn get<M: CapabilityModule + 'static>(&self, key: ModuleKey<M>) -> Option<Arc<M>> {
        self.modules
            .get(key.name())
            .and_then(|entry| entry.descriptor.downcast::<M>())
    }

    /// Whether `handle` still refers to the current registration of its
    /// module.
    #[must_use]
    pub fn is_current(&self, handle: &ModuleHandle) -> bool {
        self.modules
            .get(handle.name())
            .is_some_and(|entry| entry.generation == handle.generation())
    }

    /// All descriptors, sorted by name.
    #[must_use]
    pub fn list(&self) -> Vec<ModuleDescriptor> {
        let mut descriptors: Vec<ModuleDescriptor> = self
            .modules
            .values()
            .map(|entry| entry.descriptor.clone())
            .collect();
        descriptors.sort_by(|a, b| a.name().cmp(b.name()));
        descriptors
    }

    /// Descriptors of lifecycle-capable modules, sorted by name.
    #[must_use]
    pub fn lifecycle_capable(&self) -> Vec<ModuleDescriptor> {
        self.list()
            .into_iter()
            .filter(ModuleDescriptor::lifecycle_capable)
            .collect()
    }

    /// Number of registered modules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    /// Whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

impl std::fmt::Debug for ModuleRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<&String> = self.modules.keys().collect();
        names.sort();
        f.debug_struct("ModuleRegistry")
            .field("modules", &names)
            .finish()
    }
}
