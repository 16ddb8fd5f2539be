//! Ordered, name-keyed module registry.

use crate::error::{ConductorError, Result};
use crate::module::Module;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Default)]
struct Entries {
    modules: Vec<Arc<dyn Module>>,
    names: HashSet<String>,
}

/// Holds the modules of an application in registration order.
///
/// Registration order is the start order; stop order is its reverse. Once
/// [`lock`](Self::lock)ed, the registry rejects further registrations for
/// good.
#[derive(Default)]
pub struct Registry {
    entries: RwLock<Entries>,
    locked: AtomicBool,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, Entries> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Entries> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append a module.
    ///
    /// # Errors
    ///
    /// - [`ConductorError::RegistrationClosed`] once the registry is locked
    /// - [`ConductorError::NameEmpty`] for a module with an empty name
    /// - [`ConductorError::DuplicateName`] if the name is already taken
    pub fn register(&self, module: Arc<dyn Module>) -> Result<()> {
        // Checked under the write lock so a concurrent `lock()` cannot slip
        // between the check and the append.
        let mut entries = self.write();
        if self.locked.load(Ordering::Acquire) {
            return Err(ConductorError::RegistrationClosed);
        }

        let name = module.name();
        if name.is_empty() {
            return Err(ConductorError::NameEmpty);
        }
        if entries.names.contains(name) {
            return Err(ConductorError::DuplicateName {
                name: name.to_string(),
            });
        }

        tracing::debug!(module = name, "module registered");
        entries.names.insert(name.to_string());
        entries.modules.push(module);
        Ok(())
    }

    /// Close the registry. Idempotent.
    pub fn lock(&self) {
        let _entries = self.write();
        self.locked.store(true, Ordering::Release);
    }

    pub fn is_locked(&self) -> bool {
        self.locked.load(Ordering::Acquire)
    }

    /// Copy of the modules in registration order.
    pub fn snapshot(&self) -> Vec<Arc<dyn Module>> {
        self.read().modules.clone()
    }

    pub fn names(&self) -> Vec<String> {
        self.read()
            .modules
            .iter()
            .map(|m| m.name().to_string())
            .collect()
    }

    /// Modules exposing the background-failure capability, in registration order.
    pub fn background_modules(&self) -> Vec<Arc<dyn Module>> {
        self.read()
            .modules
            .iter()
            .filter(|m| m.as_background().is_some())
            .cloned()
            .collect()
    }

    /// Modules exposing the health-check capability, in registration order.
    pub fn health_checked_modules(&self) -> Vec<Arc<dyn Module>> {
        self.read()
            .modules
            .iter()
            .filter(|m| m.as_health_check().is_some())
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.read().modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().modules.is_empty()
    }
}
