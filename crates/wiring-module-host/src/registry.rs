use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use wiring_module_sdk::{
    Capability, ConnectionModule, ElementModule, ExportModule, ModuleCatalog, ModuleContext,
    ModuleDirectory, ModuleInfo, WiringModule,
};

use crate::discovery::{resolve_candidate, scan_candidates, DiscoveryConfig};
use crate::error::HostError;

/// Identity and enabled state of a registered module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleDescriptor {
    pub name: String,
    pub version: String,
    pub enabled: bool,
}

/// Registry entry wrapping one live module instance.
pub struct LoadedModule {
    name: String,
    factory: String,
    enabled: AtomicBool,
    module: RwLock<Box<dyn WiringModule>>,
}

impl LoadedModule {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Catalog factory that produced this instance.
    pub fn factory(&self) -> &str {
        &self.factory
    }

    pub fn info(&self) -> ModuleInfo {
        self.module.read().info()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Release);
    }

    pub fn capability(&self) -> Capability {
        self.module.read().capability()
    }

    pub fn supports(&self, capability: Capability) -> bool {
        self.module.read().supports(capability)
    }

    pub fn descriptor(&self) -> ModuleDescriptor {
        ModuleDescriptor {
            name: self.name.clone(),
            version: self.info().version,
            enabled: self.is_enabled(),
        }
    }

    pub fn with_element<R>(&self, f: impl FnOnce(&dyn ElementModule) -> R) -> Option<R> {
        let module = self.module.read();
        module.as_element().map(f)
    }

    pub fn with_connection<R>(&self, f: impl FnOnce(&dyn ConnectionModule) -> R) -> Option<R> {
        let module = self.module.read();
        module.as_connection().map(f)
    }

    pub fn with_export<R>(&self, f: impl FnOnce(&dyn ExportModule) -> R) -> Option<R> {
        let module = self.module.read();
        module.as_export().map(f)
    }

    // Waits for in-flight hook calls to finish before cleaning up.
    fn cleanup(&self) {
        let mut module = self.module.write();
        let result = panic::catch_unwind(AssertUnwindSafe(|| module.cleanup()));
        if result.is_err() {
            tracing::error!(module = %self.name, "module panicked during cleanup");
        }
    }
}

impl fmt::Debug for LoadedModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadedModule")
            .field("name", &self.name)
            .field("factory", &self.factory)
            .field("enabled", &self.is_enabled())
            .finish()
    }
}

/// A candidate that could not be registered.
#[derive(Debug)]
pub struct LoadFailure {
    pub name: String,
    pub error: HostError,
}

/// Outcome of a full discovery pass.
#[derive(Debug, Default)]
pub struct LoadReport {
    pub loaded: Vec<String>,
    pub failures: Vec<LoadFailure>,
}

impl LoadReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

struct RegistryInner {
    config: DiscoveryConfig,
    catalog: ModuleCatalog,
    modules: Mutex<HashMap<String, Arc<LoadedModule>>>,
    // Serializes load/unload/reload. Never held by readers.
    lifecycle: Mutex<()>,
}

impl ModuleDirectory for RegistryInner {
    fn module_names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.modules.lock().keys().cloned().collect();
        names.sort();
        names
    }

    fn module_info(&self, name: &str) -> Option<ModuleInfo> {
        let entry = self.modules.lock().get(name).cloned()?;
        Some(entry.info())
    }

    fn is_enabled(&self, name: &str) -> Option<bool> {
        self.modules
            .lock()
            .get(name)
            .map(|entry| entry.is_enabled())
    }
}

/// In-memory registry mapping module names to live instances.
///
/// The name map is only locked for lookups and insertions; module hooks run
/// outside of it so that modules can query the registry through their
/// [`ModuleContext`]. Lifecycle operations are serialized among themselves.
pub struct ModuleRegistry {
    inner: Arc<RegistryInner>,
}

impl ModuleRegistry {
    pub fn new(config: DiscoveryConfig, catalog: ModuleCatalog) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                config,
                catalog,
                modules: Mutex::new(HashMap::new()),
                lifecycle: Mutex::new(()),
            }),
        }
    }

    pub fn config(&self) -> &DiscoveryConfig {
        &self.inner.config
    }

    pub fn catalog(&self) -> &ModuleCatalog {
        &self.inner.catalog
    }

    /// Loads every eligible unit of the modules directory. A failing unit is
    /// recorded in the report and does not stop the scan.
    pub fn discover_and_load_all(&self) -> LoadReport {
        let _lifecycle = self.inner.lifecycle.lock();
        let scan = scan_candidates(&self.inner.config);
        let mut report = LoadReport::default();

        for error in scan.errors {
            tracing::warn!(%error, "skipping module candidate");
            report.failures.push(LoadFailure {
                name: self.inner.config.modules_dir.display().to_string(),
                error,
            });
        }

        for name in scan.names {
            match self.load_locked(&name) {
                Ok(_) => report.loaded.push(name),
                Err(error) => {
                    tracing::warn!(module = %name, %error, "failed to load module");
                    report.failures.push(LoadFailure { name, error });
                }
            }
        }

        tracing::info!(
            loaded = report.loaded.len(),
            failed = report.failures.len(),
            dir = %self.inner.config.modules_dir.display(),
            "module discovery finished"
        );
        report
    }

    /// Loads a single unit by name. Use [`ModuleRegistry::reload`] to
    /// replace a module that is already registered.
    pub fn load(&self, name: &str) -> Result<Arc<LoadedModule>, HostError> {
        let _lifecycle = self.inner.lifecycle.lock();
        self.load_locked(name)
    }

    fn load_locked(&self, name: &str) -> Result<Arc<LoadedModule>, HostError> {
        if self.inner.modules.lock().contains_key(name) {
            return Err(HostError::AlreadyLoaded(name.to_string()));
        }

        let candidate = resolve_candidate(&self.inner.config, name)?;
        let factory = self
            .inner
            .catalog
            .get(&candidate.manifest.factory)
            .ok_or_else(|| HostError::UnknownFactory {
                name: name.to_string(),
                factory: candidate.manifest.factory.clone(),
            })?;

        let mut module = factory.create();
        let inner: Weak<RegistryInner> = Arc::downgrade(&self.inner);
        let directory: Weak<dyn ModuleDirectory> = inner;
        let context = ModuleContext::new(name)
            .with_directory(directory)
            .with_settings(candidate.manifest.settings.clone());
        let initialized =
            panic::catch_unwind(AssertUnwindSafe(|| module.initialize(&context))).unwrap_or(false);
        if !initialized {
            return Err(HostError::InitializationFailed(name.to_string()));
        }

        let entry = Arc::new(LoadedModule {
            name: name.to_string(),
            factory: candidate.manifest.factory,
            enabled: AtomicBool::new(candidate.manifest.enabled),
            module: RwLock::new(module),
        });
        self.inner
            .modules
            .lock()
            .insert(name.to_string(), Arc::clone(&entry));
        tracing::info!(module = name, factory = entry.factory(), "module loaded");
        Ok(entry)
    }

    pub fn get(&self, name: &str) -> Option<Arc<LoadedModule>> {
        self.inner.modules.lock().get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.inner.modules.lock().contains_key(name)
    }

    /// Snapshot of the registry. Changes to the returned map do not affect
    /// the registry.
    pub fn list_all(&self) -> BTreeMap<String, Arc<LoadedModule>> {
        self.inner
            .modules
            .lock()
            .iter()
            .map(|(name, entry)| (name.clone(), Arc::clone(entry)))
            .collect()
    }

    /// Loaded modules implementing `capability`, in name order, whether
    /// enabled or not.
    pub fn filter_by_capability(&self, capability: Capability) -> Vec<Arc<LoadedModule>> {
        self.list_all()
            .into_values()
            .filter(|entry| entry.supports(capability))
            .collect()
    }

    /// Like [`ModuleRegistry::filter_by_capability`] but skips disabled
    /// modules.
    pub fn enabled_with_capability(&self, capability: Capability) -> Vec<Arc<LoadedModule>> {
        self.filter_by_capability(capability)
            .into_iter()
            .filter(|entry| entry.is_enabled())
            .collect()
    }

    /// Removes a module and runs its cleanup hook. Returns whether a module
    /// was registered under `name`.
    pub fn unload(&self, name: &str) -> bool {
        let _lifecycle = self.inner.lifecycle.lock();
        self.unload_locked(name)
    }

    fn unload_locked(&self, name: &str) -> bool {
        let removed = self.inner.modules.lock().remove(name);
        match removed {
            Some(entry) => {
                entry.cleanup();
                tracing::info!(module = name, "module unloaded");
                true
            }
            None => false,
        }
    }

    /// Unloads `name` if present and loads it again from its manifest.
    pub fn reload(&self, name: &str) -> Result<Arc<LoadedModule>, HostError> {
        let _lifecycle = self.inner.lifecycle.lock();
        self.unload_locked(name);
        self.load_locked(name)
    }

    /// Flips the advisory enabled flag. No hook is invoked.
    pub fn set_enabled(&self, name: &str, enabled: bool) -> Result<ModuleDescriptor, HostError> {
        let entry = self
            .get(name)
            .ok_or_else(|| HostError::NotFound(name.to_string()))?;
        entry.set_enabled(enabled);
        tracing::info!(module = name, enabled, "module enabled flag changed");
        Ok(entry.descriptor())
    }

    pub fn len(&self) -> usize {
        self.inner.modules.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.modules.lock().is_empty()
    }

    /// Unloads every module, running cleanup hooks in name order.
    pub fn shutdown(&self) {
        let _lifecycle = self.inner.lifecycle.lock();
        let drained: BTreeMap<_, _> = self.inner.modules.lock().drain().collect();
        for (name, entry) in drained {
            entry.cleanup();
            tracing::debug!(module = %name, "module cleaned up on shutdown");
        }
    }
}

impl Drop for ModuleRegistry {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl fmt::Debug for ModuleRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleRegistry")
            .field("modules_dir", &self.inner.config.modules_dir)
            .field("modules", &self.inner.module_names())
            .finish()
    }
}
