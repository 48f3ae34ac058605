//! Serializable views of the registry for an outer management layer.

use serde::{Deserialize, Serialize};
use wiring_module_sdk::ModuleInfo;

use crate::error::HostError;
use crate::registry::{LoadedModule, ModuleRegistry};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleView {
    pub name: String,
    pub info: ModuleInfo,
    pub enabled: bool,
}

impl From<&LoadedModule> for ModuleView {
    fn from(entry: &LoadedModule) -> Self {
        Self {
            name: entry.name().to_string(),
            info: entry.info(),
            enabled: entry.is_enabled(),
        }
    }
}

/// Acknowledgement returned by mutating management calls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ack {
    pub success: bool,
    pub message: String,
}

impl Ack {
    fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}

/// All registered modules, sorted by name.
pub fn list_modules(registry: &ModuleRegistry) -> Vec<ModuleView> {
    registry
        .list_all()
        .values()
        .map(|entry| ModuleView::from(entry.as_ref()))
        .collect()
}

pub fn module_view(registry: &ModuleRegistry, name: &str) -> Result<ModuleView, HostError> {
    registry
        .get(name)
        .map(|entry| ModuleView::from(entry.as_ref()))
        .ok_or_else(|| HostError::NotFound(name.to_string()))
}

/// Reloads one module. Any failure is reported as not found; the cause is
/// logged.
pub fn reload_module(registry: &ModuleRegistry, name: &str) -> Result<Ack, HostError> {
    match registry.reload(name) {
        Ok(_) => Ok(Ack::ok(format!("Module {name} reloaded"))),
        Err(err) => {
            tracing::warn!(module = name, error = %err, "reload failed");
            Err(HostError::NotFound(name.to_string()))
        }
    }
}

pub fn set_module_enabled(
    registry: &ModuleRegistry,
    name: &str,
    enabled: bool,
) -> Result<Ack, HostError> {
    registry.set_enabled(name, enabled)?;
    let state = if enabled { "enabled" } else { "disabled" };
    Ok(Ack::ok(format!("Module {name} {state}")))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;
    use wiring_module_sdk::prelude::*;

    use super::*;
    use crate::discovery::{DiscoveryConfig, ModuleManifest};

    struct Dummy;

    impl WiringModule for Dummy {
        fn info(&self) -> ModuleInfo {
            ModuleInfo::new("Dummy", Capability::Generic).with_author("tests")
        }

        fn initialize(&mut self, _context: &ModuleContext) -> bool {
            true
        }
    }

    struct DummyFactory;

    impl ModuleFactory for DummyFactory {
        fn id(&self) -> &str {
            "test.dummy"
        }

        fn info(&self) -> ModuleInfo {
            ModuleInfo::new("Dummy", Capability::Generic)
        }

        fn create(&self) -> Box<dyn WiringModule> {
            Box::new(Dummy)
        }
    }

    fn registry(dir: &std::path::Path, units: &[&str]) -> ModuleRegistry {
        let config = DiscoveryConfig::new(dir);
        for unit in units {
            ModuleManifest::new("test.dummy")
                .write(&config.manifest_path(unit))
                .unwrap();
        }
        let mut catalog = ModuleCatalog::new();
        catalog.register_factory(Box::new(DummyFactory)).unwrap();
        let registry = ModuleRegistry::new(config, catalog);
        registry.discover_and_load_all();
        registry
    }

    #[test]
    fn views_are_sorted_by_name() {
        let dir = tempdir().unwrap();
        let registry = registry(dir.path(), &["zeta", "alpha"]);
        let names: Vec<_> = list_modules(&registry)
            .into_iter()
            .map(|view| view.name)
            .collect();
        assert_eq!(names, vec!["alpha".to_string(), "zeta".to_string()]);

        let view = module_view(&registry, "alpha").unwrap();
        assert_eq!(view.info.author.as_deref(), Some("tests"));
        assert!(view.enabled);
        assert!(module_view(&registry, "ghost").unwrap_err().is_not_found());
    }

    #[test]
    fn enable_and_reload_acknowledge() {
        let dir = tempdir().unwrap();
        let registry = registry(dir.path(), &["alpha"]);

        let ack = set_module_enabled(&registry, "alpha", false).unwrap();
        assert_eq!(ack.message, "Module alpha disabled");
        assert!(!module_view(&registry, "alpha").unwrap().enabled);

        let ack = reload_module(&registry, "alpha").unwrap();
        assert!(ack.success);
        // The manifest still says enabled.
        assert!(module_view(&registry, "alpha").unwrap().enabled);
    }

    #[test]
    fn failed_reload_is_reported_as_not_found() {
        let dir = tempdir().unwrap();
        let registry = registry(dir.path(), &["alpha"]);
        std::fs::remove_file(registry.config().manifest_path("alpha")).unwrap();

        assert!(reload_module(&registry, "alpha").unwrap_err().is_not_found());
        assert!(reload_module(&registry, "ghost").unwrap_err().is_not_found());
        assert!(registry.get("alpha").is_none());
    }
}
