//! Routes project operations through the enabled modules of the registry.

use anyhow::{anyhow, bail, Result};
use wiring_module_host::ModuleRegistry;
use wiring_module_sdk::Capability;
use wiring_project::{Element, NewElement, ProjectBundle};

/// Runs a draft through every enabled element module: all validators must
/// accept it, then each processor is applied in name order.
pub fn prepare_element(registry: &ModuleRegistry, draft: NewElement) -> Result<NewElement> {
    let modules = registry.enabled_with_capability(Capability::Element);
    let mut element = draft.to_element(0);
    for entry in &modules {
        let accepted = entry
            .with_element(|module| module.validate_element(&element))
            .unwrap_or(true);
        if !accepted {
            bail!(
                "element `{}` rejected by module `{}`",
                element.element_id,
                entry.name()
            );
        }
    }
    for entry in &modules {
        let processed = entry.with_element(|module| module.process_element(element.clone()));
        if let Some(processed) = processed {
            element = processed;
        }
    }
    Ok(NewElement::from(element))
}

/// Cable length in metres from the first enabled connection module.
pub fn cable_length(registry: &ModuleRegistry, from: &Element, to: &Element) -> Option<f64> {
    registry
        .enabled_with_capability(Capability::Connection)
        .iter()
        .find_map(|entry| entry.with_connection(|module| module.calculate_cable_length(from, to)))
}

pub fn suggest_section(registry: &ModuleRegistry, power: f64, distance: f64) -> Option<f64> {
    registry
        .enabled_with_capability(Capability::Connection)
        .iter()
        .find_map(|entry| {
            entry.with_connection(|module| module.suggest_cable_section(power, distance))
        })
}

/// Exports with the first enabled export module that supports `format`.
pub fn export_project(
    registry: &ModuleRegistry,
    bundle: &ProjectBundle,
    format: &str,
) -> Result<Vec<u8>> {
    for entry in registry.enabled_with_capability(Capability::Export) {
        let exported = entry.with_export(|module| {
            module
                .supports_format(format)
                .then(|| module.export(bundle, format))
        });
        if let Some(Some(result)) = exported {
            tracing::debug!(module = entry.name(), format, "exporting project");
            return result.map_err(|err| anyhow!("module `{}` failed: {err}", entry.name()));
        }
    }
    bail!("no enabled export module supports format `{format}`")
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use tempfile::{tempdir, TempDir};
    use wiring_module_host::{write_stock_manifests, DiscoveryConfig};
    use wiring_modules::stock_catalog;
    use wiring_project::{NewProject, ProjectStore};

    use super::*;

    fn stock_registry() -> (TempDir, ModuleRegistry) {
        let dir = tempdir().unwrap();
        let catalog = stock_catalog().unwrap();
        write_stock_manifests(dir.path(), &catalog).unwrap();
        let registry = ModuleRegistry::new(DiscoveryConfig::new(dir.path()), catalog);
        assert!(registry.discover_and_load_all().is_complete());
        (dir, registry)
    }

    #[test]
    fn element_drafts_are_validated_then_normalized() {
        let (_dir, registry) = stock_registry();
        let draft = NewElement::new(1, " S1", "Socket ", "Kitchen ", 10.0, 20.0);
        let prepared = prepare_element(&registry, draft).unwrap();
        assert_eq!(prepared.element_id, "S1");
        assert_eq!(prepared.kind, "socket");
        assert_eq!(prepared.name, "Kitchen");

        let unknown = NewElement::new(1, "R1", "router", "Router", 0.0, 0.0);
        assert!(prepare_element(&registry, unknown).is_err());
    }

    #[test]
    fn disabled_element_modules_are_skipped() {
        let (_dir, registry) = stock_registry();
        registry.set_enabled("element_normalizer", false).unwrap();
        let draft = NewElement::new(1, "R1", " Router", "Router", 0.0, 0.0);
        let prepared = prepare_element(&registry, draft).unwrap();
        assert_eq!(prepared.kind, " Router");
    }

    #[test]
    fn connection_helpers_use_stock_module() {
        let (_dir, registry) = stock_registry();
        let a = NewElement::new(1, "A", "socket", "A", 0.0, 0.0).to_element(1);
        let b = NewElement::new(1, "B", "lamp", "B", 300.0, 400.0).to_element(2);
        let length = cable_length(&registry, &a, &b).unwrap();
        assert!((length - 5.0).abs() < 1e-12);
        assert_eq!(suggest_section(&registry, 1500.0, 12.0), Some(4.0));

        registry.set_enabled("euclidean_connection", false).unwrap();
        assert_eq!(cable_length(&registry, &a, &b), None);
    }

    #[test]
    fn export_picks_module_by_format() {
        let (_dir, registry) = stock_registry();
        let store = ProjectStore::in_memory();
        let project = store.create_project(NewProject::new("Flat")).unwrap();
        let bundle = store.bundle(project.id).unwrap();

        let json = export_project(&registry, &bundle, "json").unwrap();
        let parsed: ProjectBundle = serde_json::from_slice(&json).unwrap();
        assert_eq!(parsed.project.name, "Flat");
        assert!(export_project(&registry, &bundle, "pdf").is_err());
    }
}
