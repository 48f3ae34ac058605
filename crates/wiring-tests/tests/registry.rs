use std::fs;

use pretty_assertions::assert_eq;
use serde_json::json;
use tempfile::tempdir;
use wiring_module_host::management::{list_modules, reload_module};
use wiring_module_host::{write_stock_manifests, DiscoveryConfig, ModuleManifest, ModuleRegistry};
use wiring_module_sdk::Capability;
use wiring_modules::{stock_catalog, EUCLIDEAN_CONNECTION_ID};
use wiring_project::NewElement;

#[test]
fn stock_modules_are_discovered_from_seeded_manifests() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let catalog = stock_catalog()?;
    let written = write_stock_manifests(dir.path(), &catalog)?;
    assert_eq!(written.len(), 3);
    fs::write(dir.path().join("registry.json"), "not a manifest")?;
    fs::write(dir.path().join("README.md"), "# modules")?;

    let registry = ModuleRegistry::new(DiscoveryConfig::new(dir.path()), catalog);
    let report = registry.discover_and_load_all();
    assert!(report.is_complete());
    assert_eq!(
        report.loaded,
        vec!["element_normalizer", "euclidean_connection", "tabular_exporter"]
    );

    let capabilities: Vec<_> = list_modules(&registry)
        .into_iter()
        .map(|view| view.info.capability)
        .collect();
    assert_eq!(
        capabilities,
        vec![Capability::Element, Capability::Connection, Capability::Export]
    );
    Ok(())
}

#[test]
fn broken_manifest_only_skips_itself() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let config = DiscoveryConfig::new(dir.path());
    ModuleManifest::new(EUCLIDEAN_CONNECTION_ID).write(&config.manifest_path("cables"))?;
    ModuleManifest::new(EUCLIDEAN_CONNECTION_ID)
        .with_settings(json!({"scale": 0}))
        .write(&config.manifest_path("bad_scale"))?;
    fs::write(config.manifest_path("garbled"), "{")?;
    ModuleManifest::new("wiring.missing").write(&config.manifest_path("orphan"))?;

    let registry = ModuleRegistry::new(config, stock_catalog()?);
    let report = registry.discover_and_load_all();
    assert_eq!(report.loaded, vec!["cables"]);
    let mut failed: Vec<_> = report.failures.iter().map(|f| f.name.as_str()).collect();
    failed.sort();
    assert_eq!(failed, vec!["bad_scale", "garbled", "orphan"]);
    Ok(())
}

#[test]
fn reload_picks_up_new_settings() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let config = DiscoveryConfig::new(dir.path());
    let manifest_path = config.manifest_path("cables");
    ModuleManifest::new(EUCLIDEAN_CONNECTION_ID).write(&manifest_path)?;
    let registry = ModuleRegistry::new(config, stock_catalog()?);
    registry.discover_and_load_all();

    let a = NewElement::new(1, "A", "socket", "A", 0.0, 0.0).to_element(1);
    let b = NewElement::new(1, "B", "lamp", "B", 0.0, 100.0).to_element(2);
    let length = |registry: &ModuleRegistry| {
        registry
            .get("cables")
            .and_then(|entry| entry.with_connection(|module| module.calculate_cable_length(&a, &b)))
    };
    assert!((length(&registry).unwrap() - 1.0).abs() < 1e-12);

    ModuleManifest::new(EUCLIDEAN_CONNECTION_ID)
        .with_settings(json!({"scale": 0.05}))
        .write(&manifest_path)?;
    assert!(reload_module(&registry, "cables")?.success);
    assert!((length(&registry).unwrap() - 5.0).abs() < 1e-12);
    assert_eq!(registry.len(), 1);
    Ok(())
}
