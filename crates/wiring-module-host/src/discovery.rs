use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use walkdir::WalkDir;
use wiring_module_sdk::ModuleCatalog;

use crate::error::HostError;

/// Extension of unit manifests inside the modules directory.
pub const MANIFEST_EXTENSION: &str = "json";

/// Unit names that describe the contract and the registry itself rather than
/// a loadable module.
pub const RESERVED_UNITS: &[&str] = &["contract", "registry"];

#[derive(Debug, Clone)]
pub struct DiscoveryConfig {
    pub modules_dir: PathBuf,
    pub reserved_units: Vec<String>,
}

impl DiscoveryConfig {
    pub fn new(modules_dir: impl Into<PathBuf>) -> Self {
        Self {
            modules_dir: modules_dir.into(),
            reserved_units: RESERVED_UNITS.iter().map(|unit| unit.to_string()).collect(),
        }
    }

    pub fn is_reserved(&self, name: &str) -> bool {
        self.reserved_units
            .iter()
            .any(|reserved| reserved.eq_ignore_ascii_case(name))
    }

    pub fn manifest_path(&self, name: &str) -> PathBuf {
        self.modules_dir.join(format!("{name}.{MANIFEST_EXTENSION}"))
    }
}

/// On-disk description of one discoverable module.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleManifest {
    /// Id of the catalog factory that builds the module.
    pub factory: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Passed to the module through its initialization context.
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub settings: Value,
}

fn default_enabled() -> bool {
    true
}

impl ModuleManifest {
    pub fn new(factory: impl Into<String>) -> Self {
        Self {
            factory: factory.into(),
            enabled: true,
            settings: Value::Null,
        }
    }

    pub fn with_settings(mut self, settings: Value) -> Self {
        self.settings = settings;
        self
    }

    pub fn read(path: &Path) -> Result<Self, HostError> {
        let raw = fs::read_to_string(path)?;
        serde_json::from_str(&raw).map_err(|source| HostError::Manifest {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn write(&self, path: &Path) -> Result<(), HostError> {
        let json = serde_json::to_string_pretty(self).map_err(|source| HostError::Manifest {
            path: path.to_path_buf(),
            source,
        })?;
        fs::write(path, json)?;
        Ok(())
    }
}

/// A manifest resolved for a module name.
#[derive(Debug, Clone)]
pub struct ModuleCandidate {
    pub name: String,
    pub path: PathBuf,
    pub manifest: ModuleManifest,
}

#[derive(Debug)]
pub struct DiscoveryResult {
    /// Eligible unit names in lexical order.
    pub names: Vec<String>,
    pub errors: Vec<HostError>,
}

impl DiscoveryResult {
    pub fn empty() -> Self {
        Self {
            names: Vec::new(),
            errors: Vec::new(),
        }
    }
}

fn validate_name(name: &str) -> Result<(), HostError> {
    let valid = !name.is_empty()
        && !name.starts_with('.')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));
    if valid {
        Ok(())
    } else {
        Err(HostError::InvalidName(name.to_string()))
    }
}

fn unit_name(path: &Path) -> Option<&str> {
    let is_manifest = path
        .extension()
        .and_then(OsStr::to_str)
        .map(|ext| ext.eq_ignore_ascii_case(MANIFEST_EXTENSION))
        .unwrap_or(false);
    if !is_manifest {
        return None;
    }
    path.file_stem().and_then(OsStr::to_str)
}

/// Lists the eligible units of the modules directory without loading them.
/// A missing directory yields an empty result.
pub fn scan_candidates(config: &DiscoveryConfig) -> DiscoveryResult {
    let mut result = DiscoveryResult::empty();
    if !config.modules_dir.exists() {
        tracing::debug!(dir = %config.modules_dir.display(), "module directory does not exist");
        return result;
    }

    let walker = WalkDir::new(&config.modules_dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name();
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                result.errors.push(HostError::Scan(err));
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let Some(name) = unit_name(entry.path()) else {
            continue;
        };
        if config.is_reserved(name) {
            tracing::debug!(unit = name, "skipping reserved unit");
            continue;
        }
        if let Err(err) = validate_name(name) {
            result.errors.push(err);
            continue;
        }
        // `a.json` and `a.JSON` describe the same unit.
        if result.names.iter().any(|known| known == name) {
            tracing::debug!(path = %entry.path().display(), "duplicate manifest for unit");
            continue;
        }
        result.names.push(name.to_string());
    }
    result
}

/// Finds the manifest file of `name`, preferring the lowercase extension and
/// falling back to any casing of it.
fn locate_manifest(config: &DiscoveryConfig, name: &str) -> Option<PathBuf> {
    let exact = config.manifest_path(name);
    if exact.is_file() {
        return Some(exact);
    }
    WalkDir::new(&config.modules_dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .find(|entry| unit_name(entry.path()) == Some(name))
        .map(|entry| entry.into_path())
}

/// Resolves a single module name to its manifest, without scanning the rest
/// of the directory.
pub fn resolve_candidate(
    config: &DiscoveryConfig,
    name: &str,
) -> Result<ModuleCandidate, HostError> {
    validate_name(name)?;
    if config.is_reserved(name) {
        return Err(HostError::Reserved(name.to_string()));
    }
    let path = locate_manifest(config, name)
        .ok_or_else(|| HostError::NotFound(name.to_string()))?;
    let manifest = ModuleManifest::read(&path)?;
    Ok(ModuleCandidate {
        name: name.to_string(),
        path,
        manifest,
    })
}

/// Rewrites the `enabled` field of a module's manifest so the flag survives
/// a restart.
pub fn persist_enabled(
    config: &DiscoveryConfig,
    name: &str,
    enabled: bool,
) -> Result<(), HostError> {
    let mut candidate = resolve_candidate(config, name)?;
    candidate.manifest.enabled = enabled;
    candidate.manifest.write(&candidate.path)
}

/// Unit name used for a factory's default manifest: the last dotted segment
/// of its id.
pub fn default_unit_name(factory_id: &str) -> &str {
    factory_id.rsplit('.').next().unwrap_or(factory_id)
}

/// Writes a default manifest for every catalog factory that does not have
/// one yet. Returns the paths that were created.
pub fn write_stock_manifests(
    dir: &Path,
    catalog: &ModuleCatalog,
) -> Result<Vec<PathBuf>, HostError> {
    fs::create_dir_all(dir)?;
    let mut written = Vec::new();
    for factory in catalog.iter() {
        let name = default_unit_name(factory.id());
        let path = dir.join(format!("{name}.{MANIFEST_EXTENSION}"));
        if path.exists() {
            continue;
        }
        ModuleManifest::new(factory.id()).write(&path)?;
        tracing::info!(path = %path.display(), factory = factory.id(), "wrote module manifest");
        written.push(path);
    }
    Ok(written)
}
