use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use wiring_module_host::{DiscoveryConfig, RESERVED_UNITS};

const APP_DIR_NAME: &str = "WiringDesigner";
const MODULES_DIR: &str = "modules";
const STORE_FILE: &str = "projects.json";

/// Base directory for configuration, modules and the project store.
pub fn app_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR_NAME)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WiringConfig {
    /// Directory scanned for unit manifests.
    pub modules_dir: PathBuf,
    /// JSON file holding projects and their records.
    pub store_path: PathBuf,
    /// Manifest names that are never loaded as modules.
    pub reserved_units: Vec<String>,
}

impl Default for WiringConfig {
    fn default() -> Self {
        let base = app_dir();
        Self {
            modules_dir: base.join(MODULES_DIR),
            store_path: base.join(STORE_FILE),
            reserved_units: RESERVED_UNITS.iter().map(|unit| unit.to_string()).collect(),
        }
    }
}

impl WiringConfig {
    /// Reads a config file on top of the defaults. Keys missing from the
    /// file keep their default value.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("{} is not a valid config file", path.display()))
    }

    pub fn with_overrides(
        mut self,
        modules_dir: Option<PathBuf>,
        store_path: Option<PathBuf>,
    ) -> Self {
        if let Some(dir) = modules_dir {
            self.modules_dir = dir;
        }
        if let Some(path) = store_path {
            self.store_path = path;
        }
        self
    }

    pub fn discovery(&self) -> DiscoveryConfig {
        DiscoveryConfig {
            modules_dir: self.modules_dir.clone(),
            reserved_units: self.reserved_units.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn missing_keys_keep_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("wiring.json");
        fs::write(&path, r#"{"modules_dir": "/srv/modules"}"#).unwrap();

        let config = WiringConfig::load(Some(&path)).unwrap();
        let defaults = WiringConfig::default();
        assert_eq!(config.modules_dir, PathBuf::from("/srv/modules"));
        assert_eq!(config.store_path, defaults.store_path);
        assert_eq!(config.reserved_units, vec!["contract", "registry"]);
    }

    #[test]
    fn cli_overrides_win() {
        let config = WiringConfig::default()
            .with_overrides(Some("mods".into()), None)
            .with_overrides(None, Some("store.json".into()));
        assert_eq!(config.modules_dir, PathBuf::from("mods"));
        assert_eq!(config.store_path, PathBuf::from("store.json"));
        assert_eq!(config.discovery().modules_dir, PathBuf::from("mods"));
    }

    #[test]
    fn broken_config_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("wiring.json");
        fs::write(&path, "modules_dir = 3").unwrap();
        assert!(WiringConfig::load(Some(&path)).is_err());
        assert!(WiringConfig::load(Some(&dir.path().join("absent.json"))).is_err());
    }
}
