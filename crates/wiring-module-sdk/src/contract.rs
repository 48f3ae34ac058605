use std::fmt;
use std::sync::{Arc, Weak};

use serde_json::Value;
use wiring_project::{Element, ProjectBundle};

use crate::{Capability, ExportError, ModuleInfo};

/// Read-only view of the registry handed to modules for inter-module lookups.
pub trait ModuleDirectory: Send + Sync {
    fn module_names(&self) -> Vec<String>;
    fn module_info(&self, name: &str) -> Option<ModuleInfo>;
    fn is_enabled(&self, name: &str) -> Option<bool>;
}

/// Context passed to [`WiringModule::initialize`].
#[derive(Clone, Default)]
pub struct ModuleContext {
    name: String,
    directory: Option<Weak<dyn ModuleDirectory>>,
    settings: Value,
}

impl ModuleContext {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            directory: None,
            settings: Value::Null,
        }
    }

    pub fn with_directory(mut self, directory: Weak<dyn ModuleDirectory>) -> Self {
        self.directory = Some(directory);
        self
    }

    pub fn with_settings(mut self, settings: Value) -> Self {
        self.settings = settings;
        self
    }

    /// Registry name the module is being loaded under.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The owning registry, if it is still alive.
    pub fn directory(&self) -> Option<Arc<dyn ModuleDirectory>> {
        self.directory.as_ref().and_then(Weak::upgrade)
    }

    pub fn settings(&self) -> &Value {
        &self.settings
    }

    pub fn setting(&self, key: &str) -> Option<&Value> {
        self.settings.get(key)
    }
}

impl fmt::Debug for ModuleContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleContext")
            .field("name", &self.name)
            .field("has_directory", &self.directory.is_some())
            .field("settings", &self.settings)
            .finish()
    }
}

/// Contract every loadable module satisfies.
///
/// `initialize` is called exactly once right after construction and signals
/// failure by returning `false`; such an instance is dropped without
/// `cleanup`. `cleanup` runs exactly once right before a registered instance
/// is discarded.
pub trait WiringModule: Send + Sync {
    fn info(&self) -> ModuleInfo;

    fn initialize(&mut self, context: &ModuleContext) -> bool;

    fn cleanup(&mut self) {}

    fn as_element(&self) -> Option<&dyn ElementModule> {
        None
    }

    fn as_connection(&self) -> Option<&dyn ConnectionModule> {
        None
    }

    fn as_export(&self) -> Option<&dyn ExportModule> {
        None
    }

    /// Most specific capability variant implemented by this module.
    fn capability(&self) -> Capability {
        if self.as_element().is_some() {
            Capability::Element
        } else if self.as_connection().is_some() {
            Capability::Connection
        } else if self.as_export().is_some() {
            Capability::Export
        } else {
            Capability::Generic
        }
    }

    fn supports(&self, capability: Capability) -> bool {
        match capability {
            Capability::Generic => true,
            Capability::Element => self.as_element().is_some(),
            Capability::Connection => self.as_connection().is_some(),
            Capability::Export => self.as_export().is_some(),
        }
    }
}

pub trait ElementModule: WiringModule {
    fn process_element(&self, element: Element) -> Element;
    fn validate_element(&self, element: &Element) -> bool;
}

pub trait ConnectionModule: WiringModule {
    /// Cable length in metres between two elements.
    fn calculate_cable_length(&self, from: &Element, to: &Element) -> f64;
    /// Conductor cross-section in mm² for a load in watts over a distance in
    /// metres.
    fn suggest_cable_section(&self, power: f64, distance: f64) -> f64;
}

pub trait ExportModule: WiringModule {
    fn export(&self, project: &ProjectBundle, format: &str) -> Result<Vec<u8>, ExportError>;
    fn supported_formats(&self) -> Vec<String>;

    fn supports_format(&self, format: &str) -> bool {
        self.supported_formats()
            .iter()
            .any(|supported| supported.eq_ignore_ascii_case(format))
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    struct Blank;

    impl WiringModule for Blank {
        fn info(&self) -> ModuleInfo {
            ModuleInfo::new("Blank", Capability::Generic)
        }

        fn initialize(&mut self, _context: &ModuleContext) -> bool {
            true
        }
    }

    struct Directory;

    impl ModuleDirectory for Directory {
        fn module_names(&self) -> Vec<String> {
            vec!["blank".into()]
        }

        fn module_info(&self, _name: &str) -> Option<ModuleInfo> {
            None
        }

        fn is_enabled(&self, _name: &str) -> Option<bool> {
            Some(true)
        }
    }

    #[test]
    fn generic_module_supports_only_generic() {
        let blank = Blank;
        assert_eq!(blank.capability(), Capability::Generic);
        assert!(blank.supports(Capability::Generic));
        assert!(!blank.supports(Capability::Connection));
    }

    #[test]
    fn context_directory_is_weak() {
        let directory: Arc<dyn ModuleDirectory> = Arc::new(Directory);
        let context = ModuleContext::new("blank")
            .with_directory(Arc::downgrade(&directory))
            .with_settings(json!({"scale": 0.02}));
        assert_eq!(context.setting("scale"), Some(&json!(0.02)));
        assert_eq!(
            context.directory().map(|dir| dir.module_names()),
            Some(vec!["blank".to_string()])
        );
        drop(directory);
        assert!(context.directory().is_none());
    }
}
