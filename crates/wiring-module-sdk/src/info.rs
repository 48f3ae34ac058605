use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Hook set implemented by a module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Capability {
    /// Lifecycle hooks only. Every module satisfies this variant.
    Generic,
    Element,
    Connection,
    Export,
}

impl Capability {
    pub fn label(self) -> &'static str {
        match self {
            Capability::Generic => "generic",
            Capability::Element => "element",
            Capability::Connection => "connection",
            Capability::Export => "export",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Capability {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "generic" | "base" => Ok(Capability::Generic),
            "element" => Ok(Capability::Element),
            "connection" => Ok(Capability::Connection),
            "export" | "exporter" => Ok(Capability::Export),
            other => Err(format!("unknown capability: {other}")),
        }
    }
}

/// Descriptive metadata reported by a module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleInfo {
    pub name: String,
    pub version: String,
    pub description: Option<String>,
    pub author: Option<String>,
    pub capability: Capability,
}

impl ModuleInfo {
    pub fn new(name: impl Into<String>, capability: Capability) -> Self {
        Self {
            name: name.into(),
            version: "1.0.0".into(),
            description: None,
            author: None,
            capability,
        }
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }
}
