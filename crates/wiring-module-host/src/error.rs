use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while discovering or managing modules.
#[derive(Debug, Error)]
pub enum HostError {
    #[error("module `{0}` not found")]
    NotFound(String),
    #[error("`{0}` is a reserved unit name")]
    Reserved(String),
    #[error("invalid module name `{0}`")]
    InvalidName(String),
    #[error("invalid manifest {}: {source}", path.display())]
    Manifest {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("module `{name}` references unknown factory `{factory}`")]
    UnknownFactory { name: String, factory: String },
    #[error("module `{0}` failed to initialize")]
    InitializationFailed(String),
    #[error("module `{0}` is already loaded")]
    AlreadyLoaded(String),
    #[error("failed to scan module directory: {0}")]
    Scan(#[from] walkdir::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl HostError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, HostError::NotFound(_))
    }
}
