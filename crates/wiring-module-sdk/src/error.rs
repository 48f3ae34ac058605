use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("a factory with id `{0}` is already registered")]
    Duplicate(String),
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("unsupported export format `{0}`")]
    UnsupportedFormat(String),
    #[error("failed to encode export: {0}")]
    Encode(String),
    #[error("failed to serialize export: {0}")]
    Serialize(#[from] serde_json::Error),
}
