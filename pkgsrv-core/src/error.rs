//! Catalog error types

use std::path::PathBuf;
use thiserror::Error;

/// Failures raised while loading or serving the catalog.
///
/// An unknown package is not an error: lookups report it as `Ok(None)`.
#[derive(Error, Debug)]
pub enum CatalogError {
    /// Source document is not well-formed YAML
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml_ng::Error,
    },

    /// Well-formed document that breaks a required-field, uniqueness or existence rule
    #[error("{0}")]
    Validation(String),

    /// Source document could not be read
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Invalid configuration value
    #[error("configuration error: {0}")]
    Config(String),
}

impl CatalogError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        CatalogError::Validation(message.into())
    }

    pub(crate) fn missing_element(key: &str) -> Self {
        CatalogError::Validation(format!(
            "package descriptor is missing element '{}'",
            key
        ))
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, CatalogError::Validation(_))
    }

    pub fn is_parse(&self) -> bool {
        matches!(self, CatalogError::Parse { .. })
    }
}

pub type Result<T> = std::result::Result<T, CatalogError>;
