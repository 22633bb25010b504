//! Package descriptors

use chrono::NaiveDateTime;
use std::path::PathBuf;

use crate::error::{CatalogError, Result};

/// Textual format of package timestamps
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// A package that is available on the server
#[derive(Debug, Clone, PartialEq)]
pub struct PackageDescriptor {
    /// Unique package name
    pub name: String,

    /// Absolute path to the package document
    pub file: PathBuf,

    /// Version information (opaque)
    pub version: String,

    /// When the package was created
    pub timestamp: NaiveDateTime,

    /// Optional description
    pub description: Option<String>,
}

impl PackageDescriptor {
    /// Timestamp rendered as ISO-8601 text
    pub fn timestamp_iso(&self) -> String {
        self.timestamp.format(TIMESTAMP_FORMAT).to_string()
    }
}

/// Parse a package timestamp; anything but `YYYY-MM-DDTHH:MM:SS` is rejected
pub fn parse_timestamp(text: &str) -> Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(text, TIMESTAMP_FORMAT).map_err(|_| {
        CatalogError::validation(format!(
            "invalid timestamp '{}' (expected YYYY-MM-DDTHH:MM:SS)",
            text
        ))
    })
}
