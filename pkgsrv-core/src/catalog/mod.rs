//! Package catalog - descriptors, path matching and document loading
//!
//! # Overview
//!
//! The catalog is derived entirely from YAML documents on disk:
//!
//! ```text
//! index.yaml            ← Lists package names and their documents
//!     │
//!     ├── demo.yaml     ← version, timestamp, description, modules
//!     └── tools.yaml
//! ```
//!
//! Nothing is cached. Every load re-reads the documents, so a snapshot is
//! only as old as the request that produced it.

mod fields;
mod loader;
mod module;
mod package;

pub use loader::{
    load_index, load_modules, rewrite_download_sources, Catalog, DOWNLOAD_TASK, SOURCE_PROPERTY,
};
pub(crate) use loader::unknown_file;
pub use module::{compute_identifier, matches, ModuleDescriptor, PATH_DELIMITER};
pub use package::{parse_timestamp, PackageDescriptor, TIMESTAMP_FORMAT};
