//! Index and package document loading
//!
//! The index document lists the packages served by the catalog:
//!
//! ```yaml
//! packages:
//!   - name: demo
//!     file: /srv/packages/demo.yaml
//! ```
//!
//! Each package document carries its metadata and module declarations:
//!
//! ```yaml
//! version: "1.0"
//! timestamp: "2020-01-01T00:00:00"
//! description: Demo package
//! modules:
//!   - name: build
//!     folder: tools
//!     install:
//!       tasks:
//!         - type: DOWNLOAD
//!           properties:
//!             - name: source
//!               value: demo/build.tar
//! ```
//!
//! Loading is all-or-nothing: any parse or validation failure aborts the
//! whole load and no partial catalog is returned.

use indexmap::IndexMap;
use serde_yaml_ng::{Mapping, Value};
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

use super::fields;
use super::module::ModuleDescriptor;
use super::package::{parse_timestamp, PackageDescriptor};
use crate::error::{CatalogError, Result};

/// Install task type whose `source` properties point at downloadable files
pub const DOWNLOAD_TASK: &str = "DOWNLOAD";

/// Property of a download task holding the file location
pub const SOURCE_PROPERTY: &str = "source";

/// Packages keyed by name, in index declaration order
pub type Catalog = IndexMap<String, PackageDescriptor>;

/// Read the index document and every package document it references
pub fn load_index(path: &Path) -> Result<Catalog> {
    let doc = read_document(path, unknown_file)?;
    let index = fields::as_mapping(&doc, "index file")?;

    let entries = index.get("packages").ok_or_else(|| {
        CatalogError::validation("index file is missing element 'packages'")
    })?;
    let entries = fields::as_sequence(entries, "packages")?;

    let mut packages = Catalog::new();
    for entry in entries {
        let entry = fields::as_mapping(entry, "package entry")?;
        let name = fields::scalar_text(fields::require(entry, "name")?, "package.name")?;
        let file = fields::scalar_text(fields::require(entry, "file")?, "package.file")?;

        if packages.contains_key(&name) {
            return Err(CatalogError::validation(format!(
                "duplicate package descriptor '{}'",
                name
            )));
        }

        let package = load_package(name.clone(), &absolute_path(&file)?)?;
        packages.insert(name, package);
    }

    debug!(
        "Loaded package index {} ({} packages)",
        path.display(),
        packages.len()
    );
    Ok(packages)
}

/// Read the package document at `file` into a descriptor
fn load_package(name: String, file: &Path) -> Result<PackageDescriptor> {
    let doc = read_package_document(file)?;
    let pckg = fields::as_mapping(&doc, "package file")?;

    let timestamp = fields::require(pckg, "timestamp")?;
    let version = fields::require(pckg, "version")?;

    let timestamp = parse_timestamp(&fields::scalar_text(timestamp, "timestamp")?)?;
    let version = fields::scalar_text(version, "version")?;
    let description = fields::optional_text(pckg, "description", "package")?;

    Ok(PackageDescriptor {
        name,
        file: file.to_path_buf(),
        version,
        timestamp,
        description,
    })
}

/// Read the modules declared in a package document.
///
/// Download sources are prefixed with `download_prefix`; the returned
/// descriptors hold the rewritten declarations in document order.
pub fn load_modules(package_file: &Path, download_prefix: &str) -> Result<Vec<ModuleDescriptor>> {
    let doc = read_package_document(package_file)?;
    let pckg = fields::as_mapping(&doc, "package file")?;

    let declarations = match pckg.get("modules") {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(value) => fields::as_sequence(value, "modules")?,
    };

    let mut modules = Vec::with_capacity(declarations.len());
    for declaration in declarations {
        let declaration = fields::as_mapping(declaration, "module")?.clone();
        let declaration = rewrite_download_sources(declaration, download_prefix)?;
        modules.push(ModuleDescriptor::from_declaration(declaration)?);
    }

    debug!(
        "Loaded {} modules from {}",
        modules.len(),
        package_file.display()
    );
    Ok(modules)
}

/// Prefix every `source` property of `DOWNLOAD` install tasks with the
/// download location.
///
/// Consumes the declaration and returns the rewritten one.
pub fn rewrite_download_sources(mut declaration: Mapping, download_prefix: &str) -> Result<Mapping> {
    let install = match declaration.get_mut("install") {
        None | Some(Value::Null) => return Ok(declaration),
        Some(install) => install
            .as_mapping_mut()
            .ok_or_else(|| fields::shape_error("install", "a mapping"))?,
    };

    let tasks = match install.get_mut("tasks") {
        None | Some(Value::Null) => return Ok(declaration),
        Some(tasks) => tasks
            .as_sequence_mut()
            .ok_or_else(|| fields::shape_error("install.tasks", "a list"))?,
    };

    for task in tasks.iter_mut() {
        let task = task
            .as_mapping_mut()
            .ok_or_else(|| fields::shape_error("install task", "a mapping"))?;

        if task.get("type").and_then(Value::as_str) != Some(DOWNLOAD_TASK) {
            continue;
        }

        let properties = match task.get_mut("properties") {
            None | Some(Value::Null) => continue,
            Some(properties) => properties
                .as_sequence_mut()
                .ok_or_else(|| fields::shape_error("install task properties", "a list"))?,
        };

        for property in properties.iter_mut() {
            let property = property
                .as_mapping_mut()
                .ok_or_else(|| fields::shape_error("task property", "a mapping"))?;

            if property.get("name").and_then(Value::as_str) != Some(SOURCE_PROPERTY) {
                continue;
            }

            let value = property
                .get_mut("value")
                .ok_or_else(|| CatalogError::missing_element("value"))?;
            let source = fields::scalar_text(value, "source property")?;
            let rewritten = format!("{}/{}", download_prefix, source);
            trace!("Rewrote download source {} -> {}", source, rewritten);
            *value = Value::String(rewritten);
        }
    }

    Ok(declaration)
}

/// Package documents must exist; a file vanishing between the existence
/// check and the read is reported the same way
fn read_package_document(file: &Path) -> Result<Value> {
    if !file.is_file() {
        return Err(package_file_missing(file));
    }
    read_document(file, package_file_missing)
}

/// Parse a YAML document with merge keys (`<<: *anchor`) resolved
fn read_document(path: &Path, missing: fn(&Path) -> CatalogError) -> Result<Value> {
    let content = std::fs::read_to_string(path).map_err(|source| {
        if source.kind() == std::io::ErrorKind::NotFound {
            missing(path)
        } else {
            CatalogError::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    })?;

    let parse_error = |source: serde_yaml_ng::Error| CatalogError::Parse {
        path: path.to_path_buf(),
        source,
    };
    let mut doc: Value = serde_yaml_ng::from_str(&content).map_err(parse_error)?;
    doc.apply_merge().map_err(parse_error)?;
    Ok(doc)
}

fn package_file_missing(path: &Path) -> CatalogError {
    CatalogError::validation(format!(
        "package file '{}' does not exist",
        path.display()
    ))
}

/// Error for an index document that is not there
pub(crate) fn unknown_file(path: &Path) -> CatalogError {
    CatalogError::validation(format!("unknown file '{}'", path.display()))
}

/// Resolve a package file reference against the working directory
fn absolute_path(file: &str) -> Result<PathBuf> {
    std::path::absolute(file).map_err(|source| CatalogError::Io {
        path: PathBuf::from(file),
        source,
    })
}
