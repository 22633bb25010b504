//! Catalog service - answers the queries exposed by the Web API
//!
//! The service keeps no catalog state between calls. Each query reloads the
//! index (and, for module queries, the package document) so the answer
//! always reflects the files on disk. The only precomputed value is the
//! service overview, which contains no catalog data.

use serde::Serialize;
use serde_yaml_ng::Mapping;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::catalog::{self, PackageDescriptor, PATH_DELIMITER};
use crate::config::ServiceConfig;
use crate::error::{CatalogError, Result};
use crate::links::{
    reference, self_reference, Link, UrlFactory, REL_APIDOC, REL_PACKAGES, REL_SERVICE,
};

/// Key under which resources list their links
pub const JSON_REFERENCES: &str = "links";

/// Service overview returned by the API root
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceDescriptor {
    pub name: String,
    pub links: Vec<Link>,
}

/// Listing of all available packages
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PackageListing {
    pub packages: Vec<PackageDocument>,
    pub links: Vec<Link>,
}

/// Serialized package descriptor
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PackageDocument {
    pub name: String,
    pub version: String,
    pub timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub links: Vec<Link>,
}

/// Modules matching a query expression
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModuleListing {
    pub modules: Vec<ModuleDocument>,
    pub links: Vec<Link>,
}

/// A module declaration as written in its package document, plus links
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModuleDocument {
    /// Module path within its package
    #[serde(skip)]
    pub identifier: String,
    #[serde(flatten)]
    pub fields: Mapping,
    pub links: Vec<Link>,
}

/// Package and module counts of a fully loaded catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogSummary {
    pub packages: usize,
    pub modules: usize,
}

/// Read-only catalog API
#[derive(Debug)]
pub struct CatalogService {
    index_file: PathBuf,
    download_prefix: String,
    urls: UrlFactory,
    descriptor: ServiceDescriptor,
}

impl CatalogService {
    /// Create the service from configuration.
    ///
    /// Fails if the index file does not exist or does not load, so a
    /// broken catalog is caught at startup.
    pub fn new(config: &ServiceConfig) -> Result<Self> {
        let index_file =
            std::path::absolute(&config.package_index).map_err(|source| CatalogError::Io {
                path: config.package_index.clone(),
                source,
            })?;
        if !index_file.is_file() {
            return Err(catalog::unknown_file(&index_file));
        }

        let packages = catalog::load_index(&index_file)?;
        info!(
            "Serving package index {} ({} packages)",
            index_file.display(),
            packages.len()
        );

        let urls = config.url_factory();
        let descriptor = ServiceDescriptor {
            name: config.app_name.clone(),
            links: vec![
                self_reference(urls.service_url()),
                reference(REL_PACKAGES, urls.packages_url()),
                reference(REL_APIDOC, config.api_doc.clone()),
            ],
        };

        Ok(Self {
            index_file,
            download_prefix: config.download_prefix().to_string(),
            urls,
            descriptor,
        })
    }

    /// Absolute path of the package index document
    pub fn index_file(&self) -> &Path {
        &self.index_file
    }

    /// Essential information about the service with links to its resources
    pub fn service_overview(&self) -> &ServiceDescriptor {
        &self.descriptor
    }

    /// All packages currently available, in index order
    pub fn list_packages(&self) -> Result<PackageListing> {
        let packages = catalog::load_index(&self.index_file)?;
        debug!("Listing {} packages", packages.len());

        Ok(PackageListing {
            packages: packages
                .values()
                .map(|package| self.package_document(package))
                .collect(),
            links: vec![
                self_reference(self.urls.packages_url()),
                reference(REL_SERVICE, self.urls.service_url()),
            ],
        })
    }

    /// Modules matching a query expression.
    ///
    /// The first segment of the expression names the package, the remaining
    /// segments select modules by path prefix. Returns `Ok(None)` when the
    /// package is unknown; a known package with no matching modules yields
    /// an empty listing.
    pub fn resolve_modules(&self, query: &str) -> Result<Option<ModuleListing>> {
        debug!("Resolving module query '{}'", query);

        let mut segments = query.split(PATH_DELIMITER);
        let package_name = segments.next().unwrap_or_default();
        let path: Vec<&str> = segments.collect();

        let packages = catalog::load_index(&self.index_file)?;
        let Some(package) = packages.get(package_name) else {
            debug!("Unknown package '{}'", package_name);
            return Ok(None);
        };

        let modules = catalog::load_modules(&package.file, &self.download_prefix)?
            .into_iter()
            .filter(|module| module.matches(path.as_slice()))
            .map(|module| {
                let mut fields = module.fields;
                fields.shift_remove(JSON_REFERENCES);
                let href = self.urls.module_url(&format!(
                    "{}{}{}",
                    package_name, PATH_DELIMITER, module.identifier
                ));
                ModuleDocument {
                    identifier: module.identifier,
                    fields,
                    links: vec![self_reference(href)],
                }
            })
            .collect::<Vec<_>>();
        debug!("Query '{}' matched {} modules", query, modules.len());

        Ok(Some(ModuleListing {
            modules,
            links: vec![
                self_reference(self.urls.module_url(query)),
                reference(REL_PACKAGES, self.urls.packages_url()),
                reference(REL_SERVICE, self.urls.service_url()),
            ],
        }))
    }

    /// Load the index and every package's modules, reporting the first failure
    pub fn validate(&self) -> Result<CatalogSummary> {
        let packages = catalog::load_index(&self.index_file)?;
        let mut modules = 0;
        for package in packages.values() {
            modules += catalog::load_modules(&package.file, &self.download_prefix)?.len();
        }

        Ok(CatalogSummary {
            packages: packages.len(),
            modules,
        })
    }

    fn package_document(&self, package: &PackageDescriptor) -> PackageDocument {
        PackageDocument {
            name: package.name.clone(),
            version: package.version.clone(),
            timestamp: package.timestamp_iso(),
            description: package.description.clone(),
            links: vec![
                self_reference(self.urls.module_url(&package.name)),
                reference(REL_PACKAGES, self.urls.packages_url()),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::TempDir;

    fn fixture() -> (TempDir, ServiceConfig) {
        let dir = TempDir::new().unwrap();
        let package = dir.path().join("demo.yaml");
        fs::write(
            &package,
            r#"
version: "1.0"
timestamp: "2020-01-01T00:00:00"
modules:
  - name: build
    folder: tools
    links: stale
  - name: lint
    folder: tools.check
  - name: readme
    install:
      tasks:
        - type: DOWNLOAD
          properties:
            - name: source
              value: demo/readme.md
"#,
        )
        .unwrap();
        let index = dir.path().join("index.yaml");
        fs::write(
            &index,
            format!("packages:\n  - name: demo\n    file: {}\n", package.display()),
        )
        .unwrap();

        let config = ServiceConfig {
            package_index: index,
            server_url: "http://x".to_string(),
            port: 80,
            app_path: "/api".to_string(),
            download_prefix: "http://files/pkgs/".to_string(),
            ..ServiceConfig::default()
        };
        (dir, config)
    }

    #[test]
    fn test_missing_index_fails_construction() {
        let config = ServiceConfig {
            package_index: PathBuf::from("/nonexistent/index.yaml"),
            ..ServiceConfig::default()
        };
        let err = CatalogService::new(&config).unwrap_err();
        assert!(err.is_validation());
        assert_eq!(err.to_string(), "unknown file '/nonexistent/index.yaml'");
    }

    #[test]
    fn test_service_overview() {
        let (_dir, config) = fixture();
        let service = CatalogService::new(&config).unwrap();

        let overview = service.service_overview();
        assert_eq!(overview.name, config.app_name);
        assert_eq!(
            overview.links,
            vec![
                self_reference("http://x/api"),
                reference("packages", "http://x/api/packages"),
                reference("doc", config.api_doc.clone()),
            ]
        );
    }

    #[test]
    fn test_module_links_and_listing_links() {
        let (_dir, config) = fixture();
        let service = CatalogService::new(&config).unwrap();

        let listing = service.resolve_modules("demo.tools").unwrap().unwrap();
        let ids: Vec<&str> = listing.modules.iter().map(|m| m.identifier.as_str()).collect();
        assert_eq!(ids, vec!["tools.build", "tools.check.lint"]);
        assert_eq!(
            listing.modules[0].links,
            vec![self_reference("http://x/api/packages/demo.tools.build")]
        );
        assert_eq!(
            listing.links,
            vec![
                self_reference("http://x/api/packages/demo.tools"),
                reference("packages", "http://x/api/packages"),
                reference("home", "http://x/api"),
            ]
        );
    }

    #[test]
    fn test_whole_package_query() {
        let (_dir, config) = fixture();
        let service = CatalogService::new(&config).unwrap();

        let listing = service.resolve_modules("demo").unwrap().unwrap();
        assert_eq!(listing.modules.len(), 3);
    }

    #[test]
    fn test_module_document_serialization() {
        let (_dir, config) = fixture();
        let service = CatalogService::new(&config).unwrap();

        let listing = service.resolve_modules("demo.readme").unwrap().unwrap();
        let json = serde_json::to_value(&listing.modules[0]).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "name": "readme",
                "install": {
                    "tasks": [{
                        "type": "DOWNLOAD",
                        "properties": [
                            {"name": "source", "value": "http://files/pkgs/demo/readme.md"}
                        ]
                    }]
                },
                "links": [
                    {"rel": "self", "href": "http://x/api/packages/demo.readme"}
                ]
            })
        );

        // A declared `links` key is replaced by the generated links
        let listing = service.resolve_modules("demo.tools.build").unwrap().unwrap();
        let json = serde_json::to_value(&listing.modules[0]).unwrap();
        assert_eq!(
            json["links"],
            serde_json::json!([{"rel": "self", "href": "http://x/api/packages/demo.tools.build"}])
        );
    }

    #[test]
    fn test_package_listing_serialization() {
        let (_dir, config) = fixture();
        let service = CatalogService::new(&config).unwrap();

        let json = serde_json::to_value(service.list_packages().unwrap()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "packages": [{
                    "name": "demo",
                    "version": "1.0",
                    "timestamp": "2020-01-01T00:00:00",
                    "links": [
                        {"rel": "self", "href": "http://x/api/packages/demo"},
                        {"rel": "packages", "href": "http://x/api/packages"}
                    ]
                }],
                "links": [
                    {"rel": "self", "href": "http://x/api/packages"},
                    {"rel": "home", "href": "http://x/api"}
                ]
            })
        );
    }

    #[test]
    fn test_validate_counts_modules() {
        let (_dir, config) = fixture();
        let service = CatalogService::new(&config).unwrap();

        assert_eq!(
            service.validate().unwrap(),
            CatalogSummary {
                packages: 1,
                modules: 3
            }
        );
    }

    #[test]
    fn test_index_removed_after_startup() {
        let (dir, config) = fixture();
        let service = CatalogService::new(&config).unwrap();

        let index = dir.path().join("index.yaml");
        fs::remove_file(&index).unwrap();
        let err = service.list_packages().unwrap_err();
        assert!(err.is_validation());
        assert_eq!(
            err.to_string(),
            format!("unknown file '{}'", service.index_file().display())
        );
    }

    #[test]
    fn test_index_changes_are_picked_up() {
        let (dir, config) = fixture();
        let service = CatalogService::new(&config).unwrap();

        fs::write(dir.path().join("index.yaml"), "packages: []\n").unwrap();
        assert!(service.list_packages().unwrap().packages.is_empty());
        assert_eq!(service.resolve_modules("demo").unwrap(), None);
    }
}
