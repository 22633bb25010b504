//! Service configuration
//!
//! Configuration files are YAML documents holding a list of key/value
//! properties:
//!
//! ```yaml
//! properties:
//!   - key: server.port
//!     value: 8080
//!   - key: package.index
//!     value: /srv/packages/index.yaml
//! ```
//!
//! Every recognized key overrides its default; everything else is ignored.

use serde::Deserialize;
use serde_yaml_ng::Value;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::{CatalogError, Result};
use crate::links::UrlFactory;

/// Environment variable naming the configuration file
pub const ENV_CONFIG: &str = "PKGSRV_CONFIG";

/// Earlier name of `PKGSRV_CONFIG`, still honored when the new one is unset
pub const LEGACY_ENV_CONFIG: &str = "PRMPCKGSRV_CONFIG";

/// Configuration file looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "./config.yaml";

pub const API_DOC: &str = "api.doc";
pub const APP_NAME: &str = "app.name";
pub const APP_DEBUG: &str = "app.debug";
pub const DOWNLOAD_URLPREFIX: &str = "download.urlprefix";
pub const PACKAGE_INDEXFILE: &str = "package.index";
pub const SERVER_APP_PATH: &str = "server.apppath";
pub const SERVER_URL: &str = "server.url";
pub const SERVER_PORT: &str = "server.port";

/// Immutable configuration handed to the catalog service at construction
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceConfig {
    /// Application name reported by the service overview
    pub app_name: String,

    /// Enables debug logging
    pub debug: bool,

    /// URL of the API documentation
    pub api_doc: String,

    /// URL prefix for module download sources
    pub download_prefix: String,

    /// Path to the package index document
    pub package_index: PathBuf,

    /// Application path part of resource URLs
    pub app_path: String,

    /// Base URL of the server
    pub server_url: String,

    /// Port the server listens on
    pub port: u16,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            app_name: "prm - Project Repository Manager".to_string(),
            debug: true,
            api_doc: "http://cds-dc.cims.nyu.edu/prm/package-server/".to_string(),
            download_prefix: "http://cds-dc.cims.nyu.edu/prm/packages".to_string(),
            package_index: PathBuf::from("./.packages/index.yaml"),
            app_path: "/package-server/api/v1".to_string(),
            server_url: "http://localhost".to_string(),
            port: 5000,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    properties: Vec<Property>,
}

#[derive(Debug, Deserialize)]
struct Property {
    key: String,
    value: Value,
}

impl ServiceConfig {
    /// Load configuration.
    ///
    /// Resolution order:
    /// 1. `explicit` path (must exist)
    /// 2. File named by `PKGSRV_CONFIG` (or `PRMPCKGSRV_CONFIG`), if it exists
    /// 3. `./config.yaml`, if it exists
    /// 4. Defaults
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let env = config_env(|name| std::env::var_os(name));
        match resolve_config_path(explicit, env)? {
            Some(path) => Self::from_file(&path),
            None => {
                debug!("No configuration file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Read a configuration file and overlay it onto the defaults
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        debug!("Loading configuration from {}", path.display());
        Self::from_yaml(&content).map_err(|err| match err {
            CatalogError::Config(message) => {
                CatalogError::Config(format!("{}: {}", path.display(), message))
            }
            other => other,
        })
    }

    /// Parse a configuration document and overlay it onto the defaults
    pub fn from_yaml(content: &str) -> Result<Self> {
        let file: ConfigFile = serde_yaml_ng::from_str(content)
            .map_err(|e| CatalogError::Config(format!("invalid configuration file: {}", e)))?;

        let mut config = Self::default();
        for property in file.properties {
            config.set(&property.key, property.value)?;
        }
        Ok(config)
    }

    /// Override a single recognized key
    pub fn set(&mut self, key: &str, value: Value) -> Result<()> {
        match key {
            APP_NAME => self.app_name = text(key, &value)?,
            APP_DEBUG => {
                self.debug = value
                    .as_bool()
                    .ok_or_else(|| invalid(key, "a boolean"))?
            }
            API_DOC => self.api_doc = text(key, &value)?,
            DOWNLOAD_URLPREFIX => self.download_prefix = text(key, &value)?,
            PACKAGE_INDEXFILE => self.package_index = PathBuf::from(text(key, &value)?),
            SERVER_APP_PATH => self.app_path = text(key, &value)?,
            SERVER_URL => self.server_url = text(key, &value)?,
            SERVER_PORT => {
                self.port = value
                    .as_u64()
                    .and_then(|port| u16::try_from(port).ok())
                    .ok_or_else(|| invalid(key, "a port number"))?
            }
            _ => warn!("Ignoring unknown configuration key '{}'", key),
        }
        Ok(())
    }

    /// Download prefix without trailing slashes
    pub fn download_prefix(&self) -> &str {
        self.download_prefix.trim_end_matches('/')
    }

    /// URL factory for the configured server URL, port and application path
    pub fn url_factory(&self) -> UrlFactory {
        UrlFactory::from_server(&self.server_url, self.port, &self.app_path)
    }

    /// Base URL of the service
    pub fn base_url(&self) -> String {
        self.url_factory().service_url().to_string()
    }
}

fn config_env(lookup: impl Fn(&str) -> Option<OsString>) -> Option<OsString> {
    lookup(ENV_CONFIG).or_else(|| {
        let legacy = lookup(LEGACY_ENV_CONFIG)?;
        debug!("Using {}, {} is not set", LEGACY_ENV_CONFIG, ENV_CONFIG);
        Some(legacy)
    })
}

fn resolve_config_path(explicit: Option<&Path>, env: Option<OsString>) -> Result<Option<PathBuf>> {
    if let Some(path) = explicit {
        if !path.is_file() {
            return Err(CatalogError::Config(format!(
                "configuration file '{}' does not exist",
                path.display()
            )));
        }
        return Ok(Some(path.to_path_buf()));
    }

    if let Some(path) = env.map(PathBuf::from) {
        if path.is_file() {
            return Ok(Some(path));
        }
        warn!(
            "{} points to missing file {}, ignoring",
            ENV_CONFIG,
            path.display()
        );
    }

    let fallback = PathBuf::from(DEFAULT_CONFIG_FILE);
    Ok(fallback.is_file().then_some(fallback))
}

fn text(key: &str, value: &Value) -> Result<String> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        _ => Err(invalid(key, "a string")),
    }
}

fn invalid(key: &str, expected: &str) -> CatalogError {
    CatalogError::Config(format!("'{}' must be {}", key, expected))
}
