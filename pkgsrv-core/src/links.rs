//! Hypermedia references for API resources
//!
//! Every serialized resource carries a list of links so clients can
//! navigate the API without building URLs themselves. All resource URLs
//! are defined here in one place.

use serde::Serialize;

/// Link relation pointing at the resource itself
pub const REL_SELF: &str = "self";

/// Link relation pointing at the API documentation
pub const REL_APIDOC: &str = "doc";

/// Link relation pointing at the package listing
pub const REL_PACKAGES: &str = "packages";

/// Link relation pointing at the service overview
pub const REL_SERVICE: &str = "home";

/// A `{rel, href}` reference attached to a resource representation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Link {
    #[serde(rename = "rel")]
    pub relation: String,
    pub href: String,
}

/// Reference with an arbitrary relation
pub fn reference(relation: impl Into<String>, href: impl Into<String>) -> Link {
    Link {
        relation: relation.into(),
        href: href.into(),
    }
}

/// Self reference for a resource
pub fn self_reference(href: impl Into<String>) -> Link {
    reference(REL_SELF, href)
}

/// Factory for API resource URLs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlFactory {
    base_url: String,
}

impl UrlFactory {
    /// Use `base_url` as the prefix for all resource URLs.
    ///
    /// Trailing slashes are stripped.
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Build the base URL from server URL, port and application path.
    ///
    /// The port is only included when it is not 80.
    pub fn from_server(server_url: &str, port: u16, app_path: &str) -> Self {
        let mut base_url = server_url.to_string();
        if port != 80 {
            base_url.push_str(&format!(":{}", port));
        }
        base_url.push_str(app_path);
        Self::new(base_url)
    }

    /// Base URL of the service
    pub fn service_url(&self) -> &str {
        &self.base_url
    }

    /// URL of the package listing
    pub fn packages_url(&self) -> String {
        format!("{}/packages", self.service_url())
    }

    /// URL of a package or module query
    pub fn module_url(&self, id: &str) -> String {
        format!("{}/{}", self.packages_url(), id)
    }
}
