//! prm package server - catalog resolution engine
//!
//! Loads the package catalog from YAML documents, matches hierarchical
//! module queries and decorates results with hypermedia links.

pub mod catalog;
pub mod config;
pub mod error;
pub mod links;
pub mod service;

pub use config::ServiceConfig;
pub use error::{CatalogError, Result};
pub use service::CatalogService;
