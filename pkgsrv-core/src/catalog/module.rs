//! Module descriptors and hierarchical path matching
//!
//! Every module declared in a package document is addressed by a
//! dot-delimited identifier built from its `folder` and `name`. Queries
//! select modules by segment-wise prefix match on that identifier.

use serde_yaml_ng::Mapping;

use super::fields;
use crate::error::Result;

/// Separator between identifier segments
pub const PATH_DELIMITER: char = '.';

/// One module declared in a package document
#[derive(Debug, Clone, PartialEq)]
pub struct ModuleDescriptor {
    /// Full module path (`folder.name`, or `name` when there is no folder)
    pub identifier: String,

    /// The declaration as written, after download-source rewriting
    pub fields: Mapping,
}

impl ModuleDescriptor {
    /// Wrap a module declaration, deriving its identifier from `folder` and `name`.
    ///
    /// Keys are normalized to strings so the declaration renders as JSON.
    pub fn from_declaration(fields: Mapping) -> Result<Self> {
        let fields = fields::with_string_keys(fields, "module")?;
        let name = fields::scalar_text(fields::require(&fields, "name")?, "module.name")?;
        let folder = fields::optional_text(&fields, "folder", "module")?.unwrap_or_default();

        Ok(Self {
            identifier: compute_identifier(&folder, &name),
            fields,
        })
    }

    /// Check whether this module lies under the given query path
    pub fn matches<S: AsRef<str>>(&self, query: &[S]) -> bool {
        matches(&self.identifier, query)
    }
}

/// Join folder and name into a hierarchical identifier
pub fn compute_identifier(folder: &str, name: &str) -> String {
    if folder.is_empty() {
        name.to_string()
    } else {
        format!("{}{}{}", folder, PATH_DELIMITER, name)
    }
}

/// Segment-wise prefix match of `query` against `identifier`.
///
/// An empty query matches everything; a query with more segments than the
/// identifier never matches.
pub fn matches<S: AsRef<str>>(identifier: &str, query: &[S]) -> bool {
    let path: Vec<&str> = identifier.split(PATH_DELIMITER).collect();
    if path.len() < query.len() {
        return false;
    }

    path.iter()
        .zip(query.iter())
        .all(|(segment, wanted)| *segment == wanted.as_ref())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn declaration(yaml: &str) -> Mapping {
        serde_yaml_ng::from_str(yaml).unwrap()
    }

    #[test]
    fn test_compute_identifier() {
        assert_eq!(compute_identifier("", "build"), "build");
        assert_eq!(compute_identifier("tools", "build"), "tools.build");
        assert_eq!(compute_identifier("a.b", "c"), "a.b.c");
    }

    #[test]
    fn test_matches_is_reflexive() {
        for id in ["build", "tools.build", "a.b.c.d"] {
            let segments: Vec<&str> = id.split('.').collect();
            assert!(matches(id, segments.as_slice()), "{} should match itself", id);
        }
    }

    #[test]
    fn test_empty_query_matches_everything() {
        let empty: [&str; 0] = [];
        assert!(matches("build", &empty));
        assert!(matches("tools.build", &empty));
    }

    #[test]
    fn test_prefix_matching() {
        assert!(matches("a.b.c", &["a"]));
        assert!(matches("a.b.c", &["a", "b"]));
        assert!(!matches("a.b.c", &["a", "b", "d"]));
        assert!(!matches("a.b.c", &["b"]));
    }

    #[test]
    fn test_longer_query_never_matches() {
        assert!(!matches("a.b", &["a", "b", "c"]));
    }

    #[test]
    fn test_matching_is_not_substring_based() {
        assert!(!matches("tools.build", &["tool"]));
        assert!(!matches("tools.build", &["tools", "bui"]));
    }

    #[test]
    fn test_from_declaration() {
        let module = ModuleDescriptor::from_declaration(declaration(
            "name: build\nfolder: tools\n",
        ))
        .unwrap();
        assert_eq!(module.identifier, "tools.build");
        assert!(module.matches(&["tools"]));

        let module = ModuleDescriptor::from_declaration(declaration("name: build\n")).unwrap();
        assert_eq!(module.identifier, "build");

        let module =
            ModuleDescriptor::from_declaration(declaration("name: build\nfolder: ''\n")).unwrap();
        assert_eq!(module.identifier, "build");
    }

    #[test]
    fn test_declaration_keys_become_strings() {
        let module =
            ModuleDescriptor::from_declaration(declaration("name: build\n42: answer\n")).unwrap();
        let json = serde_json::to_value(&module.fields).unwrap();
        assert_eq!(json, serde_json::json!({"name": "build", "42": "answer"}));

        let err = ModuleDescriptor::from_declaration(declaration("name: build\n~: nothing\n"))
            .unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_declaration_without_name_is_rejected() {
        let err = ModuleDescriptor::from_declaration(declaration("folder: tools\n")).unwrap_err();
        assert!(err.is_validation());
        assert!(err.to_string().contains("'name'"));
    }
}
