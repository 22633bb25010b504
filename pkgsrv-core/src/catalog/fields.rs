//! Fallible accessors over parsed YAML documents
//!
//! Documents are kept as generic `serde_yaml_ng` values so module
//! declarations survive verbatim. These helpers pull out the handful of
//! fields the catalog needs and turn shape mismatches into validation
//! errors instead of panics.

use serde_yaml_ng::{Mapping, Value};

use crate::error::{CatalogError, Result};

/// Interpret a document root as a mapping
pub(crate) fn as_mapping<'a>(value: &'a Value, context: &str) -> Result<&'a Mapping> {
    value
        .as_mapping()
        .ok_or_else(|| shape_error(context, "a mapping"))
}

/// Look up a key that must be present
pub(crate) fn require<'a>(map: &'a Mapping, key: &str) -> Result<&'a Value> {
    map.get(key).ok_or_else(|| CatalogError::missing_element(key))
}

/// Render a scalar as text; strings pass through, numbers and booleans are
/// formatted the way they were written
pub(crate) fn scalar_text(value: &Value, context: &str) -> Result<String> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        _ => Err(shape_error(context, "a scalar value")),
    }
}

/// Optional scalar; an explicit `null` counts as absent
pub(crate) fn optional_text(map: &Mapping, key: &str, context: &str) -> Result<Option<String>> {
    match map.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => scalar_text(value, &format!("{}.{}", context, key)).map(Some),
    }
}

pub(crate) fn as_sequence<'a>(value: &'a Value, context: &str) -> Result<&'a [Value]> {
    value
        .as_sequence()
        .map(|seq| seq.as_slice())
        .ok_or_else(|| shape_error(context, "a list"))
}

/// Rewrite every mapping key in `map` and its nested values as a string.
///
/// Numbers and booleans keep their written form; `null` and collection keys
/// have no string form and are rejected.
pub(crate) fn with_string_keys(map: Mapping, context: &str) -> Result<Mapping> {
    let mut keyed = Mapping::with_capacity(map.len());
    for (key, value) in map {
        let key = scalar_text(&key, &format!("{} key", context))?;
        keyed.insert(Value::String(key), string_keys(value, context)?);
    }
    Ok(keyed)
}

fn string_keys(value: Value, context: &str) -> Result<Value> {
    match value {
        Value::Mapping(map) => with_string_keys(map, context).map(Value::Mapping),
        Value::Sequence(items) => items
            .into_iter()
            .map(|item| string_keys(item, context))
            .collect::<Result<Vec<_>>>()
            .map(Value::Sequence),
        Value::Tagged(mut tagged) => {
            let inner = std::mem::take(&mut tagged.value);
            tagged.value = string_keys(inner, context)?;
            Ok(Value::Tagged(tagged))
        }
        scalar => Ok(scalar),
    }
}

pub(crate) fn shape_error(context: &str, expected: &str) -> CatalogError {
    CatalogError::validation(format!("{}: expected {}", context, expected))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(yaml: &str) -> Value {
        serde_yaml_ng::from_str(yaml).unwrap()
    }

    #[test]
    fn test_scalar_text_keeps_written_form() {
        let value = doc("version: 1.0\nflag: true\nname: demo");
        let map = value.as_mapping().unwrap();

        assert_eq!(scalar_text(&map["version"], "version").unwrap(), "1.0");
        assert_eq!(scalar_text(&map["flag"], "flag").unwrap(), "true");
        assert_eq!(scalar_text(&map["name"], "name").unwrap(), "demo");
    }

    #[test]
    fn test_optional_text_treats_null_as_absent() {
        let value = doc("folder: ~\nname: build");
        let map = value.as_mapping().unwrap();

        assert_eq!(optional_text(map, "folder", "module").unwrap(), None);
        assert_eq!(optional_text(map, "missing", "module").unwrap(), None);
        assert_eq!(
            optional_text(map, "name", "module").unwrap().as_deref(),
            Some("build")
        );
    }

    #[test]
    fn test_shape_mismatch_is_validation_error() {
        let value = doc("name: [a, b]");
        let map = value.as_mapping().unwrap();

        let err = scalar_text(&map["name"], "module.name").unwrap_err();
        assert!(err.is_validation());
        assert_eq!(err.to_string(), "module.name: expected a scalar value");

        let err = as_mapping(&doc("- 1\n- 2"), "index").unwrap_err();
        assert_eq!(err.to_string(), "index: expected a mapping");
    }

    #[test]
    fn test_keys_are_rendered_as_strings() {
        let map = doc("1: one\nnested:\n  - true: x\n").as_mapping().unwrap().clone();

        let keyed = with_string_keys(map, "module").unwrap();
        assert_eq!(keyed, doc("'1': one\nnested:\n  - 'true': x\n").as_mapping().unwrap().clone());
    }

    #[test]
    fn test_null_keys_are_rejected() {
        for yaml in ["~: x\nname: build\n", "name: build\nnested: {~: x}\n"] {
            let map = doc(yaml).as_mapping().unwrap().clone();
            let err = with_string_keys(map, "module").unwrap_err();
            assert!(err.is_validation());
            assert_eq!(err.to_string(), "module key: expected a scalar value");
        }
    }
}
