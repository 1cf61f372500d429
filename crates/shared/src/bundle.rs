//! The ingestion bundle: one call's payload.
//!
//! A bundle is a JSON object with three reserved metadata keys - `name`
//! (the dependency-tracking identity of the load), `version`, and
//! `dependencies` (a single group name or a list) - plus one array-valued
//! key per entity collection it carries. Anything else is ignored; the
//! engine decides which collection keys it recognizes.

use serde_json::Value;
use thiserror::Error;

/// Errors raised while interpreting a JSON value as a bundle.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BundleParseError {
    #[error("bundle must be a JSON object")]
    NotAnObject,
    #[error("bundle 'name' must be a string")]
    InvalidName,
    #[error("bundle 'version' must be a string")]
    InvalidVersion,
    #[error("bundle 'dependencies' must be a string or an array of strings")]
    InvalidDependencies,
}

/// One ingestion call's payload, possibly spanning multiple collections.
///
/// Collections keep the order they carried in the source document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IngestionBundle {
    /// Dependency-tracking identity of this load, if any.
    pub name: Option<String>,
    /// Declared data-format version, checked by per-collection gates.
    pub version: Option<String>,
    /// Entity groups that must be loaded before this bundle may ingest.
    pub dependencies: Vec<String>,
    /// Collection key -> raw entity records.
    pub collections: Vec<(String, Vec<Value>)>,
}

impl IngestionBundle {
    /// An empty, anonymous bundle. Useful as a builder seed.
    pub fn new() -> Self {
        Self::default()
    }

    /// An empty bundle named for dependency tracking.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    /// Sets the declared version.
    #[must_use]
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Adds a dependency on another entity group.
    #[must_use]
    pub fn with_dependency(mut self, group: impl Into<String>) -> Self {
        self.dependencies.push(group.into());
        self
    }

    /// Adds a collection of raw records.
    #[must_use]
    pub fn with_collection(mut self, key: impl Into<String>, records: Vec<Value>) -> Self {
        self.collections.push((key.into(), records));
        self
    }

    /// Interprets a JSON value as a bundle.
    ///
    /// Reserved keys are parsed as metadata; every other array-valued key
    /// becomes a collection. Non-array unreserved keys are treated as
    /// foreign metadata and skipped.
    pub fn from_value(value: Value) -> Result<Self, BundleParseError> {
        let Value::Object(entries) = value else {
            return Err(BundleParseError::NotAnObject);
        };

        let mut bundle = Self::default();
        for (key, value) in entries {
            match key.as_str() {
                "name" => {
                    bundle.name = Some(
                        value
                            .as_str()
                            .ok_or(BundleParseError::InvalidName)?
                            .to_owned(),
                    );
                }
                "version" => {
                    bundle.version = Some(
                        value
                            .as_str()
                            .ok_or(BundleParseError::InvalidVersion)?
                            .to_owned(),
                    );
                }
                "dependencies" => {
                    bundle.dependencies = parse_dependencies(value)?;
                }
                _ => {
                    if let Value::Array(records) = value {
                        bundle.collections.push((key, records));
                    }
                }
            }
        }
        Ok(bundle)
    }
}

/// Accepts `"base"` as shorthand for `["base"]`.
fn parse_dependencies(value: Value) -> Result<Vec<String>, BundleParseError> {
    match value {
        Value::String(single) => Ok(vec![single]),
        Value::Array(items) => items
            .into_iter()
            .map(|item| match item {
                Value::String(group) => Ok(group),
                _ => Err(BundleParseError::InvalidDependencies),
            })
            .collect(),
        _ => Err(BundleParseError::InvalidDependencies),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_value_parses_metadata_and_collections() {
        let bundle = IngestionBundle::from_value(json!({
            "version": "0.2",
            "name": "srd",
            "spells": [{ "name": "spell1" }],
            "monsters": [{ "name": "monster1" }],
        }))
        .unwrap();

        assert_eq!(bundle.name.as_deref(), Some("srd"));
        assert_eq!(bundle.version.as_deref(), Some("0.2"));
        assert!(bundle.dependencies.is_empty());
        assert_eq!(bundle.collections.len(), 2);
    }

    #[test]
    fn test_single_dependency_string_becomes_a_list() {
        let bundle = IngestionBundle::from_value(json!({
            "name": "derivative",
            "dependencies": "base",
            "spells": [],
        }))
        .unwrap();
        assert_eq!(bundle.dependencies, vec!["base"]);
    }

    #[test]
    fn test_dependency_list_is_preserved() {
        let bundle = IngestionBundle::from_value(json!({
            "dependencies": ["base", "extras"],
        }))
        .unwrap();
        assert_eq!(bundle.dependencies, vec!["base", "extras"]);
    }

    #[test]
    fn test_invalid_dependencies_are_rejected() {
        let err = IngestionBundle::from_value(json!({ "dependencies": 7 }));
        assert_eq!(err, Err(BundleParseError::InvalidDependencies));

        let err = IngestionBundle::from_value(json!({ "dependencies": ["base", 7] }));
        assert_eq!(err, Err(BundleParseError::InvalidDependencies));
    }

    #[test]
    fn test_non_object_bundle_is_rejected() {
        let err = IngestionBundle::from_value(json!([1, 2, 3]));
        assert_eq!(err, Err(BundleParseError::NotAnObject));
    }

    #[test]
    fn test_non_array_foreign_keys_are_skipped() {
        let bundle = IngestionBundle::from_value(json!({
            "format": "srd-export",
            "spells": [],
        }))
        .unwrap();
        assert_eq!(bundle.collections.len(), 1);
        assert_eq!(bundle.collections[0].0, "spells");
    }

    #[test]
    fn test_builder_mirrors_parsing() {
        let built = IngestionBundle::named("srd")
            .with_version("0.2")
            .with_dependency("base")
            .with_collection("spells", vec![json!({ "name": "spell1" })]);
        assert_eq!(built.name.as_deref(), Some("srd"));
        assert_eq!(built.version.as_deref(), Some("0.2"));
        assert_eq!(built.dependencies, vec!["base"]);
        assert_eq!(built.collections.len(), 1);
    }
}
