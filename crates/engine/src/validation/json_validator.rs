//! The declarative JSON validator.
//!
//! A [`JsonValidator`] is built once from a spec document describing the
//! accepted data-format versions and the expected shape of entity records.
//! It plugs into the compendium two ways: as a version gate evaluated
//! against a whole bundle before ingestion, and as a pipeline processor
//! checking each record's structure. It never mutates what it checks.

use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;

use grimoire_shared::IngestionBundle;

use crate::compendium::{Collections, EntityProcessor, ProcessorError, VersionChecker};
use grimoire_domain::EntityRecord;

/// Expected shape of one record field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    String,
    Number,
    Boolean,
    Array,
    Object,
}

impl FieldKind {
    fn matches(self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Number => value.is_number(),
            Self::Boolean => value.is_boolean(),
            Self::Array => value.is_array(),
            Self::Object => value.is_object(),
        }
    }

    fn describe(self) -> &'static str {
        match self {
            Self::String => "a string",
            Self::Number => "a number",
            Self::Boolean => "a boolean",
            Self::Array => "an array",
            Self::Object => "an object",
        }
    }
}

/// Declared constraints for one record field.
#[derive(Debug, Clone, Deserialize)]
pub struct FieldSpec {
    #[serde(rename = "type")]
    pub kind: FieldKind,
    #[serde(default)]
    pub required: bool,
}

/// The declarative validation spec, deserialized from a JSON document.
///
/// ```json
/// {
///   "versions": ["0.2"],
///   "fields": {
///     "name": { "type": "string", "required": true },
///     "spells": { "type": "string" }
///   }
/// }
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ValidatorSpec {
    /// Accepted version strings; empty means any version is accepted.
    #[serde(default)]
    pub versions: Vec<String>,
    /// Per-field shape constraints, keyed by field name.
    #[serde(default)]
    pub fields: BTreeMap<String, FieldSpec>,
}

/// Schema/version checker driven by a [`ValidatorSpec`].
pub struct JsonValidator {
    spec: ValidatorSpec,
}

impl JsonValidator {
    pub fn new(spec: ValidatorSpec) -> Self {
        Self { spec }
    }

    /// Builds a validator from a raw spec document.
    pub fn from_value(spec: Value) -> Result<Self, serde_json::Error> {
        Ok(Self::new(serde_json::from_value(spec)?))
    }

    /// Whether the given declared version is acceptable.
    pub fn accepts_version(&self, version: Option<&str>) -> bool {
        if self.spec.versions.is_empty() {
            return true;
        }
        version.is_some_and(|v| self.spec.versions.iter().any(|accepted| accepted == v))
    }

    /// Checks a candidate document against the field constraints.
    ///
    /// Returns every violation found, not just the first.
    pub fn validate(&self, candidate: &Value) -> Result<(), Vec<String>> {
        let Some(fields) = candidate.as_object() else {
            return Err(vec!["document must be a JSON object".to_owned()]);
        };

        let mut violations = Vec::new();
        for (name, spec) in &self.spec.fields {
            match fields.get(name) {
                Some(value) => {
                    if !spec.kind.matches(value) {
                        violations.push(format!(
                            "field '{}' must be {}",
                            name,
                            spec.kind.describe()
                        ));
                    }
                }
                None if spec.required => {
                    violations.push(format!("required field '{}' is missing", name));
                }
                None => {}
            }
        }

        if violations.is_empty() {
            Ok(())
        } else {
            Err(violations)
        }
    }
}

impl VersionChecker for JsonValidator {
    fn accepts(&self, bundle: &IngestionBundle) -> bool {
        self.accepts_version(bundle.version.as_deref())
    }
}

impl EntityProcessor for JsonValidator {
    fn name(&self) -> &'static str {
        "json-validator"
    }

    fn process(
        &self,
        record: &mut EntityRecord,
        _collections: &mut Collections,
    ) -> Result<(), ProcessorError> {
        self.validate(&record.to_value())
            .map_err(|errors| ProcessorError {
                processor: self.name(),
                entity: record.name().to_owned(),
                errors,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn monster_validator() -> JsonValidator {
        JsonValidator::from_value(json!({
            "versions": ["0.2", "0.3"],
            "fields": {
                "name": { "type": "string", "required": true },
                "challenge": { "type": "number", "required": true },
                "spells": { "type": "string" },
            },
        }))
        .unwrap()
    }

    #[test]
    fn test_accepts_listed_versions_only() {
        let validator = monster_validator();
        assert!(validator.accepts_version(Some("0.2")));
        assert!(validator.accepts_version(Some("0.3")));
        assert!(!validator.accepts_version(Some("1.0")));
        assert!(!validator.accepts_version(None));
    }

    #[test]
    fn test_empty_version_list_accepts_anything() {
        let validator = JsonValidator::from_value(json!({})).unwrap();
        assert!(validator.accepts_version(None));
        assert!(validator.accepts_version(Some("weird")));
    }

    #[test]
    fn test_validate_collects_every_violation() {
        let validator = monster_validator();
        let violations = validator
            .validate(&json!({ "name": 7, "spells": ["wrong shape"] }))
            .unwrap_err();
        assert_eq!(
            violations,
            vec![
                "required field 'challenge' is missing",
                "field 'name' must be a string",
                "field 'spells' must be a string",
            ]
        );
    }

    #[test]
    fn test_validate_passes_conforming_documents() {
        let validator = monster_validator();
        assert!(validator
            .validate(&json!({ "name": "monster1", "challenge": 5, "spells": "spell1" }))
            .is_ok());
        // Optional fields may be absent
        assert!(validator
            .validate(&json!({ "name": "monster2", "challenge": 0.5 }))
            .is_ok());
    }

    #[test]
    fn test_as_version_checker_reads_the_bundle() {
        let validator = monster_validator();
        assert!(validator.accepts(&IngestionBundle::new().with_version("0.2")));
        assert!(!validator.accepts(&IngestionBundle::new().with_version("9.9")));
    }

    #[test]
    fn test_as_processor_routes_violations() {
        let validator = monster_validator();
        let mut collections = Collections::default();
        let mut record =
            EntityRecord::from_value(json!({ "name": "monster1" })).unwrap();
        let err = validator.process(&mut record, &mut collections).unwrap_err();
        assert_eq!(err.processor, "json-validator");
        assert_eq!(err.entity, "monster1");
        assert_eq!(err.errors, vec!["required field 'challenge' is missing"]);
    }
}
