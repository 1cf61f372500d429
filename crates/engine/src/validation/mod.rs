//! Declarative JSON validation for bundles and records.

mod json_validator;

pub use json_validator::{FieldKind, FieldSpec, JsonValidator, ValidatorSpec};
