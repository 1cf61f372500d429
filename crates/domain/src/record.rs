//! The entity record: an open attribute bag with a mandatory name.
//!
//! Compendium data is duck-typed by nature - a spell and a monster share no
//! schema beyond having a `name` - so records keep their fields as raw JSON
//! values rather than forcing a closed struct. Processors mutate records in
//! place during ingestion (hydration rewrites a name list into full
//! objects), which is why the bag is mutable.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::common::{normalize_name, squash_name};
use crate::error::DomainError;

/// The one mandatory field of every record.
pub const NAME_FIELD: &str = "name";

/// Sentinel field marking an incoming record as a deletion request rather
/// than data: `{ "name": "spell1", "delete": true }`.
pub const DELETE_FIELD: &str = "delete";

/// An entity record: a named, open bag of JSON-valued attributes.
///
/// Invariant: the bag always carries a non-empty string `name`. The only
/// way to construct a record is [`EntityRecord::from_value`], which enforces
/// it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct EntityRecord {
    fields: Map<String, Value>,
}

impl EntityRecord {
    /// Builds a record from a raw JSON value.
    ///
    /// Fails with [`DomainError::Validation`] when the value is not an
    /// object or its `name` is missing, not a string, or blank.
    pub fn from_value(value: Value) -> Result<Self, DomainError> {
        let Value::Object(fields) = value else {
            return Err(DomainError::validation("entity record must be a JSON object"));
        };
        match fields.get(NAME_FIELD) {
            Some(Value::String(name)) if !name.trim().is_empty() => Ok(Self { fields }),
            _ => Err(DomainError::validation(
                "entity record must have a non-empty string 'name'",
            )),
        }
    }

    /// The record's name exactly as supplied.
    pub fn name(&self) -> &str {
        self.fields
            .get(NAME_FIELD)
            .and_then(Value::as_str)
            .unwrap_or_default()
    }

    /// The record's name normalized for indexing (trimmed, lowercased).
    pub fn normalized_name(&self) -> String {
        normalize_name(self.name())
    }

    /// The record's name squashed for fuzzy indexing (no whitespace).
    pub fn squashed_name(&self) -> String {
        squash_name(self.name())
    }

    /// Whether this record is a deletion request (`"delete": true`).
    pub fn is_delete_marker(&self) -> bool {
        self.fields
            .get(DELETE_FIELD)
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    /// A field by name, if present.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Sets (or replaces) a field. The `name` field cannot be overwritten;
    /// attempts to do so are ignored so the indexing invariant holds.
    pub fn set(&mut self, field: &str, value: Value) {
        if field == NAME_FIELD {
            return;
        }
        self.fields.insert(field.to_owned(), value);
    }

    /// The record as a plain JSON object value (cloned), for embedding into
    /// other records during hydration.
    pub fn to_value(&self) -> Value {
        Value::Object(self.fields.clone())
    }

    /// Iterates the record's fields in key order.
    pub fn fields(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.fields.iter()
    }
}
