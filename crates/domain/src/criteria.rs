//! Attribute-based search criteria matching.
//!
//! A criteria map pairs field names with expected values. A record matches
//! when every criterion matches (logical AND). Multi-valued record fields -
//! JSON arrays and comma-separated strings - are treated as sets.

use serde_json::{Map, Value};

use crate::common::split_comma_set;
use crate::record::EntityRecord;

/// Returns true when `record` satisfies every criterion in `criteria`.
///
/// - an array criterion matches if the record field, viewed as a set,
///   intersects the criterion's values;
/// - a string criterion matches if the record field, viewed as a set,
///   contains it;
/// - a boolean or numeric criterion matches by exact equality;
/// - a missing record field never matches.
pub fn record_matches(record: &EntityRecord, criteria: &Map<String, Value>) -> bool {
    criteria.iter().all(|(field, expected)| {
        record
            .get(field)
            .is_some_and(|actual| criterion_matches(actual, expected))
    })
}

fn criterion_matches(actual: &Value, expected: &Value) -> bool {
    match expected {
        Value::Array(candidates) => candidates.iter().any(|value| set_contains(actual, value)),
        Value::String(_) => set_contains(actual, expected),
        Value::Bool(_) | Value::Number(_) => actual == expected,
        _ => false,
    }
}

/// Whether `actual`, viewed as a set, contains `expected`.
///
/// An array field is the set of its elements; a string field is the set of
/// its trimmed comma-separated parts; any other scalar is a one-element set.
fn set_contains(actual: &Value, expected: &Value) -> bool {
    match actual {
        Value::Array(items) => items.contains(expected),
        Value::String(raw) => match expected {
            Value::String(wanted) => split_comma_set(raw).iter().any(|part| part == wanted),
            _ => false,
        },
        other => other == expected,
    }
}
