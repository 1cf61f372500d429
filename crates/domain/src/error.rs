//! Unified error type for the domain layer.
//!
//! Record construction and pipeline steps report failures through
//! [`DomainError`] so callers never have to match on strings.

use thiserror::Error;

/// Unified error type for domain operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A record or bundle failed a structural check.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// A raw value could not be interpreted as domain data.
    #[error("Parse error: {0}")]
    Parse(String),
}

impl DomainError {
    /// Creates a validation error.
    ///
    /// Use this when a structural invariant is violated: a record is not a
    /// JSON object, a mandatory field is missing or empty, a field has the
    /// wrong shape.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Creates a parse error for value-to-type conversion failures.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }
}
