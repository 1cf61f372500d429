//! Grimoire Domain library.
//!
//! Core model for compendium entities: the open attribute-bag record type,
//! name normalization rules, search criteria matching, and the unified
//! domain error type.

pub mod common;
pub mod criteria;
pub mod error;
pub mod record;

pub use common::{normalize_name, split_comma_set, squash_name};
pub use criteria::record_matches;
pub use error::DomainError;
pub use record::{EntityRecord, DELETE_FIELD, NAME_FIELD};
