//! Common utilities shared across the domain.

mod string;

pub use string::{normalize_name, split_comma_set, squash_name};
