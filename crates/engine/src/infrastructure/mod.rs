//! Adapters around the compendium core.

pub mod importers;
