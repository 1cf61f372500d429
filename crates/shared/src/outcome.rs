//! Per-ingestion result summaries.
//!
//! Every ingestion call - completed, deferred-then-completed, or failed on
//! a dependency timeout - produces exactly one [`IngestionOutcome`], keyed
//! by the bundle's entity-group name. The outcome is handed to the
//! [`crate::ResultReporter`] and then discarded by the engine.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// The synthetic entity name under which dependency-timeout failures are
/// reported.
pub const MISSING_DEPENDENCIES_ENTITY: &str = "Missing dependencies";

/// A named entity (or pseudo-entity) with its violation messages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityError {
    pub entity: String,
    pub errors: Vec<String>,
}

impl EntityError {
    pub fn new(entity: impl Into<String>, errors: Vec<String>) -> Self {
        Self {
            entity: entity.into(),
            errors,
        }
    }
}

/// Diff buckets for one collection within one ingestion call.
///
/// Buckets hold record names except `with_errors`, which pairs each failed
/// record with its violations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionOutcome {
    pub added: Vec<String>,
    pub patched: Vec<String>,
    pub deleted: Vec<String>,
    pub skipped: Vec<String>,
    pub with_errors: Vec<EntityError>,
}

impl CollectionOutcome {
    /// Total number of records accounted for in this collection.
    pub fn total(&self) -> usize {
        self.added.len()
            + self.patched.len()
            + self.deleted.len()
            + self.skipped.len()
            + self.with_errors.len()
    }
}

/// The summary of one ingestion call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestionOutcome {
    /// The bundle's dependency-tracking identity, if it had one.
    pub entity_group_name: Option<String>,
    /// Per-collection diff buckets, keyed by collection name.
    pub collections: BTreeMap<String, CollectionOutcome>,
    /// Bundle-level errors: version-gate rejections, missing dependencies.
    pub errors: Vec<EntityError>,
}

impl IngestionOutcome {
    /// An empty outcome for the given entity group.
    pub fn for_group(entity_group_name: Option<String>) -> Self {
        Self {
            entity_group_name,
            ..Self::default()
        }
    }

    /// The canonical dependency-timeout failure outcome.
    ///
    /// `unmet` lists the dependency groups still missing when the wait
    /// expired.
    pub fn missing_dependencies(entity_group_name: Option<String>, unmet: &[String]) -> Self {
        Self {
            entity_group_name,
            collections: BTreeMap::new(),
            errors: vec![EntityError::new(
                MISSING_DEPENDENCIES_ENTITY,
                vec![format!(
                    "Entity group is missing dependencies [{}]",
                    unmet.join(", ")
                )],
            )],
        }
    }

    /// The diff buckets for one collection, if the bundle touched it.
    pub fn collection(&self, key: &str) -> Option<&CollectionOutcome> {
        self.collections.get(key)
    }

    /// The diff buckets for one collection, created empty on first access.
    pub fn collection_mut(&mut self, key: &str) -> &mut CollectionOutcome {
        self.collections.entry(key.to_owned()).or_default()
    }

    /// True when no bundle-level error was recorded. Record-level errors in
    /// `with_errors` buckets do not make an ingestion unsuccessful.
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }
}

/// What `add_entities` did with a bundle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestionStatus {
    /// The bundle was ingested; here is its summary.
    Completed(IngestionOutcome),
    /// The bundle is waiting on unmet dependencies; its outcome will be
    /// delivered through the reporter (or stashed) once resolved.
    Deferred,
}
