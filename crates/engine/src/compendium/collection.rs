//! Ordered entity collections with derived name indices.

use std::collections::HashMap;

use indexmap::IndexMap;

use grimoire_domain::{normalize_name, squash_name, EntityRecord};

/// A named, ordered set of entity records.
///
/// Records are keyed by normalized name in insertion order; a squashed-name
/// side index serves fuzzy lookups. Both indices are maintained
/// incrementally by [`insert`](Collection::insert) and
/// [`remove`](Collection::remove), so they are consistent with the record
/// sequence after every mutation.
#[derive(Debug, Clone, Default)]
pub struct Collection {
    records: IndexMap<String, EntityRecord>,
    fuzzy: HashMap<String, String>,
}

impl Collection {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Looks up a record by its normalized name.
    pub fn get(&self, normalized: &str) -> Option<&EntityRecord> {
        self.records.get(normalized)
    }

    /// Looks up a record by its squashed (whitespace-free) name.
    pub fn get_fuzzy(&self, squashed: &str) -> Option<&EntityRecord> {
        let normalized = self.fuzzy.get(squashed)?;
        self.records.get(normalized)
    }

    pub fn contains(&self, normalized: &str) -> bool {
        self.records.contains_key(normalized)
    }

    /// Inserts a record, replacing (in place, order preserved) any existing
    /// record with the same normalized name. Returns the replaced record.
    pub fn insert(&mut self, record: EntityRecord) -> Option<EntityRecord> {
        let normalized = record.normalized_name();
        self.fuzzy.insert(record.squashed_name(), normalized.clone());
        self.records.insert(normalized, record)
    }

    /// Removes a record by normalized name, preserving the order of the
    /// remaining records.
    pub fn remove(&mut self, normalized: &str) -> Option<EntityRecord> {
        let removed = self.records.shift_remove(normalized)?;
        self.fuzzy.remove(&squash_name(normalized));
        Some(removed)
    }

    /// Iterates records in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &EntityRecord> {
        self.records.values()
    }

    /// Iterates records mutably, in insertion order. Callers must not
    /// change record names through this; [`EntityRecord::set`] already
    /// refuses to.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut EntityRecord> {
        self.records.values_mut()
    }

    /// The records' display names in insertion order.
    pub fn names(&self) -> Vec<String> {
        self.records.values().map(|r| r.name().to_owned()).collect()
    }
}

/// All collections of one compendium, keyed by collection name.
///
/// Processors receive this whole, so hydration can read one collection
/// while rewriting a record bound for another.
#[derive(Debug, Clone, Default)]
pub struct Collections {
    inner: HashMap<String, Collection>,
}

impl Collections {
    pub fn get(&self, name: &str) -> Option<&Collection> {
        self.inner.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Collection> {
        self.inner.get_mut(name)
    }

    /// The collection by name, created empty on first access.
    pub fn ensure(&mut self, name: &str) -> &mut Collection {
        self.inner.entry(name.to_owned()).or_default()
    }

    /// Names of all collections that currently hold at least one record or
    /// were touched by an ingestion, sorted for stable output.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.inner.keys().cloned().collect();
        names.sort();
        names
    }

    /// Finds a record by name in the given collection.
    ///
    /// The query is normalized (trim + lowercase) before the exact-index
    /// lookup; with `fuzzy` a whitespace-insensitive second lookup is
    /// attempted. Missing collections and missing names both yield `None`.
    pub fn find(&self, collection: &str, raw_name: &str, fuzzy: bool) -> Option<&EntityRecord> {
        let col = self.get(collection)?;
        if let Some(record) = col.get(&normalize_name(raw_name)) {
            return Some(record);
        }
        if fuzzy {
            return col.get_fuzzy(&squash_name(raw_name));
        }
        None
    }
}
