//! The per-collection processing pipeline and its built-in processors.
//!
//! Processors run over every incoming record, in configuration order,
//! before the record is diffed against the store. They may rewrite the
//! record and may read or mutate sibling collections - that is how
//! spell hydration works in both directions.

use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;

use grimoire_domain::{normalize_name, split_comma_set, EntityRecord};
use grimoire_shared::IngestionBundle;

use super::collection::Collections;

/// A pipeline step rejected a record.
///
/// The record is routed into the collection's `with_errors` bucket;
/// sibling records are unaffected.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{processor} rejected '{entity}'")]
pub struct ProcessorError {
    /// Which processor rejected the record.
    pub processor: &'static str,
    /// The record's display name.
    pub entity: String,
    /// Human-readable violations.
    pub errors: Vec<String>,
}

/// One step of a collection's ingestion pipeline.
pub trait EntityProcessor: Send + Sync {
    /// Stable name used in error reports and logs.
    fn name(&self) -> &'static str;

    /// Transforms `record` in place. `collections` is the live store
    /// content, for cross-collection reads and writes.
    fn process(
        &self,
        record: &mut EntityRecord,
        collections: &mut Collections,
    ) -> Result<(), ProcessorError>;
}

/// Gate evaluated against a bundle before a collection's records are
/// ingested.
pub trait VersionChecker: Send + Sync {
    fn accepts(&self, bundle: &IngestionBundle) -> bool;
}

/// The default gate: accepts every bundle.
pub struct AcceptAll;

impl VersionChecker for AcceptAll {
    fn accepts(&self, _bundle: &IngestionBundle) -> bool {
        true
    }
}

/// Accepts only bundles declaring exactly the given version.
pub struct ExactVersion {
    version: String,
}

impl ExactVersion {
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
        }
    }
}

impl VersionChecker for ExactVersion {
    fn accepts(&self, bundle: &IngestionBundle) -> bool {
        bundle.version.as_deref() == Some(self.version.as_str())
    }
}

/// Names referenced by a spell-list field, whether it is still the raw
/// comma-separated string or an already-hydrated array of names/objects.
fn referenced_names(field: &Value) -> Vec<String> {
    match field {
        Value::String(list) => split_comma_set(list),
        Value::Array(items) => items
            .iter()
            .filter_map(|item| match item {
                Value::String(name) => Some(name.clone()),
                Value::Object(fields) => fields
                    .get("name")
                    .and_then(Value::as_str)
                    .map(str::to_owned),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

/// Rewrites a monster's `spells` field into an array of full spell records.
///
/// Names that do not (yet) resolve in the spells collection are kept as
/// bare strings; [`MonsterSpellUpdater`] completes them when the spells
/// arrive. Configured on the monster collection.
pub struct SpellHydrator {
    spell_collection: String,
    spell_field: String,
}

impl SpellHydrator {
    /// Hydrator with the conventional D&D collection layout:
    /// `spells` field resolved against the `spells` collection.
    pub fn new() -> Self {
        Self {
            spell_collection: "spells".to_owned(),
            spell_field: "spells".to_owned(),
        }
    }
}

impl Default for SpellHydrator {
    fn default() -> Self {
        Self::new()
    }
}

impl EntityProcessor for SpellHydrator {
    fn name(&self) -> &'static str {
        "spell-hydrator"
    }

    fn process(
        &self,
        record: &mut EntityRecord,
        collections: &mut Collections,
    ) -> Result<(), ProcessorError> {
        let Some(field) = record.get(&self.spell_field) else {
            return Ok(());
        };
        if !matches!(field, Value::String(_) | Value::Array(_)) {
            return Ok(());
        }

        let spells = collections.get(&self.spell_collection);
        let hydrated: Vec<Value> = referenced_names(field)
            .into_iter()
            .map(|name| {
                spells
                    .and_then(|col| col.get(&normalize_name(&name)))
                    .map_or(Value::String(name), EntityRecord::to_value)
            })
            .collect();

        tracing::debug!(
            entity = %record.name(),
            spells = hydrated.len(),
            "hydrated spell references"
        );
        record.set(&self.spell_field, Value::Array(hydrated));
        Ok(())
    }
}

/// Retroactively re-hydrates stored monsters when their spells arrive.
///
/// Configured on the spell collection: each ingested spell is pushed into
/// every stored monster whose `spells` field references it by name, so
/// monsters loaded before their spells catch up without re-ingestion.
pub struct MonsterSpellUpdater {
    monster_collection: String,
    spell_field: String,
}

impl MonsterSpellUpdater {
    /// Updater with the conventional D&D collection layout: rewrites the
    /// `spells` field of records in the `monsters` collection.
    pub fn new() -> Self {
        Self {
            monster_collection: "monsters".to_owned(),
            spell_field: "spells".to_owned(),
        }
    }
}

impl Default for MonsterSpellUpdater {
    fn default() -> Self {
        Self::new()
    }
}

impl EntityProcessor for MonsterSpellUpdater {
    fn name(&self) -> &'static str {
        "monster-spell-updater"
    }

    fn process(
        &self,
        record: &mut EntityRecord,
        collections: &mut Collections,
    ) -> Result<(), ProcessorError> {
        let spell_name = record.normalized_name();
        let spell_value = record.to_value();

        let Some(monsters) = collections.get_mut(&self.monster_collection) else {
            return Ok(());
        };

        let mut updated = 0usize;
        for monster in monsters.iter_mut() {
            let Some(field) = monster.get(&self.spell_field) else {
                continue;
            };
            let references_spell = referenced_names(field)
                .iter()
                .any(|name| normalize_name(name) == spell_name);
            if !references_spell {
                continue;
            }

            let rebuilt: Vec<Value> = match field {
                Value::String(list) => split_comma_set(list)
                    .into_iter()
                    .map(|name| {
                        if normalize_name(&name) == spell_name {
                            spell_value.clone()
                        } else {
                            Value::String(name)
                        }
                    })
                    .collect(),
                Value::Array(items) => items
                    .iter()
                    .map(|item| {
                        let item_name = match item {
                            Value::String(name) => Some(name.as_str()),
                            Value::Object(fields) => {
                                fields.get("name").and_then(Value::as_str)
                            }
                            _ => None,
                        };
                        if item_name.is_some_and(|name| normalize_name(name) == spell_name) {
                            spell_value.clone()
                        } else {
                            item.clone()
                        }
                    })
                    .collect(),
                _ => continue,
            };
            monster.set(&self.spell_field, Value::Array(rebuilt));
            updated += 1;
        }

        if updated > 0 {
            tracing::debug!(
                spell = %record.name(),
                monsters = updated,
                "re-hydrated monsters referencing new spell"
            );
        }
        Ok(())
    }
}

/// A collection's registered pipeline and version gate.
pub(crate) struct CollectionConfig {
    pub processors: Vec<Arc<dyn EntityProcessor>>,
    pub version_checker: Arc<dyn VersionChecker>,
}

impl CollectionConfig {
    pub fn new(
        processors: Vec<Arc<dyn EntityProcessor>>,
        version_checker: Arc<dyn VersionChecker>,
    ) -> Self {
        Self {
            processors,
            version_checker,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> EntityRecord {
        EntityRecord::from_value(value).unwrap()
    }

    #[test]
    fn test_exact_version_checker() {
        let checker = ExactVersion::new("0.2");
        let good = IngestionBundle::new().with_version("0.2");
        let bad = IngestionBundle::new().with_version("0.1");
        let missing = IngestionBundle::new();
        assert!(checker.accepts(&good));
        assert!(!checker.accepts(&bad));
        assert!(!checker.accepts(&missing));
        assert!(AcceptAll.accepts(&missing));
    }

    #[test]
    fn test_hydrator_resolves_known_spells_and_keeps_unknown_names() {
        let mut collections = Collections::default();
        collections
            .ensure("spells")
            .insert(record(json!({ "name": "spell1", "level": 1 })));

        let mut monster = record(json!({ "name": "monster1", "spells": "spell1, spell2" }));
        SpellHydrator::new()
            .process(&mut monster, &mut collections)
            .unwrap();

        assert_eq!(
            monster.get("spells"),
            Some(&json!([{ "name": "spell1", "level": 1 }, "spell2"]))
        );
    }

    #[test]
    fn test_hydrator_ignores_records_without_spell_field() {
        let mut collections = Collections::default();
        let mut monster = record(json!({ "name": "monster2" }));
        SpellHydrator::new()
            .process(&mut monster, &mut collections)
            .unwrap();
        assert!(monster.get("spells").is_none());
    }

    #[test]
    fn test_hydrator_leaves_non_list_spell_fields_alone() {
        let mut collections = Collections::default();
        let mut monster = record(json!({ "name": "monster3", "spells": 4 }));
        SpellHydrator::new()
            .process(&mut monster, &mut collections)
            .unwrap();
        assert_eq!(monster.get("spells"), Some(&json!(4)));
    }

    #[test]
    fn test_updater_rewrites_referencing_monsters_only() {
        let mut collections = Collections::default();
        collections.ensure("monsters").insert(record(json!({
            "name": "monster1",
            "spells": ["spell1", "spell2"],
        })));
        collections.ensure("monsters").insert(record(json!({
            "name": "monster2",
            "spells": ["other"],
        })));

        let mut spell = record(json!({ "name": "Spell1", "level": 1 }));
        MonsterSpellUpdater::new()
            .process(&mut spell, &mut collections)
            .unwrap();

        let monsters = collections.get("monsters").unwrap();
        assert_eq!(
            monsters.get("monster1").unwrap().get("spells"),
            Some(&json!([{ "name": "Spell1", "level": 1 }, "spell2"]))
        );
        assert_eq!(
            monsters.get("monster2").unwrap().get("spells"),
            Some(&json!(["other"]))
        );
    }

    #[test]
    fn test_updater_replaces_previously_hydrated_objects() {
        let mut collections = Collections::default();
        collections.ensure("monsters").insert(record(json!({
            "name": "monster1",
            "spells": [{ "name": "spell1", "level": 1 }],
        })));

        let mut spell = record(json!({ "name": "spell1", "level": 9 }));
        MonsterSpellUpdater::new()
            .process(&mut spell, &mut collections)
            .unwrap();

        assert_eq!(
            collections
                .get("monsters")
                .unwrap()
                .get("monster1")
                .unwrap()
                .get("spells"),
            Some(&json!([{ "name": "spell1", "level": 9 }]))
        );
    }

    #[test]
    fn test_updater_without_monster_collection_is_a_no_op() {
        let mut collections = Collections::default();
        let mut spell = record(json!({ "name": "spell1" }));
        assert!(MonsterSpellUpdater::new()
            .process(&mut spell, &mut collections)
            .is_ok());
    }
}
