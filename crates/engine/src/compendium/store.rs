//! The compendium store: ingestion, diffing, and lookup.
//!
//! All mutable state lives behind one async mutex, so ingestion calls
//! serialize per store instance: a bundle is processed to completion (or
//! deferred whole) before the next begins. The dependency-timeout timer is
//! the only background task, and it takes the same lock before acting.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::Mutex;

use grimoire_domain::{record_matches, EntityRecord};
use grimoire_shared::{
    CollectionOutcome, EntityError, IngestionBundle, IngestionOutcome, IngestionStatus,
    ResultReporter,
};

use super::collection::Collections;
use super::dependencies::{DependencyTracker, PendingBundle};
use super::processors::{AcceptAll, CollectionConfig, EntityProcessor, VersionChecker};

/// How long a bundle may wait on unmet dependencies before being failed.
pub const DEFAULT_DEPENDENCY_TIMEOUT: Duration = Duration::from_secs(10);

struct CompendiumState {
    collections: Collections,
    configs: HashMap<String, CollectionConfig>,
    tracker: DependencyTracker,
    /// Outcomes of deferred bundles that resolved without a reporter,
    /// retrievable once by entity-group name.
    unclaimed: HashMap<String, IngestionOutcome>,
}

/// The compendium: a registry of typed game-data collections.
///
/// Cheap to clone; clones share the same underlying store.
#[derive(Clone)]
pub struct Compendium {
    state: Arc<Mutex<CompendiumState>>,
    dependency_timeout: Duration,
}

impl Default for Compendium {
    fn default() -> Self {
        Self::new()
    }
}

impl Compendium {
    /// A store with the default dependency timeout.
    pub fn new() -> Self {
        Self::with_dependency_timeout(DEFAULT_DEPENDENCY_TIMEOUT)
    }

    /// A store with an explicit dependency timeout.
    pub fn with_dependency_timeout(dependency_timeout: Duration) -> Self {
        Self {
            state: Arc::new(Mutex::new(CompendiumState {
                collections: Collections::default(),
                configs: HashMap::new(),
                tracker: DependencyTracker::default(),
                unclaimed: HashMap::new(),
            })),
            dependency_timeout,
        }
    }

    /// Registers a collection's processor pipeline and version gate.
    ///
    /// Must be called before any bundle referencing the collection is
    /// ingested; bundles mentioning unconfigured collections have those
    /// collections ignored. Re-registration overwrites the prior config.
    pub async fn configure_collection(
        &self,
        name: impl Into<String>,
        processors: Vec<Arc<dyn EntityProcessor>>,
        version_checker: Arc<dyn VersionChecker>,
    ) {
        let name = name.into();
        tracing::debug!(
            collection = %name,
            processors = processors.len(),
            "configured collection"
        );
        self.state
            .lock()
            .await
            .configs
            .insert(name, CollectionConfig::new(processors, version_checker));
    }

    /// Registers a collection with no processors and an accept-all gate.
    pub async fn register_collection(&self, name: impl Into<String>) {
        self.configure_collection(name, Vec::new(), Arc::new(AcceptAll))
            .await;
    }

    /// Ingests a bundle.
    ///
    /// When the bundle's declared dependencies are all met (or absent) the
    /// bundle is processed immediately and its outcome returned; a supplied
    /// reporter is additionally notified. When dependencies are unmet the
    /// call returns [`IngestionStatus::Deferred`] and the outcome is
    /// delivered later - through the reporter, or stashed for
    /// [`take_unclaimed_outcome`](Self::take_unclaimed_outcome) - once the
    /// dependencies load or the timeout expires.
    pub async fn add_entities(
        &self,
        bundle: IngestionBundle,
        reporter: Option<Arc<dyn ResultReporter>>,
    ) -> IngestionStatus {
        let mut dispatches = Vec::new();
        let status = {
            let mut state = self.state.lock().await;
            let unmet = state.tracker.unmet_dependencies(&bundle);
            if unmet.is_empty() {
                let outcome =
                    Self::run_ingestion(&mut state, bundle, reporter, &mut dispatches);
                IngestionStatus::Completed(outcome)
            } else {
                tracing::info!(
                    group = ?bundle.name,
                    unmet = ?unmet,
                    "bundle deferred on unmet dependencies"
                );
                let id = state.tracker.defer(bundle, reporter, unmet);
                let store = self.clone();
                let timeout = self.dependency_timeout;
                let timer = tokio::spawn(async move {
                    tokio::time::sleep(timeout).await;
                    store.expire_pending(id).await;
                });
                state.tracker.attach_timer(id, timer);
                IngestionStatus::Deferred
            }
        };
        for (reporter, outcome) in dispatches {
            reporter.report(outcome).await;
        }
        status
    }

    /// Finds a record by name. `fuzzy` additionally ignores whitespace.
    pub async fn find_entity(
        &self,
        collection: &str,
        raw_name: &str,
        fuzzy: bool,
    ) -> Option<EntityRecord> {
        let state = self.state.lock().await;
        state.collections.find(collection, raw_name, fuzzy).cloned()
    }

    /// Returns the records of a collection matching every criterion, in
    /// collection order. Unknown collections and non-object criteria yield
    /// an empty vector.
    pub async fn search_entities(&self, collection: &str, criteria: &Value) -> Vec<EntityRecord> {
        let Some(criteria) = criteria.as_object() else {
            return Vec::new();
        };
        let state = self.state.lock().await;
        state
            .collections
            .get(collection)
            .map(|col| {
                col.iter()
                    .filter(|record| record_matches(record, criteria))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Names of all collections holding data, sorted.
    pub async fn collection_names(&self) -> Vec<String> {
        self.state.lock().await.collections.names()
    }

    /// Display names of a collection's records in collection order.
    pub async fn entity_names(&self, collection: &str) -> Vec<String> {
        let state = self.state.lock().await;
        state
            .collections
            .get(collection)
            .map(|col| col.names())
            .unwrap_or_default()
    }

    /// Whether the named entity group has completed a successful load.
    pub async fn is_group_loaded(&self, group: &str) -> bool {
        self.state.lock().await.tracker.is_loaded(group)
    }

    /// Whether the named entity group has terminally failed on a
    /// dependency timeout.
    pub async fn is_group_failed(&self, group: &str) -> bool {
        self.state.lock().await.tracker.is_failed(group)
    }

    /// Retrieves (once) the outcome of a deferred bundle that resolved
    /// without a reporter.
    pub async fn take_unclaimed_outcome(&self, group: &str) -> Option<IngestionOutcome> {
        self.state.lock().await.unclaimed.remove(group)
    }

    /// Ingests a bundle and every deferred bundle its success unblocks,
    /// collecting reporter dispatches to run after the lock is released.
    fn run_ingestion(
        state: &mut CompendiumState,
        bundle: IngestionBundle,
        reporter: Option<Arc<dyn ResultReporter>>,
        dispatches: &mut Vec<(Arc<dyn ResultReporter>, IngestionOutcome)>,
    ) -> IngestionOutcome {
        let first = Self::ingest_bundle(state, bundle);
        let mut queue: VecDeque<PendingBundle> =
            Self::wake_dependents(state, &first).into_iter().collect();
        if let Some(reporter) = reporter {
            dispatches.push((reporter, first.clone()));
        }

        while let Some(pending) = queue.pop_front() {
            let PendingBundle {
                bundle, reporter, ..
            } = pending;
            let outcome = Self::ingest_bundle(state, bundle);
            queue.extend(Self::wake_dependents(state, &outcome));
            match reporter {
                Some(reporter) => dispatches.push((reporter, outcome)),
                None => {
                    let group = outcome.entity_group_name.clone().unwrap_or_default();
                    state.unclaimed.insert(group, outcome);
                }
            }
        }
        first
    }

    /// Marks a successful named ingestion as loaded and drains newly
    /// satisfied pending bundles.
    fn wake_dependents(
        state: &mut CompendiumState,
        outcome: &IngestionOutcome,
    ) -> Vec<PendingBundle> {
        if !outcome.is_success() {
            return Vec::new();
        }
        let Some(group) = outcome.entity_group_name.as_deref() else {
            return Vec::new();
        };
        let woken = state.tracker.mark_loaded(group);
        if !woken.is_empty() {
            tracing::info!(
                group,
                resumed = woken.len(),
                "dependency satisfied; resuming deferred bundles"
            );
        }
        woken
    }

    /// Processes one bundle against the store.
    fn ingest_bundle(state: &mut CompendiumState, mut bundle: IngestionBundle) -> IngestionOutcome {
        let mut outcome = IngestionOutcome::for_group(bundle.name.clone());
        let payload = std::mem::take(&mut bundle.collections);
        let CompendiumState {
            collections,
            configs,
            ..
        } = state;

        for (key, records) in payload {
            let Some(config) = configs.get(&key) else {
                tracing::debug!(collection = %key, "ignoring unconfigured collection in bundle");
                continue;
            };

            if !config.version_checker.accepts(&bundle) {
                tracing::warn!(
                    collection = %key,
                    version = ?bundle.version,
                    "version gate rejected collection"
                );
                outcome.errors.push(EntityError::new(
                    key.clone(),
                    vec![format!(
                        "Version '{}' not accepted for collection '{}'",
                        bundle.version.as_deref().unwrap_or("none"),
                        key
                    )],
                ));
                continue;
            }

            // Materialize the bucket even for an empty record list so the
            // outcome names every collection the bundle touched
            outcome.collection_mut(&key);
            for raw in records {
                Self::ingest_record(collections, config, &key, raw, outcome.collection_mut(&key));
            }
        }
        outcome
    }

    /// Runs one raw record through the delete/pipeline/diff sequence.
    fn ingest_record(
        collections: &mut Collections,
        config: &CollectionConfig,
        key: &str,
        raw: Value,
        bucket: &mut CollectionOutcome,
    ) {
        let display_name = raw
            .as_object()
            .and_then(|fields| fields.get("name"))
            .and_then(Value::as_str)
            .unwrap_or("<invalid record>")
            .to_owned();
        let mut record = match EntityRecord::from_value(raw) {
            Ok(record) => record,
            Err(err) => {
                bucket
                    .with_errors
                    .push(EntityError::new(display_name, vec![err.to_string()]));
                return;
            }
        };

        if record.is_delete_marker() {
            let normalized = record.normalized_name();
            let removed = collections
                .get_mut(key)
                .and_then(|col| col.remove(&normalized));
            match removed {
                Some(_) => bucket.deleted.push(record.name().to_owned()),
                None => bucket.skipped.push(record.name().to_owned()),
            }
            return;
        }

        // The pipeline runs before the diff so the stored record and the
        // incoming record are compared in the same (processed) shape;
        // otherwise every hydrated record would look patched on re-load
        for processor in &config.processors {
            if let Err(err) = processor.process(&mut record, collections) {
                tracing::debug!(
                    processor = processor.name(),
                    entity = %err.entity,
                    "processor rejected record"
                );
                bucket
                    .with_errors
                    .push(EntityError::new(err.entity, err.errors));
                return;
            }
        }

        enum Diff {
            Skip,
            Patch,
            Add,
        }

        let normalized = record.normalized_name();
        let name = record.name().to_owned();
        let target = collections.ensure(key);
        let diff = match target.get(&normalized) {
            Some(existing) if *existing == record => Diff::Skip,
            Some(_) => Diff::Patch,
            None => Diff::Add,
        };
        match diff {
            Diff::Skip => bucket.skipped.push(name),
            Diff::Patch => {
                target.insert(record);
                bucket.patched.push(name);
            }
            Diff::Add => {
                target.insert(record);
                bucket.added.push(name);
            }
        }
    }

    /// Timeout path: fail the pending bundle if it is still waiting.
    async fn expire_pending(&self, id: u64) {
        let dispatch = {
            let mut state = self.state.lock().await;
            let Some(pending) = state.tracker.take_pending(id) else {
                // Satisfaction won the race; nothing to fail
                return;
            };
            let unmet = pending.unmet_sorted();
            let group = pending.bundle.name.clone();
            if let Some(name) = &group {
                state.tracker.mark_failed(name);
            }
            tracing::warn!(
                group = ?group,
                unmet = ?unmet,
                "dependency wait expired; failing bundle"
            );
            let outcome = IngestionOutcome::missing_dependencies(group.clone(), &unmet);
            match pending.reporter {
                Some(reporter) => Some((reporter, outcome)),
                None => {
                    state.unclaimed.insert(group.unwrap_or_default(), outcome);
                    None
                }
            }
        };
        if let Some((reporter, outcome)) = dispatch {
            reporter.report(outcome).await;
        }
    }
}
