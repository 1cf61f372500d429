//! Dependency tracking for ordered bundle loading.
//!
//! Bundles may declare that other entity groups must be loaded first. The
//! tracker holds such bundles in a pending set until their dependencies
//! report loaded, or force-fails them when the bounded wait expires. Both
//! outcomes are terminal for the pending entry; the tracker never re-runs a
//! resolved bundle.

use std::collections::HashSet;
use std::sync::Arc;

use tokio::task::JoinHandle;

use grimoire_shared::{IngestionBundle, ResultReporter};

/// A bundle waiting on unmet dependencies.
pub(crate) struct PendingBundle {
    pub id: u64,
    pub bundle: IngestionBundle,
    pub reporter: Option<Arc<dyn ResultReporter>>,
    pub unmet: HashSet<String>,
    timer: Option<JoinHandle<()>>,
}

impl PendingBundle {
    /// The unmet dependencies, sorted for deterministic error messages.
    pub fn unmet_sorted(&self) -> Vec<String> {
        let mut unmet: Vec<String> = self.unmet.iter().cloned().collect();
        unmet.sort();
        unmet
    }

    fn cancel_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }
}

/// Process-wide record of which entity groups have loaded, which have
/// terminally failed, and which bundles are still waiting.
#[derive(Default)]
pub(crate) struct DependencyTracker {
    loaded: HashSet<String>,
    failed: HashSet<String>,
    pending: Vec<PendingBundle>,
    next_id: u64,
}

impl DependencyTracker {
    /// Dependencies of `bundle` that have not loaded yet.
    pub fn unmet_dependencies(&self, bundle: &IngestionBundle) -> HashSet<String> {
        bundle
            .dependencies
            .iter()
            .filter(|group| !self.loaded.contains(*group))
            .cloned()
            .collect()
    }

    /// Parks a bundle until its dependencies load. Returns the pending id
    /// the caller must use when attaching the timeout timer.
    pub fn defer(
        &mut self,
        bundle: IngestionBundle,
        reporter: Option<Arc<dyn ResultReporter>>,
        unmet: HashSet<String>,
    ) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.pending.push(PendingBundle {
            id,
            bundle,
            reporter,
            unmet,
            timer: None,
        });
        id
    }

    /// Attaches the timeout task handle to a pending bundle so satisfaction
    /// can cancel it.
    pub fn attach_timer(&mut self, id: u64, timer: JoinHandle<()>) {
        if let Some(pending) = self.pending.iter_mut().find(|p| p.id == id) {
            pending.timer = Some(timer);
        } else {
            // The timer raced a satisfaction that already drained the entry
            timer.abort();
        }
    }

    /// Records a successful load and drains every pending bundle whose
    /// dependencies are now fully met, in submission order. Drained
    /// bundles have their timers cancelled.
    pub fn mark_loaded(&mut self, group: &str) -> Vec<PendingBundle> {
        self.loaded.insert(group.to_owned());

        for pending in &mut self.pending {
            pending.unmet.remove(group);
        }

        let mut satisfied = Vec::new();
        let mut still_waiting = Vec::new();
        for mut pending in self.pending.drain(..) {
            if pending.unmet.is_empty() {
                pending.cancel_timer();
                satisfied.push(pending);
            } else {
                still_waiting.push(pending);
            }
        }
        self.pending = still_waiting;
        satisfied
    }

    /// Marks a group as terminally failed.
    pub fn mark_failed(&mut self, group: &str) {
        self.failed.insert(group.to_owned());
    }

    /// Removes and returns the pending bundle with the given id, if the
    /// timeout won the race against satisfaction.
    pub fn take_pending(&mut self, id: u64) -> Option<PendingBundle> {
        let index = self.pending.iter().position(|p| p.id == id)?;
        Some(self.pending.remove(index))
    }

    pub fn is_loaded(&self, group: &str) -> bool {
        self.loaded.contains(group)
    }

    pub fn is_failed(&self, group: &str) -> bool {
        self.failed.contains(group)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bundle(name: &str, deps: &[&str]) -> IngestionBundle {
        let mut bundle = IngestionBundle::named(name);
        for dep in deps {
            bundle = bundle.with_dependency(*dep);
        }
        bundle
    }

    fn unmet(groups: &[&str]) -> HashSet<String> {
        groups.iter().map(|g| (*g).to_owned()).collect()
    }

    #[test]
    fn test_unmet_dependencies_ignores_loaded_groups() {
        let mut tracker = DependencyTracker::default();
        tracker.mark_loaded("base");
        let b = bundle("derivative", &["base", "extras"]);
        assert_eq!(tracker.unmet_dependencies(&b), unmet(&["extras"]));
    }

    #[test]
    fn test_mark_loaded_drains_satisfied_bundles_in_order() {
        let mut tracker = DependencyTracker::default();
        tracker.defer(bundle("first", &["base"]), None, unmet(&["base"]));
        tracker.defer(bundle("second", &["base", "other"]), None, unmet(&["base", "other"]));
        tracker.defer(bundle("third", &["base"]), None, unmet(&["base"]));

        let satisfied = tracker.mark_loaded("base");
        let names: Vec<_> = satisfied
            .iter()
            .map(|p| p.bundle.name.clone().unwrap())
            .collect();
        assert_eq!(names, vec!["first", "third"]);

        // "second" still waits on "other"
        let satisfied = tracker.mark_loaded("other");
        assert_eq!(satisfied.len(), 1);
        assert_eq!(satisfied[0].bundle.name.as_deref(), Some("second"));
    }

    #[test]
    fn test_take_pending_removes_the_entry_once() {
        let mut tracker = DependencyTracker::default();
        let id = tracker.defer(bundle("only", &["base"]), None, unmet(&["base"]));
        let pending = tracker.take_pending(id).unwrap();
        assert_eq!(pending.unmet_sorted(), vec!["base"]);
        assert!(tracker.take_pending(id).is_none());
    }

    #[test]
    fn test_terminal_state_bookkeeping() {
        let mut tracker = DependencyTracker::default();
        tracker.mark_loaded("base");
        tracker.mark_failed("orphan");
        assert!(tracker.is_loaded("base"));
        assert!(tracker.is_failed("orphan"));
        assert!(!tracker.is_loaded("orphan"));
    }
}
