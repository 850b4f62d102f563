// Local segment cache + active-segment tracker (§4.H), grounded on the Go
// original's `ObservableSegmentStorageImpl`/`activeSegmentTracker`
// (`segment_wrapper.go`). The capability gate there is a runtime interface
// type-assertion (`toWrap.(extendedSegmentStorage)`); here it's an
// `as_extended` hook a concrete store opts into, checked once at wrap time
// so every other call site can rely on the capability already being proven.

use std::any::Any;
use std::collections::HashMap;
use std::collections::HashSet;
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::RwLock;

use crate::error::{ProxyError, Result};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateSummary {
    pub added: usize,
    pub removed: usize,
}

/// Base capability every segment store exposes.
pub trait SegmentStorage: Any + Send + Sync {
    fn update(&self, name: &str, to_add: &HashSet<String>, to_remove: &HashSet<String>, till: i64);
    fn keys(&self, name: &str) -> HashSet<String>;
    fn till(&self, name: &str) -> i64;

    /// `Some` when this store can also report exact add/remove counts and a
    /// size — the capability `ObservableSegmentStorage` requires. Plain
    /// stores return `None`.
    fn as_extended(&self) -> Option<&dyn ExtendedSegmentStorage>;
}

/// The widened capability: exact counts plus size, needed to drive the
/// active-segment tracker.
pub trait ExtendedSegmentStorage: SegmentStorage {
    fn update_with_summary(
        &self,
        name: &str,
        to_add: &HashSet<String>,
        to_remove: &HashSet<String>,
        till: i64,
    ) -> UpdateSummary;

    fn size(&self, name: &str) -> usize;
}

struct SegmentEntry {
    keys: HashSet<String>,
    till: i64,
}

/// The built-in in-memory segment store. Always supports the extended
/// capability — it's the reference implementation the proxy ships with.
pub struct InMemorySegmentStore {
    segments: DashMap<String, SegmentEntry>,
}

impl InMemorySegmentStore {
    pub fn new() -> Self {
        Self { segments: DashMap::new() }
    }
}

impl Default for InMemorySegmentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SegmentStorage for InMemorySegmentStore {
    fn update(&self, name: &str, to_add: &HashSet<String>, to_remove: &HashSet<String>, till: i64) {
        let _ = self.update_with_summary(name, to_add, to_remove, till);
    }

    fn keys(&self, name: &str) -> HashSet<String> {
        self.segments.get(name).map(|e| e.keys.clone()).unwrap_or_default()
    }

    fn till(&self, name: &str) -> i64 {
        self.segments.get(name).map(|e| e.till).unwrap_or(0)
    }

    fn as_extended(&self) -> Option<&dyn ExtendedSegmentStorage> {
        Some(self)
    }
}

impl ExtendedSegmentStorage for InMemorySegmentStore {
    fn update_with_summary(
        &self,
        name: &str,
        to_add: &HashSet<String>,
        to_remove: &HashSet<String>,
        till: i64,
    ) -> UpdateSummary {
        let mut entry = self
            .segments
            .entry(name.to_string())
            .or_insert_with(|| SegmentEntry { keys: HashSet::new(), till: 0 });
        if till <= entry.till {
            return UpdateSummary::default();
        }
        let mut summary = UpdateSummary::default();
        for key in to_add {
            if entry.keys.insert(key.clone()) {
                summary.added += 1;
            }
        }
        for key in to_remove {
            if entry.keys.remove(key) {
                summary.removed += 1;
            }
        }
        entry.till = till;
        summary
    }

    fn size(&self, name: &str) -> usize {
        self.segments.get(name).map(|e| e.keys.len()).unwrap_or(0)
    }
}

/// `segmentName -> active count`. A name is absent once its count reaches
/// zero — never stored as zero.
pub struct ActiveSegmentTracker {
    active: RwLock<HashMap<String, i64>>,
}

impl ActiveSegmentTracker {
    pub fn new() -> Self {
        Self { active: RwLock::new(HashMap::new()) }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self { active: RwLock::new(HashMap::with_capacity(capacity)) }
    }

    fn update(&self, name: &str, added: i64, removed: i64) {
        let mut map = self.active.write();
        let current = map.get(name).copied().unwrap_or(0) + added - removed;
        if current <= 0 {
            map.remove(name);
        } else {
            map.insert(name.to_string(), current);
        }
    }

    pub fn names_and_count(&self) -> HashMap<String, i64> {
        self.active.read().clone()
    }

    pub fn count(&self, name: &str) -> i64 {
        self.active.read().get(name).copied().unwrap_or(0)
    }
}

impl Default for ActiveSegmentTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone)]
pub struct SegmentChangesPayload {
    pub name: String,
    pub since: i64,
    pub till: i64,
    pub added: Vec<String>,
    pub removed: Vec<String>,
}

pub enum SegmentChangesOutcome {
    Exact(SegmentChangesPayload),
    Stale,
}

/// The capability-widened wrapper the sync loop and handlers actually hold.
/// `wrap` is the fallible constructor from the design note on interface
/// capability widening — it never panics on an incompatible store.
pub struct ObservableSegmentStorage {
    inner: Arc<dyn SegmentStorage>,
    tracker: ActiveSegmentTracker,
}

impl std::fmt::Debug for ObservableSegmentStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObservableSegmentStorage").finish_non_exhaustive()
    }
}

impl ObservableSegmentStorage {
    pub fn wrap(inner: Arc<dyn SegmentStorage>) -> Result<Self> {
        Self::wrap_with_capacity_hint(inner, 0)
    }

    pub fn wrap_with_capacity_hint(inner: Arc<dyn SegmentStorage>, capacity_hint: usize) -> Result<Self> {
        if inner.as_extended().is_none() {
            return Err(ProxyError::IncompatibleSegmentStorage);
        }
        Ok(Self {
            inner,
            tracker: ActiveSegmentTracker::with_capacity(capacity_hint),
        })
    }

    fn extended(&self) -> &dyn ExtendedSegmentStorage {
        self.inner
            .as_extended()
            .expect("capability checked once at wrap time")
    }

    pub fn update(&self, name: &str, to_add: HashSet<String>, to_remove: HashSet<String>, till: i64) {
        let _ = self.update_with_summary(name, to_add, to_remove, till);
    }

    pub fn update_with_summary(
        &self,
        name: &str,
        to_add: HashSet<String>,
        to_remove: HashSet<String>,
        till: i64,
    ) -> UpdateSummary {
        let summary = self.extended().update_with_summary(name, &to_add, &to_remove, till);
        self.tracker.update(name, summary.added as i64, summary.removed as i64);
        summary
    }

    pub fn size(&self, name: &str) -> usize {
        self.extended().size(name)
    }

    pub fn keys(&self, name: &str) -> HashSet<String> {
        self.inner.keys(name)
    }

    pub fn till(&self, name: &str) -> i64 {
        self.inner.till(name)
    }

    pub fn names_and_count(&self) -> HashMap<String, i64> {
        self.tracker.names_and_count()
    }

    /// §4.L's segment-changes handler contract: exact when the cache holds
    /// the segment and `since` isn't ahead of it; otherwise stale, meaning
    /// the handler falls back to an upstream fetch. The in-memory store
    /// doesn't retain historical removals, so a stale-but-known segment is
    /// reported as a full key snapshot under `added`.
    pub fn changes_since(&self, name: &str, since: i64) -> SegmentChangesOutcome {
        let till = self.inner.till(name);
        if since < 0 || since > till {
            return SegmentChangesOutcome::Stale;
        }
        let added = if since < till { self.inner.keys(name).into_iter().collect() } else { Vec::new() };
        SegmentChangesOutcome::Exact(SegmentChangesPayload {
            name: name.to_string(),
            since,
            till,
            added,
            removed: Vec::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct BareSegmentStore;

    impl SegmentStorage for BareSegmentStore {
        fn update(&self, _name: &str, _to_add: &HashSet<String>, _to_remove: &HashSet<String>, _till: i64) {}
        fn keys(&self, _name: &str) -> HashSet<String> {
            HashSet::new()
        }
        fn till(&self, _name: &str) -> i64 {
            0
        }
        fn as_extended(&self) -> Option<&dyn ExtendedSegmentStorage> {
            None
        }
    }

    fn set(items: &[&str]) -> HashSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn wrap_rejects_a_store_without_the_extended_capability() {
        let err = ObservableSegmentStorage::wrap(Arc::new(BareSegmentStore)).unwrap_err();
        assert!(matches!(err, ProxyError::IncompatibleSegmentStorage));
    }

    #[test]
    fn tracker_removes_entry_once_count_reaches_zero() {
        let storage = ObservableSegmentStorage::wrap(Arc::new(InMemorySegmentStore::new())).unwrap();
        storage.update("s", set(&["u1", "u2"]), HashSet::new(), 1);
        assert_eq!(storage.names_and_count().get("s"), Some(&2));

        storage.update("s", HashSet::new(), set(&["u1", "u2"]), 2);
        assert!(storage.names_and_count().is_empty());
    }

    #[test]
    fn update_with_summary_excludes_duplicates_and_misses() {
        let storage = ObservableSegmentStorage::wrap(Arc::new(InMemorySegmentStore::new())).unwrap();
        storage.update("s", set(&["u1"]), HashSet::new(), 1);
        let summary = storage.update_with_summary("s", set(&["u1", "u2"]), set(&["nope"]), 2);
        assert_eq!(summary.added, 1);
        assert_eq!(summary.removed, 0);
    }

    #[test]
    fn size_and_keys_reflect_current_state() {
        let storage = ObservableSegmentStorage::wrap(Arc::new(InMemorySegmentStore::new())).unwrap();
        storage.update("s", set(&["u1", "u2"]), HashSet::new(), 1);
        assert_eq!(storage.size("s"), 2);
        assert_eq!(storage.keys("s"), set(&["u1", "u2"]));
    }
}
