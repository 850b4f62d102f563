// Local split cache (§4.G). A single `RwLock`-guarded snapshot: writers
// (only the sync loop) serialize through `apply`; any number of readers see
// either the pre- or post-merge state, never a torn one, because every read
// takes its own read guard and copies out what it needs before releasing it.

use std::collections::{HashMap, HashSet};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SplitStatus {
    Active,
    Archived,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Matcher {
    pub matcher_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub segment_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatcherGroup {
    pub matchers: Vec<Matcher>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Partition {
    pub treatment: String,
    pub size: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub matcher_group: MatcherGroup,
    pub partitions: Vec<Partition>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Split {
    pub name: String,
    pub traffic_type: String,
    pub status: SplitStatus,
    pub killed: bool,
    pub default_treatment: String,
    #[serde(default)]
    pub conditions: Vec<Condition>,
    pub change_number: i64,
}

/// A batch of split mutations to merge, in the order they were produced
/// upstream. `till` is the cache version this batch advances to.
pub struct SplitChangesDelta {
    pub till: i64,
    pub added: Vec<Split>,
    pub removed: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SplitChangesPayload {
    pub since: i64,
    pub till: i64,
    pub splits: Vec<Split>,
}

#[derive(Debug, PartialEq)]
pub enum ChangesOutcome {
    Exact(SplitChangesPayload),
    /// The cache can't answer precisely for this `since` — either it
    /// predates the retained floor or it's ahead of what the cache knows.
    /// Either way the handler falls back to an upstream fetch.
    Stale,
}

struct State {
    splits: HashMap<String, Split>,
    // name -> till at which it was removed; retained so a lagging `since`
    // still learns about the deletion.
    tombstones: HashMap<String, i64>,
    till: i64,
}

pub struct SplitCache {
    state: RwLock<State>,
}

impl SplitCache {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(State {
                splits: HashMap::new(),
                tombstones: HashMap::new(),
                till: 0,
            }),
        }
    }

    /// Writer-only. Merges `added`/`removed` and advances `till`. A second
    /// apply carrying a `till` at or behind the current one is a no-op —
    /// applies are idempotent after the first.
    pub fn apply(&self, delta: SplitChangesDelta) {
        let mut state = self.state.write();
        if delta.till <= state.till {
            return;
        }
        for name in delta.removed {
            state.splits.remove(&name);
            state.tombstones.insert(name, delta.till);
        }
        for mut split in delta.added {
            split.change_number = delta.till;
            state.tombstones.remove(&split.name);
            state.splits.insert(split.name.clone(), split);
        }
        state.till = delta.till;
    }

    pub fn changes_since(&self, since: i64) -> ChangesOutcome {
        let state = self.state.read();
        if since < 0 || since > state.till {
            return ChangesOutcome::Stale;
        }
        let splits: Vec<Split> = state
            .splits
            .values()
            .filter(|s| s.change_number > since)
            .cloned()
            .collect();
        // Tombstoned names newer than `since` are represented as archived
        // stubs so the caller can tell a removal from "never existed".
        let mut splits = splits;
        for (name, removed_at) in state.tombstones.iter() {
            if *removed_at > since {
                splits.push(Split {
                    name: name.clone(),
                    traffic_type: String::new(),
                    status: SplitStatus::Archived,
                    killed: true,
                    default_treatment: String::new(),
                    conditions: Vec::new(),
                    change_number: *removed_at,
                });
            }
        }
        ChangesOutcome::Exact(SplitChangesPayload {
            since,
            till: state.till,
            splits,
        })
    }

    /// Union of segment names referenced by any live split's matchers; used
    /// to seed the segment cache.
    pub fn segment_names(&self) -> HashSet<String> {
        self.state
            .read()
            .splits
            .values()
            .flat_map(|s| s.conditions.iter())
            .flat_map(|c| c.matcher_group.matchers.iter())
            .filter_map(|m| m.segment_name.clone())
            .collect()
    }

    pub fn till(&self) -> i64 {
        self.state.read().till
    }
}

impl Default for SplitCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn split(name: &str, change_number: i64) -> Split {
        Split {
            name: name.to_string(),
            traffic_type: "user".to_string(),
            status: SplitStatus::Active,
            killed: false,
            default_treatment: "off".to_string(),
            conditions: Vec::new(),
            change_number,
        }
    }

    #[test]
    fn changes_since_zero_yields_full_set_and_current_till() {
        let cache = SplitCache::new();
        cache.apply(SplitChangesDelta {
            till: 2,
            added: vec![split("a", 1), split("b", 2)],
            removed: vec![],
        });
        match cache.changes_since(0) {
            ChangesOutcome::Exact(payload) => {
                assert_eq!(payload.till, 2);
                let names: HashSet<_> = payload.splits.iter().map(|s| s.name.clone()).collect();
                assert_eq!(names, HashSet::from(["a".to_string(), "b".to_string()]));
            }
            ChangesOutcome::Stale => panic!("expected exact result"),
        }
    }

    #[test]
    fn since_equal_till_is_a_no_op_diff() {
        let cache = SplitCache::new();
        cache.apply(SplitChangesDelta { till: 2, added: vec![split("a", 1)], removed: vec![] });
        match cache.changes_since(2) {
            ChangesOutcome::Exact(payload) => assert!(payload.splits.is_empty()),
            ChangesOutcome::Stale => panic!("expected exact result"),
        }
    }

    #[test]
    fn since_ahead_of_till_is_stale() {
        let cache = SplitCache::new();
        cache.apply(SplitChangesDelta { till: 2, added: vec![split("a", 1)], removed: vec![] });
        assert_eq!(cache.changes_since(10), ChangesOutcome::Stale);
    }

    #[test]
    fn repeated_apply_with_same_till_is_idempotent() {
        let cache = SplitCache::new();
        cache.apply(SplitChangesDelta { till: 2, added: vec![split("a", 1)], removed: vec![] });
        cache.apply(SplitChangesDelta { till: 2, added: vec![split("a", 1), split("b", 2)], removed: vec![] });
        assert_eq!(cache.till(), 2);
        let names: HashSet<_> = match cache.changes_since(0) {
            ChangesOutcome::Exact(p) => p.splits.into_iter().map(|s| s.name).collect(),
            ChangesOutcome::Stale => panic!("expected exact result"),
        };
        assert_eq!(names, HashSet::from(["a".to_string()]));
    }

    #[test]
    fn removal_is_visible_to_lagging_since_but_not_current() {
        let cache = SplitCache::new();
        cache.apply(SplitChangesDelta { till: 1, added: vec![split("a", 1)], removed: vec![] });
        cache.apply(SplitChangesDelta { till: 2, added: vec![], removed: vec!["a".to_string()] });

        match cache.changes_since(0) {
            ChangesOutcome::Exact(p) => {
                assert_eq!(p.splits.len(), 1);
                assert_eq!(p.splits[0].status, SplitStatus::Archived);
            }
            ChangesOutcome::Stale => panic!("expected exact result"),
        }
        match cache.changes_since(2) {
            ChangesOutcome::Exact(p) => assert!(p.splits.is_empty()),
            ChangesOutcome::Stale => panic!("expected exact result"),
        }
    }
}
