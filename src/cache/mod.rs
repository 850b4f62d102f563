// Local split/segment cache (§4.G, §4.H).
//
// Both caches are owned exclusively by the sync loop for writes; readers
// (request handlers) take a read lock (or, for the segment store, a
// per-key `DashMap` access) to copy out a snapshot and never observe a
// torn one.

pub mod segment;
pub mod split;

pub use segment::{
    ActiveSegmentTracker, ExtendedSegmentStorage, InMemorySegmentStore, ObservableSegmentStorage,
    SegmentChangesOutcome, SegmentChangesPayload, SegmentStorage, UpdateSummary,
};
pub use split::{ChangesOutcome, Condition, Matcher, MatcherGroup, Partition, Split, SplitCache, SplitChangesDelta, SplitChangesPayload, SplitStatus};
