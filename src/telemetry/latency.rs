// Bucketed latency store (§4.D). One fixed-size array of atomic counters
// per endpoint; lock-free on both the record and peek paths, grounded on
// the teacher's `HistogramMetric` (`api/monitoring/metrics_core.rs`), which
// uses the same `Vec<AtomicU64>` bucket-counter shape.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::endpoint::{EndpointId, SUBSTORE_COUNT};

use super::buckets::{bucket_of, BUCKET_COUNT};

pub struct LatencyStore {
    // One fixed-size bucket array per endpoint, indexed by `EndpointId`.
    buckets: Vec<[AtomicU64; BUCKET_COUNT]>,
}

impl LatencyStore {
    pub fn new() -> Self {
        let buckets = (0..SUBSTORE_COUNT)
            .map(|_| std::array::from_fn(|_| AtomicU64::new(0)))
            .collect();
        Self { buckets }
    }

    /// Records one observation for `endpoint`. A total function: an
    /// out-of-range tag (never constructible through `EndpointId` itself,
    /// but defensive against future enum growth) is a silent no-op.
    pub fn record(&self, endpoint: EndpointId, duration: Duration) {
        let Some(row) = self.buckets.get(endpoint.index()) else {
            return;
        };
        let b = bucket_of(duration.as_secs_f64() * 1000.0);
        row[b].fetch_add(1, Ordering::Relaxed);
    }

    /// Snapshot read of every bucket for `endpoint`. Out-of-range tags peek
    /// as all-zero rather than panicking.
    pub fn peek(&self, endpoint: EndpointId) -> [u64; BUCKET_COUNT] {
        let mut out = [0u64; BUCKET_COUNT];
        if let Some(row) = self.buckets.get(endpoint.index()) {
            for (i, counter) in row.iter().enumerate() {
                out[i] = counter.load(Ordering::Relaxed);
            }
        }
        out
    }
}

impl Default for LatencyStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_increases_peek_sum_by_one() {
        let store = LatencyStore::new();
        let before: u64 = store.peek(EndpointId::SplitChanges).iter().sum();
        store.record(EndpointId::SplitChanges, Duration::from_millis(7));
        let after: u64 = store.peek(EndpointId::SplitChanges).iter().sum();
        assert_eq!(after, before + 1);
    }

    #[test]
    fn distinct_latencies_land_in_distinct_buckets() {
        let store = LatencyStore::new();
        store.record(EndpointId::SplitChanges, Duration::from_millis(7));
        store.record(EndpointId::SplitChanges, Duration::from_millis(1200));
        let snapshot = store.peek(EndpointId::SplitChanges);
        let nonzero: Vec<usize> = snapshot
            .iter()
            .enumerate()
            .filter(|(_, &v)| v == 1)
            .map(|(i, _)| i)
            .collect();
        assert_eq!(nonzero.len(), 2);
    }

    #[test]
    fn endpoints_are_independent() {
        let store = LatencyStore::new();
        store.record(EndpointId::Auth, Duration::from_millis(5));
        let auth_sum: u64 = store.peek(EndpointId::Auth).iter().sum();
        let other_sum: u64 = store.peek(EndpointId::MySegments).iter().sum();
        assert_eq!(auth_sum, 1);
        assert_eq!(other_sum, 0);
    }
}
