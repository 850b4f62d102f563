// Runtime telemetry surface (§4.F): the handful of process-wide counters the
// admin `stats` surface and the upstream `/metrics/usage` payload report
// alongside the per-endpoint histograms — events dropped, upstream HTTP
// errors by resource, and the last successful synchronization time.

use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use dashmap::DashMap;

pub struct RuntimeTelemetry {
    events_dropped: AtomicU64,
    impressions_dropped: AtomicU64,
    http_errors_upstream: DashMap<&'static str, AtomicU64>,
    last_synchronization_ms: AtomicI64,
}

impl RuntimeTelemetry {
    pub fn new() -> Self {
        Self {
            events_dropped: AtomicU64::new(0),
            impressions_dropped: AtomicU64::new(0),
            http_errors_upstream: DashMap::new(),
            last_synchronization_ms: AtomicI64::new(0),
        }
    }

    pub fn record_event_dropped(&self) {
        self.events_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_impression_dropped(&self) {
        self.impressions_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn incr_http_error_upstream(&self, resource: &'static str) {
        self.http_errors_upstream
            .entry(resource)
            .or_insert_with(|| AtomicU64::new(0))
            .fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_synchronization(&self, at: SystemTime) {
        let millis = at
            .duration_since(UNIX_EPOCH)
            .unwrap_or(Duration::ZERO)
            .as_millis() as i64;
        self.last_synchronization_ms.store(millis, Ordering::Relaxed);
    }

    pub fn events_dropped(&self) -> u64 {
        self.events_dropped.load(Ordering::Relaxed)
    }

    pub fn impressions_dropped(&self) -> u64 {
        self.impressions_dropped.load(Ordering::Relaxed)
    }

    pub fn http_errors_upstream(&self) -> std::collections::HashMap<&'static str, u64> {
        self.http_errors_upstream
            .iter()
            .map(|entry| (*entry.key(), entry.value().load(Ordering::Relaxed)))
            .collect()
    }

    pub fn last_synchronization_ms(&self) -> i64 {
        self.last_synchronization_ms.load(Ordering::Relaxed)
    }
}

impl Default for RuntimeTelemetry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_start_at_zero() {
        let rt = RuntimeTelemetry::new();
        assert_eq!(rt.events_dropped(), 0);
        assert_eq!(rt.last_synchronization_ms(), 0);
    }

    #[test]
    fn http_errors_are_tallied_per_resource() {
        let rt = RuntimeTelemetry::new();
        rt.incr_http_error_upstream("splitChanges");
        rt.incr_http_error_upstream("splitChanges");
        rt.incr_http_error_upstream("segmentChanges");
        let errs = rt.http_errors_upstream();
        assert_eq!(errs.get("splitChanges"), Some(&2));
        assert_eq!(errs.get("segmentChanges"), Some(&1));
    }
}
