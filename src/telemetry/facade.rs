// Proxy telemetry facade (§4.F): the single shared handle the request
// middleware and the admin `stats`/`dashboard` handlers hold. Unifies the
// latency store, the status-code map, and the runtime counters behind one
// type so callers never reach into a sub-store directly.
//
// Dispatch from `EndpointId` to sub-store is total by construction — both
// `LatencyStore` and `StatusMap` index by `EndpointId::index()` into a
// `SUBSTORE_COUNT`-sized array, so there is no per-endpoint match arm to get
// backwards (the defect documented upstream, where `TelemetryConfigEndpoint`
// and `TelemetryRuntimeEndpoint` were swapped, can't reoccur here).

use std::time::{Duration, SystemTime};

use crate::endpoint::EndpointId;

use super::latency::LatencyStore;
use super::runtime::RuntimeTelemetry;
use super::status::StatusMap;

pub struct TelemetryFacade {
    latency: LatencyStore,
    status: StatusMap,
    pub runtime: RuntimeTelemetry,
}

impl TelemetryFacade {
    pub fn new() -> Self {
        Self {
            latency: LatencyStore::new(),
            status: StatusMap::new(),
            runtime: RuntimeTelemetry::new(),
        }
    }

    pub fn record_endpoint_latency(&self, endpoint: EndpointId, duration: Duration) {
        self.latency.record(endpoint, duration);
    }

    pub fn incr_endpoint_status(&self, endpoint: EndpointId, status: u16) {
        self.status.incr(endpoint, status);
    }

    pub fn peek_endpoint_latency(&self, endpoint: EndpointId) -> [u64; super::buckets::BUCKET_COUNT] {
        self.latency.peek(endpoint)
    }

    pub fn peek_endpoint_status(&self, endpoint: EndpointId) -> std::collections::HashMap<u16, i64> {
        self.status.peek(endpoint)
    }

    pub fn record_synchronization_now(&self) {
        self.runtime.record_synchronization(SystemTime::now());
    }
}

impl Default for TelemetryFacade {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_and_runtime_endpoints_do_not_swap() {
        let facade = TelemetryFacade::new();
        facade.record_endpoint_latency(EndpointId::TelemetryConfig, Duration::from_millis(10));
        facade.incr_endpoint_status(EndpointId::TelemetryRuntime, 200);

        let config_sum: u64 = facade.peek_endpoint_latency(EndpointId::TelemetryConfig).iter().sum();
        let runtime_sum: u64 = facade.peek_endpoint_latency(EndpointId::TelemetryRuntime).iter().sum();
        assert_eq!(config_sum, 1);
        assert_eq!(runtime_sum, 0);

        assert!(facade.peek_endpoint_status(EndpointId::TelemetryConfig).is_empty());
        assert_eq!(facade.peek_endpoint_status(EndpointId::TelemetryRuntime).get(&200), Some(&1));
    }
}
