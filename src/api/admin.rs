// Admin/operator surface, separate from the SDK-facing API and never
// subject to `require_auth` — it's wired on its own sub-router in
// `server.rs` with no Bearer-key check.

use std::sync::Arc;

use axum::extract::State;
use axum::response::{Html, IntoResponse};
use axum::Json;
use serde_json::json;

use crate::endpoint::EndpointId;

use super::state::{AppState, VERSION};

pub async fn ping() -> &'static str {
    "pong"
}

pub async fn version() -> impl IntoResponse {
    Json(json!({ "version": VERSION }))
}

pub async fn uptime(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({ "uptimeSeconds": state.start_time.elapsed().as_secs() }))
}

fn endpoint_label(id: EndpointId) -> &'static str {
    use EndpointId::*;
    match id {
        Auth => "auth",
        SplitChanges => "splitChanges",
        SegmentChanges => "segmentChanges",
        MySegments => "mySegments",
        ImpressionsBulk => "testImpressions/bulk",
        ImpressionsBulkBeacon => "testImpressions/bulk/beacon",
        ImpressionsCount => "testImpressions/count",
        ImpressionsCountBeacon => "testImpressions/count/beacon",
        EventsBulk => "events/bulk",
        EventsBulkBeacon => "events/bulk/beacon",
        TelemetryConfig => "metrics/config",
        TelemetryRuntime => "metrics/usage",
        LegacyTime => "metrics/time",
        LegacyTimes => "metrics/times",
        LegacyCounter => "metrics/counter",
        LegacyCounters => "metrics/counters",
        LegacyGauge => "metrics/gauge",
    }
}

pub async fn stats(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let queues: serde_json::Map<String, serde_json::Value> = state
        .task_queue_sizes()
        .into_iter()
        .map(|(id, size)| (endpoint_label(id).to_string(), json!(size)))
        .collect();

    let mut status_codes = serde_json::Map::new();
    let mut latency_buckets = serde_json::Map::new();
    for id in EndpointId::all() {
        status_codes.insert(endpoint_label(id).to_string(), json!(state.telemetry.peek_endpoint_status(id)));
        latency_buckets.insert(endpoint_label(id).to_string(), json!(state.telemetry.peek_endpoint_latency(id)));
    }

    Json(json!({
        "healthy": state.health.healthy(),
        "knownSplits": state.split_cache.till(),
        "activeSegments": state.segment_cache.names_and_count(),
        "queuedRecords": queues,
        "endpointStatusCodes": status_codes,
        "endpointLatencyBuckets": latency_buckets,
        "runtime": {
            "eventsDropped": state.telemetry.runtime.events_dropped(),
            "impressionsDropped": state.telemetry.runtime.impressions_dropped(),
            "httpErrorsUpstream": state.telemetry.runtime.http_errors_upstream(),
            "lastSynchronizationMs": state.telemetry.runtime.last_synchronization_ms(),
        },
    }))
}

/// No templating crate in the stack: a handful of `format!`ed rows is
/// simpler than pulling one in for a single operator-facing page.
pub async fn dashboard(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let rows: String = EndpointId::all()
        .into_iter()
        .map(|id| {
            let total_requests: i64 = state.telemetry.peek_endpoint_status(id).values().sum();
            let total_latency_samples: u64 = state.telemetry.peek_endpoint_latency(id).iter().sum();
            format!(
                "<tr><td>{}</td><td>{}</td><td>{}</td></tr>",
                endpoint_label(id),
                total_requests,
                total_latency_samples
            )
        })
        .collect();

    Html(format!(
        "<html><body><h1>split-proxy</h1>\
         <p>healthy: {} | uptime: {}s</p>\
         <table border=\"1\"><tr><th>endpoint</th><th>requests</th><th>latency samples</th></tr>{}</table>\
         </body></html>",
        state.health.healthy(),
        state.start_time.elapsed().as_secs(),
        rows
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_label_covers_legacy_metrics() {
        assert_eq!(endpoint_label(EndpointId::LegacyGauge), "metrics/gauge");
        assert_eq!(endpoint_label(EndpointId::EventsBulkBeacon), "events/bulk/beacon");
    }
}
