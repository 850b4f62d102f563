// Request middleware (§4.K), grounded on `rusty-db`'s
// `request_logger_middleware`/`auth_middleware`
// (`api/rest/middleware.rs`) — same `from_fn_with_state` shape, generalized
// from "log + rate-limit" to "tag endpoint + time + record telemetry" and
// "check a Bearer API key against an allow-list".
//
// Chain (outermost first, wired in `server.rs`): panic recovery (tower-http
// `CatchPanicLayer`) → CORS (`CorsLayer`) → `require_auth` → `track_request`.
// Tagging and metrics are combined into one middleware — both wrap exactly
// once per request, so splitting them into two `from_fn` layers would only
// add a second indirection with no behavioral difference. `track_request`
// also tags its tracing span with a per-request UUID so a failure can be
// traced from the access log through to the worker that eventually recorded
// (or failed to record) it.

use std::sync::Arc;
use std::time::Instant;

use axum::extract::{MatchedPath, Request, State};
use axum::http::Method;
use axum::middleware::Next;
use axum::response::Response;
use tracing::Instrument;
use uuid::Uuid;

use crate::endpoint::EndpointId;
use crate::error::ProxyError;

use super::state::AppState;

fn endpoint_for(method: &Method, matched_path: &str) -> Option<EndpointId> {
    use EndpointId::*;
    Some(match (method.as_str(), matched_path) {
        ("GET", "/api/auth") => Auth,
        ("GET", "/api/splitChanges") => SplitChanges,
        ("GET", "/api/segmentChanges/{name}") => SegmentChanges,
        ("GET", "/api/mySegments/{key}") => MySegments,
        ("POST", "/api/testImpressions/bulk") => ImpressionsBulk,
        ("POST", "/api/testImpressions/bulk/beacon") => ImpressionsBulkBeacon,
        ("POST", "/api/testImpressions/count") => ImpressionsCount,
        ("POST", "/api/testImpressions/count/beacon") => ImpressionsCountBeacon,
        ("POST", "/api/events/bulk") => EventsBulk,
        ("POST", "/api/events/bulk/beacon") => EventsBulkBeacon,
        ("POST", "/metrics/config") => TelemetryConfig,
        ("POST", "/metrics/usage") => TelemetryRuntime,
        ("POST", "/metrics/time") => LegacyTime,
        ("POST", "/metrics/times") => LegacyTimes,
        ("POST", "/metrics/counter") => LegacyCounter,
        ("POST", "/metrics/counters") => LegacyCounters,
        ("POST", "/metrics/gauge") => LegacyGauge,
        _ => return None,
    })
}

/// A beacon path never requires the `Authorization` header — the API key
/// travels inline in the JSON body instead.
fn is_beacon_path(path: &str) -> bool {
    path.ends_with("/beacon")
}

pub async fn require_auth(State(state): State<Arc<AppState>>, req: Request, next: Next) -> Response {
    // Only ever layered on the SDK-facing sub-router (admin routes never
    // pass through here), so every path reaching this point needs a key
    // except beacon requests, which carry theirs inline in the JSON body.
    let path = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str())
        .unwrap_or_else(|| req.uri().path());

    if is_beacon_path(path) {
        return next.run(req).await;
    }

    let key = req
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    match key {
        Some(key) if state.is_authorized(key) => next.run(req).await,
        _ => {
            use axum::response::IntoResponse;
            ProxyError::AuthRejected.into_response()
        }
    }
}

pub async fn track_request(State(state): State<Arc<AppState>>, req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let endpoint = req
        .extensions()
        .get::<MatchedPath>()
        .and_then(|p| endpoint_for(&method, p.as_str()));
    let request_id = Uuid::new_v4();
    let span = tracing::debug_span!("request", %request_id, method = %method);

    async move {
        let start = Instant::now();
        let response = next.run(req).await;

        if let Some(endpoint) = endpoint {
            state.telemetry.record_endpoint_latency(endpoint, start.elapsed());
            state.telemetry.incr_endpoint_status(endpoint, response.status().as_u16());
        }

        response
    }
    .instrument(span)
    .await
}
