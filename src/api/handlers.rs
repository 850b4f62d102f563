// HTTP handlers (§4.L).

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::cache::split::ChangesOutcome;
use crate::cache::segment::SegmentChangesOutcome;
use crate::endpoint::EndpointId;
use crate::error::{ProxyError, Result};
use crate::payload::{Envelope, Metadata};

use super::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SinceQuery {
    #[serde(default)]
    pub since: i64,
}

/// The Bearer key doubles as the cache's auth-principal component — two
/// callers with different keys never share a cached response.
fn principal_of(headers: &HeaderMap) -> String {
    headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .unwrap_or("")
        .to_string()
}

fn cached_or<F>(
    state: &AppState,
    endpoint: EndpointId,
    query: &str,
    principal: &str,
    build: F,
) -> Response
where
    F: FnOnce() -> (i64, serde_json::Value),
{
    if let Some(hit) = state.response_cache.get(endpoint, query, principal) {
        return (StatusCode::OK, [("ETag", hit.etag)], hit.body).into_response();
    }
    let (till, value) = build();
    let body = serde_json::to_vec(&value).unwrap_or_default();
    let etag = till.to_string();
    state.response_cache.put(endpoint, query, principal, etag.clone(), body.clone());
    (StatusCode::OK, [("ETag", etag)], body).into_response()
}

pub async fn split_changes(
    State(state): State<Arc<AppState>>,
    Query(q): Query<SinceQuery>,
    headers: HeaderMap,
) -> Result<Response> {
    let principal = principal_of(&headers);
    let query = format!("since={}", q.since);
    match state.split_cache.changes_since(q.since) {
        ChangesOutcome::Exact(payload) => Ok(cached_or(&state, EndpointId::SplitChanges, &query, &principal, || {
            (
                payload.till,
                json!({ "since": payload.since, "till": payload.till, "splits": payload.splits }),
            )
        })),
        ChangesOutcome::Stale => {
            let delta = state.split_fetcher.fetch(q.since).await?;
            let till = delta.till;
            let splits = delta.added.clone();
            state.split_cache.apply(delta);
            state.response_cache.invalidate_all();
            Ok(Json(json!({ "since": q.since, "till": till, "splits": splits })).into_response())
        }
    }
}

pub async fn segment_changes(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    Query(q): Query<SinceQuery>,
    headers: HeaderMap,
) -> Result<Response> {
    let principal = principal_of(&headers);
    let query = format!("name={name}&since={}", q.since);
    match state.segment_cache.changes_since(&name, q.since) {
        SegmentChangesOutcome::Exact(payload) => {
            Ok(cached_or(&state, EndpointId::SegmentChanges, &query, &principal, || {
                (
                    payload.till,
                    json!({
                        "name": payload.name,
                        "since": payload.since,
                        "till": payload.till,
                        "added": payload.added,
                        "removed": payload.removed,
                    }),
                )
            }))
        }
        SegmentChangesOutcome::Stale => {
            let delta = state.segment_fetcher.fetch(&name, q.since).await?;
            let till = delta.till;
            let added: Vec<String> = delta.added.iter().cloned().collect();
            let removed: Vec<String> = delta.removed.iter().cloned().collect();
            state.segment_cache.update(&name, delta.added, delta.removed, till);
            state.response_cache.invalidate_all();
            Ok(Json(json!({ "name": name, "since": q.since, "till": till, "added": added, "removed": removed }))
                .into_response())
        }
    }
}

#[derive(Debug, Serialize)]
struct MySegmentEntry {
    name: String,
}

pub async fn my_segments(State(state): State<Arc<AppState>>, Path(key): Path<String>) -> Response {
    let names: Vec<MySegmentEntry> = state
        .segment_cache
        .names_and_count()
        .into_keys()
        .filter(|name| state.segment_cache.keys(name).contains(&key))
        .map(|name| MySegmentEntry { name })
        .collect();
    Json(json!({ "mySegments": names })).into_response()
}

async fn stage_envelope(
    state: &AppState,
    endpoint: EndpointId,
    headers: &HeaderMap,
    body: Bytes,
) -> Result<Response> {
    let envelope = Envelope { metadata: Metadata::from_headers(headers), body };
    state.stage(endpoint, envelope)?;
    Ok(().into_response())
}

#[derive(Debug, Deserialize)]
struct BeaconEnvelope {
    token: String,
    entries: serde_json::Value,
}

async fn stage_beacon(state: &AppState, endpoint: EndpointId, body: Bytes) -> Result<Response> {
    let parsed: BeaconEnvelope =
        serde_json::from_slice(&body).map_err(|e| ProxyError::Malformed(format!("beacon payload: {e}")))?;
    if !state.is_authorized(&parsed.token) {
        return Err(ProxyError::AuthRejected);
    }
    let body = Bytes::from(serde_json::to_vec(&parsed.entries)?);
    let envelope = Envelope { metadata: Metadata::default(), body };
    state.stage(endpoint, envelope)?;
    Ok(().into_response())
}

pub async fn impressions_bulk(State(state): State<Arc<AppState>>, headers: HeaderMap, body: Bytes) -> Result<Response> {
    stage_envelope(&state, EndpointId::ImpressionsBulk, &headers, body).await
}

pub async fn impressions_bulk_beacon(State(state): State<Arc<AppState>>, body: Bytes) -> Result<Response> {
    stage_beacon(&state, EndpointId::ImpressionsBulkBeacon, body).await
}

pub async fn impressions_count(State(state): State<Arc<AppState>>, headers: HeaderMap, body: Bytes) -> Result<Response> {
    stage_envelope(&state, EndpointId::ImpressionsCount, &headers, body).await
}

pub async fn impressions_count_beacon(State(state): State<Arc<AppState>>, body: Bytes) -> Result<Response> {
    stage_beacon(&state, EndpointId::ImpressionsCountBeacon, body).await
}

pub async fn events_bulk(State(state): State<Arc<AppState>>, headers: HeaderMap, body: Bytes) -> Result<Response> {
    stage_envelope(&state, EndpointId::EventsBulk, &headers, body).await
}

pub async fn events_bulk_beacon(State(state): State<Arc<AppState>>, body: Bytes) -> Result<Response> {
    stage_beacon(&state, EndpointId::EventsBulkBeacon, body).await
}

pub async fn telemetry_config(State(state): State<Arc<AppState>>, headers: HeaderMap, body: Bytes) -> Result<Response> {
    stage_envelope(&state, EndpointId::TelemetryConfig, &headers, body).await
}

pub async fn telemetry_usage(State(state): State<Arc<AppState>>, headers: HeaderMap, body: Bytes) -> Result<Response> {
    stage_envelope(&state, EndpointId::TelemetryRuntime, &headers, body).await
}

pub async fn legacy_time(State(state): State<Arc<AppState>>, headers: HeaderMap, body: Bytes) -> Result<Response> {
    stage_envelope(&state, EndpointId::LegacyTime, &headers, body).await
}

pub async fn legacy_times(State(state): State<Arc<AppState>>, headers: HeaderMap, body: Bytes) -> Result<Response> {
    stage_envelope(&state, EndpointId::LegacyTimes, &headers, body).await
}

pub async fn legacy_counter(State(state): State<Arc<AppState>>, headers: HeaderMap, body: Bytes) -> Result<Response> {
    stage_envelope(&state, EndpointId::LegacyCounter, &headers, body).await
}

pub async fn legacy_counters(State(state): State<Arc<AppState>>, headers: HeaderMap, body: Bytes) -> Result<Response> {
    stage_envelope(&state, EndpointId::LegacyCounters, &headers, body).await
}

pub async fn legacy_gauge(State(state): State<Arc<AppState>>, headers: HeaderMap, body: Bytes) -> Result<Response> {
    stage_envelope(&state, EndpointId::LegacyGauge, &headers, body).await
}

pub async fn auth(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    let key = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .unwrap_or_default();
    Json(json!({
        "pushEnabled": false,
        "token": "",
        "authorized": state.is_authorized(key),
    }))
    .into_response()
}
