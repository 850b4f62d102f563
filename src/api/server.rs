// Router assembly (§4.K/§4.L), grounded on `rusty-db`'s `api/rest/server.rs`
// layer-stacking shape: panic recovery, then CORS, then the two custom
// `from_fn_with_state` layers, then the transport-level guards tower-http
// ships (timeout, body-size limit, tracing).

use std::sync::Arc;
use std::time::Duration;

use axum::http::{HeaderName, Method};
use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use super::middleware::{require_auth, track_request};
use super::state::AppState;
use super::{admin, handlers};

const ALLOWED_HEADERS: [&str; 8] = [
    "origin",
    "content-length",
    "content-type",
    "splitsdkmachinename",
    "splitsdkmachineip",
    "splitsdkversion",
    "splitsdkimpressionsmode",
    "authorization",
];

pub fn build_router(state: Arc<AppState>, request_timeout: Duration, max_body_bytes: usize) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(ALLOWED_HEADERS.map(|h| HeaderName::from_static(h)).to_vec());

    let sdk_routes = Router::new()
        .route("/api/auth", get(handlers::auth))
        .route("/api/splitChanges", get(handlers::split_changes))
        .route("/api/segmentChanges/{name}", get(handlers::segment_changes))
        .route("/api/mySegments/{key}", get(handlers::my_segments))
        .route("/api/testImpressions/bulk", post(handlers::impressions_bulk))
        .route("/api/testImpressions/bulk/beacon", post(handlers::impressions_bulk_beacon))
        .route("/api/testImpressions/count", post(handlers::impressions_count))
        .route("/api/testImpressions/count/beacon", post(handlers::impressions_count_beacon))
        .route("/api/events/bulk", post(handlers::events_bulk))
        .route("/api/events/bulk/beacon", post(handlers::events_bulk_beacon))
        .route("/metrics/config", post(handlers::telemetry_config))
        .route("/metrics/usage", post(handlers::telemetry_usage))
        .route("/metrics/time", post(handlers::legacy_time))
        .route("/metrics/times", post(handlers::legacy_times))
        .route("/metrics/counter", post(handlers::legacy_counter))
        .route("/metrics/counters", post(handlers::legacy_counters))
        .route("/metrics/gauge", post(handlers::legacy_gauge))
        .layer(middleware::from_fn_with_state(state.clone(), track_request))
        .layer(middleware::from_fn_with_state(state.clone(), require_auth));

    let admin_routes = Router::new()
        .route("/admin/ping", get(admin::ping))
        .route("/admin/version", get(admin::version))
        .route("/admin/uptime", get(admin::uptime))
        .route("/admin/stats", get(admin::stats))
        .route("/admin/dashboard", get(admin::dashboard));

    Router::new()
        .merge(sdk_routes)
        .merge(admin_routes)
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(TimeoutLayer::new(request_timeout))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(CatchPanicLayer::new())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{InMemorySegmentStore, ObservableSegmentStorage, SplitCache};
    use crate::config::ProxyConfig;
    use crate::health::ThresholdCounter;
    use crate::sync::{SegmentDelta, SegmentFetcher, SplitFetcher};
    use crate::cache::split::SplitChangesDelta;
    use crate::telemetry::TelemetryFacade;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    struct NoopSplitFetcher;
    #[async_trait]
    impl SplitFetcher for NoopSplitFetcher {
        async fn fetch(&self, since: i64) -> crate::error::Result<SplitChangesDelta> {
            Ok(SplitChangesDelta { till: since, added: vec![], removed: vec![] })
        }
    }

    struct NoopSegmentFetcher;
    #[async_trait]
    impl SegmentFetcher for NoopSegmentFetcher {
        async fn fetch(&self, _name: &str, since: i64) -> crate::error::Result<SegmentDelta> {
            Ok(SegmentDelta { till: since, ..Default::default() })
        }
    }

    struct NoopRecorder;
    #[async_trait]
    impl crate::sync::RawRecorder for NoopRecorder {
        async fn record_raw(&self, _path: &str, _body: &[u8], _metadata: &crate::payload::Metadata) -> crate::error::Result<()> {
            Ok(())
        }
    }

    /// Echoes a single split back at whatever `since` it's asked for, so a
    /// cache miss (`since` ahead of an empty cache's `till`) demonstrably
    /// backfills from "upstream" rather than just returning empty.
    struct BackfillSplitFetcher;
    #[async_trait]
    impl SplitFetcher for BackfillSplitFetcher {
        async fn fetch(&self, since: i64) -> crate::error::Result<SplitChangesDelta> {
            Ok(SplitChangesDelta {
                till: since,
                added: vec![crate::cache::split::Split {
                    name: "backfilled_split".to_string(),
                    traffic_type: "user".to_string(),
                    status: crate::cache::split::SplitStatus::Active,
                    killed: false,
                    default_treatment: "off".to_string(),
                    conditions: vec![],
                    change_number: since,
                }],
                removed: vec![],
            })
        }
    }

    fn test_config() -> ProxyConfig {
        ProxyConfig { api_keys: std::collections::HashSet::from(["k1".to_string()]), ..Default::default() }
    }

    fn state_with_config(config: &ProxyConfig) -> Arc<AppState> {
        Arc::new(AppState::new(
            config,
            Arc::new(SplitCache::new()),
            Arc::new(ObservableSegmentStorage::wrap(Arc::new(InMemorySegmentStore::new())).unwrap()),
            Arc::new(TelemetryFacade::new()),
            Arc::new(NoopSplitFetcher),
            Arc::new(NoopSegmentFetcher),
            Arc::new(NoopRecorder),
            Arc::new(ThresholdCounter::new("test", 5)),
        ))
    }

    fn test_state() -> Arc<AppState> {
        state_with_config(&test_config())
    }

    fn state_with_split_fetcher(fetcher: Arc<dyn SplitFetcher>) -> Arc<AppState> {
        let config = test_config();
        Arc::new(AppState::new(
            &config,
            Arc::new(SplitCache::new()),
            Arc::new(ObservableSegmentStorage::wrap(Arc::new(InMemorySegmentStore::new())).unwrap()),
            Arc::new(TelemetryFacade::new()),
            fetcher,
            Arc::new(NoopSegmentFetcher),
            Arc::new(NoopRecorder),
            Arc::new(ThresholdCounter::new("test", 5)),
        ))
    }

    fn state_with_tiny_impressions_queue() -> Arc<AppState> {
        let mut config = test_config();
        config.impressions.queue_size = 1;
        // Zero workers: nothing ever drains the queue, so the capacity limit
        // set above is exactly what the second request hits — no race with
        // a background worker pulling the first item back off before it.
        config.impressions.threads = 0;
        state_with_config(&config)
    }

    #[tokio::test]
    async fn unauthorized_split_changes_is_rejected() {
        let app = build_router(test_state(), Duration::from_secs(5), 1024 * 1024);
        let resp = app
            .oneshot(Request::builder().uri("/api/splitChanges?since=0").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn authorized_split_changes_succeeds() {
        let app = build_router(test_state(), Duration::from_secs(5), 1024 * 1024);
        let resp = app
            .oneshot(
                Request::builder()
                    .uri("/api/splitChanges?since=0")
                    .header("authorization", "Bearer k1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn admin_ping_needs_no_auth() {
        let app = build_router(test_state(), Duration::from_secs(5), 1024 * 1024);
        let resp = app
            .oneshot(Request::builder().uri("/admin/ping").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn repeated_split_changes_hits_the_response_cache() {
        let state = test_state();
        state.split_cache.apply(SplitChangesDelta {
            till: 1,
            added: vec![],
            removed: vec![],
        });
        let app = build_router(state, Duration::from_secs(5), 1024 * 1024);

        let request = || {
            Request::builder()
                .uri("/api/splitChanges?since=0")
                .header("authorization", "Bearer k1")
                .body(Body::empty())
                .unwrap()
        };
        let first = app.clone().oneshot(request()).await.unwrap();
        assert_eq!(first.status(), StatusCode::OK);
        let first_etag = first.headers().get("etag").cloned();
        assert!(first_etag.is_some());

        let second = app.oneshot(request()).await.unwrap();
        assert_eq!(second.status(), StatusCode::OK);
        assert_eq!(second.headers().get("etag").cloned(), first_etag);
    }

    #[tokio::test]
    async fn stale_split_changes_backfills_from_upstream() {
        let state = state_with_split_fetcher(Arc::new(BackfillSplitFetcher));
        let app = build_router(state, Duration::from_secs(5), 1024 * 1024);

        let resp = app
            .oneshot(
                Request::builder()
                    .uri("/api/splitChanges?since=5")
                    .header("authorization", "Bearer k1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let body = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["splits"][0]["name"], "backfilled_split");
    }

    #[tokio::test]
    async fn impressions_bulk_returns_500_when_the_queue_is_full() {
        let state = state_with_tiny_impressions_queue();
        let app = build_router(state, Duration::from_secs(5), 1024 * 1024);

        let post = |app: Router| {
            app.oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/testImpressions/bulk")
                    .header("authorization", "Bearer k1")
                    .header("content-type", "application/json")
                    .body(Body::from("[]"))
                    .unwrap(),
            )
        };

        let first = post(app.clone()).await.unwrap();
        assert_eq!(first.status(), StatusCode::OK);

        let second = post(app).await.unwrap();
        assert_eq!(second.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
