// Split-proxy entry point, grounded on the Go original's
// `cmd/synchronizer/main.go` startup sequence (build config, wire the
// shared state, start the sync loop, serve HTTP, shut down on signal) and
// on `rusty-db`'s `main.rs` for the tracing-init/banner/exit-code shape.

use std::collections::HashSet;
use std::sync::Arc;

use split_proxy::api::AppState;
use split_proxy::cache::{InMemorySegmentStore, ObservableSegmentStorage, SplitCache};
use split_proxy::config::ProxyConfig;
use split_proxy::error::ProxyError;
use split_proxy::health::{HealthCounter, PeriodicCounter};
use split_proxy::sync::{HttpRawRecorder, HttpSegmentFetcher, HttpSplitFetcher, SyncLoop};
use split_proxy::telemetry::TelemetryFacade;
use tracing::{error, info};

fn load_config() -> ProxyConfig {
    let mut config = ProxyConfig::default();

    if let Ok(port) = std::env::var("SPLIT_PROXY_PORT") {
        if let Ok(port) = port.parse() {
            config.port = port;
        }
    }
    if let Ok(base_url) = std::env::var("SPLIT_PROXY_UPSTREAM_URL") {
        config.upstream_base_url = base_url;
    }
    if let Ok(api_key) = std::env::var("SPLIT_PROXY_UPSTREAM_API_KEY") {
        config.upstream_api_key = api_key;
    }
    if let Ok(keys) = std::env::var("SPLIT_PROXY_API_KEYS") {
        config.api_keys = keys.split(',').map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect::<HashSet<_>>();
    }

    config
}

fn print_banner(config: &ProxyConfig) {
    info!(
        version = split_proxy::api::state::VERSION,
        host = config.host.as_str(),
        port = config.port,
        upstream = config.upstream_base_url.as_str(),
        "split-proxy starting"
    );
}

async fn run(config: ProxyConfig) -> Result<(), ProxyError> {
    if config.upstream_api_key.is_empty() {
        return Err(ProxyError::InitializationFailed {
            message: "SPLIT_PROXY_UPSTREAM_API_KEY must be set".to_string(),
            exit_code: 1,
        });
    }

    print_banner(&config);

    let client = reqwest::Client::builder()
        .timeout(config.request_timeout)
        .build()
        .map_err(|e| ProxyError::InitializationFailed { message: e.to_string(), exit_code: 1 })?;

    let split_cache = Arc::new(SplitCache::new());
    // Capacity hint mirrors the Go original's `newActiveSegmentTracker(segmentNames.Size()+1)`:
    // the split cache starts empty on a cold boot, so the hint is 1 here, but
    // it grows with whatever `segment_names()` already knows on a future
    // warm-restart path.
    let segment_cache = Arc::new(
        ObservableSegmentStorage::wrap_with_capacity_hint(
            Arc::new(InMemorySegmentStore::new()),
            split_cache.segment_names().len() + 1,
        )
        .expect("the in-memory segment store always supports the extended capability"),
    );
    let telemetry = Arc::new(TelemetryFacade::new());
    let split_fetcher = Arc::new(HttpSplitFetcher::new(client.clone(), config.upstream_base_url.clone(), config.upstream_api_key.clone()));
    let segment_fetcher = Arc::new(HttpSegmentFetcher::new(client.clone(), config.upstream_base_url.clone(), config.upstream_api_key.clone()));
    let recorder = Arc::new(HttpRawRecorder::new(client, config.upstream_base_url.clone(), config.upstream_api_key.clone()));
    let health: Arc<dyn HealthCounter> =
        Arc::new(PeriodicCounter::new("upstream", config.health.period, config.health.max_errors_allowed_in_period));
    health.start();

    let state = Arc::new(AppState::new(
        &config,
        split_cache.clone(),
        segment_cache.clone(),
        telemetry.clone(),
        split_fetcher.clone(),
        segment_fetcher.clone(),
        recorder,
        health.clone(),
    ));

    let sync_loop = SyncLoop::new(
        split_cache,
        segment_cache,
        split_fetcher,
        segment_fetcher,
        health.clone(),
        telemetry,
        state.response_cache.clone(),
        config.sync_poll_period,
    );
    sync_loop.start();

    let router = split_proxy::api::build_router(state.clone(), config.request_timeout, config.max_body_bytes);
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| ProxyError::InitializationFailed { message: format!("bind {addr}: {e}"), exit_code: 1 })?;
    info!(addr = addr.as_str(), "listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| ProxyError::InitializationFailed { message: e.to_string(), exit_code: 1 })?;

    sync_loop.stop().await;
    health.stop();
    state.shutdown(false).await;
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("shutdown signal received, draining in-flight work");
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt().with_target(false).with_level(true).with_thread_ids(true).init();

    let config = load_config();
    if let Err(err) = run(config).await {
        let exit_code = match &err {
            ProxyError::InitializationFailed { exit_code, .. } => *exit_code,
            _ => 1,
        };
        error!(error = %err, "split-proxy exited with an error");
        std::process::exit(exit_code);
    }
}
