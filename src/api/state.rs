use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;

use super::response_cache::ResponseCache;
use crate::cache::{ObservableSegmentStorage, SplitCache};
use crate::config::ProxyConfig;
use crate::endpoint::EndpointId;
use crate::error::{ProxyError, Result};
use crate::health::HealthCounter;
use crate::payload::Envelope;
use crate::sync::{RawRecorder, SegmentFetcher, SplitFetcher};
use crate::tasks::{DeferredRecordingTask, RecordingWorkerFactory};
use crate::telemetry::TelemetryFacade;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Shared handle every handler, middleware layer, and background task
/// holds. Construction wires every deferred recording task once at
/// startup; `stage` is the only way handlers reach into them afterward.
pub struct AppState {
    pub split_cache: Arc<SplitCache>,
    pub segment_cache: Arc<ObservableSegmentStorage>,
    pub telemetry: Arc<TelemetryFacade>,
    pub api_keys: HashSet<String>,
    pub split_fetcher: Arc<dyn SplitFetcher>,
    pub segment_fetcher: Arc<dyn SegmentFetcher>,
    tasks: HashMap<EndpointId, Arc<DeferredRecordingTask<Envelope>>>,
    pub response_cache: Arc<ResponseCache>,
    pub health: Arc<dyn HealthCounter>,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(
        config: &ProxyConfig,
        split_cache: Arc<SplitCache>,
        segment_cache: Arc<ObservableSegmentStorage>,
        telemetry: Arc<TelemetryFacade>,
        split_fetcher: Arc<dyn SplitFetcher>,
        segment_fetcher: Arc<dyn SegmentFetcher>,
        recorder: Arc<dyn RawRecorder>,
        health: Arc<dyn HealthCounter>,
    ) -> Self {
        let mut tasks = HashMap::new();
        let mut add_task = |endpoint: EndpointId, path: &'static str, cfg: crate::tasks::DeferredTaskConfig| {
            let factory = Arc::new(RecordingWorkerFactory::new(path, recorder.clone(), telemetry.clone()));
            tasks.insert(endpoint, Arc::new(DeferredRecordingTask::new(path, cfg, factory)));
        };

        add_task(EndpointId::ImpressionsBulk, "/api/testImpressions/bulk", config.impressions.clone().into_deferred_config());
        add_task(
            EndpointId::ImpressionsBulkBeacon,
            "/api/testImpressions/bulk",
            config.impressions.clone().into_deferred_config(),
        );
        add_task(EndpointId::ImpressionsCount, "/api/testImpressions/count", config.impressions.clone().into_deferred_config());
        add_task(
            EndpointId::ImpressionsCountBeacon,
            "/api/testImpressions/count",
            config.impressions.clone().into_deferred_config(),
        );
        add_task(EndpointId::EventsBulk, "/api/events/bulk", config.events.clone().into_deferred_config());
        add_task(EndpointId::EventsBulkBeacon, "/api/events/bulk", config.events.clone().into_deferred_config());
        add_task(EndpointId::TelemetryConfig, "/metrics/config", config.telemetry.clone().into_deferred_config());
        add_task(EndpointId::TelemetryRuntime, "/metrics/usage", config.telemetry.clone().into_deferred_config());
        add_task(EndpointId::LegacyTime, "/metrics/time", config.legacy_metrics.clone().into_deferred_config());
        add_task(EndpointId::LegacyTimes, "/metrics/times", config.legacy_metrics.clone().into_deferred_config());
        add_task(EndpointId::LegacyCounter, "/metrics/counter", config.legacy_metrics.clone().into_deferred_config());
        add_task(EndpointId::LegacyCounters, "/metrics/counters", config.legacy_metrics.clone().into_deferred_config());
        add_task(EndpointId::LegacyGauge, "/metrics/gauge", config.legacy_metrics.clone().into_deferred_config());

        for task in tasks.values() {
            task.start().expect("fresh task starts cleanly");
        }

        Self {
            split_cache,
            segment_cache,
            telemetry,
            api_keys: config.api_keys.clone(),
            split_fetcher,
            segment_fetcher,
            tasks,
            response_cache: Arc::new(ResponseCache::new()),
            health,
            start_time: Instant::now(),
        }
    }

    pub fn stage(&self, endpoint: EndpointId, envelope: Envelope) -> Result<()> {
        match self.tasks.get(&endpoint) {
            Some(task) => task.stage(envelope),
            None => Err(ProxyError::NotFound(format!("no recording task for endpoint {endpoint:?}"))),
        }
    }

    /// `(endpoint-path, queued-item-count)` for every deferred recording
    /// task, for the admin `stats`/`dashboard` views.
    pub fn task_queue_sizes(&self) -> Vec<(EndpointId, usize)> {
        self.tasks.iter().map(|(id, task)| (*id, task.queue_size())).collect()
    }

    pub fn is_authorized(&self, key: &str) -> bool {
        self.api_keys.contains(key)
    }

    pub async fn shutdown(&self, drain: bool) {
        for task in self.tasks.values() {
            task.stop(drain).await;
        }
    }
}
