// Upstream sync loop (§4.I). Owns the only write path into the split and
// segment caches; everything else only reads them.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::api::response_cache::ResponseCache;
use crate::cache::split::SplitCache;
use crate::cache::ObservableSegmentStorage;
use crate::health::HealthCounter;
use crate::telemetry::TelemetryFacade;

use super::fetcher::{SegmentFetcher, SplitFetcher};

const MAX_SEGMENT_CATCHUP_ITERATIONS: usize = 1000;

pub struct SyncLoop {
    split_cache: Arc<SplitCache>,
    segment_cache: Arc<ObservableSegmentStorage>,
    split_fetcher: Arc<dyn SplitFetcher>,
    segment_fetcher: Arc<dyn SegmentFetcher>,
    health: Arc<dyn HealthCounter>,
    telemetry: Arc<TelemetryFacade>,
    response_cache: Arc<ResponseCache>,
    poll_period: Duration,
    task: Mutex<Option<JoinHandle<()>>>,
    stopping: AtomicBool,
    stop_signal: Notify,
}

impl SyncLoop {
    pub fn new(
        split_cache: Arc<SplitCache>,
        segment_cache: Arc<ObservableSegmentStorage>,
        split_fetcher: Arc<dyn SplitFetcher>,
        segment_fetcher: Arc<dyn SegmentFetcher>,
        health: Arc<dyn HealthCounter>,
        telemetry: Arc<TelemetryFacade>,
        response_cache: Arc<ResponseCache>,
        poll_period: Duration,
    ) -> Arc<Self> {
        Arc::new(Self {
            split_cache,
            segment_cache,
            split_fetcher,
            segment_fetcher,
            health,
            telemetry,
            response_cache,
            poll_period,
            task: Mutex::new(None),
            stopping: AtomicBool::new(false),
            stop_signal: Notify::new(),
        })
    }

    pub fn start(self: &Arc<Self>) {
        let mut guard = self.task.lock();
        if guard.is_some() {
            return;
        }
        let this = self.clone();
        *guard = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(this.poll_period);
            loop {
                tokio::select! {
                    _ = interval.tick() => {}
                    _ = this.stop_signal.notified() => break,
                }
                if this.stopping.load(Ordering::Acquire) {
                    break;
                }
                this.run_tick().await;
            }
        }));
    }

    /// Signals the loop to stop and waits for it to exit. The signal is only
    /// ever observed between ticks (the `select!` in `start` races it against
    /// the next `interval.tick()`, never against `run_tick` itself), so a
    /// tick already in flight always completes before the task exits, per
    /// the shutdown semantics in §5.
    pub async fn stop(&self) {
        self.stopping.store(true, Ordering::Release);
        self.stop_signal.notify_one();
        let handle = self.task.lock().take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
    }

    async fn run_tick(&self) {
        let since = self.split_cache.till();
        let delta = match self.split_fetcher.fetch(since).await {
            Ok(delta) => delta,
            Err(err) => {
                self.health.notify_event();
                self.telemetry.runtime.incr_http_error_upstream("splitChanges");
                warn!(error = %err, "split sync tick failed");
                return;
            }
        };

        if delta.till == since {
            debug!("split sync tick: no changes");
        } else {
            let touched_till = delta.till;
            self.split_cache.apply(delta);
            self.response_cache.invalidate_all();
            debug!(till = touched_till, "applied split changes");
        }

        for name in self.split_cache.segment_names() {
            self.sync_segment(&name).await;
        }

        self.health.reset(0);
        self.telemetry.record_synchronization_now();
    }

    async fn sync_segment(&self, name: &str) {
        for _ in 0..MAX_SEGMENT_CATCHUP_ITERATIONS {
            let since = self.segment_cache.till(name);
            match self.segment_fetcher.fetch(name, since).await {
                Ok(delta) => {
                    if delta.till == since {
                        return;
                    }
                    self.segment_cache.update(name, delta.added, delta.removed, delta.till);
                    self.response_cache.invalidate_all();
                    self.health.reset(0);
                }
                Err(err) => {
                    self.health.notify_event();
                    self.telemetry.runtime.incr_http_error_upstream("segmentChanges");
                    warn!(segment = name, error = %err, "segment sync failed");
                    return;
                }
            }
        }
        warn!(segment = name, "segment sync did not converge within the iteration cap");
    }
}
