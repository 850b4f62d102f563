// The one worker implementation every deferred recording task in this proxy
// uses: forward the envelope's body to a fixed upstream path. Grounded on
// the Go original's `TelemetryConfigWorker.DoWork`
// (`splitio/proxy/tasks/telemetry.go`), generalized across every
// envelope-shaped endpoint (impressions, events, telemetry, legacy
// metrics) since they all reduce to the same "forward raw bytes" action.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::Result;
use crate::payload::Envelope;
use crate::sync::RawRecorder;
use crate::telemetry::TelemetryFacade;

use super::worker::{Worker, WorkerFactory};

pub struct RecordingWorker {
    name: String,
    path: &'static str,
    recorder: Arc<dyn RawRecorder>,
    telemetry: Arc<TelemetryFacade>,
}

#[async_trait]
impl Worker<Envelope> for RecordingWorker {
    fn name(&self) -> &str {
        &self.name
    }

    async fn do_work(&mut self, item: Envelope) -> Result<()> {
        self.recorder.record_raw(self.path, &item.body, &item.metadata).await
    }

    fn on_error(&mut self, _err: &crate::error::ProxyError) {
        self.telemetry.runtime.incr_http_error_upstream(self.path);
    }

    fn failure_time(&self) -> Duration {
        Duration::from_secs(1)
    }
}

pub struct RecordingWorkerFactory {
    path: &'static str,
    recorder: Arc<dyn RawRecorder>,
    telemetry: Arc<TelemetryFacade>,
}

impl RecordingWorkerFactory {
    pub fn new(path: &'static str, recorder: Arc<dyn RawRecorder>, telemetry: Arc<TelemetryFacade>) -> Self {
        Self { path, recorder, telemetry }
    }
}

impl WorkerFactory<Envelope> for RecordingWorkerFactory {
    fn new_worker(&self, index: usize) -> Box<dyn Worker<Envelope>> {
        Box::new(RecordingWorker {
            name: format!("{}-{index}", self.path),
            path: self.path,
            recorder: self.recorder.clone(),
            telemetry: self.telemetry.clone(),
        })
    }
}
