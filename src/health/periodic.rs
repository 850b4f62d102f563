// Periodic health counter (§4.J), grounded on the Go original's
// `PeriodicImp` (`splitio/provisional/healthcheck/application/counter/periodic.go`):
// `NotifyEvent` flips to unhealthy as soon as the period's error count
// reaches the configured maximum; a background task rolls the period over,
// resetting both the count and the healthy verdict.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::warn;

use super::counter::HealthCounter;

struct Inner {
    name: String,
    max_errors_allowed_in_period: i64,
    count: AtomicI64,
    healthy: RwLock<bool>,
}

pub struct PeriodicCounter {
    inner: Arc<Inner>,
    period: Duration,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl PeriodicCounter {
    pub fn new(name: impl Into<String>, period: Duration, max_errors_allowed_in_period: i64) -> Self {
        Self {
            inner: Arc::new(Inner {
                name: name.into(),
                max_errors_allowed_in_period,
                count: AtomicI64::new(0),
                healthy: RwLock::new(true),
            }),
            period,
            task: Mutex::new(None),
        }
    }
}

impl HealthCounter for PeriodicCounter {
    fn name(&self) -> &str {
        &self.inner.name
    }

    fn healthy(&self) -> bool {
        *self.inner.healthy.read()
    }

    fn notify_event(&self) {
        let count = self.inner.count.fetch_add(1, Ordering::SeqCst) + 1;
        if count >= self.inner.max_errors_allowed_in_period {
            *self.inner.healthy.write() = false;
            warn!(counter = self.inner.name.as_str(), count, "health counter tripped unhealthy");
        }
    }

    fn reset(&self, value: i64) {
        self.inner.count.store(value, Ordering::SeqCst);
        *self.inner.healthy.write() = value < self.inner.max_errors_allowed_in_period;
    }

    fn start(&self) {
        let mut guard = self.task.lock();
        if guard.is_some() {
            return;
        }
        let inner = self.inner.clone();
        let period = self.period;
        *guard = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.tick().await; // first tick fires immediately
            loop {
                interval.tick().await;
                inner.count.store(0, Ordering::SeqCst);
                *inner.healthy.write() = true;
            }
        }));
    }

    fn stop(&self) {
        if let Some(handle) = self.task.lock().take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn flips_unhealthy_on_max_th_event_and_recovers_next_period() {
        let counter = PeriodicCounter::new("test", Duration::from_millis(60), 3);
        counter.start();

        counter.notify_event();
        counter.notify_event();
        assert!(counter.healthy());
        counter.notify_event();
        assert!(!counter.healthy());

        tokio::time::sleep(Duration::from_millis(130)).await;
        assert!(counter.healthy());
        counter.stop();
    }

    #[test]
    fn reset_below_max_reports_healthy() {
        let counter = PeriodicCounter::new("test", Duration::from_secs(60), 3);
        counter.notify_event();
        counter.notify_event();
        counter.notify_event();
        assert!(!counter.healthy());
        counter.reset(0);
        assert!(counter.healthy());
    }
}
