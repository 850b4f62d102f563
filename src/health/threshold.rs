// Threshold health counter (§4.J): no background rollover. Increments on
// event, flips unhealthy strictly above the configured threshold, and only
// recovers when the caller explicitly `reset`s it.

use std::sync::atomic::{AtomicI64, Ordering};

use parking_lot::RwLock;

use super::counter::HealthCounter;

pub struct ThresholdCounter {
    name: String,
    threshold: i64,
    count: AtomicI64,
    healthy: RwLock<bool>,
}

impl ThresholdCounter {
    pub fn new(name: impl Into<String>, threshold: i64) -> Self {
        Self {
            name: name.into(),
            threshold,
            count: AtomicI64::new(0),
            healthy: RwLock::new(true),
        }
    }
}

impl HealthCounter for ThresholdCounter {
    fn name(&self) -> &str {
        &self.name
    }

    fn healthy(&self) -> bool {
        *self.healthy.read()
    }

    fn notify_event(&self) {
        let count = self.count.fetch_add(1, Ordering::SeqCst) + 1;
        if count > self.threshold {
            *self.healthy.write() = false;
        }
    }

    fn reset(&self, value: i64) {
        self.count.store(value, Ordering::SeqCst);
        *self.healthy.write() = value <= self.threshold;
    }

    /// No background task to drive; start is a no-op for this variant.
    fn start(&self) {}

    fn stop(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flips_unhealthy_strictly_above_threshold() {
        let counter = ThresholdCounter::new("test", 2);
        counter.notify_event();
        counter.notify_event();
        assert!(counter.healthy());
        counter.notify_event();
        assert!(!counter.healthy());
    }

    #[test]
    fn recovers_only_on_explicit_reset() {
        let counter = ThresholdCounter::new("test", 1);
        counter.notify_event();
        counter.notify_event();
        assert!(!counter.healthy());
        counter.notify_event();
        assert!(!counter.healthy(), "must not self-recover without reset");
        counter.reset(0);
        assert!(counter.healthy());
    }
}
