// Deferred recording task (§4.C): queue + worker pool + a periodic liveness
// tick, wired together with start/stop lifecycle semantics.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::error::{ProxyError, Result};

use super::pool::WorkerPool;
use super::queue::BoundedQueue;
use super::worker::WorkerFactory;

#[derive(Debug, Clone)]
pub struct DeferredTaskConfig {
    pub queue_size: usize,
    pub threads: usize,
    pub period: Duration,
}

struct Running<T> {
    pool: WorkerPool<T>,
    tick: JoinHandle<()>,
}

enum State<T> {
    Idle,
    Running(Running<T>),
    Stopped,
}

/// `Stage` is always legal to call; it just forwards to the queue, which
/// itself refuses admission once closed. `Start`/`Stop` govern the workers
/// and the liveness tick around that queue.
pub struct DeferredRecordingTask<T> {
    name: String,
    queue: Arc<BoundedQueue<T>>,
    config: DeferredTaskConfig,
    factory: Arc<dyn WorkerFactory<T>>,
    state: Mutex<State<T>>,
}

impl<T: Send + 'static> DeferredRecordingTask<T> {
    pub fn new(name: impl Into<String>, config: DeferredTaskConfig, factory: Arc<dyn WorkerFactory<T>>) -> Self {
        Self {
            name: name.into(),
            queue: Arc::new(BoundedQueue::new(config.queue_size)),
            config,
            factory,
            state: Mutex::new(State::Idle),
        }
    }

    pub fn stage(&self, item: T) -> Result<()> {
        self.queue.stage(item)
    }

    /// Starts the worker pool and the liveness tick. A no-op if already
    /// running. Fails with `Closed` if this task has already been stopped —
    /// per §4.C, a stopped task cannot be restarted; build a fresh one.
    pub fn start(&self) -> Result<()> {
        let mut guard = self.state.lock();
        match &*guard {
            State::Running(_) => return Ok(()),
            State::Stopped => return Err(ProxyError::Closed),
            State::Idle => {}
        }

        let pool = WorkerPool::start(self.queue.clone(), self.config.threads, self.factory.clone());
        let period = self.config.period;
        let name = self.name.clone();
        let tick = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.tick().await; // first tick fires immediately; skip it
            loop {
                interval.tick().await;
                debug!(task = name.as_str(), "deferred task liveness tick");
            }
        });

        *guard = State::Running(Running { pool, tick });
        Ok(())
    }

    /// `drain = true` closes the queue and waits for workers to finish
    /// outstanding items; `drain = false` discards whatever is queued and
    /// returns as soon as workers notice the queue is closed.
    pub async fn stop(&self, drain: bool) {
        let running = {
            let mut guard = self.state.lock();
            match std::mem::replace(&mut *guard, State::Stopped) {
                State::Running(running) => Some(running),
                _ => None,
            }
        };

        let Some(running) = running else { return };
        running.tick.abort();
        if drain {
            self.queue.close();
        } else {
            self.queue.close_and_discard();
        }
        running.pool.join().await;
    }

    pub fn queue_size(&self) -> usize {
        self.queue.size()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingWorker {
        seen: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl super::super::worker::Worker<u32> for CountingWorker {
        fn name(&self) -> &str {
            "counting"
        }

        async fn do_work(&mut self, _item: u32) -> Result<()> {
            self.seen.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn stages_are_processed_after_start() {
        let seen = Arc::new(AtomicUsize::new(0));
        let factory_seen = seen.clone();
        let factory = Arc::new(move |_idx: usize| {
            Box::new(CountingWorker { seen: factory_seen.clone() }) as Box<dyn super::super::worker::Worker<u32>>
        });
        let task = DeferredRecordingTask::new(
            "test",
            DeferredTaskConfig { queue_size: 8, threads: 1, period: Duration::from_millis(50) },
            factory,
        );
        task.start().unwrap();
        task.stage(1).unwrap();
        task.stage(2).unwrap();

        for _ in 0..50 {
            if seen.load(Ordering::SeqCst) == 2 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(seen.load(Ordering::SeqCst), 2);
        task.stop(true).await;
    }

    #[tokio::test]
    async fn restart_after_stop_is_rejected() {
        let factory = Arc::new(|_idx: usize| {
            Box::new(CountingWorker { seen: Arc::new(AtomicUsize::new(0)) }) as Box<dyn super::super::worker::Worker<u32>>
        });
        let task = DeferredRecordingTask::new(
            "test",
            DeferredTaskConfig { queue_size: 4, threads: 1, period: Duration::from_millis(50) },
            factory,
        );
        task.start().unwrap();
        task.stop(false).await;
        match task.start() {
            Err(ProxyError::Closed) => {}
            other => panic!("expected Closed, got {other:?}"),
        }
    }
}
