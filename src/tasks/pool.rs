// N workers draining one bounded queue (§4.B). Workers are independent: one
// worker's `DoWork` error only pauses that worker for its own `FailureTime`,
// never the pool.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::queue::BoundedQueue;
use super::worker::WorkerFactory;

pub struct WorkerPool<T> {
    queue: Arc<BoundedQueue<T>>,
    handles: Vec<JoinHandle<()>>,
}

impl<T: Send + 'static> WorkerPool<T> {
    pub fn start(queue: Arc<BoundedQueue<T>>, n: usize, factory: Arc<dyn WorkerFactory<T>>) -> Self {
        let mut handles = Vec::with_capacity(n);
        for index in 0..n {
            let queue = queue.clone();
            let factory = factory.clone();
            handles.push(tokio::spawn(async move {
                let mut worker = factory.new_worker(index);
                debug!(worker = worker.name(), "worker started");
                loop {
                    match queue.drain().await {
                        Some(item) => {
                            if let Err(err) = worker.do_work(item).await {
                                warn!(worker = worker.name(), error = %err, "worker do_work failed");
                                worker.on_error(&err);
                                tokio::time::sleep(worker.failure_time()).await;
                            }
                        }
                        None => break,
                    }
                }
                worker.cleanup();
                debug!(worker = worker.name(), "worker stopped");
            }));
        }
        Self { queue, handles }
    }

    pub fn queue(&self) -> &Arc<BoundedQueue<T>> {
        &self.queue
    }

    /// Waits for every worker task to exit. Call after the queue has been
    /// closed (and optionally drained), never before.
    pub async fn join(self) {
        for handle in self.handles {
            let _ = handle.await;
        }
    }
}
