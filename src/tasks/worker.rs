// Worker pool (§4.B). A per-task item type replaces the source's `any`-typed
// queue item and the runtime type assertion used to recover it inside
// `DoWork` — the queue, the factory, and the worker are all parameterised by
// the same `T`, so a mismatched payload is a compile error, not a logged
// "invalid data" branch.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::ProxyError;

#[async_trait]
pub trait Worker<T>: Send {
    fn name(&self) -> &str;

    async fn do_work(&mut self, item: T) -> Result<(), ProxyError>;

    /// Called after a failed `do_work`. Default is a no-op; implementors
    /// that need to log or report health do so here.
    fn on_error(&mut self, _err: &ProxyError) {}

    /// How long this worker pauses before draining again after an error.
    /// Isolates the failure to this worker only.
    fn failure_time(&self) -> Duration {
        Duration::from_secs(1)
    }

    /// Runs once after the worker's loop exits, win or lose.
    fn cleanup(&mut self) {}
}

/// Produces one `Worker<T>` per pool slot. Implemented for plain closures so
/// call sites can hand in `|index| Box::new(MyWorker::new(index))` without a
/// named type.
pub trait WorkerFactory<T>: Send + Sync {
    fn new_worker(&self, index: usize) -> Box<dyn Worker<T>>;
}

impl<T, F> WorkerFactory<T> for F
where
    F: Fn(usize) -> Box<dyn Worker<T>> + Send + Sync,
{
    fn new_worker(&self, index: usize) -> Box<dyn Worker<T>> {
        self(index)
    }
}
