pub mod deferred;
pub mod pool;
pub mod queue;
pub mod recording;
pub mod worker;

pub use deferred::{DeferredRecordingTask, DeferredTaskConfig};
pub use pool::WorkerPool;
pub use queue::BoundedQueue;
pub use recording::{RecordingWorker, RecordingWorkerFactory};
pub use worker::{Worker, WorkerFactory};
