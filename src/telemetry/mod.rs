pub mod buckets;
pub mod facade;
pub mod latency;
pub mod runtime;
pub mod status;

pub use buckets::{bucket_of, BUCKET_COUNT};
pub use facade::TelemetryFacade;
pub use latency::LatencyStore;
pub use runtime::RuntimeTelemetry;
pub use status::StatusMap;
