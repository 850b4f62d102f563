// Split-proxy: a local synchronizer and recording edge sitting between
// feature-flag SDK clients and the remote feature-flag backend. Holds a
// local split/segment cache refreshed by a background sync loop, stages
// SDK-reported impressions/events/telemetry into bounded queues for
// deferred upstream delivery, and reports per-endpoint health and latency.

pub mod api;
pub mod cache;
pub mod config;
pub mod endpoint;
pub mod error;
pub mod health;
pub mod payload;
pub mod sync;
pub mod tasks;
pub mod telemetry;

pub use config::ProxyConfig;
pub use error::{ProxyError, Result};
