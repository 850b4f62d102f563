// Core-relevant configuration subset (§6). CLI flag parsing and
// config-file loading remain external collaborators — the core only ever
// accepts this struct, built here the way `rusty-db`'s `main.rs` builds
// `DatabaseConfig::default()`.

use std::collections::HashSet;
use std::time::Duration;

use crate::tasks::DeferredTaskConfig;

#[derive(Debug, Clone)]
pub struct RecordingTaskConfig {
    pub queue_size: usize,
    pub threads: usize,
    pub period: Duration,
}

impl RecordingTaskConfig {
    pub fn into_deferred_config(self) -> DeferredTaskConfig {
        DeferredTaskConfig { queue_size: self.queue_size, threads: self.threads, period: self.period }
    }
}

impl Default for RecordingTaskConfig {
    fn default() -> Self {
        Self { queue_size: 5000, threads: 2, period: Duration::from_secs(30) }
    }
}

#[derive(Debug, Clone)]
pub struct HealthConfig {
    pub max_errors_allowed_in_period: i64,
    pub period: Duration,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self { max_errors_allowed_in_period: 10, period: Duration::from_secs(60) }
    }
}

#[derive(Debug, Clone)]
pub struct ProxyConfig {
    pub host: String,
    pub port: u16,
    pub api_keys: HashSet<String>,
    pub upstream_base_url: String,
    pub upstream_api_key: String,
    pub sync_poll_period: Duration,
    pub impressions: RecordingTaskConfig,
    pub events: RecordingTaskConfig,
    pub telemetry: RecordingTaskConfig,
    pub legacy_metrics: RecordingTaskConfig,
    pub health: HealthConfig,
    pub request_timeout: Duration,
    pub max_body_bytes: usize,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 7999,
            api_keys: HashSet::new(),
            upstream_base_url: "https://sdk.split.io".to_string(),
            upstream_api_key: String::new(),
            sync_poll_period: Duration::from_secs(30),
            impressions: RecordingTaskConfig::default(),
            events: RecordingTaskConfig::default(),
            telemetry: RecordingTaskConfig::default(),
            legacy_metrics: RecordingTaskConfig::default(),
            health: HealthConfig::default(),
            request_timeout: Duration::from_secs(10),
            max_body_bytes: 5 * 1024 * 1024,
        }
    }
}
