// Raw telemetry/impression/event recorder (§6's `RecordRaw(path, body,
// metadata)`), grounded on the Go original's `HTTPTelemetryRecorder` used by
// `TelemetryConfigWorker.DoWork` (`splitio/proxy/tasks/telemetry.go`).

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};

use crate::error::{ProxyError, Result};
use crate::payload::Metadata;

#[async_trait]
pub trait RawRecorder: Send + Sync {
    async fn record_raw(&self, path: &str, body: &[u8], metadata: &Metadata) -> Result<()>;
}

pub struct HttpRawRecorder {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl HttpRawRecorder {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self { client, base_url: base_url.into(), api_key: api_key.into() }
    }
}

#[async_trait]
impl RawRecorder for HttpRawRecorder {
    async fn record_raw(&self, path: &str, body: &[u8], metadata: &Metadata) -> Result<()> {
        let mut headers = HeaderMap::new();
        if let Ok(v) = HeaderValue::from_str(&metadata.sdk_version) {
            headers.insert("SplitSDKVersion", v);
        }
        if let Ok(v) = HeaderValue::from_str(&metadata.machine_name) {
            headers.insert("SplitSDKMachineName", v);
        }
        if let Ok(v) = HeaderValue::from_str(&metadata.machine_ip) {
            headers.insert("SplitSDKMachineIP", v);
        }

        let url = format!("{}{}", self.base_url, path);
        self.client
            .post(&url)
            .bearer_auth(&self.api_key)
            .headers(headers)
            .body(body.to_vec())
            .send()
            .await?
            .error_for_status()
            .map_err(|e| ProxyError::UpstreamUnavailable(e.to_string()))?;
        Ok(())
    }
}
