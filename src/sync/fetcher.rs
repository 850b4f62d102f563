// Upstream fetch interfaces (§6): the core only depends on these two narrow
// traits plus a raw telemetry recorder (`tasks::worker::Worker` instances
// own their own recorder calls) — never on `reqwest` directly outside this
// module.

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use crate::cache::split::{Split, SplitChangesDelta, SplitStatus};
use crate::error::{ProxyError, Result};

#[async_trait]
pub trait SplitFetcher: Send + Sync {
    async fn fetch(&self, since: i64) -> Result<SplitChangesDelta>;
}

#[derive(Debug, Clone, Default)]
pub struct SegmentDelta {
    pub till: i64,
    pub added: HashSet<String>,
    pub removed: HashSet<String>,
}

#[async_trait]
pub trait SegmentFetcher: Send + Sync {
    async fn fetch(&self, name: &str, since: i64) -> Result<SegmentDelta>;
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireSplitChanges {
    till: i64,
    splits: Vec<Split>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireSegmentChanges {
    till: i64,
    #[serde(default)]
    added: HashSet<String>,
    #[serde(default)]
    removed: HashSet<String>,
}

pub struct HttpSplitFetcher {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl HttpSplitFetcher {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self { client, base_url: base_url.into(), api_key: api_key.into() }
    }
}

#[async_trait]
impl SplitFetcher for HttpSplitFetcher {
    async fn fetch(&self, since: i64) -> Result<SplitChangesDelta> {
        let url = format!("{}/api/splitChanges", self.base_url);
        let resp = self
            .client
            .get(&url)
            .bearer_auth(&self.api_key)
            .query(&[("since", since.to_string())])
            .timeout(Duration::from_secs(30))
            .send()
            .await?
            .error_for_status()
            .map_err(|e| ProxyError::UpstreamUnavailable(e.to_string()))?;

        let parsed: WireSplitChanges = resp
            .json()
            .await
            .map_err(|e| ProxyError::Malformed(format!("splitChanges payload: {e}")))?;

        let (removed, added) = parsed
            .splits
            .into_iter()
            .partition::<Vec<_>, _>(|s| s.status == SplitStatus::Archived);

        Ok(SplitChangesDelta {
            till: parsed.till,
            added,
            removed: removed.into_iter().map(|s| s.name).collect(),
        })
    }
}

pub struct HttpSegmentFetcher {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl HttpSegmentFetcher {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self { client, base_url: base_url.into(), api_key: api_key.into() }
    }
}

#[async_trait]
impl SegmentFetcher for HttpSegmentFetcher {
    async fn fetch(&self, name: &str, since: i64) -> Result<SegmentDelta> {
        let url = format!("{}/api/segmentChanges/{name}", self.base_url);
        let resp = self
            .client
            .get(&url)
            .bearer_auth(&self.api_key)
            .query(&[("since", since.to_string())])
            .timeout(Duration::from_secs(30))
            .send()
            .await?
            .error_for_status()
            .map_err(|e| ProxyError::UpstreamUnavailable(e.to_string()))?;

        let parsed: WireSegmentChanges = resp
            .json()
            .await
            .map_err(|e| ProxyError::Malformed(format!("segmentChanges payload: {e}")))?;

        Ok(SegmentDelta { till: parsed.till, added: parsed.added, removed: parsed.removed })
    }
}
