//! Fetching externally hosted log blobs
//!
//! Large recordings keep their replay events and logs behind URLs instead of
//! inline in the metadata. Failures here are never fatal; the loader turns
//! them into an empty family.

use anyhow::{bail, Context};
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

/// Fetches a JSON document from a URL
#[async_trait]
pub trait LogFetcher: Send + Sync {
    async fn fetch_json(&self, url: &str) -> anyhow::Result<Value>;
}

/// `LogFetcher` backed by reqwest
pub struct HttpLogFetcher {
    client: reqwest::Client,
}

impl HttpLogFetcher {
    pub fn new(timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self { client })
    }
}

#[async_trait]
impl LogFetcher for HttpLogFetcher {
    async fn fetch_json(&self, url: &str) -> anyhow::Result<Value> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("request to {} failed", url))?;

        let status = response.status();
        if !status.is_success() {
            bail!("{} responded with {}", url, status);
        }

        response
            .json::<Value>()
            .await
            .with_context(|| format!("{} did not return JSON", url))
    }
}

/// Fetcher for recordings that only ever carry inline data
pub struct NoopLogFetcher;

#[async_trait]
impl LogFetcher for NoopLogFetcher {
    async fn fetch_json(&self, url: &str) -> anyhow::Result<Value> {
        bail!("remote logs are disabled, not fetching {}", url)
    }
}
