//! Page fetching.
//!
//! `PageFetcher` is the only place the pipeline touches the network. It never
//! retries; the harvester decides what a failed attempt costs.

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use crate::config::HarvestConfig;
use crate::error::FetchError;

/// Raw HTML of one page plus the URL it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub url: String,
    pub body: String,
}

impl Document {
    pub fn new(url: impl Into<String>, body: impl Into<String>) -> Self {
        Self { url: url.into(), body: body.into() }
    }
}

#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Document, FetchError>;
}

/// reqwest-backed fetcher sharing one connection pool across workers.
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(config: &HarvestConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self { client })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Document, FetchError> {
        debug!("GET {}", url);
        let response = self.client.get(url).send().await.map_err(|source| {
            FetchError::Transport { url: url.to_string(), source }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.text().await.map_err(|source| FetchError::Body {
            url: url.to_string(),
            source,
        })?;

        Ok(Document::new(url, body))
    }
}
