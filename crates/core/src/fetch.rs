//! Source downloads.
//!
//! Fallback decoding and audio passthrough need the full byte buffer rather
//! than a URL the engines can stream from.

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::debug;

use crate::metrics::{EXTERNAL_SERVICE_DURATION, EXTERNAL_SERVICE_REQUESTS};

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unexpected status {status} for {url}")]
    Status { status: u16, url: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Downloads a source in full.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Bytes, FetchError>;
}

/// Fetches `http(s)` URLs with reqwest and anything else from the local
/// filesystem.
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }

    async fn get(&self, url: &str) -> Result<Bytes, FetchError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        Ok(response.bytes().await?)
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Bytes, FetchError> {
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            let path = url.strip_prefix("file://").unwrap_or(url);
            return Ok(Bytes::from(tokio::fs::read(path).await?));
        }

        let start = Instant::now();
        let result = self.get(url).await;

        EXTERNAL_SERVICE_DURATION
            .with_label_values(&["http", "fetch"])
            .observe(start.elapsed().as_secs_f64());
        EXTERNAL_SERVICE_REQUESTS
            .with_label_values(&["http", "fetch", if result.is_ok() { "success" } else { "error" }])
            .inc();

        if let Ok(ref bytes) = result {
            debug!(size = bytes.len(), "Fetched source");
        }
        result
    }
}
