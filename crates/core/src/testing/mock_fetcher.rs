//! Mock fetcher for testing.

use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::fetch::{FetchError, Fetcher};

/// Mock implementation of the Fetcher trait. Unknown URLs answer 404.
#[derive(Debug, Default)]
pub struct MockFetcher {
    bodies: Arc<RwLock<HashMap<String, Bytes>>>,
    fetched: Arc<RwLock<Vec<String>>>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_body(&self, url: impl Into<String>, body: impl Into<Bytes>) {
        self.bodies.write().await.insert(url.into(), body.into());
    }

    pub async fn fetch_count(&self) -> usize {
        self.fetched.read().await.len()
    }
}

#[async_trait]
impl Fetcher for MockFetcher {
    async fn fetch(&self, url: &str) -> Result<Bytes, FetchError> {
        self.fetched.write().await.push(url.to_string());

        self.bodies
            .read()
            .await
            .get(url)
            .cloned()
            .ok_or_else(|| FetchError::Status {
                status: 404,
                url: url.to_string(),
            })
    }
}
