//! Mock link resolver for testing.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::link::{LinkError, LinkResolver, ResolvedLink};

/// Mock implementation of the LinkResolver trait.
///
/// Links without a configured result fail to resolve.
#[derive(Debug, Default)]
pub struct MockLinkResolver {
    results: Arc<RwLock<HashMap<String, ResolvedLink>>>,
    resolved: Arc<RwLock<Vec<String>>>,
}

impl MockLinkResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_result(&self, url: impl Into<String>, link: ResolvedLink) {
        self.results.write().await.insert(url.into(), link);
    }

    pub async fn resolve_count(&self) -> usize {
        self.resolved.read().await.len()
    }
}

#[async_trait]
impl LinkResolver for MockLinkResolver {
    fn name(&self) -> &str {
        "mock"
    }

    async fn resolve(&self, url: &str) -> Result<ResolvedLink, LinkError> {
        self.resolved.write().await.push(url.to_string());

        self.results
            .read()
            .await
            .get(url)
            .cloned()
            .ok_or_else(|| LinkError::Failed(format!("unsupported URL: {}", url)))
    }
}
