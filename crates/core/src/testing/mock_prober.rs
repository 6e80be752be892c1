//! Mock prober for testing.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::fixtures;
use crate::converter::{ConverterError, Prober};
use crate::media::StreamInfo;

/// Mock implementation of the Prober trait.
///
/// Unknown sources fail to probe, like a real engine handed something it
/// cannot read.
///
/// # Example
///
/// ```rust,ignore
/// use mediarelay_core::testing::{fixtures, MockProber};
///
/// let prober = MockProber::new();
/// prober.set_info("https://files/clip.mp4", &fixtures::video_info(1280, 720, true)).await;
/// ```
#[derive(Debug, Default)]
pub struct MockProber {
    /// Raw JSON by source.
    outputs: Arc<RwLock<HashMap<String, String>>>,
    /// One-shot errors by source.
    errors: Arc<RwLock<HashMap<String, ConverterError>>>,
    /// Answer for sources without a configured result.
    default_output: Arc<RwLock<Option<String>>>,
    /// Every probed source, in order.
    probed: Arc<RwLock<Vec<String>>>,
}

impl MockProber {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the raw JSON returned for a source.
    pub async fn set_raw(&self, url: impl Into<String>, json: impl Into<String>) {
        self.outputs.write().await.insert(url.into(), json.into());
    }

    /// Set the stream information returned for a source.
    pub async fn set_info(&self, url: impl Into<String>, info: &StreamInfo) {
        self.set_raw(url, fixtures::probe_json(info)).await;
    }

    /// Set the stream information returned for any unconfigured source,
    /// such as staged temp files.
    pub async fn set_default_info(&self, info: &StreamInfo) {
        *self.default_output.write().await = Some(fixtures::probe_json(info));
    }

    /// Make the next probe of `url` fail.
    pub async fn set_error(&self, url: impl Into<String>, error: ConverterError) {
        self.errors.write().await.insert(url.into(), error);
    }

    pub async fn probe_count(&self) -> usize {
        self.probed.read().await.len()
    }

    pub async fn probed(&self) -> Vec<String> {
        self.probed.read().await.clone()
    }
}

#[async_trait]
impl Prober for MockProber {
    fn name(&self) -> &str {
        "mock"
    }

    async fn probe(&self, url: &str) -> Result<String, ConverterError> {
        self.probed.write().await.push(url.to_string());

        if let Some(err) = self.errors.write().await.remove(url) {
            return Err(err);
        }

        if let Some(raw) = self.outputs.read().await.get(url) {
            return Ok(raw.clone());
        }

        self.default_output
            .read()
            .await
            .clone()
            .ok_or_else(|| ConverterError::probe_failed(format!("no probe result for {}", url)))
    }
}
