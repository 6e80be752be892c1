//! Mock transcoder for testing.

use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::converter::{ConverterError, Transcoder};
use crate::media::ConversionPlan;

/// Mock implementation of the Transcoder trait.
///
/// Records every plan it receives and answers with a configurable output.
#[derive(Debug)]
pub struct MockTranscoder {
    plans: Arc<RwLock<Vec<ConversionPlan>>>,
    output: Arc<RwLock<Bytes>>,
    next_error: Arc<RwLock<Option<ConverterError>>>,
}

impl Default for MockTranscoder {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTranscoder {
    /// Create a transcoder that outputs a small non-empty payload.
    pub fn new() -> Self {
        Self {
            plans: Arc::new(RwLock::new(Vec::new())),
            output: Arc::new(RwLock::new(Bytes::from_static(b"transcoded"))),
            next_error: Arc::new(RwLock::new(None)),
        }
    }

    /// Set the bytes returned by every successful run.
    pub async fn set_output(&self, output: impl Into<Bytes>) {
        *self.output.write().await = output.into();
    }

    /// Configure the next run to fail with the given error.
    pub async fn set_next_error(&self, error: ConverterError) {
        *self.next_error.write().await = Some(error);
    }

    /// Plans received so far, including failed runs.
    pub async fn recorded_plans(&self) -> Vec<ConversionPlan> {
        self.plans.read().await.clone()
    }

    pub async fn run_count(&self) -> usize {
        self.plans.read().await.len()
    }
}

#[async_trait]
impl Transcoder for MockTranscoder {
    fn name(&self) -> &str {
        "mock"
    }

    async fn run(&self, plan: &ConversionPlan) -> Result<Bytes, ConverterError> {
        self.plans.write().await.push(plan.clone());

        if let Some(err) = self.next_error.write().await.take() {
            return Err(err);
        }

        Ok(self.output.read().await.clone())
    }

    async fn validate(&self) -> Result<(), ConverterError> {
        Ok(())
    }
}
