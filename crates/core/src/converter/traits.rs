//! Trait definitions for the converter module.

use async_trait::async_trait;
use bytes::Bytes;

use super::error::ConverterError;
use crate::media::ConversionPlan;

/// Inspects a media source and reports its streams.
#[async_trait]
pub trait Prober: Send + Sync {
    /// Returns the name of this prober implementation.
    fn name(&self) -> &str;

    /// Probes `url` (remote URL or local path) and returns the engine's raw
    /// stream/format JSON.
    async fn probe(&self, url: &str) -> Result<String, ConverterError>;
}

/// Executes conversion plans.
#[async_trait]
pub trait Transcoder: Send + Sync {
    /// Returns the name of this transcoder implementation.
    fn name(&self) -> &str;

    /// Runs the plan to completion and returns the encoded output.
    ///
    /// All-or-nothing: a failed run never yields partial bytes.
    async fn run(&self, plan: &ConversionPlan) -> Result<Bytes, ConverterError>;

    /// Validates that the engine is properly configured and ready.
    async fn validate(&self) -> Result<(), ConverterError>;
}
