//! Web link resolution.
//!
//! Turns a page URL (video hosting sites and the like) into direct media
//! URLs the transcoder can read.

mod ytdlp;

pub use ytdlp::{parse_resolver_output, YtDlpResolver};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while resolving a link.
#[derive(Debug, Error)]
pub enum LinkError {
    /// Resolver binary could not be started.
    #[error("Resolver not available: {0}")]
    NotAvailable(String),

    /// Resolver ran but rejected the link.
    #[error("Resolver failed: {0}")]
    Failed(String),

    #[error("Resolver timed out after {timeout_secs} seconds")]
    Timeout { timeout_secs: u64 },

    /// Failed to parse the resolver's output.
    #[error("Failed to parse resolver output: {0}")]
    ParseError(String),
}

/// Direct media URLs behind a link.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedLink {
    pub title: Option<String>,
    /// Video (or muxed video+audio) stream URL.
    pub video_url: Option<String>,
    /// Separate audio stream for adaptive formats.
    pub audio_url: Option<String>,
    /// Size of the video stream when the site reports it.
    pub filesize: Option<u64>,
}

#[async_trait]
pub trait LinkResolver: Send + Sync {
    fn name(&self) -> &str;

    async fn resolve(&self, url: &str) -> Result<ResolvedLink, LinkError>;
}
