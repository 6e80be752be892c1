//! Fallback decoders for attachments no probe could classify.
//!
//! Decoders run against the fully downloaded byte buffer, in order, and the
//! first one that succeeds decides the output.

use async_trait::async_trait;
use bytes::Bytes;
use image::{DynamicImage, ImageFormat};
use std::io::Cursor;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::time::{timeout, Duration};
use tracing::{debug, error};

use super::types::OutputType;

/// Errors raised by fallback decoders.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The input is not something this decoder understands.
    #[error("Unsupported input: {0}")]
    Unsupported(String),

    /// An external tool failed.
    #[error("{tool} failed: {reason}")]
    ToolFailed { tool: String, reason: String },

    #[error("{tool} timed out after {timeout_secs} seconds")]
    Timeout { tool: String, timeout_secs: u64 },

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Decoder task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// A successfully re-encoded buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoded {
    pub output: OutputType,
    pub bytes: Bytes,
}

#[async_trait]
pub trait FallbackDecoder: Send + Sync {
    fn name(&self) -> &str;

    async fn decode(&self, input: &[u8]) -> Result<Decoded, DecodeError>;
}

/// Rasterizes the first page of a paginated document with `pdftoppm`.
pub struct PdfPageExtractor {
    pdftoppm_path: PathBuf,
    timeout_secs: u64,
}

impl PdfPageExtractor {
    pub fn new(pdftoppm_path: impl Into<PathBuf>, timeout_secs: u64) -> Self {
        Self {
            pdftoppm_path: pdftoppm_path.into(),
            timeout_secs,
        }
    }
}

#[async_trait]
impl FallbackDecoder for PdfPageExtractor {
    fn name(&self) -> &str {
        "pdftoppm"
    }

    async fn decode(&self, input: &[u8]) -> Result<Decoded, DecodeError> {
        if !input.starts_with(b"%PDF") {
            return Err(DecodeError::Unsupported("not a PDF document".to_string()));
        }

        // Read from stdin, first page only, PNG on stdout
        let mut child = Command::new(&self.pdftoppm_path)
            .args(["-f", "1", "-l", "1", "-singlefile", "-png", "-"])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| DecodeError::ToolFailed {
                tool: self.name().to_string(),
                reason: e.to_string(),
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            let document = input.to_vec();
            tokio::spawn(async move {
                // A failed write shows up as a non-zero exit below
                let _ = stdin.write_all(&document).await;
            });
        }

        let output = timeout(
            Duration::from_secs(self.timeout_secs),
            child.wait_with_output(),
        )
        .await
        .map_err(|_| DecodeError::Timeout {
            tool: self.name().to_string(),
            timeout_secs: self.timeout_secs,
        })??;

        if !output.status.success() || output.stdout.is_empty() {
            return Err(DecodeError::ToolFailed {
                tool: self.name().to_string(),
                reason: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(Decoded {
            output: OutputType::Photo,
            bytes: Bytes::from(output.stdout),
        })
    }
}

fn reencode(input: Vec<u8>, format: ImageFormat) -> Result<Bytes, DecodeError> {
    let mut image = image::load_from_memory(&input)?;
    if format == ImageFormat::WebP {
        // The WebP encoder only takes 8-bit color
        image = DynamicImage::ImageRgba8(image.to_rgba8());
    }
    let mut buffer = Cursor::new(Vec::new());
    image.write_to(&mut buffer, format)?;
    Ok(Bytes::from(buffer.into_inner()))
}

/// Decodes any supported raster image and re-encodes it as WebP.
#[derive(Debug, Default)]
pub struct StickerEncoder;

#[async_trait]
impl FallbackDecoder for StickerEncoder {
    fn name(&self) -> &str {
        "sticker"
    }

    async fn decode(&self, input: &[u8]) -> Result<Decoded, DecodeError> {
        let input = input.to_vec();
        let bytes = tokio::task::spawn_blocking(move || reencode(input, ImageFormat::WebP)).await??;
        Ok(Decoded {
            output: OutputType::Sticker,
            bytes,
        })
    }
}

/// Turns a sticker into a regular PNG photo.
#[derive(Debug, Default)]
pub struct StickerPhotoDecoder;

impl StickerPhotoDecoder {
    /// Caption that identifies the sticker's origin.
    pub fn caption(emoji: Option<&str>, set_name: Option<&str>) -> String {
        format!(
            "Sticker for the emoji \"{}\" from the set \"{}\"",
            emoji.unwrap_or_default(),
            set_name.unwrap_or_default()
        )
    }
}

#[async_trait]
impl FallbackDecoder for StickerPhotoDecoder {
    fn name(&self) -> &str {
        "sticker_photo"
    }

    async fn decode(&self, input: &[u8]) -> Result<Decoded, DecodeError> {
        let input = input.to_vec();
        let bytes = tokio::task::spawn_blocking(move || reencode(input, ImageFormat::Png)).await??;
        Ok(Decoded {
            output: OutputType::Photo,
            bytes,
        })
    }
}

/// Ordered list of decoders; the first success wins.
#[derive(Clone, Default)]
pub struct FallbackChain {
    decoders: Vec<Arc<dyn FallbackDecoder>>,
}

impl FallbackChain {
    pub fn new(decoders: Vec<Arc<dyn FallbackDecoder>>) -> Self {
        Self { decoders }
    }

    /// Document page first, then raster sticker.
    pub fn standard(pdftoppm_path: impl Into<PathBuf>, timeout_secs: u64) -> Self {
        Self::new(vec![
            Arc::new(PdfPageExtractor::new(pdftoppm_path, timeout_secs)),
            Arc::new(StickerEncoder),
        ])
    }

    pub fn names(&self) -> Vec<&str> {
        self.decoders.iter().map(|d| d.name()).collect()
    }

    /// Runs the decoders in order. `None` when every decoder failed.
    pub async fn decode(&self, input: &[u8]) -> Option<Decoded> {
        for decoder in &self.decoders {
            match decoder.decode(input).await {
                Ok(decoded) => {
                    debug!(
                        decoder = decoder.name(),
                        output = %decoded.output,
                        size = decoded.bytes.len(),
                        "Fallback decoder succeeded"
                    );
                    return Some(decoded);
                }
                Err(e) => {
                    error!(decoder = decoder.name(), error = %e, "Fallback decoder failed");
                }
            }
        }
        None
    }
}
