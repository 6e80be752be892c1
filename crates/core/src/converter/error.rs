//! Error types for the converter module.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the probing and transcoding engines.
#[derive(Debug, Error)]
pub enum ConverterError {
    /// FFmpeg binary not found.
    #[error("FFmpeg not found at path: {path}")]
    FfmpegNotFound { path: PathBuf },

    /// FFprobe binary not found.
    #[error("FFprobe not found at path: {path}")]
    FfprobeNotFound { path: PathBuf },

    /// Conversion process failed.
    #[error("Conversion failed: {reason}")]
    ConversionFailed {
        reason: String,
        stderr: Option<String>,
    },

    /// Conversion timed out.
    #[error("Conversion timed out after {timeout_secs} seconds")]
    Timeout { timeout_secs: u64 },

    /// Failed to probe media file.
    #[error("Failed to probe media file: {reason}")]
    ProbeFailed { reason: String },

    /// The plan has no inputs.
    #[error("Invalid plan: {reason}")]
    InvalidPlan { reason: String },

    /// I/O error during conversion.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ConverterError {
    /// Creates a new conversion failed error with stderr output.
    pub fn conversion_failed(reason: impl Into<String>, stderr: Option<String>) -> Self {
        Self::ConversionFailed {
            reason: reason.into(),
            stderr,
        }
    }

    /// Creates a new probe failed error.
    pub fn probe_failed(reason: impl Into<String>) -> Self {
        Self::ProbeFailed {
            reason: reason.into(),
        }
    }

    /// Engine diagnostic to log alongside the error, if any.
    pub fn diagnostic(&self) -> Option<&str> {
        match self {
            Self::ConversionFailed { stderr, .. } => stderr.as_deref(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversion_failed_keeps_stderr() {
        let err = ConverterError::conversion_failed("exit 1", Some("moov atom".to_string()));
        assert_eq!(err.to_string(), "Conversion failed: exit 1");
        assert_eq!(err.diagnostic(), Some("moov atom"));
    }

    #[test]
    fn test_probe_failed_has_no_diagnostic() {
        let err = ConverterError::probe_failed("bad json");
        assert!(err.diagnostic().is_none());
    }
}
