//! Terminal states of a dispatched request.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Why a request did not produce an artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    /// The prober could not read the source. Never surfaced on its own.
    ProbeUnavailable,
    NoMatchingCodec,
    TranscodeEngineError,
    DownloadTooLarge,
    UploadTooLarge,
    /// The transcoder succeeded but wrote nothing.
    EmptyOutput,
    LinkResolutionFailed,
    /// A compressed photo was sent where only files are accepted.
    CompressedPhoto,
}

impl FailureReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureReason::ProbeUnavailable => "probe_unavailable",
            FailureReason::NoMatchingCodec => "no_matching_codec",
            FailureReason::TranscodeEngineError => "transcode_engine_error",
            FailureReason::DownloadTooLarge => "download_too_large",
            FailureReason::UploadTooLarge => "upload_too_large",
            FailureReason::EmptyOutput => "empty_output",
            FailureReason::LinkResolutionFailed => "link_resolution_failed",
            FailureReason::CompressedPhoto => "compressed_photo",
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How an artifact should be presented by the transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ArtifactKind {
    Voice,
    Video {
        supports_streaming: bool,
        /// Show the "make round" action under the video.
        offer_round: bool,
    },
    VideoNote,
    Photo,
    Sticker,
    Document { file_name: String },
}

impl ArtifactKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactKind::Voice => "voice",
            ArtifactKind::Video { .. } => "video",
            ArtifactKind::VideoNote => "video_note",
            ArtifactKind::Photo => "photo",
            ArtifactKind::Sticker => "sticker",
            ArtifactKind::Document { .. } => "document",
        }
    }

    /// MIME type of the payload.
    pub fn content_type(&self) -> &'static str {
        match self {
            ArtifactKind::Voice => "audio/ogg",
            ArtifactKind::Video { .. } | ArtifactKind::VideoNote => "video/mp4",
            ArtifactKind::Photo => "image/png",
            ArtifactKind::Sticker => "image/webp",
            ArtifactKind::Document { .. } => "audio/mpeg",
        }
    }
}

/// A deliverable payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub kind: ArtifactKind,
    pub bytes: Bytes,
    pub caption: Option<String>,
}

/// What the sender ends up seeing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Delivered(Artifact),
    /// A message to send back instead of an artifact.
    Rejected {
        reason: FailureReason,
        message: String,
    },
    /// Nothing is sent. Group chats never get diagnostics.
    Silent { reason: Option<FailureReason> },
}

impl Outcome {
    pub fn artifact(&self) -> Option<&Artifact> {
        match self {
            Outcome::Delivered(artifact) => Some(artifact),
            _ => None,
        }
    }

    /// Failure reason for rejected and silenced outcomes.
    pub fn reason(&self) -> Option<FailureReason> {
        match self {
            Outcome::Delivered(_) => None,
            Outcome::Rejected { reason, .. } => Some(*reason),
            Outcome::Silent { reason } => *reason,
        }
    }

    /// Label used for metrics: "delivered", "rejected" or "silent".
    pub fn result_label(&self) -> &'static str {
        match self {
            Outcome::Delivered(_) => "delivered",
            Outcome::Rejected { .. } => "rejected",
            Outcome::Silent { .. } => "silent",
        }
    }
}
