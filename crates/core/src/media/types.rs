//! Request-scoped media types shared by the classifier, plan builder and
//! dispatcher.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;

/// What the transport asked us to do with a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestKind {
    /// A file attachment (document, audio, voice, sticker).
    GenericAttachment,
    /// A native video the sender wants back as a round video note.
    ExplicitVideo,
    /// A web link that must be resolved to direct media URLs first.
    RemoteLink,
    /// The "make round" button pressed under a delivered video.
    CallbackReplay,
}

impl RequestKind {
    /// Whether this request asks for a round video note.
    pub fn wants_video_note(&self) -> bool {
        matches!(self, RequestKind::ExplicitVideo | RequestKind::CallbackReplay)
    }
}

/// The transport-level attachment flavour of a `GenericAttachment`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AttachmentKind {
    #[default]
    Document,
    Audio,
    /// A recorded voice message; converted back to a portable file.
    Voice,
    /// A sticker; converted to a regular image.
    Sticker {
        emoji: Option<String>,
        set_name: Option<String>,
    },
    /// A compressed photo album entry. Only files can become stickers.
    CompressedPhoto,
}

/// Where the source bytes live.
#[derive(Clone, PartialEq, Eq)]
pub enum SourceRef {
    Url(String),
    Bytes(Bytes),
}

impl fmt::Debug for SourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceRef::Url(url) => f.debug_tuple("Url").field(url).finish(),
            SourceRef::Bytes(bytes) => write!(f, "Bytes({} bytes)", bytes.len()),
        }
    }
}

/// An incoming source as handed over by the transport.
#[derive(Debug, Clone)]
pub struct SourceDescriptor {
    source: SourceRef,
    declared_size: Option<u64>,
    display_name: Option<String>,
    kind: RequestKind,
    attachment: AttachmentKind,
}

impl SourceDescriptor {
    pub fn new(source: SourceRef, kind: RequestKind) -> Self {
        Self {
            source,
            declared_size: None,
            display_name: None,
            kind,
            attachment: AttachmentKind::default(),
        }
    }

    pub fn url(url: impl Into<String>, kind: RequestKind) -> Self {
        Self::new(SourceRef::Url(url.into()), kind)
    }

    pub fn bytes(bytes: impl Into<Bytes>, kind: RequestKind) -> Self {
        Self::new(SourceRef::Bytes(bytes.into()), kind)
    }

    pub fn with_declared_size(mut self, size: u64) -> Self {
        self.declared_size = Some(size);
        self
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    pub fn with_attachment(mut self, attachment: AttachmentKind) -> Self {
        self.attachment = attachment;
        self
    }

    pub fn source(&self) -> &SourceRef {
        &self.source
    }

    /// Declared size, falling back to the buffer length for byte sources.
    pub fn declared_size(&self) -> Option<u64> {
        match (&self.declared_size, &self.source) {
            (Some(size), _) => Some(*size),
            (None, SourceRef::Bytes(bytes)) => Some(bytes.len() as u64),
            (None, SourceRef::Url(_)) => None,
        }
    }

    pub fn display_name(&self) -> Option<&str> {
        self.display_name.as_deref()
    }

    pub fn kind(&self) -> RequestKind {
        self.kind
    }

    pub fn attachment(&self) -> &AttachmentKind {
        &self.attachment
    }
}

/// One probed stream.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamRecord {
    pub codec_name: Option<String>,
    pub codec_type: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

impl StreamRecord {
    pub fn new(codec_name: &str, codec_type: &str) -> Self {
        Self {
            codec_name: Some(codec_name.to_string()),
            codec_type: Some(codec_type.to_string()),
            width: None,
            height: None,
        }
    }

    pub fn with_dimensions(mut self, width: u32, height: u32) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }

    pub fn is_audio(&self) -> bool {
        self.codec_type.as_deref() == Some("audio")
    }

    pub fn is_video(&self) -> bool {
        self.codec_type.as_deref() == Some("video")
    }
}

/// Normalized probe output for one source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamInfo {
    pub streams: Vec<StreamRecord>,
    pub container_size: Option<u64>,
    pub format_name: Option<String>,
}

impl StreamInfo {
    pub fn new(streams: Vec<StreamRecord>) -> Self {
        Self {
            streams,
            ..Default::default()
        }
    }

    pub fn has_audio(&self) -> bool {
        self.streams.iter().any(StreamRecord::is_audio)
    }

    /// Dimensions of the first video stream that reports them.
    pub fn video_dimensions(&self) -> Option<(u32, u32)> {
        self.streams
            .iter()
            .filter(|s| s.is_video())
            .find_map(|s| Some((s.width?, s.height?)))
    }
}

/// Probe outcome. Failures carry no detail: callers treat them as "no
/// information".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeResult {
    Available(StreamInfo),
    Unavailable,
}

impl ProbeResult {
    /// Probed streams, empty when the probe failed.
    pub fn streams(&self) -> &[StreamRecord] {
        match self {
            ProbeResult::Available(info) => &info.streams,
            ProbeResult::Unavailable => &[],
        }
    }

    pub fn info(&self) -> Option<&StreamInfo> {
        match self {
            ProbeResult::Available(info) => Some(info),
            ProbeResult::Unavailable => None,
        }
    }
}

/// How classified audio reaches the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AudioMode {
    /// Already in the native voice format, bytes are sent verbatim.
    Passthrough,
    /// Needs a transcode to Opus in Ogg.
    Reencode,
}

/// Output representation chosen for a source.
///
/// `None` means "nothing matched yet"; it is never delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "mode", rename_all = "snake_case")]
pub enum OutputType {
    None,
    Audio(AudioMode),
    Video,
    VideoNote,
    Photo,
    Sticker,
    File,
}

impl OutputType {
    pub fn is_none(&self) -> bool {
        matches!(self, OutputType::None)
    }

    /// Stable label for logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputType::None => "none",
            OutputType::Audio(AudioMode::Passthrough) => "audio_passthrough",
            OutputType::Audio(AudioMode::Reencode) => "audio",
            OutputType::Video => "video",
            OutputType::VideoNote => "video_note",
            OutputType::Photo => "photo",
            OutputType::Sticker => "sticker",
            OutputType::File => "file",
        }
    }
}

impl fmt::Display for OutputType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What to call the source in an "unsupported format" message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodecHint {
    /// Last codec name seen while scanning streams.
    Codec(String),
    /// Extension of the source URL, used when no codec was reported.
    Extension(String),
    Unknown,
}

impl fmt::Display for CodecHint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodecHint::Codec(name) | CodecHint::Extension(name) => f.write_str(name),
            CodecHint::Unknown => f.write_str("unknown"),
        }
    }
}
