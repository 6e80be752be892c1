//! Request dispatcher.
//!
//! Drives one request from intake to a user-facing outcome:
//!
//! ```text
//! Start -> Probed -> Classified -> PlanBuilt -> Transcoded -> SizeChecked -> Delivered
//!                              \-> FallbackDecoded ---------/
//! ```
//!
//! Every branch ends in an [`Outcome`]; nothing is retried. Diagnostics are
//! only produced for direct chats, group chats get silence.

mod outcome;
mod staging;

pub use outcome::{Artifact, ArtifactKind, FailureReason, Outcome};
pub use staging::StagedSource;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

use crate::config::{Config, LimitsConfig};
use crate::converter::{Prober, Transcoder};
use crate::fetch::Fetcher;
use crate::link::{LinkResolver, ResolvedLink};
use crate::media::{
    AttachmentKind, AudioMode, Classifier, CodecSets, FallbackChain, FallbackDecoder, OutputType,
    PlanBuilder, PlanSources, ProbeResult, RequestKind, SourceDescriptor, SourceRef,
    StickerPhotoDecoder, StreamProbe,
};
use crate::metrics::{DISPATCH_DURATION, DISPATCH_TOTAL, REJECTIONS_TOTAL};
use crate::size_gate::SizeGate;

const CONVERSION_FAILED: &str = "File could not be converted.";
const NO_VIDEO_FOUND: &str = "No video found on this link.";
const COMPRESSED_PHOTO: &str = "You need to send the image as a file to convert it to a sticker.";
const VOICE_FILE_NAME: &str = "voice.mp3";

/// Kind of conversation a request came from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatKind {
    /// One-to-one conversation with the sender.
    #[default]
    Direct,
    Group,
}

/// A request handed over by the transport.
#[derive(Debug, Clone)]
pub struct DispatchRequest {
    pub source: SourceDescriptor,
    pub chat: ChatKind,
}

impl DispatchRequest {
    pub fn new(source: SourceDescriptor, chat: ChatKind) -> Self {
        Self { source, chat }
    }
}

/// External collaborators the dispatcher calls into.
#[derive(Clone)]
pub struct DispatcherServices {
    pub prober: Arc<dyn Prober>,
    pub transcoder: Arc<dyn Transcoder>,
    pub resolver: Arc<dyn LinkResolver>,
    pub fetcher: Arc<dyn Fetcher>,
    pub fallback: FallbackChain,
}

/// Classifies sources and turns them into deliverable artifacts.
///
/// Holds no per-request state; one instance serves concurrent requests.
pub struct Dispatcher {
    limits: LimitsConfig,
    caption_max_chars: usize,
    temp_dir: PathBuf,
    probe: StreamProbe,
    classifier: Classifier,
    plans: PlanBuilder,
    transcoder: Arc<dyn Transcoder>,
    resolver: Arc<dyn LinkResolver>,
    fetcher: Arc<dyn Fetcher>,
    fallback: FallbackChain,
    sticker_photo: StickerPhotoDecoder,
}

impl Dispatcher {
    pub fn new(config: &Config, services: DispatcherServices) -> Self {
        Self {
            limits: config.limits.clone(),
            caption_max_chars: config.media.caption_max_chars,
            temp_dir: config.converter.temp_dir.clone(),
            probe: StreamProbe::new(services.prober),
            classifier: Classifier::new(CodecSets::from_config(&config.media)),
            plans: PlanBuilder::new(config.media.video_note.clone()),
            transcoder: services.transcoder,
            resolver: services.resolver,
            fetcher: services.fetcher,
            fallback: services.fallback,
            sticker_photo: StickerPhotoDecoder,
        }
    }

    /// Handles one request. Never fails: errors become rejections or silence.
    pub async fn handle(&self, request: DispatchRequest) -> Outcome {
        let start = Instant::now();
        let kind = request.source.kind();
        let chat = request.chat;

        let outcome = self.dispatch(&request).await;

        let result = outcome.result_label();
        let output = outcome.artifact().map(|a| a.kind.as_str()).unwrap_or("none");
        DISPATCH_TOTAL.with_label_values(&[output, result]).inc();
        DISPATCH_DURATION
            .with_label_values(&[result])
            .observe(start.elapsed().as_secs_f64());
        if let Some(reason) = outcome.reason() {
            REJECTIONS_TOTAL.with_label_values(&[reason.as_str()]).inc();
        }

        let elapsed_ms = start.elapsed().as_millis() as u64;
        match &outcome {
            Outcome::Delivered(artifact) => info!(
                ?kind,
                ?chat,
                artifact = artifact.kind.as_str(),
                size = artifact.bytes.len(),
                elapsed_ms,
                "Delivered artifact"
            ),
            Outcome::Rejected { reason, .. } => {
                info!(?kind, ?chat, %reason, elapsed_ms, "Rejected request")
            }
            Outcome::Silent { reason } => {
                debug!(?kind, ?chat, ?reason, elapsed_ms, "Request ended silently")
            }
        }

        outcome
    }

    async fn dispatch(&self, request: &DispatchRequest) -> Outcome {
        let source = &request.source;
        let chat = request.chat;

        if *source.attachment() == AttachmentKind::CompressedPhoto {
            return reject(chat, FailureReason::CompressedPhoto, COMPRESSED_PHOTO);
        }

        // Round videos are only offered in direct chats
        if source.kind() == RequestKind::ExplicitVideo && chat == ChatKind::Group {
            return Outcome::Silent { reason: None };
        }

        if let Some(size) = source.declared_size() {
            let gate = SizeGate::check(size, self.limits.download);
            if let Some(message) = gate.overflow_message("File") {
                return reject(chat, FailureReason::DownloadTooLarge, message);
            }
        }

        let (location, _staged) = match self.stage(source).await {
            Ok(staged) => staged,
            Err(e) => {
                error!(error = %e, dir = %self.temp_dir.display(), "Failed to stage source");
                return reject(chat, FailureReason::TranscodeEngineError, CONVERSION_FAILED);
            }
        };

        if source.kind() == RequestKind::RemoteLink {
            return self.handle_link(&location, chat).await;
        }

        let caption = source.display_name().map(str::to_string);

        let sticker_failed = match source.attachment() {
            AttachmentKind::Voice => {
                return self
                    .convert(OutputType::File, PlanSources::single(location), caption, chat)
                    .await;
            }
            AttachmentKind::Sticker { emoji, set_name } => {
                let caption = StickerPhotoDecoder::caption(emoji.as_deref(), set_name.as_deref());
                if let Some(outcome) = self.sticker_to_photo(source, &location, caption, chat).await {
                    return outcome;
                }
                true
            }
            _ => false,
        };

        // Stickers that are not rasters skip codec classification
        let probe = if sticker_failed {
            ProbeResult::Unavailable
        } else {
            let probe = self.probe.probe(&location).await;
            if probe == ProbeResult::Unavailable {
                debug!(
                    reason = %FailureReason::ProbeUnavailable,
                    "No stream information, treating source as unknown"
                );
            }
            probe
        };

        let name = match source.source() {
            SourceRef::Url(url) => Some(url.as_str()),
            SourceRef::Bytes(_) => source.display_name(),
        };
        let classification = self.classifier.classify(&probe, source.kind(), name);
        debug!(
            output = %classification.output,
            hint = %classification.hint,
            "Classified source"
        );

        match classification.output {
            OutputType::None => {}
            OutputType::Audio(AudioMode::Passthrough) => {
                return match self.load_bytes(source, &location).await {
                    Some(bytes) => self.deliver(classification.output, bytes, caption, chat),
                    None => reject(chat, FailureReason::TranscodeEngineError, CONVERSION_FAILED),
                };
            }
            output => {
                let sources = PlanSources::single(location).with_info(probe.info().cloned());
                return self.convert(output, sources, caption, chat).await;
            }
        }

        if source.kind() == RequestKind::GenericAttachment {
            if let Some(bytes) = self.load_bytes(source, &location).await {
                if let Some(decoded) = self.fallback.decode(&bytes).await {
                    return self.deliver(decoded.output, decoded.bytes, caption, chat);
                }
            }
        }

        reject(
            chat,
            FailureReason::NoMatchingCodec,
            format!("File type \"{}\" is not yet supported.", classification.hint),
        )
    }

    /// Resolves a web link and transcodes its video.
    async fn handle_link(&self, link: &str, chat: ChatKind) -> Outcome {
        let resolved = match self.resolver.resolve(link).await {
            Ok(resolved) => resolved,
            Err(e) => {
                error!(resolver = self.resolver.name(), error = %e, "Link resolution failed");
                ResolvedLink::default()
            }
        };

        let Some(video_url) = resolved.video_url else {
            return reject(chat, FailureReason::LinkResolutionFailed, NO_VIDEO_FOUND);
        };

        let size = match resolved.filesize {
            Some(size) => Some(size),
            None => self.probe.container_size(&video_url).await,
        };
        if let Some(size) = size {
            let gate = SizeGate::check(size, self.limits.upload.video);
            if let Some(message) = gate.overflow_message("File") {
                return reject(chat, FailureReason::UploadTooLarge, message);
            }
        }

        let caption = resolved.title.unwrap_or_else(|| link.to_string());
        let sources = PlanSources::single(video_url).with_audio(resolved.audio_url);
        self.convert(OutputType::Video, sources, Some(caption), chat)
            .await
    }

    async fn sticker_to_photo(
        &self,
        source: &SourceDescriptor,
        location: &str,
        caption: String,
        chat: ChatKind,
    ) -> Option<Outcome> {
        let bytes = self.load_bytes(source, location).await?;
        match self.sticker_photo.decode(&bytes).await {
            Ok(decoded) => Some(self.deliver(decoded.output, decoded.bytes, Some(caption), chat)),
            Err(e) => {
                error!(decoder = self.sticker_photo.name(), error = %e, "Sticker decode failed");
                None
            }
        }
    }

    async fn convert(
        &self,
        output: OutputType,
        sources: PlanSources,
        caption: Option<String>,
        chat: ChatKind,
    ) -> Outcome {
        let plan = match self.plans.build(output, sources) {
            Ok(plan) => plan,
            Err(e) => {
                error!(%output, error = %e, "Failed to build conversion plan");
                return reject(chat, FailureReason::TranscodeEngineError, CONVERSION_FAILED);
            }
        };

        match self.transcoder.run(&plan).await {
            Ok(bytes) if bytes.is_empty() => {
                warn!(transcoder = self.transcoder.name(), %output, "Transcode produced no output");
                reject(chat, FailureReason::EmptyOutput, CONVERSION_FAILED)
            }
            Ok(bytes) => self.deliver(output, bytes, caption, chat),
            Err(e) => {
                error!(
                    transcoder = self.transcoder.name(),
                    %output,
                    error = %e,
                    diagnostic = e.diagnostic().unwrap_or_default(),
                    "Transcode failed"
                );
                reject(chat, FailureReason::TranscodeEngineError, CONVERSION_FAILED)
            }
        }
    }

    /// Applies the upload gate and wraps the payload.
    fn deliver(
        &self,
        output: OutputType,
        bytes: Bytes,
        caption: Option<String>,
        chat: ChatKind,
    ) -> Outcome {
        let gate = SizeGate::check(bytes.len() as u64, self.limits.upload.for_output(output));
        if let Some(message) = gate.overflow_message("Converted file") {
            return reject(chat, FailureReason::UploadTooLarge, message);
        }

        let kind = match output {
            OutputType::Audio(_) => ArtifactKind::Voice,
            OutputType::Video => ArtifactKind::Video {
                supports_streaming: true,
                offer_round: chat == ChatKind::Direct,
            },
            OutputType::VideoNote => ArtifactKind::VideoNote,
            OutputType::Photo => ArtifactKind::Photo,
            OutputType::Sticker => ArtifactKind::Sticker,
            OutputType::File | OutputType::None => ArtifactKind::Document {
                file_name: VOICE_FILE_NAME.to_string(),
            },
        };

        Outcome::Delivered(Artifact {
            kind,
            bytes,
            caption: caption.map(|c| truncate_chars(c, self.caption_max_chars)),
        })
    }

    /// Address engines can read the source from, plus the temp file guard
    /// for in-memory sources.
    async fn stage(
        &self,
        source: &SourceDescriptor,
    ) -> std::io::Result<(String, Option<StagedSource>)> {
        match source.source() {
            SourceRef::Url(url) => Ok((url.clone(), None)),
            SourceRef::Bytes(bytes) => {
                let staged = StagedSource::write(&self.temp_dir, bytes).await?;
                Ok((staged.location(), Some(staged)))
            }
        }
    }

    /// Full source bytes, downloading URL sources.
    async fn load_bytes(&self, source: &SourceDescriptor, location: &str) -> Option<Bytes> {
        match source.source() {
            SourceRef::Bytes(bytes) => Some(bytes.clone()),
            SourceRef::Url(_) => match self.fetcher.fetch(location).await {
                Ok(bytes) => Some(bytes),
                Err(e) => {
                    warn!(error = %e, "Failed to download source");
                    None
                }
            },
        }
    }
}

fn reject(chat: ChatKind, reason: FailureReason, message: impl Into<String>) -> Outcome {
    match chat {
        ChatKind::Direct => Outcome::Rejected {
            reason,
            message: message.into(),
        },
        ChatKind::Group => Outcome::Silent {
            reason: Some(reason),
        },
    }
}

fn truncate_chars(text: String, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((end, _)) => text[..end].to_string(),
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reject_is_silent_in_groups() {
        let direct = reject(ChatKind::Direct, FailureReason::NoMatchingCodec, "nope");
        assert_eq!(
            direct,
            Outcome::Rejected {
                reason: FailureReason::NoMatchingCodec,
                message: "nope".to_string()
            }
        );

        let group = reject(ChatKind::Group, FailureReason::NoMatchingCodec, "nope");
        assert_eq!(
            group,
            Outcome::Silent {
                reason: Some(FailureReason::NoMatchingCodec)
            }
        );
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("hello".to_string(), 10), "hello");
        assert_eq!(truncate_chars("hello".to_string(), 5), "hello");
        assert_eq!(truncate_chars("hello".to_string(), 3), "hel");
        assert_eq!(truncate_chars("ééééé".to_string(), 2), "éé");
    }

    #[test]
    fn test_chat_kind_serde() {
        let chat: ChatKind = serde_json::from_str("\"group\"").unwrap();
        assert_eq!(chat, ChatKind::Group);
        assert_eq!(ChatKind::default(), ChatKind::Direct);
    }
}
