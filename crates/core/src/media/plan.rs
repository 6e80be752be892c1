//! Conversion plans.
//!
//! A plan is the engine-ready description of one transcode: its inputs (with
//! input-side options such as the duration cap), an optional filter graph,
//! stream mappings and the output container. Plans only exist for output
//! types that actually need a transcode.

use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

use super::types::{AudioMode, OutputType, StreamInfo};
use crate::config::VideoNoteConfig;

const FRAGMENTED_MOVFLAGS: &str = "frag_keyframe+empty_moov";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PlanError {
    #[error("Output type {0} does not need a transcode plan")]
    NotTranscodable(OutputType),
}

/// Output container of a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ContainerFormat {
    /// Opus in Ogg, the native voice message format.
    OggOpus,
    /// MP4 with fragments and an empty moov, streamable while being written.
    FragmentedMp4,
    /// Plain MP3, portable audio file.
    Mp3,
}

impl ContainerFormat {
    /// Muxer name passed to `-f`.
    pub fn muxer(&self) -> &'static str {
        match self {
            ContainerFormat::OggOpus => "opus",
            ContainerFormat::FragmentedMp4 => "mp4",
            ContainerFormat::Mp3 => "mp3",
        }
    }

    /// `-movflags` value, for containers that need one to be streamable.
    pub fn movflags(&self) -> Option<&'static str> {
        match self {
            ContainerFormat::FragmentedMp4 => Some(FRAGMENTED_MOVFLAGS),
            _ => None,
        }
    }
}

/// One engine input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlanInput {
    pub url: String,
    /// Read at most this much of the input.
    pub duration_cap: Option<Duration>,
}

impl PlanInput {
    fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            duration_cap: None,
        }
    }
}

/// Square crop window in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CropWindow {
    pub size: u32,
    pub x: u32,
    pub y: u32,
}

impl CropWindow {
    /// Largest centred square: side `min(w, h)`, offset `|w - h| / 2` on the
    /// longer axis and 0 on the other.
    pub fn centered(width: u32, height: u32) -> Self {
        let size = width.min(height);
        let offset = width.abs_diff(height) / 2;
        if width >= height {
            Self { size, x: offset, y: 0 }
        } else {
            Self { size, x: 0, y: offset }
        }
    }
}

/// A transcode ready to hand to the engine. Consumed once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConversionPlan {
    pub output: OutputType,
    pub inputs: Vec<PlanInput>,
    pub filter_graph: Option<String>,
    pub maps: Vec<String>,
    pub container: ContainerFormat,
    /// Numeric crop, when the source dimensions were known.
    pub crop: Option<CropWindow>,
}

impl ConversionPlan {
    fn new(output: OutputType, inputs: Vec<PlanInput>, container: ContainerFormat) -> Self {
        Self {
            output,
            inputs,
            filter_graph: None,
            maps: Vec::new(),
            container,
            crop: None,
        }
    }

    fn with_maps(mut self, maps: &[&str]) -> Self {
        self.maps = maps.iter().map(|m| m.to_string()).collect();
        self
    }

    /// Longest input duration cap, if any input is capped.
    pub fn duration_cap(&self) -> Option<Duration> {
        self.inputs.iter().filter_map(|i| i.duration_cap).max()
    }
}

/// Sources for a plan.
///
/// `primary` is the main media URL. Link-resolved adaptive streams supply a
/// separate audio-only URL.
#[derive(Debug, Clone, Default)]
pub struct PlanSources {
    pub primary: String,
    pub audio: Option<String>,
    pub info: Option<StreamInfo>,
}

impl PlanSources {
    pub fn single(url: impl Into<String>) -> Self {
        Self {
            primary: url.into(),
            ..Default::default()
        }
    }

    pub fn with_audio(mut self, audio_url: Option<String>) -> Self {
        self.audio = audio_url;
        self
    }

    pub fn with_info(mut self, info: Option<StreamInfo>) -> Self {
        self.info = info;
        self
    }
}

/// Builds conversion plans for classified sources.
#[derive(Debug, Clone)]
pub struct PlanBuilder {
    video_note: VideoNoteConfig,
}

impl PlanBuilder {
    pub fn new(video_note: VideoNoteConfig) -> Self {
        Self { video_note }
    }

    pub fn build(
        &self,
        output: OutputType,
        sources: PlanSources,
    ) -> Result<ConversionPlan, PlanError> {
        match output {
            OutputType::Audio(AudioMode::Reencode) => Ok(ConversionPlan::new(
                output,
                vec![PlanInput::new(sources.primary)],
                ContainerFormat::OggOpus,
            )
            .with_maps(&["0:a:0"])),
            OutputType::Video => Ok(self.video(sources)),
            OutputType::VideoNote => Ok(self.video_note(sources)),
            OutputType::File => Ok(ConversionPlan::new(
                output,
                vec![PlanInput::new(sources.primary)],
                ContainerFormat::Mp3,
            )
            .with_maps(&["0:a:0"])),
            OutputType::None
            | OutputType::Audio(AudioMode::Passthrough)
            | OutputType::Photo
            | OutputType::Sticker => Err(PlanError::NotTranscodable(output)),
        }
    }

    fn video(&self, sources: PlanSources) -> ConversionPlan {
        match sources.audio {
            None => ConversionPlan::new(
                OutputType::Video,
                vec![PlanInput::new(sources.primary)],
                ContainerFormat::FragmentedMp4,
            ),
            Some(audio_url) => ConversionPlan::new(
                OutputType::Video,
                vec![PlanInput::new(sources.primary), PlanInput::new(audio_url)],
                ContainerFormat::FragmentedMp4,
            )
            .with_maps(&["0:v:0", "1:a:0"]),
        }
    }

    fn video_note(&self, sources: PlanSources) -> ConversionPlan {
        let has_audio = sources.info.as_ref().is_some_and(StreamInfo::has_audio);
        let crop = sources
            .info
            .as_ref()
            .and_then(StreamInfo::video_dimensions)
            .map(|(w, h)| CropWindow::centered(w, h));

        let input = PlanInput {
            url: sources.primary,
            duration_cap: Some(Duration::from_secs(self.video_note.max_duration_secs)),
        };

        let square = match crop {
            Some(window) => self.numeric_square(window),
            None => self.expression_square(),
        };

        let (filter_graph, maps) = if has_audio {
            (
                format!("[0:v]{square}[sq];[sq][0:a]concat=n=1:v=1:a=1[v][a]"),
                vec!["[v]", "[a]"],
            )
        } else {
            (
                format!("[0:v]{square}[sq];[sq]concat=n=1:v=1:a=0[v]"),
                vec!["[v]"],
            )
        };

        let mut plan =
            ConversionPlan::new(OutputType::VideoNote, vec![input], ContainerFormat::FragmentedMp4)
                .with_maps(&maps);
        plan.filter_graph = Some(filter_graph);
        plan.crop = crop;
        plan
    }

    fn numeric_square(&self, window: CropWindow) -> String {
        let crop = format!("crop={0}:{0}:{1}:{2}", window.size, window.x, window.y);
        if window.size > self.video_note.max_side {
            format!("{crop},scale={0}:{0}", self.video_note.max_side)
        } else {
            crop
        }
    }

    fn expression_square(&self) -> String {
        format!(
            "crop=w=min(in_w\\,in_h):h=min(in_w\\,in_h):\
             x=(in_w-min(in_w\\,in_h))/2:y=(in_h-min(in_w\\,in_h))/2,\
             scale=w=min(iw\\,{0}):h=min(ih\\,{0})",
            self.video_note.max_side
        )
    }
}
