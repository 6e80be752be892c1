//! Stream classification.
//!
//! Classification is an ordered table of scan passes. Each pass walks every
//! probed stream once and the first stream whose codec matches one of the
//! pass's rules decides the output type. Passes run in order until one
//! matches.

use super::types::{AudioMode, CodecHint, OutputType, ProbeResult, RequestKind};
use crate::config::MediaConfig;

/// Known codec names, grouped by what they turn into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodecSets {
    pub video: Vec<String>,
    pub audio_reencode: Vec<String>,
    pub audio_passthrough: Vec<String>,
}

impl Default for CodecSets {
    fn default() -> Self {
        Self::from_config(&MediaConfig::default())
    }
}

impl CodecSets {
    pub fn from_config(config: &MediaConfig) -> Self {
        Self {
            video: config.video_codecs.clone(),
            audio_reencode: config.audio_reencode_codecs.clone(),
            audio_passthrough: config.audio_passthrough_codecs.clone(),
        }
    }
}

/// One predicate/output pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    pub codecs: Vec<String>,
    pub output: OutputType,
}

impl Rule {
    fn new(codecs: &[String], output: OutputType) -> Self {
        Self {
            codecs: codecs.to_vec(),
            output,
        }
    }

    fn matches(&self, codec: &str) -> bool {
        self.codecs.iter().any(|c| c == codec)
    }
}

/// A full scan over the stream list. Rules are tried in order per stream.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanPass {
    pub rules: Vec<Rule>,
}

/// Classifier verdict.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub output: OutputType,
    /// Only used for "unsupported format" messaging.
    pub hint: CodecHint,
}

/// Maps probe results to output types.
#[derive(Debug, Clone, Default)]
pub struct Classifier {
    codecs: CodecSets,
}

impl Classifier {
    pub fn new(codecs: CodecSets) -> Self {
        Self { codecs }
    }

    /// Scan passes for an intent, highest priority first.
    pub fn passes(&self, intent: RequestKind) -> Vec<ScanPass> {
        if intent.wants_video_note() {
            return vec![ScanPass {
                rules: vec![Rule::new(&self.codecs.video, OutputType::VideoNote)],
            }];
        }

        match intent {
            RequestKind::GenericAttachment => vec![
                ScanPass {
                    rules: vec![Rule::new(&self.codecs.video, OutputType::Video)],
                },
                ScanPass {
                    rules: vec![
                        Rule::new(
                            &self.codecs.audio_reencode,
                            OutputType::Audio(AudioMode::Reencode),
                        ),
                        Rule::new(
                            &self.codecs.audio_passthrough,
                            OutputType::Audio(AudioMode::Passthrough),
                        ),
                    ],
                },
            ],
            _ => Vec::new(),
        }
    }

    /// Classifies a probe result.
    ///
    /// `source_name` is the URL or file name of the source; its extension
    /// becomes the hint when no stream reported a codec.
    pub fn classify(
        &self,
        probe: &ProbeResult,
        intent: RequestKind,
        source_name: Option<&str>,
    ) -> Classification {
        let streams = probe.streams();
        let mut last_codec: Option<&str> = None;

        for pass in self.passes(intent) {
            for stream in streams {
                let Some(codec) = stream.codec_name.as_deref() else {
                    continue;
                };
                last_codec = Some(codec);

                if let Some(rule) = pass.rules.iter().find(|rule| rule.matches(codec)) {
                    return Classification {
                        output: rule.output,
                        hint: CodecHint::Codec(codec.to_string()),
                    };
                }
            }
        }

        // Passes never ran for links; still report what the streams said.
        if last_codec.is_none() {
            last_codec = streams.iter().rev().find_map(|s| s.codec_name.as_deref());
        }

        let hint = match last_codec {
            Some(codec) => CodecHint::Codec(codec.to_string()),
            None => source_name
                .and_then(url_extension)
                .map(CodecHint::Extension)
                .unwrap_or(CodecHint::Unknown),
        };

        Classification {
            output: OutputType::None,
            hint,
        }
    }
}

/// Extension of the trailing path segment of a URL or file name.
///
/// The query string and fragment are ignored and the segment is
/// percent-decoded first.
pub fn url_extension(url: &str) -> Option<String> {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let path = path
        .split_once("://")
        .map(|(_, rest)| rest.split_once('/').map(|(_, p)| p).unwrap_or(""))
        .unwrap_or(path);
    let segment = path.rsplit('/').next()?;
    let segment = urlencoding::decode(segment)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| segment.to_string());

    let (stem, ext) = segment.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_string())
}
