//! FFmpeg-based engine implementation.

use async_trait::async_trait;
use bytes::Bytes;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Instant;
use tokio::process::Command;
use tokio::sync::Semaphore;
use tokio::time::{timeout, Duration};
use tracing::{debug, warn};

use super::config::ConverterConfig;
use super::error::ConverterError;
use super::traits::{Prober, Transcoder};
use crate::media::ConversionPlan;
use crate::metrics::TRANSCODE_DURATION;

/// Bytes of stderr kept for diagnostics.
const STDERR_TAIL: usize = 2000;

/// FFmpeg/FFprobe engine.
///
/// Transcodes write to stdout (`pipe:1`) so no intermediate output file is
/// needed. Concurrent runs are bounded by `max_parallel_conversions`.
pub struct FfmpegEngine {
    config: ConverterConfig,
    permits: Arc<Semaphore>,
}

impl FfmpegEngine {
    /// Creates a new engine with the given configuration.
    pub fn new(config: ConverterConfig) -> Self {
        let permits = Arc::new(Semaphore::new(config.max_parallel_conversions.max(1)));
        Self { config, permits }
    }

    /// Creates an engine with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(ConverterConfig::default())
    }

    /// Builds the ffmpeg command line for a plan.
    fn build_args(&self, plan: &ConversionPlan) -> Vec<String> {
        let mut args = vec![
            "-hide_banner".to_string(),
            "-nostdin".to_string(),
            "-loglevel".to_string(),
            self.config.ffmpeg_log_level.clone(),
        ];

        // Inputs, with input-side duration caps
        for input in &plan.inputs {
            if let Some(cap) = input.duration_cap {
                args.extend(["-t".to_string(), cap.as_secs().to_string()]);
            }
            args.extend(["-i".to_string(), input.url.clone()]);
        }

        if let Some(ref graph) = plan.filter_graph {
            args.extend(["-filter_complex".to_string(), graph.clone()]);
        }

        for map in &plan.maps {
            args.extend(["-map".to_string(), map.clone()]);
        }

        // Container
        args.extend(["-f".to_string(), plan.container.muxer().to_string()]);
        if let Some(flags) = plan.container.movflags() {
            args.extend(["-movflags".to_string(), flags.to_string()]);
        }

        // Native opus/aac encoders are still flagged experimental in some builds
        args.extend(["-strict".to_string(), "-2".to_string()]);

        args.extend(self.config.extra_ffmpeg_args.iter().cloned());

        args.push("pipe:1".to_string());

        args
    }

    fn stderr_tail(stderr: &[u8]) -> Option<String> {
        let text = String::from_utf8_lossy(stderr);
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        let start = text
            .char_indices()
            .rev()
            .nth(STDERR_TAIL)
            .map(|(i, _)| i)
            .unwrap_or(0);
        Some(text[start..].to_string())
    }
}

#[async_trait]
impl Prober for FfmpegEngine {
    fn name(&self) -> &str {
        "ffprobe"
    }

    async fn probe(&self, url: &str) -> Result<String, ConverterError> {
        let command = Command::new(&self.config.ffprobe_path)
            .args([
                "-v",
                "quiet",
                "-print_format",
                "json",
                "-show_format",
                "-show_streams",
            ])
            .arg(url)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output();

        let output = timeout(Duration::from_secs(self.config.probe_timeout_secs), command)
            .await
            .map_err(|_| ConverterError::Timeout {
                timeout_secs: self.config.probe_timeout_secs,
            })?
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    ConverterError::FfprobeNotFound {
                        path: self.config.ffprobe_path.clone(),
                    }
                } else {
                    ConverterError::Io(e)
                }
            })?;

        if !output.status.success() {
            return Err(ConverterError::probe_failed(format!(
                "ffprobe exited with code {:?}",
                output.status.code()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[async_trait]
impl Transcoder for FfmpegEngine {
    fn name(&self) -> &str {
        "ffmpeg"
    }

    async fn run(&self, plan: &ConversionPlan) -> Result<Bytes, ConverterError> {
        if plan.inputs.is_empty() {
            return Err(ConverterError::InvalidPlan {
                reason: "plan has no inputs".to_string(),
            });
        }

        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| ConverterError::conversion_failed("engine is shutting down", None))?;

        let start = Instant::now();
        let args = self.build_args(plan);
        debug!(output = %plan.output, ?args, "Running ffmpeg");

        let child = Command::new(&self.config.ffmpeg_path)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    ConverterError::FfmpegNotFound {
                        path: self.config.ffmpeg_path.clone(),
                    }
                } else {
                    ConverterError::Io(e)
                }
            })?;

        // Dropping the future on timeout kills the child (kill_on_drop)
        let output = match timeout(
            Duration::from_secs(self.config.timeout_secs),
            child.wait_with_output(),
        )
        .await
        {
            Ok(result) => result?,
            Err(_) => {
                warn!(output = %plan.output, "ffmpeg timed out");
                return Err(ConverterError::Timeout {
                    timeout_secs: self.config.timeout_secs,
                });
            }
        };

        TRANSCODE_DURATION
            .with_label_values(&[plan.output.as_str()])
            .observe(start.elapsed().as_secs_f64());

        if !output.status.success() {
            return Err(ConverterError::conversion_failed(
                format!("FFmpeg exited with code: {:?}", output.status.code()),
                Self::stderr_tail(&output.stderr),
            ));
        }

        debug!(
            output = %plan.output,
            bytes = output.stdout.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "ffmpeg finished"
        );

        Ok(Bytes::from(output.stdout))
    }

    async fn validate(&self) -> Result<(), ConverterError> {
        // Check ffmpeg exists
        let ffmpeg_result = Command::new(&self.config.ffmpeg_path)
            .arg("-version")
            .output()
            .await;

        if let Err(e) = ffmpeg_result {
            if e.kind() == std::io::ErrorKind::NotFound {
                return Err(ConverterError::FfmpegNotFound {
                    path: self.config.ffmpeg_path.clone(),
                });
            }
            return Err(ConverterError::Io(e));
        }

        // Check ffprobe exists
        let ffprobe_result = Command::new(&self.config.ffprobe_path)
            .arg("-version")
            .output()
            .await;

        if let Err(e) = ffprobe_result {
            if e.kind() == std::io::ErrorKind::NotFound {
                return Err(ConverterError::FfprobeNotFound {
                    path: self.config.ffprobe_path.clone(),
                });
            }
            return Err(ConverterError::Io(e));
        }

        // Ensure temp dir exists
        tokio::fs::create_dir_all(&self.config.temp_dir).await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::VideoNoteConfig;
    use crate::media::{AudioMode, OutputType, PlanBuilder, PlanSources, StreamInfo, StreamRecord};

    fn builder() -> PlanBuilder {
        PlanBuilder::new(VideoNoteConfig::default())
    }

    fn position(args: &[String], flag: &str) -> usize {
        args.iter()
            .position(|a| a == flag)
            .unwrap_or_else(|| panic!("missing {}", flag))
    }

    #[test]
    fn test_build_args_audio() {
        let engine = FfmpegEngine::with_defaults();
        let plan = builder()
            .build(
                OutputType::Audio(AudioMode::Reencode),
                PlanSources::single("https://files/song.mp3"),
            )
            .unwrap();

        let args = engine.build_args(&plan);
        assert_eq!(args[position(&args, "-i") + 1], "https://files/song.mp3");
        assert_eq!(args[position(&args, "-f") + 1], "opus");
        assert_eq!(args[position(&args, "-strict") + 1], "-2");
        assert!(!args.contains(&"-movflags".to_string()));
        assert_eq!(args.last().unwrap(), "pipe:1");
    }

    #[test]
    fn test_build_args_video_two_inputs() {
        let engine = FfmpegEngine::with_defaults();
        let plan = builder()
            .build(
                OutputType::Video,
                PlanSources::single("https://cdn/v").with_audio(Some("https://cdn/a".into())),
            )
            .unwrap();

        let args = engine.build_args(&plan);
        let inputs: Vec<&String> = args
            .iter()
            .zip(args.iter().skip(1))
            .filter(|(flag, _)| *flag == "-i")
            .map(|(_, value)| value)
            .collect();
        assert_eq!(inputs, vec!["https://cdn/v", "https://cdn/a"]);
        assert_eq!(args[position(&args, "-movflags") + 1], "frag_keyframe+empty_moov");
        assert_eq!(args[position(&args, "-f") + 1], "mp4");
    }

    #[test]
    fn test_build_args_video_note_caps_input() {
        let engine = FfmpegEngine::with_defaults();
        let info = StreamInfo::new(vec![
            StreamRecord::new("h264", "video").with_dimensions(1280, 720),
            StreamRecord::new("aac", "audio"),
        ]);
        let plan = builder()
            .build(
                OutputType::VideoNote,
                PlanSources::single("clip.mp4").with_info(Some(info)),
            )
            .unwrap();

        let args = engine.build_args(&plan);
        let cap = position(&args, "-t");
        assert_eq!(args[cap + 1], "60");
        assert!(cap < position(&args, "-i"), "duration cap must be an input option");
        assert!(args[position(&args, "-filter_complex") + 1].contains("crop=720:720:280:0"));
        assert!(args.contains(&"[a]".to_string()));
    }

    #[test]
    fn test_build_args_extra_args_before_output() {
        let mut config = ConverterConfig::default();
        config.extra_ffmpeg_args = vec!["-threads".to_string(), "2".to_string()];
        let engine = FfmpegEngine::new(config);
        let plan = builder()
            .build(OutputType::File, PlanSources::single("voice.oga"))
            .unwrap();

        let args = engine.build_args(&plan);
        let threads = position(&args, "-threads");
        assert_eq!(threads + 2, args.len() - 1);
    }

    #[test]
    fn test_stderr_tail() {
        assert_eq!(FfmpegEngine::stderr_tail(b"  \n"), None);
        assert_eq!(
            FfmpegEngine::stderr_tail(b"Invalid data found\n").as_deref(),
            Some("Invalid data found")
        );

        let long = "x".repeat(STDERR_TAIL * 2);
        let tail = FfmpegEngine::stderr_tail(long.as_bytes()).unwrap();
        assert!(tail.len() <= STDERR_TAIL + 1);
    }

    #[tokio::test]
    async fn test_run_rejects_empty_plan() {
        let engine = FfmpegEngine::with_defaults();
        let mut plan = builder()
            .build(OutputType::File, PlanSources::single("voice.oga"))
            .unwrap();
        plan.inputs.clear();

        let err = engine.run(&plan).await.unwrap_err();
        assert!(matches!(err, ConverterError::InvalidPlan { .. }));
    }
}
