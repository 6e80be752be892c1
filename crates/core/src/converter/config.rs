//! Configuration for the converter module.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for the external media engines (ffmpeg, ffprobe, pdftoppm).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConverterConfig {
    /// Path to ffmpeg binary.
    #[serde(default = "default_ffmpeg_path")]
    pub ffmpeg_path: PathBuf,

    /// Path to ffprobe binary.
    #[serde(default = "default_ffprobe_path")]
    pub ffprobe_path: PathBuf,

    /// Path to pdftoppm binary (poppler), used to rasterize document pages.
    #[serde(default = "default_pdftoppm_path")]
    pub pdftoppm_path: PathBuf,

    /// Temporary directory for staged byte-buffer sources.
    #[serde(default = "default_temp_dir")]
    pub temp_dir: PathBuf,

    /// Maximum parallel transcodes.
    #[serde(default = "default_max_parallel")]
    pub max_parallel_conversions: usize,

    /// Timeout for a single transcode in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Timeout for a single probe in seconds.
    #[serde(default = "default_probe_timeout")]
    pub probe_timeout_secs: u64,

    /// FFmpeg log level (quiet, panic, fatal, error, warning, info, verbose, debug, trace).
    #[serde(default = "default_log_level")]
    pub ffmpeg_log_level: String,

    /// Additional global ffmpeg arguments.
    #[serde(default)]
    pub extra_ffmpeg_args: Vec<String>,
}

fn default_ffmpeg_path() -> PathBuf {
    PathBuf::from("ffmpeg")
}

fn default_ffprobe_path() -> PathBuf {
    PathBuf::from("ffprobe")
}

fn default_pdftoppm_path() -> PathBuf {
    PathBuf::from("pdftoppm")
}

fn default_temp_dir() -> PathBuf {
    std::env::temp_dir().join("mediarelay")
}

fn default_max_parallel() -> usize {
    4
}

fn default_timeout() -> u64 {
    300
}

fn default_probe_timeout() -> u64 {
    30
}

fn default_log_level() -> String {
    "error".to_string()
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: default_ffmpeg_path(),
            ffprobe_path: default_ffprobe_path(),
            pdftoppm_path: default_pdftoppm_path(),
            temp_dir: default_temp_dir(),
            max_parallel_conversions: default_max_parallel(),
            timeout_secs: default_timeout(),
            probe_timeout_secs: default_probe_timeout(),
            ffmpeg_log_level: default_log_level(),
            extra_ffmpeg_args: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ConverterConfig::default();
        assert_eq!(config.ffmpeg_path, PathBuf::from("ffmpeg"));
        assert_eq!(config.ffprobe_path, PathBuf::from("ffprobe"));
        assert_eq!(config.pdftoppm_path, PathBuf::from("pdftoppm"));
        assert_eq!(config.max_parallel_conversions, 4);
        assert_eq!(config.timeout_secs, 300);
    }

    #[test]
    fn test_temp_dir_defaults_under_system_temp() {
        let config = ConverterConfig::default();
        assert!(config.temp_dir.starts_with(std::env::temp_dir()));
        assert!(config.temp_dir.ends_with("mediarelay"));
    }

    #[test]
    fn test_config_deserializes_partial_table() {
        let config: ConverterConfig = toml::from_str("timeout_secs = 5\n").unwrap();
        assert_eq!(config.timeout_secs, 5);
        assert_eq!(config.ffmpeg_log_level, "error");
    }
}
