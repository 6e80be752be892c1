use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::PathBuf;

use crate::converter::ConverterConfig;
use crate::media::OutputType;

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub auth: AuthConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub limits: LimitsConfig,
    #[serde(default)]
    pub media: MediaConfig,
    #[serde(default)]
    pub converter: ConverterConfig,
    #[serde(default)]
    pub link: LinkConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::from([0, 0, 0, 0])
}

fn default_port() -> u16 {
    8080
}

/// Authentication configuration for the HTTP surface
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthConfig {
    pub method: AuthMethod,
    /// Key presented by the chat transport adapter (required when method = "api_key")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Separate key for the admin endpoints. When unset, `api_key` is also
    /// the admin key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_api_key: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AuthMethod {
    None,
    ApiKey,
}

/// Database configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("mediarelay.db")
}

/// Upstream size ceilings, in bytes.
///
/// Defaults follow the Telegram Bot API: 20 MB download, 50 MB upload and
/// 10 MB for photos.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LimitsConfig {
    /// Largest source file the transport lets us download.
    #[serde(default = "default_download_limit")]
    pub download: u64,
    #[serde(default)]
    pub upload: UploadLimits,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            download: default_download_limit(),
            upload: UploadLimits::default(),
        }
    }
}

fn default_download_limit() -> u64 {
    20_000_000
}

/// Per-output-type upload ceilings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UploadLimits {
    #[serde(default = "default_upload_limit")]
    pub audio: u64,
    #[serde(default = "default_upload_limit")]
    pub video: u64,
    #[serde(default = "default_upload_limit")]
    pub video_note: u64,
    #[serde(default = "default_upload_limit")]
    pub file: u64,
    #[serde(default = "default_photo_limit")]
    pub photo: u64,
    #[serde(default = "default_upload_limit")]
    pub sticker: u64,
}

impl Default for UploadLimits {
    fn default() -> Self {
        Self {
            audio: default_upload_limit(),
            video: default_upload_limit(),
            video_note: default_upload_limit(),
            file: default_upload_limit(),
            photo: default_photo_limit(),
            sticker: default_upload_limit(),
        }
    }
}

impl UploadLimits {
    /// Ceiling that applies to an artifact of the given output type.
    ///
    /// `None` never reaches an upload, it maps to the generic file ceiling.
    pub fn for_output(&self, output: OutputType) -> u64 {
        match output {
            OutputType::Audio(_) => self.audio,
            OutputType::Video => self.video,
            OutputType::VideoNote => self.video_note,
            OutputType::Photo => self.photo,
            OutputType::Sticker => self.sticker,
            OutputType::File | OutputType::None => self.file,
        }
    }
}

fn default_upload_limit() -> u64 {
    50_000_000
}

fn default_photo_limit() -> u64 {
    10_000_000
}

/// Codec sets and product constraints used by the classifier and plan builder.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MediaConfig {
    /// Codec names that make a stream eligible for video output.
    #[serde(default = "default_video_codecs")]
    pub video_codecs: Vec<String>,
    /// Audio codec names that are re-encoded to Opus.
    #[serde(default = "default_audio_reencode_codecs")]
    pub audio_reencode_codecs: Vec<String>,
    /// Audio codec names already in the voice format, sent verbatim.
    #[serde(default = "default_audio_passthrough_codecs")]
    pub audio_passthrough_codecs: Vec<String>,
    #[serde(default)]
    pub video_note: VideoNoteConfig,
    /// Longest caption the transport accepts, in characters.
    #[serde(default = "default_caption_max_chars")]
    pub caption_max_chars: usize,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            video_codecs: default_video_codecs(),
            audio_reencode_codecs: default_audio_reencode_codecs(),
            audio_passthrough_codecs: default_audio_passthrough_codecs(),
            video_note: VideoNoteConfig::default(),
            caption_max_chars: default_caption_max_chars(),
        }
    }
}

fn default_video_codecs() -> Vec<String> {
    ["h264", "hevc", "mpeg4", "vp6", "vp8"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_audio_reencode_codecs() -> Vec<String> {
    vec!["aac".to_string(), "mp3".to_string()]
}

fn default_audio_passthrough_codecs() -> Vec<String> {
    vec!["opus".to_string()]
}

fn default_caption_max_chars() -> usize {
    1024
}

/// Round video ("video note") constraints.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VideoNoteConfig {
    /// Input duration cap in seconds.
    #[serde(default = "default_video_note_duration")]
    pub max_duration_secs: u64,
    /// Output side length cap in pixels.
    #[serde(default = "default_video_note_side")]
    pub max_side: u32,
}

impl Default for VideoNoteConfig {
    fn default() -> Self {
        Self {
            max_duration_secs: default_video_note_duration(),
            max_side: default_video_note_side(),
        }
    }
}

fn default_video_note_duration() -> u64 {
    60
}

fn default_video_note_side() -> u32 {
    638
}

/// Link resolution (yt-dlp) configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LinkConfig {
    #[serde(default = "default_yt_dlp_path")]
    pub yt_dlp_path: PathBuf,
    #[serde(default = "default_link_timeout")]
    pub timeout_secs: u64,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            yt_dlp_path: default_yt_dlp_path(),
            timeout_secs: default_link_timeout(),
        }
    }
}

fn default_yt_dlp_path() -> PathBuf {
    PathBuf::from("yt-dlp")
}

fn default_link_timeout() -> u64 {
    120
}

/// Usage analytics configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TelemetryConfig {
    /// Google Analytics tracking id. Analytics are disabled when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub google_token: Option<String>,
    /// User agent sent with analytics beacons, usually the bot name.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            google_token: None,
            user_agent: default_user_agent(),
        }
    }
}

fn default_user_agent() -> String {
    "mediarelay".to_string()
}

/// Sanitized config for API responses (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub auth: SanitizedAuthConfig,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub limits: LimitsConfig,
    pub media: MediaConfig,
    pub converter: ConverterConfig,
    pub link: LinkConfig,
    pub telemetry: SanitizedTelemetryConfig,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedAuthConfig {
    pub method: String,
    pub api_key_configured: bool,
    pub admin_api_key_configured: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedTelemetryConfig {
    pub enabled: bool,
    pub user_agent: String,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            auth: SanitizedAuthConfig {
                method: match config.auth.method {
                    AuthMethod::None => "none".to_string(),
                    AuthMethod::ApiKey => "api_key".to_string(),
                },
                api_key_configured: config
                    .auth
                    .api_key
                    .as_ref()
                    .is_some_and(|k| !k.is_empty()),
                admin_api_key_configured: config
                    .auth
                    .admin_api_key
                    .as_ref()
                    .is_some_and(|k| !k.is_empty()),
            },
            server: config.server.clone(),
            database: config.database.clone(),
            limits: config.limits.clone(),
            media: config.media.clone(),
            converter: config.converter.clone(),
            link: config.link.clone(),
            telemetry: SanitizedTelemetryConfig {
                enabled: config.telemetry.google_token.is_some(),
                user_agent: config.telemetry.user_agent.clone(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::AudioMode;

    fn minimal() -> Config {
        toml::from_str(
            r#"
[auth]
method = "none"
"#,
        )
        .unwrap()
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let config = minimal();
        assert_eq!(config.auth.method, AuthMethod::None);
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host.to_string(), "0.0.0.0");
        assert_eq!(config.database.path.to_str().unwrap(), "mediarelay.db");
        assert_eq!(config.limits.download, 20_000_000);
        assert_eq!(config.media.video_note.max_duration_secs, 60);
        assert_eq!(config.media.video_note.max_side, 638);
        assert_eq!(config.media.caption_max_chars, 1024);
        assert!(config.media.video_codecs.contains(&"h264".to_string()));
        assert_eq!(config.media.audio_passthrough_codecs, vec!["opus"]);
    }

    #[test]
    fn test_deserialize_missing_auth_fails() {
        let result: Result<Config, _> = toml::from_str("[server]\nport = 8080\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_upload_limit_per_output_type() {
        let limits = UploadLimits {
            photo: 12,
            sticker: 7,
            ..Default::default()
        };
        assert_eq!(limits.for_output(OutputType::Photo), 12);
        assert_eq!(limits.for_output(OutputType::Sticker), 7);
        assert_eq!(
            limits.for_output(OutputType::Audio(AudioMode::Passthrough)),
            50_000_000
        );
        assert_eq!(limits.for_output(OutputType::VideoNote), 50_000_000);
    }

    #[test]
    fn test_deserialize_custom_media() {
        let config: Config = toml::from_str(
            r#"
[auth]
method = "api_key"
api_key = "secret"

[media]
video_codecs = ["av1"]

[media.video_note]
max_duration_secs = 30
"#,
        )
        .unwrap();
        assert_eq!(config.auth.method, AuthMethod::ApiKey);
        assert_eq!(config.media.video_codecs, vec!["av1"]);
        assert_eq!(config.media.video_note.max_duration_secs, 30);
        assert_eq!(config.media.video_note.max_side, 638);
    }

    #[test]
    fn test_sanitized_config_hides_secrets() {
        let mut config = minimal();
        config.auth = AuthConfig {
            method: AuthMethod::ApiKey,
            api_key: Some("secret".to_string()),
            admin_api_key: Some("admin-secret".to_string()),
        };
        config.telemetry.google_token = Some("UA-1".to_string());

        let sanitized = SanitizedConfig::from(&config);
        assert_eq!(sanitized.auth.method, "api_key");
        assert!(sanitized.auth.api_key_configured);
        assert!(sanitized.auth.admin_api_key_configured);
        assert!(sanitized.telemetry.enabled);

        let json = serde_json::to_string(&sanitized).unwrap();
        assert!(!json.contains("secret"));
        assert!(!json.contains("UA-1"));
    }
}
