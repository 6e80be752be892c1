//! yt-dlp based link resolver.

use async_trait::async_trait;
use serde::Deserialize;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Instant;
use tokio::process::Command;
use tokio::time::{timeout, Duration};
use tracing::debug;

use super::{LinkError, LinkResolver, ResolvedLink};
use crate::config::LinkConfig;
use crate::metrics::{EXTERNAL_SERVICE_DURATION, EXTERNAL_SERVICE_REQUESTS};

#[derive(Debug, Deserialize)]
struct InfoJson {
    title: Option<String>,
    url: Option<String>,
    filesize: Option<u64>,
    #[serde(default)]
    requested_formats: Vec<FormatJson>,
    #[serde(default)]
    entries: Vec<InfoJson>,
}

#[derive(Debug, Deserialize)]
struct FormatJson {
    url: Option<String>,
    vcodec: Option<String>,
    acodec: Option<String>,
    filesize: Option<u64>,
}

fn has_codec(codec: &Option<String>) -> bool {
    codec.as_deref().is_some_and(|c| c != "none")
}

/// Parses `yt-dlp --dump-single-json` output.
///
/// Playlists resolve to their first entry. Adaptive formats are split into
/// the first video-bearing and the first audio-bearing format.
pub fn parse_resolver_output(output: &str) -> Result<ResolvedLink, LinkError> {
    let mut info: InfoJson =
        serde_json::from_str(output).map_err(|e| LinkError::ParseError(e.to_string()))?;

    if !info.entries.is_empty() {
        info = info.entries.swap_remove(0);
    }

    if !info.requested_formats.is_empty() {
        let video = info.requested_formats.iter().find(|f| has_codec(&f.vcodec));
        let audio = info.requested_formats.iter().find(|f| has_codec(&f.acodec));

        return Ok(ResolvedLink {
            title: info.title,
            video_url: video.and_then(|f| f.url.clone()),
            audio_url: audio.and_then(|f| f.url.clone()),
            filesize: video.and_then(|f| f.filesize),
        });
    }

    Ok(ResolvedLink {
        title: info.title,
        video_url: info.url,
        audio_url: None,
        filesize: info.filesize,
    })
}

/// Resolves links by running the `yt-dlp` binary.
pub struct YtDlpResolver {
    path: PathBuf,
    timeout_secs: u64,
}

impl YtDlpResolver {
    pub fn new(config: &LinkConfig) -> Self {
        Self {
            path: config.yt_dlp_path.clone(),
            timeout_secs: config.timeout_secs,
        }
    }
}

#[async_trait]
impl LinkResolver for YtDlpResolver {
    fn name(&self) -> &str {
        "yt-dlp"
    }

    async fn resolve(&self, url: &str) -> Result<ResolvedLink, LinkError> {
        let start = Instant::now();
        let command = Command::new(&self.path)
            .args(["--dump-single-json", "--no-warnings", "--no-playlist"])
            .arg("--")
            .arg(url)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output();

        let result = match timeout(Duration::from_secs(self.timeout_secs), command).await {
            Err(_) => Err(LinkError::Timeout {
                timeout_secs: self.timeout_secs,
            }),
            Ok(Err(e)) => Err(LinkError::NotAvailable(e.to_string())),
            Ok(Ok(output)) if !output.status.success() => Err(LinkError::Failed(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            )),
            Ok(Ok(output)) => parse_resolver_output(&String::from_utf8_lossy(&output.stdout)),
        };

        EXTERNAL_SERVICE_DURATION
            .with_label_values(&[self.name(), "resolve"])
            .observe(start.elapsed().as_secs_f64());
        EXTERNAL_SERVICE_REQUESTS
            .with_label_values(&[
                self.name(),
                "resolve",
                if result.is_ok() { "success" } else { "error" },
            ])
            .inc();

        debug!(url = %url, ok = result.is_ok(), "Resolved link");
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_adaptive_formats() {
        let json = r#"{
            "title": "Launch day",
            "url": null,
            "requested_formats": [
                {"url": "https://cdn/v.mp4", "vcodec": "avc1.640028", "acodec": "none", "filesize": 12000000},
                {"url": "https://cdn/a.m4a", "vcodec": "none", "acodec": "mp4a.40.2", "filesize": 900000}
            ]
        }"#;

        let link = parse_resolver_output(json).unwrap();
        assert_eq!(link.title.as_deref(), Some("Launch day"));
        assert_eq!(link.video_url.as_deref(), Some("https://cdn/v.mp4"));
        assert_eq!(link.audio_url.as_deref(), Some("https://cdn/a.m4a"));
        assert_eq!(link.filesize, Some(12_000_000));
    }

    #[test]
    fn test_parse_single_url() {
        let json = r#"{"title": "Clip", "url": "https://cdn/clip.mp4", "extractor": "generic"}"#;
        let link = parse_resolver_output(json).unwrap();
        assert_eq!(link.video_url.as_deref(), Some("https://cdn/clip.mp4"));
        assert!(link.audio_url.is_none());
        assert!(link.filesize.is_none());
    }

    #[test]
    fn test_parse_playlist_takes_first_entry() {
        let json = r#"{
            "title": "Channel",
            "entries": [
                {"title": "First", "url": "https://cdn/1.mp4"},
                {"title": "Second", "url": "https://cdn/2.mp4"}
            ]
        }"#;
        let link = parse_resolver_output(json).unwrap();
        assert_eq!(link.title.as_deref(), Some("First"));
        assert_eq!(link.video_url.as_deref(), Some("https://cdn/1.mp4"));
    }

    #[test]
    fn test_parse_page_without_video() {
        let link = parse_resolver_output(r#"{"title": "Just an article"}"#).unwrap();
        assert!(link.video_url.is_none());
    }

    #[test]
    fn test_parse_garbage() {
        assert!(matches!(
            parse_resolver_output("<html>"),
            Err(LinkError::ParseError(_))
        ));
    }

    #[tokio::test]
    async fn test_missing_binary() {
        let resolver = YtDlpResolver::new(&LinkConfig {
            yt_dlp_path: PathBuf::from("/nonexistent/yt-dlp"),
            timeout_secs: 5,
        });
        let result = resolver.resolve("https://example.org/watch?v=1").await;
        assert!(matches!(result, Err(LinkError::NotAvailable(_))));
    }
}
