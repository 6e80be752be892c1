//! Stream probing adapter.
//!
//! Wraps a [`Prober`] and normalizes its JSON into [`StreamInfo`]. Every
//! failure collapses into [`ProbeResult::Unavailable`]; callers never see why.

use serde::Deserialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

use super::types::{ProbeResult, StreamInfo, StreamRecord};
use crate::converter::Prober;
use crate::metrics::EXTERNAL_SERVICE_REQUESTS;

#[derive(Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    format: Option<ProbeFormat>,
    #[serde(default)]
    streams: Vec<ProbeStream>,
}

#[derive(Deserialize)]
struct ProbeFormat {
    format_name: Option<String>,
    size: Option<String>,
}

#[derive(Deserialize)]
struct ProbeStream {
    codec_type: Option<String>,
    codec_name: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
}

/// Parses ffprobe `-show_format -show_streams` JSON.
pub fn parse_probe_output(output: &str) -> Result<StreamInfo, serde_json::Error> {
    let probe: ProbeOutput = serde_json::from_str(output)?;

    let (format_name, container_size) = match probe.format {
        Some(format) => (
            format
                .format_name
                .and_then(|name| name.split(',').next().map(str::to_string)),
            format.size.and_then(|s| s.parse::<u64>().ok()),
        ),
        None => (None, None),
    };

    Ok(StreamInfo {
        streams: probe
            .streams
            .into_iter()
            .map(|s| StreamRecord {
                codec_name: s.codec_name,
                codec_type: s.codec_type,
                width: s.width,
                height: s.height,
            })
            .collect(),
        container_size,
        format_name,
    })
}

/// Probing adapter used by the dispatcher.
#[derive(Clone)]
pub struct StreamProbe {
    prober: Arc<dyn Prober>,
}

impl StreamProbe {
    pub fn new(prober: Arc<dyn Prober>) -> Self {
        Self { prober }
    }

    /// Probes a source. Never fails: problems yield `Unavailable`.
    pub async fn probe(&self, url: &str) -> ProbeResult {
        let start = Instant::now();
        let raw = match self.prober.probe(url).await {
            Ok(raw) => raw,
            Err(e) => {
                debug!(prober = self.prober.name(), error = %e, "Probe failed");
                EXTERNAL_SERVICE_REQUESTS
                    .with_label_values(&[self.prober.name(), "probe", "error"])
                    .inc();
                return ProbeResult::Unavailable;
            }
        };

        match parse_probe_output(&raw) {
            Ok(info) => {
                debug!(
                    streams = info.streams.len(),
                    format = info.format_name.as_deref().unwrap_or("unknown"),
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "Probed source"
                );
                EXTERNAL_SERVICE_REQUESTS
                    .with_label_values(&[self.prober.name(), "probe", "success"])
                    .inc();
                ProbeResult::Available(info)
            }
            Err(e) => {
                debug!(error = %e, "Malformed probe output");
                EXTERNAL_SERVICE_REQUESTS
                    .with_label_values(&[self.prober.name(), "probe", "error"])
                    .inc();
                ProbeResult::Unavailable
            }
        }
    }

    /// Container byte size reported by the prober, if any.
    pub async fn container_size(&self, url: &str) -> Option<u64> {
        self.probe(url).await.info().and_then(|info| info.container_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converter::ConverterError;
    use crate::testing::MockProber;

    const VIDEO_JSON: &str = r#"{
        "format": {
            "filename": "test.mkv",
            "format_name": "matroska,webm",
            "duration": "7200.0",
            "size": "5000000"
        },
        "streams": [
            {
                "codec_type": "video",
                "codec_name": "h264",
                "width": 1920,
                "height": 1080,
                "r_frame_rate": "24000/1001"
            },
            {
                "codec_type": "audio",
                "codec_name": "aac",
                "channels": 6
            },
            {
                "codec_type": "data"
            }
        ]
    }"#;

    #[test]
    fn test_parse_probe_output_video() {
        let info = parse_probe_output(VIDEO_JSON).unwrap();
        assert_eq!(info.format_name.as_deref(), Some("matroska"));
        assert_eq!(info.container_size, Some(5_000_000));
        assert_eq!(info.streams.len(), 3);
        assert_eq!(info.streams[0].codec_name.as_deref(), Some("h264"));
        assert_eq!(info.video_dimensions(), Some((1920, 1080)));
        assert!(info.has_audio());
        assert_eq!(info.streams[2].codec_name, None);
    }

    #[test]
    fn test_parse_probe_output_without_format() {
        let info = parse_probe_output(r#"{"streams": []}"#).unwrap();
        assert!(info.streams.is_empty());
        assert!(info.container_size.is_none());
    }

    #[test]
    fn test_parse_probe_output_malformed() {
        assert!(parse_probe_output("not json").is_err());
    }

    #[tokio::test]
    async fn test_probe_collapses_errors() {
        let prober = Arc::new(MockProber::new());
        prober
            .set_error("https://files/broken", ConverterError::probe_failed("boom"))
            .await;
        let probe = StreamProbe::new(prober);

        assert_eq!(probe.probe("https://files/broken").await, ProbeResult::Unavailable);
    }

    #[tokio::test]
    async fn test_probe_collapses_malformed_json() {
        let prober = Arc::new(MockProber::new());
        prober.set_raw("https://files/odd", "{{{").await;
        let probe = StreamProbe::new(prober);

        assert_eq!(probe.probe("https://files/odd").await, ProbeResult::Unavailable);
    }

    #[tokio::test]
    async fn test_probe_and_container_size() {
        let prober = Arc::new(MockProber::new());
        prober.set_raw("https://files/movie.mkv", VIDEO_JSON).await;
        let probe = StreamProbe::new(prober.clone());

        let result = probe.probe("https://files/movie.mkv").await;
        assert_eq!(result.streams().len(), 3);
        assert_eq!(probe.container_size("https://files/movie.mkv").await, Some(5_000_000));
        assert_eq!(prober.probe_count().await, 2);
    }
}
