//! Testing utilities and mock implementations of the dispatcher's
//! collaborators.
//!
//! # Example
//!
//! ```rust,ignore
//! use mediarelay_core::testing::{fixtures, MockProber, MockTranscoder};
//!
//! let prober = MockProber::new();
//! let transcoder = MockTranscoder::new();
//!
//! prober.set_info("https://files/a.mp4", &fixtures::video_info(640, 480, true)).await;
//! transcoder.set_output(vec![1u8; 64]).await;
//! ```

mod mock_decoder;
mod mock_fetcher;
mod mock_link_resolver;
mod mock_prober;
mod mock_transcoder;

pub use mock_decoder::MockDecoder;
pub use mock_fetcher::MockFetcher;
pub use mock_link_resolver::MockLinkResolver;
pub use mock_prober::MockProber;
pub use mock_transcoder::MockTranscoder;

/// Test fixtures and helper functions.
pub mod fixtures {
    use serde_json::json;

    use crate::config::{load_config_from_str, Config};
    use crate::media::{StreamInfo, StreamRecord};

    /// Renders stream information the way ffprobe prints it.
    pub fn probe_json(info: &StreamInfo) -> String {
        let streams: Vec<_> = info
            .streams
            .iter()
            .enumerate()
            .map(|(index, s)| {
                json!({
                    "index": index,
                    "codec_name": s.codec_name,
                    "codec_type": s.codec_type,
                    "width": s.width,
                    "height": s.height,
                })
            })
            .collect();

        json!({
            "streams": streams,
            "format": {
                "format_name": info.format_name,
                "size": info.container_size.map(|s| s.to_string()),
            }
        })
        .to_string()
    }

    /// An h264 video, optionally with an aac track.
    pub fn video_info(width: u32, height: u32, with_audio: bool) -> StreamInfo {
        let mut streams = vec![StreamRecord::new("h264", "video").with_dimensions(width, height)];
        if with_audio {
            streams.push(StreamRecord::new("aac", "audio"));
        }
        StreamInfo {
            streams,
            container_size: None,
            format_name: Some("mov".to_string()),
        }
    }

    /// A single-stream audio file.
    pub fn audio_info(codec: &str) -> StreamInfo {
        StreamInfo {
            streams: vec![StreamRecord::new(codec, "audio")],
            container_size: None,
            format_name: Some("ogg".to_string()),
        }
    }

    /// Default configuration with authentication disabled.
    pub fn test_config() -> Config {
        load_config_from_str("[auth]\nmethod = \"none\"\n")
            .expect("minimal test config is valid")
    }
}
