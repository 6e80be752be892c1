//! Media engines used by the dispatcher.
//!
//! This module provides the `Prober` and `Transcoder` traits and an
//! implementation of both on top of the ffprobe/ffmpeg binaries. Plans are
//! built by [`crate::media::PlanBuilder`]; the engine only turns them into
//! command lines and captures the encoded output from stdout.
//!
//! # Example
//!
//! ```ignore
//! use mediarelay_core::converter::{FfmpegEngine, Prober, Transcoder};
//!
//! let engine = FfmpegEngine::with_defaults();
//! engine.validate().await?;
//!
//! let json = engine.probe("https://example.org/clip.mp4").await?;
//! let bytes = engine.run(&plan).await?;
//! ```

mod config;
mod error;
mod ffmpeg;
mod traits;

pub use config::ConverterConfig;
pub use error::ConverterError;
pub use ffmpeg::FfmpegEngine;
pub use traits::{Prober, Transcoder};
