//! Media classification and conversion planning.
//!
//! - [`types`]: request and stream data model
//! - [`probe`]: normalizes prober output
//! - [`classifier`]: maps streams to output types
//! - [`fallback`]: decoders for sources no probe understood
//! - [`plan`]: turns an output type into a transcoder plan

mod classifier;
mod fallback;
mod plan;
mod probe;
mod types;

pub use classifier::{url_extension, Classification, Classifier, CodecSets, Rule, ScanPass};
pub use fallback::{
    DecodeError, Decoded, FallbackChain, FallbackDecoder, PdfPageExtractor, StickerEncoder,
    StickerPhotoDecoder,
};
pub use plan::{
    ContainerFormat, ConversionPlan, CropWindow, PlanBuilder, PlanError, PlanInput, PlanSources,
};
pub use probe::{parse_probe_output, StreamProbe};
pub use types::{
    AttachmentKind, AudioMode, CodecHint, OutputType, ProbeResult, RequestKind, SourceDescriptor,
    SourceRef, StreamInfo, StreamRecord,
};
