//! genesisvid is a palette-quantized video codec.
//!
//! Encoding builds one global palette (up to 256 colors) from sampled frames, maps every retained
//! frame to palette indices and stores the zlib-compressed index frames in a versioned
//! `.genesisvid` container. Decoding reverses this, resolves a playback rate from the container
//! metadata, optionally smooths and interpolates frames, and streams them into a sink.
//!
//! - Read frames from a [`FrameSource`] and build a [`Container`] with [`encode_frames`]
//! - Decode a container into a [`FrameSink`] with [`decode_container`]
//! - Or work file-to-file with [`pipeline::encode`] / [`pipeline::decode`]
#![forbid(unsafe_code)]

mod foundation;

/// Encode/decode options and quality profiles.
pub mod config;
/// The versioned container format.
pub mod container;
/// Output sinks.
pub mod encode;
/// Raw and indexed frame buffers.
pub mod frame;
/// Frame sources and downscaling.
pub mod media;
/// Palette construction and quantization.
pub mod palette;
/// File-level and stream-level encode/decode.
pub mod pipeline;
/// Playback-rate resolution.
pub mod playback;
/// Block-to-frame reconstruction.
pub mod reconstruct;
/// Temporal smoothing and interpolation.
pub mod smooth;

pub use crate::foundation::core::{Dimensions, Fps, FrameIndex};
pub use crate::foundation::error::{GenesisError, GenesisResult};
pub use crate::foundation::math::Rgb;

pub use crate::config::{DecodeOpts, EncodeOpts, QualityProfile};
pub use crate::container::{Container, ContainerExtras, ContainerMeta, FormatVersion};
pub use crate::encode::ffmpeg::{FfmpegSink, FfmpegSinkOpts};
pub use crate::encode::sink::{FrameSink, InMemorySink, SinkConfig};
pub use crate::frame::{IndexFrame, RgbFrame};
pub use crate::media::probe::{SourceInfo, probe_video};
pub use crate::media::scale::Downscale;
pub use crate::media::source::{FfmpegSource, FrameSource, MemorySource};
pub use crate::palette::{
    Palette, PaletteOpts, PalettePolicy, QuantizeOpts, build_palette, quantize_frame,
};
pub use crate::pipeline::{
    DecodeReport, DecodeRequest, DecodeStats, EncodeReport, EncodeRequest, decode,
    decode_container, encode, encode_frames,
};
pub use crate::playback::{PlaybackPlan, RateClamp, plan_playback};
pub use crate::reconstruct::{ReconstructStats, Reconstructor};
pub use crate::smooth::{SmoothOpts, TemporalSmoother, smooth_stream};
