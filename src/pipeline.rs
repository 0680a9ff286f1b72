//! Encode and decode pipelines.
//!
//! Encode: source frames are sampled every `frame_skip`, downscaled, a palette is built from every
//! `palette_every`-th retained frame, and every retained frame is quantized and compressed into a
//! container. Decode: blocks are reconstructed in order, optionally smoothed and interpolated, and
//! streamed into a sink at the resolved playback rate.

use std::path::{Path, PathBuf};

use crate::config::{DecodeOpts, EncodeOpts, QualityProfile};
use crate::container::{Container, ContainerExtras, ContainerMeta};
use crate::encode::ffmpeg::{FfmpegSink, FfmpegSinkOpts};
use crate::encode::sink::{FrameSink, SinkConfig};
use crate::foundation::core::{Fps, FrameIndex};
use crate::foundation::error::{GenesisError, GenesisResult};
use crate::frame::{IndexFrame, RgbFrame};
use crate::media::source::{FfmpegSource, FrameSource};
use crate::palette::builder::palette_mse;
use crate::palette::{build_palette, quantize_frame};
use crate::playback::{PlaybackPlan, RateClamp, plan_playback};
use crate::reconstruct::{ReconstructStats, Reconstructor};
use crate::smooth::smooth_stream;

/// File-level encode request.
#[derive(Clone, Debug)]
pub struct EncodeRequest {
    pub source_path: PathBuf,
    pub dest_path: PathBuf,
    pub opts: EncodeOpts,
}

impl EncodeRequest {
    /// Build a request from a quality profile. `sampling_interval` and `palette_size` override the
    /// profile's values when given.
    pub fn new(
        source_path: impl Into<PathBuf>,
        dest_path: impl Into<PathBuf>,
        sampling_interval: Option<u32>,
        frame_cap: Option<u64>,
        palette_size: Option<usize>,
        profile: &QualityProfile,
    ) -> Self {
        let mut opts =
            EncodeOpts::from_profile(profile).with_overrides(sampling_interval, palette_size);
        opts.frame_cap = frame_cap;
        Self {
            source_path: source_path.into(),
            dest_path: dest_path.into(),
            opts,
        }
    }
}

/// Outcome of a successful encode.
#[derive(Clone, Debug, PartialEq)]
pub struct EncodeReport {
    /// Frames stored in the container.
    pub frame_count: u64,
    /// Playback rate a default decode will use.
    pub resolved_fps: f64,
    /// Bytes written to the destination.
    pub output_byte_size: u64,
    pub width: u32,
    pub height: u32,
    /// Frames read from the source before sampling.
    pub total_original_frames: u64,
}

/// File-level decode request.
#[derive(Clone, Debug)]
pub struct DecodeRequest {
    pub source_path: PathBuf,
    pub dest_path: PathBuf,
    pub opts: DecodeOpts,
    /// Replace an existing output video.
    pub overwrite: bool,
}

impl DecodeRequest {
    pub fn new(source_path: impl Into<PathBuf>, dest_path: impl Into<PathBuf>) -> Self {
        Self {
            source_path: source_path.into(),
            dest_path: dest_path.into(),
            opts: DecodeOpts::default(),
            overwrite: true,
        }
    }
}

/// Outcome of a successful decode.
#[derive(Clone, Debug, PartialEq)]
pub struct DecodeReport {
    /// Playback rate of the reconstructed frames, after clamping.
    pub resolved_fps: f64,
    /// Rate of the written video (doubled when interpolating).
    pub output_fps: f64,
    /// Size of the written video file.
    pub output_byte_size: u64,
    pub stats: DecodeStats,
}

/// Counters from [`decode_container`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DecodeStats {
    pub plan: PlaybackPlan,
    pub reconstruct: ReconstructStats,
    /// Frames pushed into the sink.
    pub frames_written: u64,
}

/// Read `source` to the end (or its cap) and build a container.
///
/// Encoding is whole-batch: every retained frame is held until the palette is final.
pub fn encode_frames(source: &mut dyn FrameSource, opts: &EncodeOpts) -> GenesisResult<Container> {
    opts.validate()?;
    let info = source.info().clone();
    let target = opts.downscale.target_dims(info.dims);
    let cap = opts.frame_cap.filter(|&c| c > 0);
    let stride = u64::from(opts.frame_skip);

    let mut read = 0u64;
    let mut retained: Vec<RgbFrame> = Vec::new();
    while cap.is_none_or(|c| read < c) {
        let Some(frame) = source.next_frame()? else {
            break;
        };
        let keep = read.is_multiple_of(stride);
        read += 1;
        if keep {
            retained.push(opts.downscale.apply(frame, target)?);
        }
    }
    if retained.is_empty() {
        return Err(GenesisError::encode(format!(
            "no frames extracted from source ({read} read, frame_skip {})",
            opts.frame_skip
        )));
    }
    tracing::debug!(read, retained = retained.len(), dims = %target, "frames collected");

    let sampled: Vec<RgbFrame>;
    let samples: &[RgbFrame] = if opts.palette_every == 1 {
        &retained
    } else {
        sampled = retained
            .iter()
            .step_by(opts.palette_every as usize)
            .cloned()
            .collect();
        &sampled
    };
    let palette = build_palette(samples, &opts.palette)?;
    if tracing::enabled!(tracing::Level::DEBUG) {
        tracing::debug!(
            policy = ?opts.palette.policy,
            mse = palette_mse(samples, &palette),
            "palette built"
        );
    }

    let indexed = retained
        .iter()
        .map(|f| quantize_frame(f, &palette, opts.quantize))
        .collect::<GenesisResult<Vec<IndexFrame>>>()?;
    drop(retained);

    let meta = ContainerMeta {
        version: opts.format_version,
        dims: target,
        fps: info.fps,
        frame_interval: opts.frame_skip,
        extras: ContainerExtras {
            total_original_frames: Some(read),
            target_fps: opts.target_fps,
            duration_secs: opts.duration_secs,
            palette_policy: Some(opts.palette.policy),
            dithering: Some(opts.quantize.dither),
        },
    };
    Container::build(meta, palette, &indexed)
}

/// Reconstruct `container` into `sink` at the resolved playback rate.
///
/// Corrupt blocks are recovered and counted, never fatal. If the sink fails midway it is not
/// finalized; sinks release their resources on drop.
pub fn decode_container(
    container: &Container,
    sink: &mut dyn FrameSink,
    opts: &DecodeOpts,
) -> GenesisResult<DecodeStats> {
    opts.validate()?;
    let plan = plan_playback(container, &opts.clamp, opts.smooth.interpolation_threshold())?;
    sink.begin(SinkConfig {
        width: container.width(),
        height: container.height(),
        fps: Fps::from_f64(plan.output_fps)?,
    })?;

    let mut frames = Reconstructor::new(container);
    let mut next = 0u64;
    let mut push = |f: RgbFrame| -> GenesisResult<()> {
        sink.push_frame(FrameIndex(next), &f)?;
        next += 1;
        Ok(())
    };
    if opts.smooth.enabled {
        smooth_stream(frames.by_ref(), &opts.smooth, plan.interpolate, &mut push)?;
    } else {
        for f in frames.by_ref() {
            push(f)?;
        }
    }
    sink.end()?;

    let reconstruct = frames.stats();
    if reconstruct.recovered > 0 {
        tracing::warn!(
            recovered = reconstruct.recovered,
            frames = reconstruct.frames,
            "corrupt blocks were substituted"
        );
    }
    Ok(DecodeStats {
        plan,
        reconstruct,
        frames_written: next,
    })
}

/// Encode a video file into a container file.
#[tracing::instrument(skip_all, fields(source = %req.source_path.display(), dest = %req.dest_path.display()))]
pub fn encode(req: &EncodeRequest) -> GenesisResult<EncodeReport> {
    req.opts.validate()?;
    let mut source = FfmpegSource::open(&req.source_path, req.opts.frame_cap)?;
    let container = encode_frames(&mut source, &req.opts)?;
    drop(source);

    let output_byte_size = container.save(&req.dest_path)?;
    let resolved_fps = plan_playback(&container, &RateClamp::default(), None)?.resolved_fps;
    let report = EncodeReport {
        frame_count: container.frame_count() as u64,
        resolved_fps,
        output_byte_size,
        width: container.width(),
        height: container.height(),
        total_original_frames: container.extras().total_original_frames.unwrap_or(0),
    };
    tracing::info!(
        frames = report.frame_count,
        fps = report.resolved_fps,
        bytes = report.output_byte_size,
        version = %container.version(),
        "encoded"
    );
    Ok(report)
}

/// Decode a container file into a video file through the system `ffmpeg`.
#[tracing::instrument(skip_all, fields(source = %req.source_path.display(), dest = %req.dest_path.display()))]
pub fn decode(req: &DecodeRequest) -> GenesisResult<DecodeReport> {
    let container = Container::load(&req.source_path)?;
    let mut sink = FfmpegSink::new(FfmpegSinkOpts {
        out_path: req.dest_path.clone(),
        overwrite: req.overwrite,
    });
    let stats = decode_container(&container, &mut sink, &req.opts)?;
    let output_byte_size = file_size(&req.dest_path)?;
    tracing::info!(
        frames = stats.frames_written,
        fps = stats.plan.output_fps,
        recovered = stats.reconstruct.recovered,
        bytes = output_byte_size,
        "decoded"
    );
    Ok(DecodeReport {
        resolved_fps: stats.plan.resolved_fps,
        output_fps: stats.plan.output_fps,
        output_byte_size,
        stats,
    })
}

fn file_size(path: &Path) -> GenesisResult<u64> {
    std::fs::metadata(path)
        .map(|m| m.len())
        .map_err(|e| GenesisError::sink(format!("output '{}' missing after encode: {e}", path.display())))
}
