use std::path::PathBuf;
use std::str::FromStr as _;

use anyhow::Context as _;
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use genesisvid::{
    DecodeRequest, EncodeRequest, FormatVersion, PalettePolicy, QualityProfile, RateClamp,
};

#[derive(Parser, Debug)]
#[command(name = "genesisvid", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Encode a video into a `.genesisvid` container (requires `ffmpeg`/`ffprobe` on PATH).
    Encode(EncodeArgs),
    /// Decode a `.genesisvid` container into a video (requires `ffmpeg` on PATH).
    Decode(DecodeArgs),
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum PolicyChoice {
    Kmeans,
    Distinct,
    MedianCut,
}

impl From<PolicyChoice> for PalettePolicy {
    fn from(p: PolicyChoice) -> Self {
        match p {
            PolicyChoice::Kmeans => Self::KMeans,
            PolicyChoice::Distinct => Self::Distinct,
            PolicyChoice::MedianCut => Self::MedianCut,
        }
    }
}

#[derive(Parser, Debug)]
struct EncodeArgs {
    /// Input video.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Output container path.
    #[arg(long)]
    out: PathBuf,

    /// Keep every N-th source frame (overrides the profile).
    #[arg(long)]
    every: Option<u32>,

    /// Read at most N source frames (0 = all).
    #[arg(long)]
    limit: Option<u64>,

    /// Palette size (overrides the profile).
    #[arg(long)]
    colors: Option<usize>,

    /// Quality profile: `low`, `medium`, `high` or a path to a JSON profile.
    #[arg(long, default_value = "high")]
    profile: String,

    /// Palette construction policy.
    #[arg(long, value_enum, default_value_t = PolicyChoice::Kmeans)]
    policy: PolicyChoice,

    /// Build the palette from every N-th retained frame.
    #[arg(long, default_value_t = 1)]
    palette_every: u32,

    /// Floyd-Steinberg dithering.
    #[arg(long, default_value_t = false)]
    dither: bool,

    /// Container format version to write.
    #[arg(long, default_value_t = 3)]
    format_version: u32,

    /// Store an explicit playback rate (v3 only).
    #[arg(long)]
    target_fps: Option<f64>,
}

#[derive(Parser, Debug)]
struct DecodeArgs {
    /// Input container.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Output video path.
    #[arg(long)]
    out: PathBuf,

    /// Skip temporal smoothing (and interpolation).
    #[arg(long, default_value_t = false)]
    no_smooth: bool,

    /// Never insert interpolated frames.
    #[arg(long, default_value_t = false)]
    no_interpolate: bool,

    /// Smoothing batch size in frames.
    #[arg(long, default_value_t = 32)]
    batch: usize,

    /// Context frames shared between smoothing batches.
    #[arg(long, default_value_t = 0)]
    overlap: usize,

    /// Playback rate floor.
    #[arg(long, default_value_t = RateClamp::default().min_fps)]
    min_fps: f64,

    /// Playback rate ceiling.
    #[arg(long, default_value_t = RateClamp::default().max_fps)]
    max_fps: f64,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Encode(args) => cmd_encode(args),
        Command::Decode(args) => cmd_decode(args),
    }
}

fn cmd_encode(args: EncodeArgs) -> anyhow::Result<()> {
    let profile = QualityProfile::from_str(&args.profile)
        .with_context(|| format!("load quality profile '{}'", args.profile))?;
    let mut req = EncodeRequest::new(
        &args.in_path,
        &args.out,
        args.every,
        args.limit,
        args.colors,
        &profile,
    );
    req.opts.palette.policy = args.policy.into();
    req.opts.palette_every = args.palette_every;
    req.opts.quantize.dither = args.dither;
    req.opts.format_version = FormatVersion::from_number(args.format_version)?;
    req.opts.target_fps = args.target_fps;

    let report = genesisvid::encode(&req)?;
    eprintln!(
        "wrote {} ({} frames, {}x{}, {:.3} fps, {} bytes)",
        args.out.display(),
        report.frame_count,
        report.width,
        report.height,
        report.resolved_fps,
        report.output_byte_size
    );
    Ok(())
}

fn cmd_decode(args: DecodeArgs) -> anyhow::Result<()> {
    let mut req = DecodeRequest::new(&args.in_path, &args.out);
    req.opts.smooth.enabled = !args.no_smooth;
    req.opts.smooth.interpolate = !args.no_interpolate;
    req.opts.smooth.batch_size = args.batch;
    req.opts.smooth.overlap = args.overlap;
    req.opts.clamp = RateClamp {
        min_fps: args.min_fps,
        max_fps: args.max_fps,
    };

    let report = genesisvid::decode(&req)?;
    if report.stats.reconstruct.recovered > 0 {
        eprintln!(
            "recovered {} corrupt frame(s)",
            report.stats.reconstruct.recovered
        );
    }
    eprintln!(
        "wrote {} ({} frames, {:.3} fps, {} bytes)",
        args.out.display(),
        report.stats.frames_written,
        report.output_fps,
        report.output_byte_size
    );
    Ok(())
}
