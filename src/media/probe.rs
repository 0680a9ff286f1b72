use std::path::Path;

use crate::foundation::core::Dimensions;
use crate::foundation::error::{GenesisError, GenesisResult};

/// Rate assumed when the source reports none (or a degenerate one).
pub const FALLBACK_FPS: f64 = 10.0;

/// Basic metadata about a video source.
#[derive(Clone, Debug, PartialEq)]
pub struct SourceInfo {
    /// Frame dimensions as decoded.
    pub dims: Dimensions,
    /// Frames per second.
    pub fps: f64,
    /// Frame count reported by the container, when known. Only a hint.
    pub frame_count_hint: Option<u64>,
}

#[derive(serde::Deserialize)]
struct ProbeStream {
    codec_type: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    avg_frame_rate: Option<String>,
    r_frame_rate: Option<String>,
    nb_frames: Option<String>,
    #[serde(default)]
    tags: ProbeTags,
    #[serde(default)]
    side_data_list: Vec<ProbeSideData>,
}

#[derive(Default, serde::Deserialize)]
struct ProbeTags {
    rotate: Option<String>,
}

#[derive(serde::Deserialize)]
struct ProbeSideData {
    rotation: Option<f64>,
}

#[derive(serde::Deserialize)]
struct ProbeOut {
    #[serde(default)]
    streams: Vec<ProbeStream>,
}

impl ProbeStream {
    /// Display rotation in degrees, from the display matrix or the legacy `rotate` tag.
    fn rotation(&self) -> f64 {
        self.side_data_list
            .iter()
            .find_map(|sd| sd.rotation)
            .or_else(|| self.tags.rotate.as_deref().and_then(|r| r.trim().parse().ok()))
            .unwrap_or(0.0)
    }
}

/// Probe the first video stream of `source_path` through `ffprobe`.
///
/// The reported dimensions are those ffmpeg decodes to: a stream tagged with a quarter-turn
/// rotation is autorotated on decode, so its coded width and height are swapped.
pub fn probe_video(source_path: &Path) -> GenesisResult<SourceInfo> {
    let out = std::process::Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-select_streams",
            "v:0",
            "-print_format",
            "json",
            "-show_streams",
        ])
        .arg(source_path)
        .output()
        .map_err(|e| GenesisError::open(format!("failed to run ffprobe: {e}")))?;
    if !out.status.success() {
        return Err(GenesisError::open(format!(
            "ffprobe failed for '{}': {}",
            source_path.display(),
            String::from_utf8_lossy(&out.stderr).trim()
        )));
    }

    info_from_probe_json(&out.stdout, source_path)
}

fn info_from_probe_json(json: &[u8], source_path: &Path) -> GenesisResult<SourceInfo> {
    let parsed: ProbeOut = serde_json::from_slice(json)
        .map_err(|e| GenesisError::open(format!("ffprobe json parse failed: {e}")))?;
    let stream = parsed
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref().unwrap_or("video") == "video")
        .ok_or_else(|| {
            GenesisError::open(format!(
                "no video stream found in '{}'",
                source_path.display()
            ))
        })?;
    let width = stream
        .width
        .ok_or_else(|| GenesisError::open("missing video width from ffprobe"))?;
    let height = stream
        .height
        .ok_or_else(|| GenesisError::open("missing video height from ffprobe"))?;
    let quarter_turns = (stream.rotation() / 90.0).round() as i64;
    let (width, height) = if quarter_turns.rem_euclid(2) == 1 {
        tracing::debug!(rotation = stream.rotation(), "source is rotated; swapping dimensions");
        (height, width)
    } else {
        (width, height)
    };
    let dims = Dimensions::new(width, height).map_err(|e| GenesisError::open(e.to_string()))?;

    let fps = stream
        .avg_frame_rate
        .as_deref()
        .and_then(parse_rate)
        .or_else(|| stream.r_frame_rate.as_deref().and_then(parse_rate))
        .unwrap_or_else(|| {
            tracing::warn!("source reports no usable frame rate; assuming {FALLBACK_FPS}");
            FALLBACK_FPS
        });
    let frame_count_hint = stream.nb_frames.as_deref().and_then(|n| n.parse().ok());

    Ok(SourceInfo {
        dims,
        fps,
        frame_count_hint,
    })
}

/// Parse an ffprobe rate such as `30000/1001` or `25`. Zero, negative and non-finite rates are
/// rejected.
pub(crate) fn parse_rate(s: &str) -> Option<f64> {
    let rate = match s.split_once('/') {
        Some((n, d)) => {
            let n: f64 = n.trim().parse().ok()?;
            let d: f64 = d.trim().parse().ok()?;
            if d == 0.0 {
                return None;
            }
            n / d
        }
        None => s.trim().parse().ok()?,
    };
    (rate.is_finite() && rate > 0.0).then_some(rate)
}
