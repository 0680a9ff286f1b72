use crate::container::Container;
use crate::foundation::error::{GenesisError, GenesisResult};

/// Bounds applied to the resolved playback rate.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct RateClamp {
    /// Floor in frames per second.
    pub min_fps: f64,
    /// Ceiling in frames per second.
    pub max_fps: f64,
}

impl Default for RateClamp {
    fn default() -> Self {
        Self {
            min_fps: 5.0,
            max_fps: 60.0,
        }
    }
}

impl RateClamp {
    pub fn validate(&self) -> GenesisResult<()> {
        if !self.min_fps.is_finite() || !self.max_fps.is_finite() || self.min_fps <= 0.0 {
            return Err(GenesisError::validation(
                "fps clamp bounds must be finite and > 0",
            ));
        }
        if self.min_fps > self.max_fps {
            return Err(GenesisError::validation(format!(
                "fps clamp floor {} exceeds ceiling {}",
                self.min_fps, self.max_fps
            )));
        }
        Ok(())
    }

    pub fn apply(&self, fps: f64) -> f64 {
        fps.clamp(self.min_fps, self.max_fps)
    }
}

/// Playback decisions derived from container metadata at decode time. Never stored.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlaybackPlan {
    /// Rate of the reconstructed (pre-interpolation) frames after clamping.
    pub resolved_fps: f64,
    /// Rate before clamping.
    pub unclamped_fps: f64,
    /// Whether the clamp changed the rate.
    pub clamped: bool,
    /// Whether the smoother inserts a synthetic frame between every pair.
    pub interpolate: bool,
    /// Rate handed to the sink: `resolved_fps`, doubled when interpolating.
    pub output_fps: f64,
}

/// Unclamped playback rate.
///
/// An explicit target rate wins; otherwise an explicit duration spreads the stored frames over it;
/// otherwise the source rate is divided by the retention stride to restore real-time duration.
pub fn raw_playback_fps(
    original_fps: f64,
    frame_interval: u32,
    target_fps: Option<f64>,
    duration_secs: Option<f64>,
    frame_count: usize,
) -> f64 {
    if let Some(t) = target_fps {
        return t;
    }
    if let Some(d) = duration_secs
        && frame_count > 0
    {
        return frame_count as f64 / d;
    }
    original_fps / f64::from(frame_interval.max(1))
}

/// Resolve the playback plan for `container`.
///
/// `interpolate_below` is `Some(threshold)` when the smoother may interpolate: plans whose
/// resolved rate is below the threshold then double the output rate.
pub fn plan_playback(
    container: &Container,
    clamp: &RateClamp,
    interpolate_below: Option<f64>,
) -> GenesisResult<PlaybackPlan> {
    clamp.validate()?;
    let extras = container.extras();
    let unclamped_fps = raw_playback_fps(
        container.fps(),
        container.frame_interval(),
        extras.target_fps,
        extras.duration_secs,
        container.frame_count(),
    );
    let resolved_fps = clamp.apply(unclamped_fps);
    let clamped = resolved_fps != unclamped_fps;
    if clamped {
        tracing::info!(
            unclamped_fps,
            resolved_fps,
            "playback rate clamped to [{}, {}]",
            clamp.min_fps,
            clamp.max_fps
        );
    }

    let interpolate = interpolate_below.is_some_and(|t| resolved_fps < t);
    Ok(PlaybackPlan {
        resolved_fps,
        unclamped_fps,
        clamped,
        interpolate,
        output_fps: if interpolate {
            resolved_fps * 2.0
        } else {
            resolved_fps
        },
    })
}
