//! Encode and decode options, and the named quality profiles that seed them.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use crate::container::FormatVersion;
use crate::foundation::error::{GenesisError, GenesisResult};
use crate::media::scale::Downscale;
use crate::palette::{PaletteOpts, QuantizeOpts};
use crate::playback::RateClamp;
use crate::smooth::SmoothOpts;

/// The three knobs a quality profile controls.
///
/// Loadable from JSON; unknown keys are rejected so a typo never silently falls back to a default.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct QualityProfile {
    /// Divide frame dimensions by this factor before quantization (>= 1).
    #[serde(default = "default_downscale_factor")]
    pub spatial_downscale_factor: f64,
    /// Keep every n-th source frame.
    #[serde(default = "default_frame_skip")]
    pub frame_skip: u32,
    /// Palette entries.
    #[serde(default = "default_palette_size")]
    pub palette_size: usize,
}

fn default_downscale_factor() -> f64 {
    1.0
}

fn default_frame_skip() -> u32 {
    1
}

fn default_palette_size() -> usize {
    256
}

impl Default for QualityProfile {
    fn default() -> Self {
        Self::high()
    }
}

impl QualityProfile {
    pub fn low() -> Self {
        Self {
            spatial_downscale_factor: 2.0,
            frame_skip: 3,
            palette_size: 64,
        }
    }

    pub fn medium() -> Self {
        Self {
            spatial_downscale_factor: 1.0,
            frame_skip: 2,
            palette_size: 128,
        }
    }

    /// Full resolution, every frame, 256 colors.
    pub fn high() -> Self {
        Self {
            spatial_downscale_factor: 1.0,
            frame_skip: 1,
            palette_size: 256,
        }
    }

    /// Built-in preset by name.
    pub fn preset(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "low" => Some(Self::low()),
            "medium" => Some(Self::medium()),
            "high" => Some(Self::high()),
            _ => None,
        }
    }

    pub fn from_reader(mut r: impl Read) -> GenesisResult<Self> {
        let mut s = String::new();
        r.read_to_string(&mut s)
            .map_err(|e| GenesisError::validation(format!("read quality profile: {e}")))?;
        let profile: Self = serde_json::from_str(&s)
            .map_err(|e| GenesisError::validation(format!("quality profile JSON: {e}")))?;
        profile.validate()?;
        Ok(profile)
    }

    pub fn from_path(path: impl AsRef<Path>) -> GenesisResult<Self> {
        let path = path.as_ref();
        let f = File::open(path).map_err(|e| {
            GenesisError::validation(format!("open quality profile '{}': {e}", path.display()))
        })?;
        Self::from_reader(BufReader::new(f))
    }

    pub fn validate(&self) -> GenesisResult<()> {
        if !self.spatial_downscale_factor.is_finite() || self.spatial_downscale_factor < 1.0 {
            return Err(GenesisError::validation(format!(
                "spatial_downscale_factor must be >= 1, got {}",
                self.spatial_downscale_factor
            )));
        }
        if self.frame_skip == 0 {
            return Err(GenesisError::validation("frame_skip must be >= 1"));
        }
        Ok(())
    }
}

impl std::str::FromStr for QualityProfile {
    type Err = GenesisError;

    /// A preset name (`low`, `medium`, `high`) or a path to a JSON profile.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match Self::preset(s) {
            Some(p) => Ok(p),
            None => Self::from_path(s),
        }
    }
}

/// Options for [`crate::pipeline::encode_frames`].
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct EncodeOpts {
    /// Retention stride: keep every n-th source frame.
    pub frame_skip: u32,
    /// Palette stride: every n-th retained frame feeds the palette builder.
    pub palette_every: u32,
    /// Stop reading the source after this many frames. `None` or `Some(0)` reads everything.
    pub frame_cap: Option<u64>,
    pub palette: PaletteOpts,
    pub quantize: QuantizeOpts,
    pub downscale: Downscale,
    /// Container version to write.
    pub format_version: FormatVersion,
    /// Explicit playback rate stored in v3 containers.
    pub target_fps: Option<f64>,
    /// Explicit playback duration stored in v3 containers.
    pub duration_secs: Option<f64>,
}

impl Default for EncodeOpts {
    fn default() -> Self {
        Self::from_profile(&QualityProfile::default())
    }
}

impl EncodeOpts {
    /// Options seeded from `profile`; everything the profile does not cover keeps its default.
    pub fn from_profile(profile: &QualityProfile) -> Self {
        Self {
            frame_skip: profile.frame_skip,
            palette_every: 1,
            frame_cap: None,
            palette: PaletteOpts {
                colors: profile.palette_size,
                ..PaletteOpts::default()
            },
            quantize: QuantizeOpts::default(),
            downscale: Downscale {
                factor: profile.spatial_downscale_factor,
                ..Downscale::default()
            },
            format_version: FormatVersion::default(),
            target_fps: None,
            duration_secs: None,
        }
    }

    /// Apply explicit caller arguments on top of a profile.
    pub fn with_overrides(mut self, sampling_interval: Option<u32>, palette_size: Option<usize>) -> Self {
        if let Some(n) = sampling_interval {
            self.frame_skip = n;
        }
        if let Some(k) = palette_size {
            self.palette.colors = k;
        }
        self
    }

    pub fn validate(&self) -> GenesisResult<()> {
        if self.frame_skip == 0 {
            return Err(GenesisError::validation("frame_skip must be >= 1"));
        }
        if self.palette_every == 0 {
            return Err(GenesisError::validation("palette_every must be >= 1"));
        }
        self.palette.validate()?;
        self.downscale.validate()?;
        if let Some(t) = self.target_fps
            && (!t.is_finite() || t <= 0.0)
        {
            return Err(GenesisError::validation(format!("target_fps must be > 0, got {t}")));
        }
        if let Some(d) = self.duration_secs
            && (!d.is_finite() || d <= 0.0)
        {
            return Err(GenesisError::validation(format!(
                "duration_secs must be > 0, got {d}"
            )));
        }
        if self.format_version != FormatVersion::V3
            && (self.target_fps.is_some() || self.duration_secs.is_some())
        {
            tracing::warn!(
                version = %self.format_version,
                "target_fps/duration_secs are only stored in v3 containers; ignoring"
            );
        }
        Ok(())
    }
}

/// Options for [`crate::pipeline::decode_container`].
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct DecodeOpts {
    pub smooth: SmoothOpts,
    pub clamp: RateClamp,
}

impl DecodeOpts {
    pub fn validate(&self) -> GenesisResult<()> {
        self.clamp.validate()?;
        if self.smooth.enabled {
            self.smooth.validate()?;
        }
        Ok(())
    }
}
