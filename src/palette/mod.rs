//! Global color palettes: construction from sampled frames and per-frame quantization.

/// Palette construction policies.
pub mod builder;
/// Nearest-color quantization with optional error diffusion.
pub mod quantize;

use crate::foundation::error::{GenesisError, GenesisResult};
use crate::foundation::math::Rgb;

/// Largest palette a container can carry (one byte per index).
pub const MAX_PALETTE_COLORS: usize = 256;
/// Smallest palette the builder will produce.
pub const MIN_PALETTE_COLORS: usize = 2;

/// Ordered, immutable list of colors addressed by one-byte indices.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Palette {
    colors: Vec<Rgb>,
}

impl Palette {
    /// Wrap a color list; it must hold between 1 and 256 entries.
    pub fn new(colors: Vec<Rgb>) -> GenesisResult<Self> {
        if colors.is_empty() || colors.len() > MAX_PALETTE_COLORS {
            return Err(GenesisError::validation(format!(
                "palette must hold 1..={MAX_PALETTE_COLORS} colors, got {}",
                colors.len()
            )));
        }
        Ok(Self { colors })
    }

    /// `k` black entries.
    pub(crate) fn zeros(k: usize) -> Self {
        Self {
            colors: vec![[0, 0, 0]; k.clamp(1, MAX_PALETTE_COLORS)],
        }
    }

    /// Build from up to `k` colors, zero-padding the tail to exactly `k` entries.
    pub(crate) fn padded(mut colors: Vec<Rgb>, k: usize) -> Self {
        colors.truncate(k);
        colors.resize(k, [0, 0, 0]);
        Self { colors }
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    pub fn colors(&self) -> &[Rgb] {
        &self.colors
    }

    /// Color for `idx`, clamping out-of-range indices to the last entry.
    #[inline]
    pub fn color_clamped(&self, idx: u8) -> Rgb {
        let i = usize::from(idx).min(self.colors.len() - 1);
        self.colors[i]
    }
}

/// How the palette builder turns sampled pixels into a palette.
///
/// The policy is written into v3 containers for provenance only; decoding never consults it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PalettePolicy {
    /// Seeded iterative k-means clustering.
    #[default]
    KMeans,
    /// Distinct colors, evenly subsampled when there are more than requested.
    Distinct,
    /// Median cut over thumbnails of the sampled frames.
    MedianCut,
}

impl std::str::FromStr for PalettePolicy {
    type Err = GenesisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "kmeans" | "k-means" => Ok(Self::KMeans),
            "distinct" => Ok(Self::Distinct),
            "median-cut" | "mediancut" => Ok(Self::MedianCut),
            other => Err(GenesisError::validation(format!(
                "unknown palette policy '{other}' (expected kmeans, distinct or median-cut)"
            ))),
        }
    }
}

pub use builder::{PaletteOpts, build_palette};
pub use quantize::{QuantizeOpts, quantize_frame};
