use crate::foundation::error::{GenesisError, GenesisResult};

/// 0-based frame index in output (sink) order.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct FrameIndex(pub u64);

/// Frames-per-second represented as a rational `num/den`.
///
/// Containers store fps as `f64` (that is what probing yields); sinks want a rational so the
/// value handed to `ffmpeg` is exact.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Fps {
    /// Numerator (frames).
    pub num: u32,
    /// Denominator (seconds), must be non-zero.
    pub den: u32,
}

impl Fps {
    const FROM_F64_DEN: u32 = 1000;

    /// Create a validated FPS value.
    pub fn new(num: u32, den: u32) -> GenesisResult<Self> {
        if den == 0 {
            return Err(GenesisError::validation("Fps den must be > 0"));
        }
        if num == 0 {
            return Err(GenesisError::validation("Fps num must be > 0"));
        }
        let g = gcd(num, den);
        Ok(Self {
            num: num / g,
            den: den / g,
        })
    }

    /// Approximate a floating-point rate with millihertz precision.
    pub fn from_f64(fps: f64) -> GenesisResult<Self> {
        if !fps.is_finite() || fps <= 0.0 {
            return Err(GenesisError::validation(format!(
                "fps must be finite and > 0, got {fps}"
            )));
        }
        let num = (fps * f64::from(Self::FROM_F64_DEN)).round();
        if num < 1.0 || num > f64::from(u32::MAX) {
            return Err(GenesisError::validation(format!(
                "fps {fps} is out of representable range"
            )));
        }
        Self::new(num as u32, Self::FROM_F64_DEN)
    }

    /// Convert to floating-point FPS.
    pub fn as_f64(self) -> f64 {
        f64::from(self.num) / f64::from(self.den)
    }

    /// Convert a frame count to seconds.
    pub fn frames_to_secs(self, frames: u64) -> f64 {
        (frames as f64) * f64::from(self.den) / f64::from(self.num)
    }
}

fn gcd(mut a: u32, mut b: u32) -> u32 {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a.max(1)
}

/// Frame dimensions in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Dimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Dimensions {
    pub fn new(width: u32, height: u32) -> GenesisResult<Self> {
        if width == 0 || height == 0 {
            return Err(GenesisError::validation(format!(
                "dimensions must be non-zero, got {width}x{height}"
            )));
        }
        Ok(Self { width, height })
    }

    /// Pixel count.
    pub fn area(self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Byte length of a packed RGB8 frame.
    pub fn rgb_len(self) -> usize {
        self.area() * 3
    }
}

impl std::fmt::Display for Dimensions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
