use crate::foundation::core::Dimensions;
use crate::foundation::error::{GenesisError, GenesisResult};
use crate::frame::RgbFrame;

/// Spatial reduction applied to every frame before palette building and quantization.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct Downscale {
    /// Shrink (aspect-preserving) so the longer side is at most this many pixels.
    pub max_side: Option<u32>,
    /// Then divide both dimensions by this factor (>= 1).
    pub factor: f64,
}

impl Default for Downscale {
    fn default() -> Self {
        Self {
            max_side: Some(720),
            factor: 1.0,
        }
    }
}

impl Downscale {
    pub fn validate(&self) -> GenesisResult<()> {
        if !self.factor.is_finite() || self.factor < 1.0 {
            return Err(GenesisError::validation(format!(
                "spatial_downscale_factor must be >= 1, got {}",
                self.factor
            )));
        }
        if self.max_side == Some(0) {
            return Err(GenesisError::validation("max_side must be > 0"));
        }
        Ok(())
    }

    /// Dimensions frames of size `src` are reduced to.
    pub fn target_dims(&self, src: Dimensions) -> Dimensions {
        let (mut w, mut h) = (f64::from(src.width), f64::from(src.height));
        if let Some(max_side) = self.max_side {
            let longest = w.max(h);
            if longest > f64::from(max_side) {
                let s = f64::from(max_side) / longest;
                w = (w * s).floor();
                h = (h * s).floor();
            }
        }
        w = (w / self.factor).round();
        h = (h / self.factor).round();
        Dimensions {
            width: (w as u32).max(1),
            height: (h as u32).max(1),
        }
    }

    /// Resize `frame` to `target`; frames already at that size are returned as is.
    pub fn apply(&self, frame: RgbFrame, target: Dimensions) -> GenesisResult<RgbFrame> {
        if frame.dims() == target {
            return Ok(frame);
        }
        let img = frame.into_image()?;
        Ok(RgbFrame::from_image(image::imageops::resize(
            &img,
            target.width,
            target.height,
            image::imageops::FilterType::Triangle,
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dims(w: u32, h: u32) -> Dimensions {
        Dimensions::new(w, h).unwrap()
    }

    #[test]
    fn large_sources_shrink_to_max_side() {
        let d = Downscale::default().target_dims(dims(1920, 1080));
        assert_eq!(d, dims(720, 405));
    }

    #[test]
    fn small_sources_are_untouched_by_default() {
        assert_eq!(Downscale::default().target_dims(dims(64, 48)), dims(64, 48));
    }

    #[test]
    fn factor_divides_after_max_side() {
        let ds = Downscale {
            max_side: None,
            factor: 2.0,
        };
        assert_eq!(ds.target_dims(dims(65, 48)), dims(33, 24));
        assert_eq!(ds.target_dims(dims(1, 1)), dims(1, 1));
    }

    #[test]
    fn apply_resizes_and_keeps_flat_color() {
        let ds = Downscale {
            max_side: None,
            factor: 2.0,
        };
        let src = RgbFrame::solid(dims(8, 6), [10, 20, 30]);
        let target = ds.target_dims(src.dims());
        let out = ds.apply(src, target).unwrap();
        assert_eq!(out.dims(), dims(4, 3));
        assert!(out.pixels().all(|p| p == [10, 20, 30]));
    }

    #[test]
    fn factor_below_one_is_rejected() {
        let ds = Downscale {
            max_side: None,
            factor: 0.5,
        };
        assert!(ds.validate().is_err());
    }
}
