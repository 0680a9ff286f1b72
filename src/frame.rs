use crate::foundation::core::Dimensions;
use crate::foundation::error::{GenesisError, GenesisResult};
use crate::foundation::math::Rgb;

/// A raw frame as packed RGB8 pixels, tightly packed, row-major.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RgbFrame {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// RGB8 bytes, `width * height * 3` long.
    pub data: Vec<u8>,
}

impl RgbFrame {
    /// Wrap an RGB8 buffer, checking its length against the dimensions.
    pub fn new(dims: Dimensions, data: Vec<u8>) -> GenesisResult<Self> {
        if data.len() != dims.rgb_len() {
            return Err(GenesisError::validation(format!(
                "rgb frame buffer is {} bytes, expected {} for {dims}",
                data.len(),
                dims.rgb_len()
            )));
        }
        Ok(Self {
            width: dims.width,
            height: dims.height,
            data,
        })
    }

    /// A frame filled with one color.
    pub fn solid(dims: Dimensions, color: Rgb) -> Self {
        Self {
            width: dims.width,
            height: dims.height,
            data: color.repeat(dims.area()),
        }
    }

    /// An all-black frame.
    pub fn black(dims: Dimensions) -> Self {
        Self::solid(dims, [0, 0, 0])
    }

    pub fn dims(&self) -> Dimensions {
        Dimensions {
            width: self.width,
            height: self.height,
        }
    }

    /// Color at pixel `(x, y)`.
    pub fn pixel(&self, x: u32, y: u32) -> Rgb {
        let i = (y as usize * self.width as usize + x as usize) * 3;
        [self.data[i], self.data[i + 1], self.data[i + 2]]
    }

    /// Iterate pixels in raster order.
    pub fn pixels(&self) -> impl Iterator<Item = Rgb> + '_ {
        self.data.chunks_exact(3).map(|p| [p[0], p[1], p[2]])
    }

    pub(crate) fn into_image(self) -> GenesisResult<image::RgbImage> {
        image::RgbImage::from_raw(self.width, self.height, self.data)
            .ok_or_else(|| GenesisError::validation("rgb frame buffer does not match dimensions"))
    }

    pub(crate) fn from_image(img: image::RgbImage) -> Self {
        let (width, height) = img.dimensions();
        Self {
            width,
            height,
            data: img.into_raw(),
        }
    }
}

/// A frame as one palette index per pixel, row-major.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IndexFrame {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Palette indices, `width * height` long.
    pub indices: Vec<u8>,
}

impl IndexFrame {
    pub fn new(dims: Dimensions, indices: Vec<u8>) -> GenesisResult<Self> {
        if indices.len() != dims.area() {
            return Err(GenesisError::validation(format!(
                "index frame buffer is {} bytes, expected {} for {dims}",
                indices.len(),
                dims.area()
            )));
        }
        Ok(Self {
            width: dims.width,
            height: dims.height,
            indices,
        })
    }

    pub fn dims(&self) -> Dimensions {
        Dimensions {
            width: self.width,
            height: self.height,
        }
    }

    /// Largest index used, `None` for an empty frame.
    pub fn max_index(&self) -> Option<u8> {
        self.indices.iter().copied().max()
    }
}
