use std::collections::HashMap;

use crate::foundation::error::{GenesisError, GenesisResult};
use crate::foundation::math::{Rgb, clamp_u8, dist2};
use crate::frame::{IndexFrame, RgbFrame};
use crate::palette::Palette;

/// Options for [`quantize_frame`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct QuantizeOpts {
    /// Floyd–Steinberg error diffusion in raster order.
    pub dither: bool,
}

/// Index of the entry closest to `c`; exact ties go to the lower index.
#[inline]
pub(crate) fn nearest_index(colors: &[Rgb], c: Rgb) -> usize {
    let mut best = 0usize;
    let mut best_d = u32::MAX;
    for (i, &p) in colors.iter().enumerate() {
        let d = dist2(c, p);
        if d < best_d {
            best = i;
            best_d = d;
            if d == 0 {
                break;
            }
        }
    }
    best
}

/// Per-frame memo of nearest-entry lookups keyed by exact color.
struct NearestCache<'a> {
    colors: &'a [Rgb],
    memo: HashMap<Rgb, u8>,
}

impl<'a> NearestCache<'a> {
    fn new(palette: &'a Palette) -> Self {
        Self {
            colors: palette.colors(),
            memo: HashMap::new(),
        }
    }

    fn lookup(&mut self, c: Rgb) -> u8 {
        let colors = self.colors;
        *self
            .memo
            .entry(c)
            .or_insert_with(|| nearest_index(colors, c) as u8)
    }
}

/// Map every pixel of `frame` to its nearest palette entry.
///
/// Output is deterministic for identical input and palette, with or without dithering.
pub fn quantize_frame(
    frame: &RgbFrame,
    palette: &Palette,
    opts: QuantizeOpts,
) -> GenesisResult<IndexFrame> {
    let dims = frame.dims();
    if frame.data.len() != dims.rgb_len() {
        return Err(GenesisError::validation(
            "quantize_frame expects data matching width*height*3",
        ));
    }
    let mut cache = NearestCache::new(palette);
    let indices = if opts.dither {
        diffuse(frame, palette, &mut cache)
    } else {
        frame.pixels().map(|px| cache.lookup(px)).collect()
    };
    IndexFrame::new(dims, indices)
}

/// Floyd–Steinberg (7, 3, 5, 1)/16 with errors carried in sixteenths.
fn diffuse(frame: &RgbFrame, palette: &Palette, cache: &mut NearestCache<'_>) -> Vec<u8> {
    let w = frame.width as usize;
    let h = frame.height as usize;
    let colors = palette.colors();
    let mut out = Vec::with_capacity(w * h);

    // Padded by one on each side so edge pixels need no bounds checks.
    let mut cur = vec![[0i32; 3]; w + 2];
    let mut next = vec![[0i32; 3]; w + 2];

    for y in 0..h {
        for x in 0..w {
            let src = frame.pixel(x as u32, y as u32);
            let mut want = [0u8; 3];
            for ch in 0..3 {
                let carried = (cur[x + 1][ch] + 8).div_euclid(16);
                want[ch] = clamp_u8(i32::from(src[ch]) + carried);
            }
            let idx = cache.lookup(want);
            out.push(idx);

            let got = colors[usize::from(idx)];
            for ch in 0..3 {
                let e = i32::from(want[ch]) - i32::from(got[ch]);
                cur[x + 2][ch] += e * 7;
                next[x][ch] += e * 3;
                next[x + 1][ch] += e * 5;
                next[x + 2][ch] += e;
            }
        }
        std::mem::swap(&mut cur, &mut next);
        next.iter_mut().for_each(|e| *e = [0; 3]);
    }
    out
}

#[cfg(test)]
#[path = "../../tests/unit/palette/quantize.rs"]
mod tests;
