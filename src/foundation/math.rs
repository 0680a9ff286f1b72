/// One packed RGB8 color.
pub type Rgb = [u8; 3];

/// Squared Euclidean distance in RGB space.
#[inline]
pub(crate) fn dist2(a: Rgb, b: Rgb) -> u32 {
    let dr = i32::from(a[0]) - i32::from(b[0]);
    let dg = i32::from(a[1]) - i32::from(b[1]);
    let db = i32::from(a[2]) - i32::from(b[2]);
    (dr * dr + dg * dg + db * db) as u32
}

#[inline]
pub(crate) fn clamp_u8(v: i32) -> u8 {
    v.clamp(0, 255) as u8
}

/// Weighted sum of byte samples divided by `total` with round-half-up.
#[inline]
pub(crate) fn weighted_u8(samples: &[(u8, u32)], total: u32) -> u8 {
    let acc: u32 = samples.iter().map(|&(v, w)| u32::from(v) * w).sum();
    ((acc + total / 2) / total).min(255) as u8
}

/// Midpoint of two byte samples, rounding half up.
#[inline]
pub(crate) fn mid_u8(a: u8, b: u8) -> u8 {
    ((u16::from(a) + u16::from(b) + 1) / 2) as u8
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/math.rs"]
mod tests;
