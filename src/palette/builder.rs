use std::collections::HashMap;

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use crate::foundation::error::{GenesisError, GenesisResult};
use crate::foundation::math::{Rgb, dist2};
use crate::frame::RgbFrame;
use crate::palette::quantize::nearest_index;
use crate::palette::{MAX_PALETTE_COLORS, MIN_PALETTE_COLORS, Palette, PalettePolicy};

/// Options for [`build_palette`].
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct PaletteOpts {
    /// Construction policy.
    pub policy: PalettePolicy,
    /// Exact number of palette entries to produce.
    pub colors: usize,
    /// RNG seed for k-means initialization.
    pub seed: u64,
    /// K-means iteration cap.
    pub max_iters: u32,
    /// Upper bound on pixels fed to k-means; larger samples are strided down.
    pub max_samples: usize,
    /// Thumbnail width used by median cut.
    pub thumb_width: u32,
}

impl Default for PaletteOpts {
    fn default() -> Self {
        Self {
            policy: PalettePolicy::KMeans,
            colors: MAX_PALETTE_COLORS,
            seed: 0x6765_6e65_7369_7376,
            max_iters: 16,
            max_samples: 65_536,
            thumb_width: 96,
        }
    }
}

impl PaletteOpts {
    pub fn validate(&self) -> GenesisResult<()> {
        if !(MIN_PALETTE_COLORS..=MAX_PALETTE_COLORS).contains(&self.colors) {
            return Err(GenesisError::validation(format!(
                "palette size must be in {MIN_PALETTE_COLORS}..={MAX_PALETTE_COLORS}, got {}",
                self.colors
            )));
        }
        if self.max_iters == 0 {
            return Err(GenesisError::validation("k-means max_iters must be > 0"));
        }
        if self.max_samples == 0 {
            return Err(GenesisError::validation("palette max_samples must be > 0"));
        }
        if self.thumb_width == 0 {
            return Err(GenesisError::validation("palette thumb_width must be > 0"));
        }
        Ok(())
    }
}

/// A sampled color and how many pixels carried it.
type Weighted = (Rgb, u32);

/// Build a palette of exactly `opts.colors` entries from sampled frames.
///
/// When the sample holds no more distinct colors than requested, every policy returns those
/// colors sorted and zero-padded. An empty sample yields an all-black palette.
#[tracing::instrument(skip(samples), fields(samples = samples.len()))]
pub fn build_palette(samples: &[RgbFrame], opts: &PaletteOpts) -> GenesisResult<Palette> {
    opts.validate()?;
    let k = opts.colors;

    let histogram = match opts.policy {
        PalettePolicy::KMeans => strided_histogram(samples, opts.max_samples),
        PalettePolicy::Distinct => strided_histogram(samples, usize::MAX),
        PalettePolicy::MedianCut => thumbnail_histogram(samples, opts.thumb_width)?,
    };
    if histogram.is_empty() {
        tracing::debug!("no sampled pixels; using all-zero palette");
        return Ok(Palette::zeros(k));
    }
    if histogram.len() <= k {
        let colors = histogram.iter().map(|&(c, _)| c).collect();
        return Ok(Palette::padded(colors, k));
    }

    let colors = match opts.policy {
        PalettePolicy::KMeans => kmeans(&histogram, k, opts.seed, opts.max_iters),
        PalettePolicy::Distinct => evenly_spaced(&histogram, k),
        PalettePolicy::MedianCut => median_cut(histogram, k),
    };
    Ok(Palette::padded(colors, k))
}

/// Sorted color histogram over all sampled pixels, visiting at most about `max_samples` of them
/// with a uniform stride.
fn strided_histogram(samples: &[RgbFrame], max_samples: usize) -> Vec<Weighted> {
    let total: usize = samples.iter().map(|f| f.data.len() / 3).sum();
    let stride = total.div_ceil(max_samples.max(1)).max(1);

    let mut counts = HashMap::<Rgb, u32>::new();
    let mut i = 0usize;
    for frame in samples {
        for px in frame.pixels() {
            if i.is_multiple_of(stride) {
                *counts.entry(px).or_insert(0) += 1;
            }
            i += 1;
        }
    }
    sorted_histogram(counts)
}

fn thumbnail_histogram(samples: &[RgbFrame], thumb_width: u32) -> GenesisResult<Vec<Weighted>> {
    let mut counts = HashMap::<Rgb, u32>::new();
    for frame in samples {
        if frame.data.is_empty() {
            continue;
        }
        let thumb = if frame.width > thumb_width {
            let h = ((u64::from(frame.height) * u64::from(thumb_width)) / u64::from(frame.width))
                .max(1) as u32;
            let img = frame.clone().into_image()?;
            RgbFrame::from_image(image::imageops::resize(
                &img,
                thumb_width,
                h,
                image::imageops::FilterType::Lanczos3,
            ))
        } else {
            frame.clone()
        };
        for px in thumb.pixels() {
            *counts.entry(px).or_insert(0) += 1;
        }
    }
    Ok(sorted_histogram(counts))
}

fn sorted_histogram(counts: HashMap<Rgb, u32>) -> Vec<Weighted> {
    let mut hist: Vec<Weighted> = counts.into_iter().collect();
    hist.sort_unstable_by_key(|&(c, _)| c);
    hist
}

fn evenly_spaced(hist: &[Weighted], k: usize) -> Vec<Rgb> {
    let n = hist.len();
    (0..k).map(|i| hist[i * n / k].0).collect()
}

/// Weighted Lloyd iterations over the histogram.
///
/// Centroids start at `k` distinct sampled colors chosen by a seeded RNG. Ties in distance go to
/// the lower centroid index; a centroid that loses all its members keeps its previous value.
fn kmeans(hist: &[Weighted], k: usize, seed: u64, max_iters: u32) -> Vec<Rgb> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut centroids: Vec<Rgb> = hist
        .choose_multiple(&mut rng, k)
        .map(|&(c, _)| c)
        .collect();

    let mut assignment = vec![usize::MAX; hist.len()];
    for iter in 0..max_iters {
        let mut changed = false;
        for (slot, &(c, _)) in assignment.iter_mut().zip(hist) {
            let nearest = nearest_index(&centroids, c);
            if *slot != nearest {
                *slot = nearest;
                changed = true;
            }
        }
        if !changed {
            tracing::debug!(iter, "k-means converged");
            break;
        }

        let mut sums = vec![[0u64; 3]; k];
        let mut weights = vec![0u64; k];
        for (&ci, &(c, n)) in assignment.iter().zip(hist) {
            let n = u64::from(n);
            for ch in 0..3 {
                sums[ci][ch] += u64::from(c[ch]) * n;
            }
            weights[ci] += n;
        }
        for ((centroid, sum), &w) in centroids.iter_mut().zip(&sums).zip(&weights) {
            if w == 0 {
                continue;
            }
            for ch in 0..3 {
                centroid[ch] = ((sum[ch] + w / 2) / w).min(255) as u8;
            }
        }
    }
    centroids
}

/// Median cut: repeatedly split the box with the widest channel range at its population median.
fn median_cut(hist: Vec<Weighted>, k: usize) -> Vec<Rgb> {
    let mut boxes: Vec<Vec<Weighted>> = vec![hist];
    while boxes.len() < k {
        let Some((bi, channel)) = widest_box(&boxes) else {
            break;
        };
        let mut b = std::mem::take(&mut boxes[bi]);
        b.sort_unstable_by_key(|&(c, _)| (c[channel], c));

        let total: u64 = b.iter().map(|&(_, n)| u64::from(n)).sum();
        let mut acc = 0u64;
        let mut split = b.len() / 2;
        for (i, &(_, n)) in b.iter().enumerate() {
            acc += u64::from(n);
            if acc * 2 >= total {
                split = i + 1;
                break;
            }
        }
        let split = split.clamp(1, b.len() - 1);
        let upper = b.split_off(split);
        boxes[bi] = b;
        boxes.push(upper);
    }
    boxes.iter().map(|b| box_mean(b)).collect()
}

fn widest_box(boxes: &[Vec<Weighted>]) -> Option<(usize, usize)> {
    let mut best: Option<(usize, usize, u8, u64)> = None;
    for (bi, b) in boxes.iter().enumerate() {
        if b.len() < 2 {
            continue;
        }
        let population: u64 = b.iter().map(|&(_, n)| u64::from(n)).sum();
        for channel in 0..3 {
            let lo = b.iter().map(|&(c, _)| c[channel]).min().unwrap_or(0);
            let hi = b.iter().map(|&(c, _)| c[channel]).max().unwrap_or(0);
            let range = hi - lo;
            if range == 0 {
                continue;
            }
            let better = match best {
                None => true,
                Some((_, _, r, p)) => range > r || (range == r && population > p),
            };
            if better {
                best = Some((bi, channel, range, population));
            }
        }
    }
    best.map(|(bi, channel, _, _)| (bi, channel))
}

fn box_mean(b: &[Weighted]) -> Rgb {
    let mut sum = [0u64; 3];
    let mut w = 0u64;
    for &(c, n) in b {
        let n = u64::from(n);
        for ch in 0..3 {
            sum[ch] += u64::from(c[ch]) * n;
        }
        w += n;
    }
    if w == 0 {
        return [0, 0, 0];
    }
    [
        ((sum[0] + w / 2) / w) as u8,
        ((sum[1] + w / 2) / w) as u8,
        ((sum[2] + w / 2) / w) as u8,
    ]
}

/// Mean squared quantization error of `frames` against `palette`, for diagnostics.
pub fn palette_mse(frames: &[RgbFrame], palette: &Palette) -> f64 {
    let mut acc = 0u64;
    let mut n = 0u64;
    for frame in frames {
        for px in frame.pixels() {
            let best = palette.colors()[nearest_index(palette.colors(), px)];
            acc += u64::from(dist2(px, best));
            n += 1;
        }
    }
    if n == 0 { 0.0 } else { acc as f64 / n as f64 }
}

#[cfg(test)]
#[path = "../../tests/unit/palette/builder.rs"]
mod tests;
