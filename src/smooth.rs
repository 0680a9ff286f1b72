//! Decode-time temporal smoothing.
//!
//! Each frame is blended with its immediate neighbors (itself weighted highest), lightly blurred,
//! and optionally followed by a synthetic midpoint frame to double the playback rate.
//!
//! Frames are processed in bounded batches. A frame at a batch edge only sees the neighbors inside
//! its batch plus `overlap` context frames borrowed from the adjacent batches; with the default
//! `overlap = 0` batch-edge frames blend with a single neighbor, exactly like the first and last
//! frame of the whole sequence. Interpolation is not affected by batching.

use std::collections::VecDeque;

use crate::foundation::error::{GenesisError, GenesisResult};
use crate::foundation::math::{mid_u8, weighted_u8};
use crate::frame::RgbFrame;

/// Options for the smoothing stage.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct SmoothOpts {
    /// Run the stage at all. When off, frames pass through untouched and are never interpolated.
    pub enabled: bool,
    /// Frames per batch.
    pub batch_size: usize,
    /// Context frames borrowed from each adjacent batch.
    pub overlap: usize,
    /// Gaussian blur radius in pixels; 0 disables the blur.
    pub blur_radius: u32,
    /// Gaussian sigma.
    pub blur_sigma: f32,
    /// Allow midpoint interpolation for slow playback.
    pub interpolate: bool,
    /// Interpolate when the resolved rate is below this many fps.
    pub interpolate_below: f64,
}

impl Default for SmoothOpts {
    fn default() -> Self {
        Self {
            enabled: true,
            batch_size: 32,
            overlap: 0,
            blur_radius: 1,
            blur_sigma: 0.8,
            interpolate: true,
            interpolate_below: 15.0,
        }
    }
}

impl SmoothOpts {
    pub fn validate(&self) -> GenesisResult<()> {
        if self.batch_size == 0 {
            return Err(GenesisError::validation("smoothing batch_size must be > 0"));
        }
        if self.overlap > self.batch_size {
            return Err(GenesisError::validation(format!(
                "smoothing overlap {} exceeds batch_size {}",
                self.overlap, self.batch_size
            )));
        }
        if self.blur_radius > 0 && (!self.blur_sigma.is_finite() || self.blur_sigma <= 0.0) {
            return Err(GenesisError::validation("blur sigma must be > 0"));
        }
        Ok(())
    }

    /// Threshold handed to the playback planner, `None` when interpolation can never happen.
    pub fn interpolation_threshold(&self) -> Option<f64> {
        (self.enabled && self.interpolate).then_some(self.interpolate_below)
    }
}

/// Weighted temporal blend: neighbors 1, current 2; with a single neighbor, current 3.
pub fn blend_neighbors(
    prev: Option<&RgbFrame>,
    cur: &RgbFrame,
    next: Option<&RgbFrame>,
) -> RgbFrame {
    let data = match (prev, next) {
        (None, None) => cur.data.clone(),
        (Some(a), Some(b)) => cur
            .data
            .iter()
            .zip(&a.data)
            .zip(&b.data)
            .map(|((&c, &p), &n)| weighted_u8(&[(p, 1), (c, 2), (n, 1)], 4))
            .collect(),
        (Some(o), None) | (None, Some(o)) => cur
            .data
            .iter()
            .zip(&o.data)
            .map(|(&c, &n)| weighted_u8(&[(c, 3), (n, 1)], 4))
            .collect(),
    };
    RgbFrame {
        width: cur.width,
        height: cur.height,
        data,
    }
}

/// Per-channel midpoint of two frames.
pub fn midpoint(a: &RgbFrame, b: &RgbFrame) -> RgbFrame {
    RgbFrame {
        width: a.width,
        height: a.height,
        data: a.data.iter().zip(&b.data).map(|(&x, &y)| mid_u8(x, y)).collect(),
    }
}

/// Separable Gaussian blur over packed RGB8 with a Q16 fixed-point kernel and clamped edges.
pub fn blur_rgb8(
    src: &[u8],
    width: u32,
    height: u32,
    radius: u32,
    sigma: f32,
) -> GenesisResult<Vec<u8>> {
    let expected_len = (width as usize)
        .checked_mul(height as usize)
        .and_then(|v| v.checked_mul(3))
        .ok_or_else(|| GenesisError::validation("blur buffer size overflow"))?;
    if src.len() != expected_len {
        return Err(GenesisError::validation(
            "blur_rgb8 expects src matching width*height*3",
        ));
    }
    if radius == 0 || expected_len == 0 {
        return Ok(src.to_vec());
    }

    let kernel = gaussian_kernel_q16(radius, sigma)?;
    let mut tmp = vec![0u8; expected_len];
    let mut out = vec![0u8; expected_len];
    horizontal_pass(src, &mut tmp, width, height, &kernel);
    vertical_pass(&tmp, &mut out, width, height, &kernel);
    Ok(out)
}

fn gaussian_kernel_q16(radius: u32, sigma: f32) -> GenesisResult<Vec<u32>> {
    if !sigma.is_finite() || sigma <= 0.0 {
        return Err(GenesisError::validation("blur sigma must be > 0"));
    }
    let r = radius as i32;
    let sigma = f64::from(sigma);
    let denom = 2.0 * sigma * sigma;
    let weights_f: Vec<f64> = (-r..=r)
        .map(|i| {
            let x = f64::from(i);
            (-x * x / denom).exp()
        })
        .collect();
    let sum: f64 = weights_f.iter().sum();

    let mut weights: Vec<u32> = weights_f
        .iter()
        .map(|wf| ((wf / sum) * 65536.0).round().clamp(0.0, 65536.0) as u32)
        .collect();
    // Push rounding drift into the center tap so the kernel sums to exactly 1.0.
    let acc: i64 = weights.iter().map(|&w| i64::from(w)).sum();
    let mid = weights.len() / 2;
    weights[mid] = (i64::from(weights[mid]) + 65536 - acc).clamp(0, 65536) as u32;
    Ok(weights)
}

fn horizontal_pass(src: &[u8], dst: &mut [u8], width: u32, height: u32, k: &[u32]) {
    let radius = (k.len() / 2) as i32;
    let w = width as i32;
    for y in 0..height as i32 {
        for x in 0..w {
            let mut acc = [0u64; 3];
            for (ki, &kw) in k.iter().enumerate() {
                let sx = (x + ki as i32 - radius).clamp(0, w - 1);
                let idx = ((y * w + sx) as usize) * 3;
                for c in 0..3 {
                    acc[c] += u64::from(kw) * u64::from(src[idx + c]);
                }
            }
            let out_idx = ((y * w + x) as usize) * 3;
            for c in 0..3 {
                dst[out_idx + c] = q16_to_u8(acc[c]);
            }
        }
    }
}

fn vertical_pass(src: &[u8], dst: &mut [u8], width: u32, height: u32, k: &[u32]) {
    let radius = (k.len() / 2) as i32;
    let w = width as i32;
    let h = height as i32;
    for y in 0..h {
        for x in 0..w {
            let mut acc = [0u64; 3];
            for (ki, &kw) in k.iter().enumerate() {
                let sy = (y + ki as i32 - radius).clamp(0, h - 1);
                let idx = ((sy * w + x) as usize) * 3;
                for c in 0..3 {
                    acc[c] += u64::from(kw) * u64::from(src[idx + c]);
                }
            }
            let out_idx = ((y * w + x) as usize) * 3;
            for c in 0..3 {
                dst[out_idx + c] = q16_to_u8(acc[c]);
            }
        }
    }
}

fn q16_to_u8(acc: u64) -> u8 {
    ((acc + 32768) >> 16).min(255) as u8
}

/// Stateful batch smoother. Feed batches in order with [`TemporalSmoother::process_batch`], then
/// call [`TemporalSmoother::finish`].
pub struct TemporalSmoother {
    opts: SmoothOpts,
    interpolate: bool,
    /// Raw frames from the end of the previous batch, used as leading context.
    history: VecDeque<RgbFrame>,
    /// Last smoothed frame, held until its successor arrives so the midpoint can follow it.
    held: Option<RgbFrame>,
    emitted: u64,
}

impl TemporalSmoother {
    pub fn new(opts: SmoothOpts, interpolate: bool) -> GenesisResult<Self> {
        opts.validate()?;
        Ok(Self {
            opts,
            interpolate,
            history: VecDeque::new(),
            held: None,
            emitted: 0,
        })
    }

    /// Frames emitted so far.
    pub fn emitted(&self) -> u64 {
        self.emitted
    }

    /// Smooth one batch. `lookahead` holds up to `overlap` raw frames that follow the batch; they
    /// are used as neighbors only and must be passed again as part of the next batch.
    pub fn process_batch(
        &mut self,
        batch: &[RgbFrame],
        lookahead: &[RgbFrame],
        emit: &mut dyn FnMut(RgbFrame) -> GenesisResult<()>,
    ) -> GenesisResult<()> {
        let smoothed = self.smooth_batch(batch, lookahead)?;
        for frame in smoothed {
            self.push_smoothed(frame, emit)?;
        }

        if self.opts.overlap > 0 {
            self.history.extend(batch.iter().cloned());
            while self.history.len() > self.opts.overlap {
                self.history.pop_front();
            }
        }
        Ok(())
    }

    fn smooth_batch(
        &self,
        batch: &[RgbFrame],
        lookahead: &[RgbFrame],
    ) -> GenesisResult<Vec<RgbFrame>> {
        let lead = self.history.len();
        let ctx: Vec<&RgbFrame> = self
            .history
            .iter()
            .chain(batch)
            .chain(lookahead.iter().take(self.opts.overlap))
            .collect();

        let mut out = Vec::with_capacity(batch.len());
        for j in 0..batch.len() {
            let at = lead + j;
            let prev = at.checked_sub(1).map(|p| ctx[p]);
            let next = ctx.get(at + 1).copied();
            let mut frame = blend_neighbors(prev, ctx[at], next);
            if self.opts.blur_radius > 0 {
                frame.data = blur_rgb8(
                    &frame.data,
                    frame.width,
                    frame.height,
                    self.opts.blur_radius,
                    self.opts.blur_sigma,
                )?;
            }
            out.push(frame);
        }
        Ok(out)
    }

    fn push_smoothed(
        &mut self,
        frame: RgbFrame,
        emit: &mut dyn FnMut(RgbFrame) -> GenesisResult<()>,
    ) -> GenesisResult<()> {
        if !self.interpolate {
            self.emitted += 1;
            return emit(frame);
        }
        if let Some(prev) = self.held.take() {
            let mid = midpoint(&prev, &frame);
            self.emitted += 2;
            emit(prev)?;
            emit(mid)?;
        }
        self.held = Some(frame);
        Ok(())
    }

    /// Flush the held frame. With interpolation on, the last frame is emitted twice so the output
    /// holds exactly twice the input count.
    pub fn finish(&mut self, emit: &mut dyn FnMut(RgbFrame) -> GenesisResult<()>) -> GenesisResult<()> {
        if let Some(last) = self.held.take() {
            self.emitted += 2;
            emit(last.clone())?;
            emit(last)?;
        }
        self.history.clear();
        Ok(())
    }
}

/// Drive a [`TemporalSmoother`] over `frames`, buffering at most `batch_size + overlap` frames.
pub fn smooth_stream(
    frames: impl Iterator<Item = RgbFrame>,
    opts: &SmoothOpts,
    interpolate: bool,
    emit: &mut dyn FnMut(RgbFrame) -> GenesisResult<()>,
) -> GenesisResult<u64> {
    let mut smoother = TemporalSmoother::new(opts.clone(), interpolate)?;
    let want = opts.batch_size + opts.overlap;
    let mut frames = frames.fuse();
    let mut buf: VecDeque<RgbFrame> = VecDeque::with_capacity(want);
    let mut batch_no = 0u64;

    loop {
        while buf.len() < want {
            match frames.next() {
                Some(f) => buf.push_back(f),
                None => break,
            }
        }
        if buf.is_empty() {
            break;
        }
        let take = opts.batch_size.min(buf.len());
        let batch: Vec<RgbFrame> = buf.drain(..take).collect();
        let lookahead: Vec<RgbFrame> = buf.iter().take(opts.overlap).cloned().collect();
        smoother.process_batch(&batch, &lookahead, emit)?;
        tracing::debug!(batch = batch_no, frames = batch.len(), "smoothed batch flushed");
        batch_no += 1;
    }
    smoother.finish(emit)?;
    Ok(smoother.emitted())
}

#[cfg(test)]
#[path = "../tests/unit/smooth/smooth.rs"]
mod tests;
