use crate::container::Container;
use crate::container::codec::inflate;
use crate::foundation::core::Dimensions;
use crate::foundation::error::{GenesisError, GenesisResult};
use crate::frame::RgbFrame;
use crate::palette::Palette;

/// Counters collected while reconstructing a container.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReconstructStats {
    /// Frames produced (always equals the container's block count).
    pub frames: u64,
    /// Frames substituted because their block was corrupt.
    pub recovered: u64,
    /// Pixels whose index exceeded the palette and was clamped.
    pub clamped_indices: u64,
}

/// Inflate one block and map its indices through `palette`.
///
/// Returns the frame and the number of clamped indices. A block that does not inflate, or
/// inflates to fewer than `width * height` bytes, is a decode error for frame `frame`.
pub fn reconstruct_block(
    frame: usize,
    block: &[u8],
    palette: &Palette,
    dims: Dimensions,
) -> GenesisResult<(RgbFrame, u64)> {
    let indices = inflate(block)
        .map_err(|e| GenesisError::decode(frame, format!("block does not inflate: {e}")))?;
    let area = dims.area();
    if indices.len() < area {
        return Err(GenesisError::decode(
            frame,
            format!(
                "block holds {} indices, expected {area} for {dims}",
                indices.len()
            ),
        ));
    }

    let last = palette.len() - 1;
    let mut clamped = 0u64;
    let mut data = Vec::with_capacity(dims.rgb_len());
    for &idx in &indices[..area] {
        if usize::from(idx) > last {
            clamped += 1;
        }
        data.extend_from_slice(&palette.color_clamped(idx));
    }
    Ok((RgbFrame::new(dims, data)?, clamped))
}

/// Lazily reconstructs a container's frames in stored order.
///
/// Corrupt blocks never end the sequence: they are replaced by the previous good frame, or by a
/// black frame when no frame has decoded yet.
pub struct Reconstructor<'a> {
    container: &'a Container,
    next: usize,
    last_good: Option<RgbFrame>,
    stats: ReconstructStats,
}

impl<'a> Reconstructor<'a> {
    pub fn new(container: &'a Container) -> Self {
        Self {
            container,
            next: 0,
            last_good: None,
            stats: ReconstructStats::default(),
        }
    }

    pub fn stats(&self) -> ReconstructStats {
        self.stats
    }
}

impl Iterator for Reconstructor<'_> {
    type Item = RgbFrame;

    fn next(&mut self) -> Option<RgbFrame> {
        let block = self.container.blocks().get(self.next)?;
        let i = self.next;
        self.next += 1;
        self.stats.frames += 1;

        let dims = self.container.dims();
        match reconstruct_block(i, block, self.container.palette(), dims) {
            Ok((frame, clamped)) => {
                if clamped > 0 {
                    tracing::debug!(frame = i, clamped, "clamped out-of-palette indices");
                }
                self.stats.clamped_indices += clamped;
                self.last_good = Some(frame.clone());
                Some(frame)
            }
            Err(err) => {
                self.stats.recovered += 1;
                let substitute = match &self.last_good {
                    Some(prev) => prev.clone(),
                    None => RgbFrame::black(dims),
                };
                tracing::warn!(
                    frame = i,
                    substitute = if self.last_good.is_some() { "previous" } else { "blank" },
                    "{err}; substituting"
                );
                Some(substitute)
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.container.frame_count() - self.next;
        (left, Some(left))
    }
}
