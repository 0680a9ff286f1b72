//! The `.genesisvid` container: metadata, a global palette and zlib-compressed index frames.
//!
//! Three on-disk versions exist. v1 is plain JSON with hex-encoded blocks; v2 renames the fps keys
//! and zlib-compresses the whole record; v3 additionally stores blocks as one length-prefixed
//! stream and carries playback metadata. Writers may target any version; readers accept all of
//! them.

pub(crate) mod codec;
pub(crate) mod schema;

use std::path::Path;

use anyhow::Context as _;

use crate::container::codec::{deflate, inflate};
use crate::container::schema::ContainerRecord;
use crate::foundation::core::Dimensions;
use crate::foundation::error::{GenesisError, GenesisResult};
use crate::frame::IndexFrame;
use crate::palette::Palette;

pub use schema::ContainerExtras;

/// Largest frame area, in pixels, a container may declare (16384 x 16384).
pub const MAX_FRAME_PIXELS: u64 = 1 << 28;

/// Container format version.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
pub enum FormatVersion {
    V1,
    V2,
    #[default]
    V3,
}

impl FormatVersion {
    pub fn number(self) -> u32 {
        match self {
            Self::V1 => 1,
            Self::V2 => 2,
            Self::V3 => 3,
        }
    }

    pub fn from_number(n: u32) -> GenesisResult<Self> {
        match n {
            1 => Ok(Self::V1),
            2 => Ok(Self::V2),
            3 => Ok(Self::V3),
            other => Err(GenesisError::validation(format!(
                "unknown container format version {other} (expected 1, 2 or 3)"
            ))),
        }
    }

    /// Whether the serialized record gets a second zlib pass.
    pub fn outer_compression(self) -> bool {
        self != Self::V1
    }
}

impl std::fmt::Display for FormatVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "v{}", self.number())
    }
}

/// Encode-side metadata for [`Container::build`].
#[derive(Clone, Debug)]
pub struct ContainerMeta {
    pub version: FormatVersion,
    pub dims: Dimensions,
    /// Source frame rate.
    pub fps: f64,
    /// Retention stride the frames were sampled with.
    pub frame_interval: u32,
    pub extras: ContainerExtras,
}

/// A complete, immutable container. Owns its palette and compressed blocks.
#[derive(Clone, Debug, PartialEq)]
pub struct Container {
    version: FormatVersion,
    width: u32,
    height: u32,
    fps: f64,
    frame_interval: u32,
    palette: Palette,
    blocks: Vec<Vec<u8>>,
    extras: ContainerExtras,
}

impl Container {
    /// Compress `frames` and assemble a container.
    pub fn build(meta: ContainerMeta, palette: Palette, frames: &[IndexFrame]) -> GenesisResult<Self> {
        let mut blocks = Vec::with_capacity(frames.len());
        for (i, f) in frames.iter().enumerate() {
            if f.dims() != meta.dims {
                return Err(GenesisError::encode(format!(
                    "index frame {i} is {}, container is {}",
                    f.dims(),
                    meta.dims
                )));
            }
            if let Some(max) = f.max_index()
                && usize::from(max) >= palette.len()
            {
                return Err(GenesisError::encode(format!(
                    "index frame {i} uses index {max} but palette has {} entries",
                    palette.len()
                )));
            }
            blocks.push(deflate(&f.indices)?);
        }
        Self::from_parts(
            meta.version,
            meta.dims.width,
            meta.dims.height,
            meta.fps,
            meta.frame_interval,
            palette,
            blocks,
            meta.extras,
        )
    }

    #[allow(clippy::too_many_arguments)]
    pub(crate) fn from_parts(
        version: FormatVersion,
        width: u32,
        height: u32,
        fps: f64,
        frame_interval: u32,
        palette: Palette,
        blocks: Vec<Vec<u8>>,
        extras: ContainerExtras,
    ) -> GenesisResult<Self> {
        if width == 0 {
            return Err(GenesisError::format("width", "must be > 0"));
        }
        if height == 0 {
            return Err(GenesisError::format("height", "must be > 0"));
        }
        let area = u64::from(width) * u64::from(height);
        if area > MAX_FRAME_PIXELS {
            return Err(GenesisError::format(
                "height",
                format!("{width}x{height} exceeds the {MAX_FRAME_PIXELS} pixel frame limit"),
            ));
        }
        if !fps.is_finite() || fps <= 0.0 {
            return Err(GenesisError::format("fps", format!("must be finite and > 0, got {fps}")));
        }
        if frame_interval == 0 {
            return Err(GenesisError::format("frame_interval", "must be >= 1"));
        }
        if let Some(t) = extras.target_fps
            && (!t.is_finite() || t <= 0.0)
        {
            return Err(GenesisError::format("target_fps", format!("must be finite and > 0, got {t}")));
        }
        if let Some(d) = extras.duration_secs
            && (!d.is_finite() || d <= 0.0)
        {
            return Err(GenesisError::format("duration_secs", format!("must be finite and > 0, got {d}")));
        }
        Ok(Self {
            version,
            width,
            height,
            fps,
            frame_interval,
            palette,
            blocks,
            extras: extras.for_version(version),
        })
    }

    pub fn version(&self) -> FormatVersion {
        self.version
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dims(&self) -> Dimensions {
        Dimensions {
            width: self.width,
            height: self.height,
        }
    }

    /// Source frame rate.
    pub fn fps(&self) -> f64 {
        self.fps
    }

    pub fn frame_interval(&self) -> u32 {
        self.frame_interval
    }

    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    /// Compressed index blocks in temporal order.
    pub fn blocks(&self) -> &[Vec<u8>] {
        &self.blocks
    }

    pub fn frame_count(&self) -> usize {
        self.blocks.len()
    }

    pub fn extras(&self) -> &ContainerExtras {
        &self.extras
    }

    /// Same contents, written as another format version.
    pub fn with_version(mut self, version: FormatVersion) -> Self {
        self.version = version;
        self.extras = self.extras.for_version(version);
        self
    }

    /// Serialize to the on-disk byte layout of this container's version.
    pub fn to_bytes(&self) -> GenesisResult<Vec<u8>> {
        let json = ContainerRecord::from_container(self)?.to_json()?;
        if self.version.outer_compression() {
            deflate(&json)
        } else {
            Ok(json)
        }
    }

    /// Parse stored bytes of any known version.
    ///
    /// Outer decompression is tried first; bytes that do not inflate are read as an uncompressed
    /// record (v1).
    pub fn from_bytes(bytes: &[u8]) -> GenesisResult<Self> {
        let value: serde_json::Value = match inflate(bytes) {
            Ok(json) => serde_json::from_slice(&json).map_err(|e| {
                GenesisError::format("record", format!("decompressed record is not JSON: {e}"))
            })?,
            Err(_) => serde_json::from_slice(bytes).map_err(|e| {
                GenesisError::format("record", format!("not a compressed or JSON record: {e}"))
            })?,
        };
        let container = ContainerRecord::parse(value)?.into_container()?;
        tracing::debug!(
            version = %container.version,
            frames = container.frame_count(),
            dims = %container.dims(),
            "container parsed"
        );
        Ok(container)
    }

    /// Write to `path` through a sibling temp file so a failed write never leaves a partial
    /// container behind. Returns the byte size written.
    pub fn save(&self, path: &Path) -> GenesisResult<u64> {
        let bytes = self.to_bytes()?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("failed to create output directory '{}'", parent.display())
            })?;
        }
        let tmp = temp_sibling(path);
        let res = std::fs::write(&tmp, &bytes)
            .and_then(|()| std::fs::rename(&tmp, path))
            .with_context(|| format!("failed to write container '{}'", path.display()));
        if res.is_err() {
            let _ = std::fs::remove_file(&tmp);
        }
        res?;
        Ok(bytes.len() as u64)
    }

    /// Read and parse a container file.
    pub fn load(path: &Path) -> GenesisResult<Self> {
        let bytes = std::fs::read(path).map_err(|e| {
            GenesisError::open(format!("failed to read container '{}': {e}", path.display()))
        })?;
        Self::from_bytes(&bytes)
    }
}

fn temp_sibling(path: &Path) -> std::path::PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "container".to_string());
    path.with_file_name(format!(".{name}.{}.tmp", std::process::id()))
}

#[cfg(test)]
#[path = "../../tests/unit/container/mod.rs"]
mod tests;
