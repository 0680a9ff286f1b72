//! On-disk record layouts, one serde struct per format version.
//!
//! Reading goes through [`VERSION_TABLE`]: the `(magic, version)` pair selects the layout, the
//! layout's struct is deserialized, and the result is lowered into the version-independent
//! [`Container`]. No layout is ever guessed from which keys happen to be present.

use serde::{Deserialize, Serialize};

use crate::container::codec::{pack_blocks, unpack_blocks};
use crate::container::{Container, FormatVersion};
use crate::foundation::error::{GenesisError, GenesisResult};
use crate::foundation::math::Rgb;
use crate::palette::{MAX_PALETTE_COLORS, Palette, PalettePolicy};

pub(crate) const MAGIC_V1: &str = "GENESISVID-1";
pub(crate) const MAGIC: &str = "GENESISVID";

/// One row of the parsing table.
pub(crate) struct VersionEntry {
    pub magic: &'static str,
    /// `None` matches records without a `version` key.
    pub version: Option<u64>,
    pub format: FormatVersion,
    /// Keys that must be present, checked before deserializing so errors can name them.
    pub required: &'static [&'static str],
}

pub(crate) const VERSION_TABLE: &[VersionEntry] = &[
    VersionEntry {
        magic: MAGIC_V1,
        version: None,
        format: FormatVersion::V1,
        required: &["width", "height", "fps", "frames", "palette"],
    },
    VersionEntry {
        magic: MAGIC_V1,
        version: Some(1),
        format: FormatVersion::V1,
        required: &["width", "height", "fps", "frames", "palette"],
    },
    VersionEntry {
        magic: MAGIC,
        version: Some(2),
        format: FormatVersion::V2,
        required: &["width", "height", "original_fps", "frames", "palette"],
    },
    VersionEntry {
        magic: MAGIC,
        version: Some(3),
        format: FormatVersion::V3,
        required: &["width", "height", "original_fps", "frame_data", "palette"],
    },
];

fn one() -> u32 {
    1
}

/// `GENESISVID-1`. Writers disagreed on the interval key; both spellings are read.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct V1Record {
    pub magic: String,
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    #[serde(default = "one", alias = "frame_skip")]
    pub frame_interval: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame_count: Option<u64>,
    pub palette: Vec<[i64; 3]>,
    pub frames: Vec<String>,
}

/// `GENESISVID` version 2: renamed fps keys, hex block list, outer zlib.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct V2Record {
    pub magic: String,
    pub version: u64,
    pub width: u32,
    pub height: u32,
    pub original_fps: f64,
    #[serde(default = "one")]
    pub frame_skip: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_original_frames: Option<u64>,
    pub palette: Vec<[i64; 3]>,
    pub frames: Vec<String>,
}

/// `GENESISVID` version 3: length-prefixed block stream plus playback and provenance metadata.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct V3Record {
    pub magic: String,
    pub version: u64,
    pub width: u32,
    pub height: u32,
    pub original_fps: f64,
    #[serde(default = "one")]
    pub frame_skip: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_original_frames: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_fps: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_secs: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub palette_policy: Option<PalettePolicy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dithering: Option<bool>,
    pub palette: Vec<[i64; 3]>,
    pub frame_data: String,
}

/// A parsed record of any known version.
#[derive(Debug)]
pub(crate) enum ContainerRecord {
    V1(V1Record),
    V2(V2Record),
    V3(V3Record),
}

impl ContainerRecord {
    /// Select the layout from the table and deserialize it.
    pub(crate) fn parse(value: serde_json::Value) -> GenesisResult<Self> {
        let obj = value
            .as_object()
            .ok_or_else(|| GenesisError::format("record", "top level is not an object"))?;
        let magic = obj
            .get("magic")
            .and_then(|m| m.as_str())
            .ok_or_else(|| GenesisError::format("magic", "missing or not a string"))?;
        let version = match obj.get("version") {
            None => None,
            Some(v) => Some(
                v.as_u64()
                    .ok_or_else(|| GenesisError::format("version", "not an unsigned integer"))?,
            ),
        };

        let entry = VERSION_TABLE
            .iter()
            .find(|e| e.magic == magic && e.version == version)
            .ok_or_else(|| {
                GenesisError::format(
                    if VERSION_TABLE.iter().any(|e| e.magic == magic) {
                        "version"
                    } else {
                        "magic"
                    },
                    format!("unknown container tag '{magic}' version {version:?}"),
                )
            })?;
        if let Some(missing) = entry.required.iter().find(|k| !obj.contains_key(**k)) {
            return Err(GenesisError::format(*missing, "required field is missing"));
        }

        let bad = |e: serde_json::Error| GenesisError::format("record", e.to_string());
        Ok(match entry.format {
            FormatVersion::V1 => Self::V1(serde_json::from_value(value).map_err(bad)?),
            FormatVersion::V2 => Self::V2(serde_json::from_value(value).map_err(bad)?),
            FormatVersion::V3 => Self::V3(serde_json::from_value(value).map_err(bad)?),
        })
    }

    /// Lower into the version-independent container, validating every field.
    pub(crate) fn into_container(self) -> GenesisResult<Container> {
        match self {
            Self::V1(r) => {
                if let Some(n) = r.frame_count
                    && n != r.frames.len() as u64
                {
                    tracing::warn!(
                        frame_count = n,
                        frames = r.frames.len(),
                        "frame_count disagrees with the stored blocks; using the blocks"
                    );
                }
                let blocks = hex_blocks(&r.frames, "frames");
                Container::from_parts(
                    FormatVersion::V1,
                    r.width,
                    r.height,
                    r.fps,
                    r.frame_interval,
                    parse_palette(&r.palette)?,
                    blocks,
                    ContainerExtras::default(),
                )
            }
            Self::V2(r) => {
                let blocks = hex_blocks(&r.frames, "frames");
                Container::from_parts(
                    FormatVersion::V2,
                    r.width,
                    r.height,
                    r.original_fps,
                    r.frame_skip,
                    parse_palette(&r.palette)?,
                    blocks,
                    ContainerExtras {
                        total_original_frames: r.total_original_frames,
                        ..ContainerExtras::default()
                    },
                )
            }
            Self::V3(r) => {
                let stream = hex::decode(&r.frame_data)
                    .map_err(|e| GenesisError::format("frame_data", e.to_string()))?;
                let blocks = unpack_blocks(&stream, "frame_data")?;
                Container::from_parts(
                    FormatVersion::V3,
                    r.width,
                    r.height,
                    r.original_fps,
                    r.frame_skip,
                    parse_palette(&r.palette)?,
                    blocks,
                    ContainerExtras {
                        total_original_frames: r.total_original_frames,
                        target_fps: r.target_fps,
                        duration_secs: r.duration_secs,
                        palette_policy: r.palette_policy,
                        dithering: r.dithering,
                    },
                )
            }
        }
    }

    /// Raise a container into the record layout of its version.
    pub(crate) fn from_container(c: &Container) -> GenesisResult<Self> {
        let palette: Vec<[i64; 3]> = c
            .palette()
            .colors()
            .iter()
            .map(|p| [i64::from(p[0]), i64::from(p[1]), i64::from(p[2])])
            .collect();
        let hex_frames = || c.blocks().iter().map(hex::encode).collect::<Vec<_>>();

        Ok(match c.version() {
            FormatVersion::V1 => Self::V1(V1Record {
                magic: MAGIC_V1.to_string(),
                width: c.width(),
                height: c.height(),
                fps: c.fps(),
                frame_interval: c.frame_interval(),
                frame_count: Some(c.frame_count() as u64),
                palette,
                frames: hex_frames(),
            }),
            FormatVersion::V2 => Self::V2(V2Record {
                magic: MAGIC.to_string(),
                version: 2,
                width: c.width(),
                height: c.height(),
                original_fps: c.fps(),
                frame_skip: c.frame_interval(),
                total_original_frames: c.extras().total_original_frames,
                palette,
                frames: hex_frames(),
            }),
            FormatVersion::V3 => {
                let extras = c.extras();
                Self::V3(V3Record {
                    magic: MAGIC.to_string(),
                    version: 3,
                    width: c.width(),
                    height: c.height(),
                    original_fps: c.fps(),
                    frame_skip: c.frame_interval(),
                    total_original_frames: extras.total_original_frames,
                    target_fps: extras.target_fps,
                    duration_secs: extras.duration_secs,
                    palette_policy: extras.palette_policy,
                    dithering: extras.dithering,
                    palette,
                    frame_data: hex::encode(pack_blocks(c.blocks())?),
                })
            }
        })
    }

    pub(crate) fn to_json(&self) -> GenesisResult<Vec<u8>> {
        let res = match self {
            Self::V1(r) => serde_json::to_vec(r),
            Self::V2(r) => serde_json::to_vec(r),
            Self::V3(r) => serde_json::to_vec(r),
        };
        res.map_err(|e| GenesisError::encode(format!("container serialization failed: {e}")))
    }
}

/// Optional metadata only some versions can carry.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ContainerExtras {
    /// Frames read from the source before retention sampling.
    pub total_original_frames: Option<u64>,
    /// Explicit playback rate; overrides `fps / frame_interval`.
    pub target_fps: Option<f64>,
    /// Intended playback duration of the stored frames.
    pub duration_secs: Option<f64>,
    /// Palette policy the encoder used (informational).
    pub palette_policy: Option<PalettePolicy>,
    /// Whether the encoder dithered (informational).
    pub dithering: Option<bool>,
}

impl ContainerExtras {
    /// Drop every field `version` cannot store, so the in-memory container matches what a save and
    /// reload would produce.
    pub fn for_version(self, version: FormatVersion) -> Self {
        match version {
            FormatVersion::V1 => Self::default(),
            FormatVersion::V2 => Self {
                total_original_frames: self.total_original_frames,
                ..Self::default()
            },
            FormatVersion::V3 => self,
        }
    }
}

fn parse_palette(raw: &[[i64; 3]]) -> GenesisResult<Palette> {
    if raw.is_empty() || raw.len() > MAX_PALETTE_COLORS {
        return Err(GenesisError::format(
            "palette",
            format!("expected 1..={MAX_PALETTE_COLORS} entries, got {}", raw.len()),
        ));
    }
    let mut colors = Vec::<Rgb>::with_capacity(raw.len());
    for (i, entry) in raw.iter().enumerate() {
        let mut c = [0u8; 3];
        for (dst, &v) in c.iter_mut().zip(entry) {
            *dst = u8::try_from(v).map_err(|_| {
                GenesisError::format(format!("palette[{i}]"), format!("channel {v} not in 0..=255"))
            })?;
        }
        colors.push(c);
    }
    Palette::new(colors)
}

/// Hex-decode each block. An undecodable block becomes empty so the reconstructor can recover it
/// like any other corrupt block instead of failing the whole container.
fn hex_blocks(frames: &[String], field: &str) -> Vec<Vec<u8>> {
    frames
        .iter()
        .enumerate()
        .map(|(i, h)| {
            hex::decode(h).unwrap_or_else(|e| {
                tracing::warn!(block = i, "{field}[{i}] is not valid hex ({e}); treating as corrupt");
                Vec::new()
            })
        })
        .collect()
}

#[cfg(test)]
#[path = "../../tests/unit/container/schema.rs"]
mod tests;
