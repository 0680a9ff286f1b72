//! Raw-frame sources and the spatial reduction applied before encoding.

/// `ffprobe` metadata probing.
pub mod probe;
/// Aspect-preserving downscale.
pub mod scale;
/// The `FrameSource` trait with in-memory and `ffmpeg` implementations.
pub mod source;
