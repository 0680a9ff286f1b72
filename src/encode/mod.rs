//! Video sinks for reconstructed frames.

/// `ffmpeg`-based sink (system `ffmpeg`, H.264 output).
pub mod ffmpeg;
/// Generic frame sink trait and the in-memory sink.
pub mod sink;
