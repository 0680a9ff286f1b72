use std::collections::VecDeque;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdout, Command, Stdio};

use crate::foundation::core::Dimensions;
use crate::foundation::error::{GenesisError, GenesisResult};
use crate::frame::RgbFrame;
use crate::media::probe::{SourceInfo, probe_video};

/// A lazy, finite, non-restartable sequence of raw frames.
pub trait FrameSource {
    /// Stream metadata, available before the first frame.
    fn info(&self) -> &SourceInfo;
    /// The next frame, or `None` at end of stream or once the frame cap is reached.
    fn next_frame(&mut self) -> GenesisResult<Option<RgbFrame>>;
}

/// Frames held in memory. Used by tests and by callers that decode video themselves.
pub struct MemorySource {
    info: SourceInfo,
    frames: VecDeque<RgbFrame>,
    remaining: Option<u64>,
}

impl MemorySource {
    /// All frames must share the dimensions of the first one.
    pub fn new(fps: f64, frames: Vec<RgbFrame>) -> GenesisResult<Self> {
        let dims = frames
            .first()
            .map(RgbFrame::dims)
            .ok_or_else(|| GenesisError::open("memory source holds no frames"))?;
        Self::with_info(
            SourceInfo {
                dims,
                fps,
                frame_count_hint: Some(frames.len() as u64),
            },
            frames,
        )
    }

    /// Explicit metadata; `frames` may be empty.
    pub fn with_info(info: SourceInfo, frames: Vec<RgbFrame>) -> GenesisResult<Self> {
        if let Some(i) = frames.iter().position(|f| f.dims() != info.dims) {
            return Err(GenesisError::open(format!(
                "memory source frame {i} is {}, expected {}",
                frames[i].dims(),
                info.dims
            )));
        }
        if !info.fps.is_finite() || info.fps <= 0.0 {
            return Err(GenesisError::open(format!(
                "memory source fps {} is invalid",
                info.fps
            )));
        }
        Ok(Self {
            info,
            frames: frames.into(),
            remaining: None,
        })
    }

    /// Stop after `cap` frames. `Some(0)` means no cap, as for [`FfmpegSource::open`].
    pub fn with_cap(mut self, cap: Option<u64>) -> Self {
        self.remaining = cap.filter(|&c| c > 0);
        self
    }
}

impl FrameSource for MemorySource {
    fn info(&self) -> &SourceInfo {
        &self.info
    }

    fn next_frame(&mut self) -> GenesisResult<Option<RgbFrame>> {
        if let Some(left) = self.remaining.as_mut() {
            if *left == 0 {
                return Ok(None);
            }
            *left -= 1;
        }
        Ok(self.frames.pop_front())
    }
}

/// Frames decoded by a system `ffmpeg` child process, streamed as `rgb24` over stdout.
///
/// The child is killed and reaped when the source is dropped, whether or not the stream was
/// read to the end.
pub struct FfmpegSource {
    path: PathBuf,
    info: SourceInfo,
    child: Option<Child>,
    stdout: Option<ChildStdout>,
    stderr_drain: Option<std::thread::JoinHandle<std::io::Result<Vec<u8>>>>,
    cap: Option<u64>,
    produced: u64,
    done: bool,
}

impl FfmpegSource {
    /// Probe and start decoding `path`. `frame_cap` of `Some(0)` is treated as no cap.
    pub fn open(path: &Path, frame_cap: Option<u64>) -> GenesisResult<Self> {
        if !path.is_file() {
            return Err(GenesisError::open(format!(
                "source '{}' does not exist or is not a file",
                path.display()
            )));
        }
        let info = probe_video(path)?;

        let mut child = Command::new("ffmpeg")
            .args(["-v", "error", "-nostdin", "-i"])
            .arg(path)
            .args(["-map", "0:v:0", "-f", "rawvideo", "-pix_fmt", "rgb24", "pipe:1"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                GenesisError::open(format!(
                    "failed to spawn ffmpeg (is it installed and on PATH?): {e}"
                ))
            })?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| GenesisError::open("failed to open ffmpeg stdout (unexpected)"))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| GenesisError::open("failed to open ffmpeg stderr (unexpected)"))?;
        let stderr_drain = std::thread::spawn(move || {
            let mut bytes = Vec::new();
            stderr.read_to_end(&mut bytes)?;
            Ok(bytes)
        });

        tracing::info!(
            source = %path.display(),
            dims = %info.dims,
            fps = info.fps,
            frames_hint = ?info.frame_count_hint,
            "opened video source"
        );
        Ok(Self {
            path: path.to_path_buf(),
            info,
            child: Some(child),
            stdout: Some(stdout),
            stderr_drain: Some(stderr_drain),
            cap: frame_cap.filter(|&c| c > 0),
            produced: 0,
            done: false,
        })
    }

    /// Reap the child after the stream ended. A failing decoder is only an error when it produced
    /// nothing; a truncated tail is logged and treated as end of stream.
    fn finish_stream(&mut self) -> GenesisResult<()> {
        self.done = true;
        drop(self.stdout.take());
        let Some(mut child) = self.child.take() else {
            return Ok(());
        };
        let status = if self.cap.is_some_and(|c| self.produced >= c) {
            let _ = child.kill();
            child.wait()
        } else {
            child.wait()
        }
        .map_err(|e| GenesisError::open(format!("failed to wait for ffmpeg decoder: {e}")))?;
        let stderr = self
            .stderr_drain
            .take()
            .and_then(|h| h.join().ok())
            .and_then(|r| r.ok())
            .unwrap_or_default();

        let capped = self.cap.is_some_and(|c| self.produced >= c);
        if !status.success() && !capped {
            let msg = String::from_utf8_lossy(&stderr);
            if self.produced == 0 {
                return Err(GenesisError::open(format!(
                    "ffmpeg could not decode '{}': {}",
                    self.path.display(),
                    msg.trim()
                )));
            }
            tracing::warn!(
                frames = self.produced,
                "ffmpeg decoder exited with {status} after partial output: {}",
                msg.trim()
            );
        }
        Ok(())
    }
}

impl FrameSource for FfmpegSource {
    fn info(&self) -> &SourceInfo {
        &self.info
    }

    fn next_frame(&mut self) -> GenesisResult<Option<RgbFrame>> {
        if self.done {
            return Ok(None);
        }
        if self.cap.is_some_and(|c| self.produced >= c) {
            self.finish_stream()?;
            return Ok(None);
        }
        let Some(stdout) = self.stdout.as_mut() else {
            return Ok(None);
        };

        let dims: Dimensions = self.info.dims;
        let mut buf = vec![0u8; dims.rgb_len()];
        let mut filled = 0usize;
        while filled < buf.len() {
            match stdout.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    return Err(GenesisError::open(format!(
                        "failed reading frame {} from ffmpeg: {e}",
                        self.produced
                    )));
                }
            }
        }
        if filled < buf.len() {
            if filled > 0 {
                tracing::warn!(
                    frame = self.produced,
                    bytes = filled,
                    "dropping truncated trailing frame"
                );
            }
            self.finish_stream()?;
            return Ok(None);
        }

        self.produced += 1;
        Ok(Some(RgbFrame::new(dims, buf)?))
    }
}

impl Drop for FfmpegSource {
    fn drop(&mut self) {
        drop(self.stdout.take());
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
        if let Some(handle) = self.stderr_drain.take() {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(v: u8) -> RgbFrame {
        RgbFrame::solid(Dimensions::new(2, 2).unwrap(), [v, v, v])
    }

    #[test]
    fn memory_source_yields_in_order_then_ends() {
        let mut src = MemorySource::new(24.0, vec![frame(1), frame(2)]).unwrap();
        assert_eq!(src.info().fps, 24.0);
        assert_eq!(src.next_frame().unwrap(), Some(frame(1)));
        assert_eq!(src.next_frame().unwrap(), Some(frame(2)));
        assert_eq!(src.next_frame().unwrap(), None);
        assert_eq!(src.next_frame().unwrap(), None);
    }

    #[test]
    fn memory_source_honors_cap() {
        let mut src = MemorySource::new(24.0, vec![frame(1), frame(2), frame(3)])
            .unwrap()
            .with_cap(Some(2));
        assert!(src.next_frame().unwrap().is_some());
        assert!(src.next_frame().unwrap().is_some());
        assert_eq!(src.next_frame().unwrap(), None);
    }

    #[test]
    fn memory_source_rejects_mixed_sizes_and_empty_input() {
        let odd = RgbFrame::solid(Dimensions::new(3, 2).unwrap(), [0, 0, 0]);
        assert!(MemorySource::new(24.0, vec![frame(1), odd]).is_err());
        assert!(matches!(
            MemorySource::new(24.0, Vec::new()),
            Err(GenesisError::Open(_))
        ));
        assert!(MemorySource::new(0.0, vec![frame(1)]).is_err());
    }

    #[test]
    fn explicit_info_allows_an_empty_stream() {
        let info = SourceInfo {
            dims: Dimensions::new(2, 2).unwrap(),
            fps: 30.0,
            frame_count_hint: None,
        };
        let mut src = MemorySource::with_info(info, Vec::new()).unwrap();
        assert_eq!(src.next_frame().unwrap(), None);
    }

    #[test]
    fn missing_file_is_an_open_error() {
        let err = FfmpegSource::open(Path::new("definitely/not/here.mp4"), None)
            .err()
            .unwrap();
        assert!(matches!(err, GenesisError::Open(_)), "{err}");
    }
}
