//! Video decoder using FFmpeg via ffmpeg-sidecar.

use crate::probe::VideoProbe;
use ffmpeg_sidecar::child::FfmpegChild;
use ffmpeg_sidecar::command::FfmpegCommand;
use ffmpeg_sidecar::event::OutputVideoFrame;
use stabilo_core::{Frame, FrameRate, FrameSource, Result, StabiloError};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

type FrameIter = Box<dyn Iterator<Item = OutputVideoFrame>>;

/// Sequential RGB24 video decoder.
///
/// Uses ffmpeg-sidecar to spawn FFmpeg as a subprocess that writes raw
/// frames to a pipe. Seeking backwards restarts the subprocess; seeking
/// forwards decodes and discards frames.
pub struct VideoDecoder {
    path: PathBuf,
    probe: VideoProbe,
    child: Option<FfmpegChild>,
    frames: Option<FrameIter>,
    position: usize,
}

impl VideoDecoder {
    /// Open a video file for decoding.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let probe = VideoProbe::probe(&path)?;
        which::which("ffmpeg")
            .map_err(|_| StabiloError::SourceUnavailable("ffmpeg not found in PATH".into()))?;

        info!(
            path = %path.display(),
            width = probe.width,
            height = probe.height,
            frames = probe.frame_count,
            "Opening video file"
        );
        let mut decoder = Self {
            path,
            probe,
            child: None,
            frames: None,
            position: 0,
        };
        decoder
            .restart()
            .map_err(|e| StabiloError::SourceUnavailable(e.to_string()))?;
        Ok(decoder)
    }

    /// Get the file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Metadata gathered when the file was opened.
    pub fn probe(&self) -> &VideoProbe {
        &self.probe
    }

    /// Index of the frame the next read returns.
    pub fn position(&self) -> usize {
        self.position
    }

    fn stop(&mut self) {
        self.frames = None;
        if let Some(mut child) = self.child.take() {
            // The child may already have exited at end of stream.
            let _ = child.kill();
            let _ = child.wait();
        }
    }

    /// (Re)start decoding from the first frame.
    fn restart(&mut self) -> Result<()> {
        self.stop();
        let path = self.path.to_string_lossy().into_owned();
        let mut child = FfmpegCommand::new()
            .hide_banner()
            .input(&path)
            .args(["-an", "-sn"])
            .rawvideo()
            .spawn()
            .map_err(|e| StabiloError::Decoder(format!("failed to spawn ffmpeg: {e}")))?;
        let frames = child
            .iter()
            .map_err(|e| StabiloError::Decoder(format!("failed to read ffmpeg output: {e}")))?
            .filter_frames();
        self.frames = Some(Box::new(frames));
        self.child = Some(child);
        self.position = 0;
        debug!(path = %path, "Started decoder");
        Ok(())
    }
}

impl FrameSource for VideoDecoder {
    fn frame_count(&self) -> usize {
        self.probe.frame_count
    }

    fn dimensions(&self) -> (u32, u32) {
        (self.probe.width, self.probe.height)
    }

    fn frame_rate(&self) -> FrameRate {
        self.probe.frame_rate
    }

    fn seek(&mut self, index: usize) -> Result<()> {
        if index < self.position || self.frames.is_none() {
            self.restart()?;
        }
        while self.position < index {
            if self.read_next()?.is_none() {
                warn!(index, reached = self.position, "Seek past end of video");
                break;
            }
        }
        Ok(())
    }

    fn read_next(&mut self) -> Result<Option<Frame>> {
        let Some(frames) = self.frames.as_mut() else {
            return Ok(None);
        };
        let Some(raw) = frames.next() else {
            return Ok(None);
        };
        if (raw.width, raw.height) != (self.probe.width, self.probe.height) {
            return Err(StabiloError::Decoder(format!(
                "frame {} is {}x{}, expected {}x{}",
                self.position, raw.width, raw.height, self.probe.width, self.probe.height
            )));
        }
        let frame = Frame::from_raw(raw.width, raw.height, raw.data)?;
        self.position += 1;
        Ok(Some(frame))
    }
}

impl Drop for VideoDecoder {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_missing_file() {
        let err = VideoDecoder::open("/no/such/video.mp4").err().unwrap();
        assert!(matches!(err, StabiloError::SourceUnavailable(_)));
    }
}
