//! Video encoding by piping raw RGB24 frames into an FFmpeg process.

use serde::{Deserialize, Serialize};
use stabilo_core::{Frame, FrameRate, FrameSink, Result, StabiloError};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, Stdio};
use tracing::{debug, info};

/// Video codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VideoCodec {
    #[default]
    H264,
    /// MPEG-4 Part 2, the `mp4v` FourCC.
    Mpeg4,
}

impl VideoCodec {
    /// FFmpeg encoder name.
    pub fn ffmpeg_encoder(self) -> &'static str {
        match self {
            Self::H264 => "libx264",
            Self::Mpeg4 => "mpeg4",
        }
    }
}

/// Encoder configuration for one output file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputFormat {
    pub codec: VideoCodec,
    pub width: u32,
    pub height: u32,
    pub frame_rate: FrameRate,
    /// CRF for H.264 (0-51), `-q:v` for MPEG-4 (1-31). Lower is better.
    pub quality: Option<u32>,
    /// Bitrate in kbps (overrides quality if set).
    pub video_bitrate: Option<u32>,
}

impl OutputFormat {
    /// H.264 at CRF 18.
    pub fn new(width: u32, height: u32, frame_rate: FrameRate) -> Self {
        Self {
            codec: VideoCodec::H264,
            width,
            height,
            frame_rate,
            quality: Some(18),
            video_bitrate: None,
        }
    }

    pub fn with_codec(mut self, codec: VideoCodec) -> Self {
        self.quality = match codec {
            VideoCodec::H264 => Some(18),
            VideoCodec::Mpeg4 => Some(3),
        };
        self.codec = codec;
        self
    }

    /// Bytes in one raw RGB24 input frame.
    pub fn frame_bytes(&self) -> usize {
        self.width as usize * self.height as usize * Frame::CHANNELS
    }

    /// Build the FFmpeg command arguments.
    pub fn ffmpeg_args(&self, output: &Path) -> Vec<String> {
        let mut args = Vec::new();

        // Input from pipe (raw frames)
        args.extend_from_slice(&[
            "-y".into(),
            "-hide_banner".into(),
            "-loglevel".into(),
            "error".into(),
            "-f".into(),
            "rawvideo".into(),
            "-pixel_format".into(),
            "rgb24".into(),
            "-video_size".into(),
            format!("{}x{}", self.width, self.height),
            "-framerate".into(),
            format!("{}/{}", self.frame_rate.numerator, self.frame_rate.denominator),
            "-i".into(),
            "pipe:0".into(),
        ]);

        args.extend_from_slice(&["-c:v".into(), self.codec.ffmpeg_encoder().into()]);

        if let Some(bitrate) = self.video_bitrate {
            args.extend_from_slice(&["-b:v".into(), format!("{}k", bitrate)]);
        } else if let Some(q) = self.quality {
            let flag = match self.codec {
                VideoCodec::H264 => "-crf",
                VideoCodec::Mpeg4 => "-q:v",
            };
            args.extend_from_slice(&[flag.into(), q.to_string()]);
        }

        // yuv420p needs even dimensions; pad odd ones by a pixel.
        if self.width % 2 != 0 || self.height % 2 != 0 {
            args.extend_from_slice(&["-vf".into(), "pad=ceil(iw/2)*2:ceil(ih/2)*2".into()]);
        }
        args.extend_from_slice(&["-pix_fmt".into(), "yuv420p".into()]);

        args.push(output.to_string_lossy().into_owned());
        args
    }
}

/// Frame sink that encodes to a video file.
pub struct VideoEncoder {
    path: PathBuf,
    format: OutputFormat,
    child: Child,
    stdin: Option<ChildStdin>,
    frames_written: usize,
}

impl VideoEncoder {
    /// Spawn FFmpeg writing to `path`.
    pub fn create<P: AsRef<Path>>(path: P, format: OutputFormat) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if format.width == 0 || format.height == 0 || !format.frame_rate.is_valid() {
            return Err(StabiloError::InvalidParameter(format!(
                "cannot encode {}x{} at {}",
                format.width, format.height, format.frame_rate
            )));
        }
        let ffmpeg = which::which("ffmpeg")
            .map_err(|_| StabiloError::Encoder("ffmpeg not found in PATH".into()))?;

        let args = format.ffmpeg_args(&path);
        debug!(?args, "Spawning encoder");
        let mut child = Command::new(ffmpeg)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| StabiloError::Encoder(format!("Failed to spawn ffmpeg: {e}")))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| StabiloError::Encoder("Failed to open ffmpeg stdin".into()))?;

        info!(
            path = %path.display(),
            width = format.width,
            height = format.height,
            codec = format.codec.ffmpeg_encoder(),
            "Opened video encoder"
        );
        Ok(Self {
            path,
            format,
            child,
            stdin: Some(stdin),
            frames_written: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn format(&self) -> &OutputFormat {
        &self.format
    }

    pub fn frames_written(&self) -> usize {
        self.frames_written
    }
}

impl FrameSink for VideoEncoder {
    fn write_frame(&mut self, frame: &Frame) -> Result<()> {
        if frame.dimensions() != (self.format.width, self.format.height) {
            return Err(StabiloError::Encoder(format!(
                "frame is {}x{}, encoder expects {}x{}",
                frame.width, frame.height, self.format.width, self.format.height
            )));
        }
        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| StabiloError::Encoder("encoder already finished".into()))?;
        stdin
            .write_all(&frame.data)
            .map_err(|e| StabiloError::Encoder(format!("Failed to write frame: {e}")))?;
        self.frames_written += 1;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        // Close stdin to signal end-of-stream
        let Some(stdin) = self.stdin.take() else {
            return Ok(());
        };
        drop(stdin);

        let status = self
            .child
            .wait()
            .map_err(|e| StabiloError::Encoder(format!("Failed to wait for ffmpeg: {e}")))?;
        if !status.success() {
            return Err(StabiloError::Encoder(format!(
                "ffmpeg exited with status: {}",
                status
            )));
        }
        info!(
            path = %self.path.display(),
            frames = self.frames_written,
            "Finished encoding"
        );
        Ok(())
    }
}

impl Drop for VideoEncoder {
    fn drop(&mut self) {
        // Unfinished output is abandoned.
        if self.stdin.take().is_some() {
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
    }
}
