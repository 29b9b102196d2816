//! Video probing through `ffprobe` to get metadata without a full decode.

use serde::{Deserialize, Serialize};
use stabilo_core::{FrameRate, Result, StabiloError};
use std::path::Path;
use std::process::{Command, Stdio};
use tracing::debug;

/// What the decoder needs to know about a video stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoProbe {
    pub width: u32,
    pub height: u32,
    pub frame_rate: FrameRate,
    /// Frame count from the container, or from counted packets when the
    /// container does not record it.
    pub frame_count: usize,
    pub codec: String,
}

/// ffprobe JSON output format.
#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: Option<String>,
    codec_name: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
    avg_frame_rate: Option<String>,
    nb_frames: Option<String>,
    nb_read_packets: Option<String>,
}

impl VideoProbe {
    /// Run `ffprobe` on `path` and describe its first video stream.
    pub fn probe<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(StabiloError::SourceUnavailable(format!(
                "File not found: {}",
                path.display()
            )));
        }
        let ffprobe = which::which("ffprobe")
            .map_err(|_| StabiloError::SourceUnavailable("ffprobe not found in PATH".into()))?;

        let output = Command::new(ffprobe)
            .args([
                "-v",
                "error",
                "-select_streams",
                "v:0",
                "-count_packets",
                "-print_format",
                "json",
                "-show_streams",
            ])
            .arg(path)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| StabiloError::SourceUnavailable(format!("failed to run ffprobe: {e}")))?;

        if !output.status.success() {
            return Err(StabiloError::SourceUnavailable(format!(
                "ffprobe failed on {}: {}",
                path.display(),
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        let probe = Self::from_json(&output.stdout)?;
        debug!(
            path = %path.display(),
            width = probe.width,
            height = probe.height,
            frames = probe.frame_count,
            fps = %probe.frame_rate,
            "Probed video"
        );
        Ok(probe)
    }

    /// Parse `ffprobe -print_format json -show_streams` output.
    pub fn from_json(json: &[u8]) -> Result<Self> {
        let parsed: FfprobeOutput = serde_json::from_slice(json)
            .map_err(|e| StabiloError::Serialization(format!("invalid ffprobe output: {e}")))?;
        let stream = parsed
            .streams
            .into_iter()
            .find(|s| s.codec_type.as_deref().map_or(true, |t| t == "video"))
            .ok_or_else(|| StabiloError::SourceUnavailable("no video stream found".into()))?;

        let (width, height) = match (stream.width, stream.height) {
            (Some(w), Some(h)) if w > 0 && h > 0 => (w, h),
            _ => {
                return Err(StabiloError::SourceUnavailable(
                    "video stream has no dimensions".into(),
                ))
            }
        };
        let frame_rate = [&stream.avg_frame_rate, &stream.r_frame_rate]
            .into_iter()
            .flatten()
            .find_map(|r| r.parse::<FrameRate>().ok())
            .unwrap_or_default();
        let frame_count = [&stream.nb_frames, &stream.nb_read_packets]
            .into_iter()
            .flatten()
            .find_map(|n| n.parse::<usize>().ok().filter(|&n| n > 0))
            .unwrap_or(0);

        Ok(Self {
            width,
            height,
            frame_rate,
            frame_count,
            codec: stream.codec_name.unwrap_or_default(),
        })
    }
}
