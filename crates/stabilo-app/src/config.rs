//! Application configuration and command-line arguments.

use clap::Parser;
use serde::{Deserialize, Serialize};
use stabilo_core::{Result, Roi, StabiloError};
use stabilo_media::VideoCodec;
use stabilo_tracking::{EstimatorParams, FrameRange, RegionTrackerParams, StabilizationParams};
use std::path::{Path, PathBuf};

/// Where and how the region average is taken.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegionConfig {
    /// Frame of the stabilized video the region is chosen on.
    pub selection_frame: usize,
    pub frame_min: i64,
    pub frame_max: i64,
    /// Fixed region; when absent a centred one is used.
    pub roi: Option<Roi>,
    /// Size of the centred region as a fraction of each frame dimension.
    pub centered_fraction: f64,
    pub tracker: RegionTrackerParams,
}

impl Default for RegionConfig {
    fn default() -> Self {
        Self {
            selection_frame: 2,
            frame_min: 2,
            frame_max: 8,
            roi: None,
            centered_fraction: 0.25,
            tracker: RegionTrackerParams::default(),
        }
    }
}

impl RegionConfig {
    pub fn range(&self) -> FrameRange {
        FrameRange::new(self.frame_min, self.frame_max)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub input: PathBuf,
    pub stabilized_output: PathBuf,
    pub mean_image: PathBuf,
    pub report: PathBuf,
    pub codec: VideoCodec,
    /// Used when `RUST_LOG` is not set.
    pub log_level: String,
    pub stabilization: StabilizationParams,
    pub estimator: EstimatorParams,
    pub region: RegionConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            input: PathBuf::from("input.mp4"),
            stabilized_output: PathBuf::from("stabilized.mp4"),
            mean_image: PathBuf::from("mean.jpg"),
            report: PathBuf::from("report.html"),
            codec: VideoCodec::H264,
            log_level: "info".into(),
            stabilization: StabilizationParams::default(),
            estimator: EstimatorParams::default(),
            region: RegionConfig::default(),
        }
    }
}

impl AppConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| StabiloError::Config(e.to_string()))
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| StabiloError::Serialization(e.to_string()))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
            .map_err(|e| StabiloError::Config(format!("{}: {e}", path.display())))
    }

    /// Positional arguments take precedence over the file.
    pub fn apply_args(&mut self, args: &CliArgs) {
        if let Some(input) = &args.input {
            self.input = input.clone();
        }
        if let Some(output) = &args.output {
            self.stabilized_output = output.clone();
        }
    }

    /// The crop of the selection frame, saved next to the mean image as
    /// `<stem>_original.<ext>`.
    pub fn original_image(&self) -> PathBuf {
        let stem = self
            .mean_image
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "mean".into());
        let name = match self.mean_image.extension() {
            Some(ext) => format!("{stem}_original.{}", ext.to_string_lossy()),
            None => format!("{stem}_original"),
        };
        self.mean_image.with_file_name(name)
    }
}

/// Stabilize a video, then average a tracked region of the result.
#[derive(Parser, Debug, Clone, Default, PartialEq)]
#[command(name = "stabilo")]
#[command(version, about = "Video stabilizer and region averager", long_about = None)]
pub struct CliArgs {
    /// JSON configuration file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Input video (overrides the config)
    #[arg(value_name = "INPUT")]
    pub input: Option<PathBuf>,

    /// Stabilized output video (overrides the config)
    #[arg(value_name = "OUTPUT")]
    pub output: Option<PathBuf>,
}
