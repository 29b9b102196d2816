//! Stabilo Media - FFmpeg integration for video I/O
//!
//! This crate handles:
//! - Video probing with ffprobe
//! - Decoding to RGB24 frames ([`VideoDecoder`], a `FrameSource`)
//! - Encoding from RGB24 frames ([`VideoEncoder`], a `FrameSink`)
//! - Still images and the HTML report

pub mod decoder;
pub mod encoder;
pub mod image_writer;
pub mod probe;
pub mod report;

pub use decoder::VideoDecoder;
pub use encoder::{OutputFormat, VideoCodec, VideoEncoder};
pub use image_writer::{read_image, ImageFileWriter};
pub use probe::VideoProbe;
pub use report::{render_html_report, write_html_report};

/// Whether the ffmpeg and ffprobe binaries can be found.
pub fn ffmpeg_available() -> bool {
    which::which("ffmpeg").is_ok() && which::which("ffprobe").is_ok()
}
