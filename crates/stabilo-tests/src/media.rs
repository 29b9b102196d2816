//! Integration tests for the ffmpeg-backed source and sink.
//!
//! These need the `ffmpeg` and `ffprobe` binaries and are skipped when
//! they are not installed.

use crate::scene::{jitter, scene_frame};
use stabilo_core::{Frame, FrameRate, FrameSink, FrameSource};
use stabilo_media::{ffmpeg_available, OutputFormat, VideoCodec, VideoDecoder, VideoEncoder, VideoProbe};
use stabilo_tracking::{FrameRange, RegionTracker, Stabilizer};
use std::path::Path;

fn skip() -> bool {
    if ffmpeg_available() {
        return false;
    }
    eprintln!("ffmpeg not installed, skipping");
    true
}

fn mean_abs_diff(a: &Frame, b: &Frame) -> f64 {
    let sum: u64 = a
        .data
        .iter()
        .zip(&b.data)
        .map(|(x, y)| (*x as i32 - *y as i32).unsigned_abs() as u64)
        .sum();
    sum as f64 / a.data.len() as f64
}

fn write_shaky_clip(path: &Path, count: usize) -> Vec<Frame> {
    let frames: Vec<Frame> = (0..count)
        .map(|i| {
            let (dx, dy) = jitter(i);
            scene_frame(160, 120, dx, dy)
        })
        .collect();
    let format = OutputFormat::new(160, 120, FrameRate::FPS_25).with_codec(VideoCodec::Mpeg4);
    let mut encoder = VideoEncoder::create(path, format).unwrap();
    for frame in &frames {
        encoder.write_frame(frame).unwrap();
    }
    encoder.finish().unwrap();
    assert_eq!(encoder.frames_written(), count);
    frames
}

#[test]
fn encode_then_probe_and_decode() {
    if skip() {
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("clip.mp4");
    let frames = write_shaky_clip(&path, 12);

    let probe = VideoProbe::probe(&path).unwrap();
    assert_eq!((probe.width, probe.height), (160, 120));
    assert_eq!(probe.frame_count, 12);
    assert_eq!(probe.frame_rate, FrameRate::FPS_25);

    let mut decoder = VideoDecoder::open(&path).unwrap();
    let mut decoded = Vec::new();
    while let Some(frame) = decoder.read_next().unwrap() {
        decoded.push(frame);
    }
    assert_eq!(decoded.len(), 12);
    for (original, back) in frames.iter().zip(&decoded) {
        assert!(mean_abs_diff(original, back) < 8.0);
    }
}

#[test]
fn decoder_seeks_both_ways() {
    if skip() {
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("clip.mp4");
    write_shaky_clip(&path, 10);

    let mut decoder = VideoDecoder::open(&path).unwrap();
    decoder.seek(6).unwrap();
    let sixth = decoder.read_next().unwrap().unwrap();
    assert_eq!(decoder.position(), 7);
    decoder.seek(2).unwrap();
    assert_eq!(decoder.position(), 2);
    decoder.seek(6).unwrap();
    assert_eq!(decoder.read_next().unwrap().unwrap(), sixth);
}

#[test]
fn stabilize_file_to_file() {
    if skip() {
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("shaky.mp4");
    let output = dir.path().join("stabilized.mp4");
    write_shaky_clip(&input, 14);

    let mut decoder = VideoDecoder::open(&input).unwrap();
    let (analysis, summary) = Stabilizer::default()
        .run(&mut decoder, |(w, h), rate| {
            VideoEncoder::create(
                &output,
                OutputFormat::new(w, h, rate).with_codec(VideoCodec::Mpeg4),
            )
        })
        .unwrap();
    assert_eq!(analysis.transforms.len(), 13);
    assert_eq!(summary.frames_written, 13);

    let mut stabilized = VideoDecoder::open(&output).unwrap();
    assert_eq!(stabilized.dimensions(), (320, 120));
    assert_eq!(stabilized.frame_count(), 13);

    let average = RegionTracker::default()
        .track(&mut stabilized, stabilo_core::Roi::new(200, 40, 40, 30), FrameRange::new(2, 8))
        .unwrap();
    assert_eq!(average.frames_accumulated, 7);
    assert!(!average.truncated);
}
