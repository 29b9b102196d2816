//! Integration tests for region tracking on stabilized footage.
//!
//! Mirrors the application flow: stabilize, select a region on an early
//! frame of the result, average it over a frame range and save images.

use crate::scene::{scene_frame, static_video};
use stabilo_core::{
    CenteredRegion, Frame, FrameRate, FrameSource, ImageWriter, MemorySink, MemorySource,
    RegionSelector, Roi,
};
use stabilo_media::{read_image, render_html_report, write_html_report, ImageFileWriter};
use stabilo_tracking::{FrameRange, PreviewLayout, RegionTracker, StabilizationParams, Stabilizer};

fn stabilize_to_memory(source: &mut MemorySource) -> MemorySource {
    let params = StabilizationParams {
        layout: PreviewLayout::StabilizedOnly,
        ..Default::default()
    };
    let mut sink = MemorySink::new();
    let out = &mut sink;
    Stabilizer::new(Default::default(), params)
        .run(source, move |_, _| Ok(out))
        .unwrap();
    MemorySource::new(sink.frames, FrameRate::FPS_30).unwrap()
}

#[test]
fn mean_of_static_stabilized_video_is_the_region() {
    let mut source = static_video(12);
    let mut stabilized = stabilize_to_memory(&mut source);
    assert_eq!(stabilized.frame_count(), 11);

    stabilized.seek(2).unwrap();
    let opening = stabilized.read_next().unwrap().unwrap();
    let roi = CenteredRegion::default().select(&opening).unwrap();
    assert_eq!(roi, Roi::new(60, 45, 40, 30));

    let average = RegionTracker::default()
        .track(&mut stabilized, roi, FrameRange::new(2, 8))
        .unwrap();
    assert_eq!(average.frames_accumulated, 7);
    assert_eq!(average.final_roi, roi);
    assert_eq!(average.mean, opening.crop(&roi).unwrap());
}

#[test]
fn range_is_clamped_to_the_video() {
    let frames = (0..6).map(|i| Frame::filled(32, 32, [i * 10; 3])).collect();
    let mut source = MemorySource::new(frames, FrameRate::FPS_30).unwrap();
    let average = RegionTracker::default()
        .track(&mut source, Roi::new(4, 4, 8, 8), FrameRange::new(-5, 100))
        .unwrap();
    assert_eq!(average.range, (0, 5));
    assert_eq!(average.frames_accumulated, 6);
    // (0 + 10 + 20 + 30 + 40 + 50) / 6 = 25
    assert_eq!(average.mean, Frame::filled(8, 8, [25; 3]));
}

#[test]
fn saves_mean_original_and_report() {
    let dir = tempfile::tempdir().unwrap();
    let mut source = static_video(10);
    let roi = Roi::new(20, 20, 32, 24);
    let average = RegionTracker::default()
        .track(&mut source, roi, FrameRange::new(2, 8))
        .unwrap();

    let mean_path = dir.path().join("mean.png");
    let original_path = dir.path().join("mean_original.png");
    let report_path = dir.path().join("report.html");
    ImageFileWriter.write(&average.mean, &mean_path).unwrap();
    ImageFileWriter
        .write(&scene_frame(160, 120, 0.0, 0.0).crop(&roi).unwrap(), &original_path)
        .unwrap();
    write_html_report(&original_path, &mean_path, &report_path).unwrap();

    assert_eq!(read_image(&mean_path).unwrap(), average.mean);
    assert_eq!(read_image(&original_path).unwrap(), average.mean);
    let html = std::fs::read_to_string(&report_path).unwrap();
    assert_eq!(html, render_html_report(&original_path, &mean_path, &report_path));
    assert!(html.contains("src=\"mean_original.png\""));
}
