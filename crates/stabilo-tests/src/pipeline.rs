//! Integration tests for the two-pass stabilization pipeline.
//!
//! Exercises stabilo-core sources and sinks together with the
//! stabilo-tracking estimator, smoother and renderer.

use crate::scene::{shaky_video, static_video};
use stabilo_core::{Frame, FrameSource, MemorySink, MemorySource, Roi, Transform2D};
use stabilo_tracking::{
    fix_border, frame_to_gray, EstimatorParams, MotionEstimator, PreviewLayout,
    StabilizationParams, Stabilizer,
};

fn stabilized_only() -> StabilizationParams {
    StabilizationParams {
        layout: PreviewLayout::StabilizedOnly,
        ..Default::default()
    }
}

fn total_variation(path: &[Transform2D]) -> f64 {
    path.windows(2)
        .map(|w| (w[1].dx - w[0].dx).abs() + (w[1].dy - w[0].dy).abs())
        .sum()
}

// ── Motion analysis ────────────────────────────────────────────

#[test]
fn analysis_recovers_camera_shake() {
    let (mut source, offsets) = shaky_video(16);
    let analysis = Stabilizer::default().analyze(&mut source).unwrap();

    assert_eq!(analysis.transforms.len(), 15);
    assert!(analysis.failed_boundaries.is_empty());
    for (i, t) in analysis.transforms.iter().enumerate() {
        let truth_dx = (offsets[i + 1].0 - offsets[i].0) as f64;
        let truth_dy = (offsets[i + 1].1 - offsets[i].1) as f64;
        assert!((t.dx - truth_dx).abs() < 0.35, "boundary {i}: {t:?} vs ({truth_dx}, {truth_dy})");
        assert!((t.dy - truth_dy).abs() < 0.35, "boundary {i}: {t:?} vs ({truth_dx}, {truth_dy})");
        assert!(t.da.abs() < 0.01, "boundary {i}: {t:?}");
    }
}

#[test]
fn smoothed_trajectory_is_steadier() {
    let (mut source, _) = shaky_video(16);
    let analysis = Stabilizer::default().analyze(&mut source).unwrap();
    let raw = total_variation(analysis.trajectory.as_slice());
    let smooth = total_variation(analysis.smoothed.as_slice());
    assert!(smooth < raw * 0.25, "smoothed {smooth} vs raw {raw}");
}

#[test]
fn identical_frames_have_no_motion() {
    let mut source = static_video(8);
    let analysis = Stabilizer::default().analyze(&mut source).unwrap();
    assert_eq!(analysis.transforms, vec![Transform2D::ZERO; 7]);
    assert_eq!(analysis.smoothed, analysis.trajectory);
    assert_eq!(analysis.corrections, vec![Transform2D::ZERO; 7]);
}

#[test]
fn corrections_follow_the_smoothing_identity() {
    let (mut source, _) = shaky_video(12);
    let analysis = Stabilizer::default().analyze(&mut source).unwrap();
    for i in 0..analysis.corrections.len() {
        let lhs = analysis.corrections[i] - analysis.transforms[i];
        let rhs = analysis.smoothed[i] - analysis.trajectory[i];
        assert!((lhs - rhs).max_abs() < 1e-12);
    }
}

// ── Rendering ──────────────────────────────────────────────────

#[test]
fn side_by_side_output_keeps_original_on_the_left() {
    let (mut source, _) = shaky_video(6);
    let mut sink = MemorySink::new();
    let stabilizer = Stabilizer::default();
    let analysis = stabilizer.analyze(&mut source).unwrap();
    let summary = stabilizer.render(&mut source, &mut sink, &analysis).unwrap();

    assert_eq!(summary.frames_written, 5);
    assert_eq!(summary.output_size, (320, 120));
    assert!(sink.finished);
    source.seek(0).unwrap();
    for out in &sink.frames {
        let original = source.read_next().unwrap().unwrap();
        assert_eq!(out.dimensions(), (320, 120));
        assert_eq!(out.crop(&Roi::new(0, 0, 160, 120)).unwrap(), original);
    }
}

#[test]
fn static_video_renders_border_zoom_only() {
    let mut source = static_video(5);
    let stabilizer = Stabilizer::new(EstimatorParams::default(), stabilized_only());
    let mut sink = MemorySink::new();
    let out = &mut sink;
    let (_, summary) = stabilizer.run(&mut source, move |_, _| Ok(out)).unwrap();
    assert_eq!(summary.output_size, (160, 120));
    assert_eq!(sink.frames.len(), 4);

    source.seek(0).unwrap();
    let expected = fix_border(&source.read_next().unwrap().unwrap(), 1.04);
    assert!(sink.frames.iter().all(|f| *f == expected));
}

#[test]
fn stabilized_output_moves_less_than_input() {
    let (mut source, offsets) = shaky_video(16);
    let stabilizer = Stabilizer::new(EstimatorParams::default(), stabilized_only());
    let mut sink = MemorySink::new();
    let out = &mut sink;
    stabilizer.run(&mut source, move |_, _| Ok(out)).unwrap();

    let estimator = MotionEstimator::default();
    let gray: Vec<_> = sink.frames.iter().map(frame_to_gray).collect();
    let residual: Vec<f64> = gray
        .windows(2)
        .filter_map(|w| estimator.estimate(&w[0], &w[1]).ok())
        .map(|t| t.dx.abs() + t.dy.abs())
        .collect();
    assert!(residual.len() >= 10);
    let residual_mean = residual.iter().sum::<f64>() / residual.len() as f64;

    let raw_mean = offsets
        .windows(2)
        .map(|w| ((w[1].0 - w[0].0).abs() + (w[1].1 - w[0].1).abs()) as f64)
        .sum::<f64>()
        / (offsets.len() - 1) as f64;
    assert!(residual_mean < 0.75, "residual {residual_mean}");
    assert!(residual_mean < raw_mean * 0.3, "residual {residual_mean} vs raw {raw_mean}");
}

#[test]
fn wide_video_preview_is_downscaled() {
    let frames = vec![Frame::test_pattern(1000, 40); 3];
    let mut source = MemorySource::new(frames, stabilo_core::FrameRate::FPS_30).unwrap();
    let mut opened = None;
    let (_, summary) = Stabilizer::default()
        .run(&mut source, |size, _| {
            opened = Some(size);
            Ok(MemorySink::new())
        })
        .unwrap();
    assert_eq!(opened, Some((1000, 20)));
    assert_eq!(summary.output_size, (1000, 20));
    assert_eq!(summary.frames_written, 2);
}
