//! Two-pass stabilization driver.
//!
//! Pass 1 reads the whole video once, estimating motion between every pair
//! of consecutive frames, and derives the corrections. Pass 2 reads it again
//! and writes one corrected frame per frame boundary to a sink.

use crate::motion::{EstimatorParams, MotionEstimator};
use crate::pyramid::frame_to_gray;
use crate::stabilize::{compose_output, output_dimensions, render, StabilizationParams};
use crate::trajectory::{self, Trajectory};
use stabilo_core::{FrameRate, FrameSink, FrameSource, Result, StabiloError, Transform2D};
use tracing::{info, warn};

const PROGRESS_EVERY: usize = 100;

/// Everything pass 1 learns about the video.
#[derive(Debug, Clone, Default)]
pub struct MotionAnalysis {
    /// Per-boundary motion, always `frame_count - 1` long. Failed boundaries
    /// and boundaries after a truncated stream hold [`Transform2D::ZERO`].
    pub transforms: Vec<Transform2D>,
    pub trajectory: Trajectory,
    pub smoothed: Trajectory,
    pub corrections: Vec<Transform2D>,
    /// Boundaries where no motion could be estimated.
    pub failed_boundaries: Vec<usize>,
    pub frames_read: usize,
    pub truncated: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderSummary {
    pub frames_written: usize,
    pub output_size: (u32, u32),
    pub truncated: bool,
}

#[derive(Debug, Clone, Default)]
pub struct Stabilizer {
    estimator: MotionEstimator,
    params: StabilizationParams,
}

impl Stabilizer {
    pub fn new(estimator: EstimatorParams, params: StabilizationParams) -> Self {
        Self {
            estimator: MotionEstimator::new(estimator),
            params,
        }
    }

    pub fn params(&self) -> &StabilizationParams {
        &self.params
    }

    /// Output frame size for a source of the given size.
    pub fn output_dimensions(&self, width: u32, height: u32) -> (u32, u32) {
        output_dimensions(width, height, &self.params)
    }

    /// Pass 1: estimate, accumulate and smooth the camera motion.
    pub fn analyze<S: FrameSource + ?Sized>(&self, source: &mut S) -> Result<MotionAnalysis> {
        let expected = source.frame_count();
        source.seek(0)?;
        let first = source
            .read_next()?
            .ok_or_else(|| StabiloError::SourceUnavailable("video contains no frames".into()))?;

        let mut prev_gray = frame_to_gray(&first);
        let boundaries = expected.saturating_sub(1);
        let mut transforms = Vec::with_capacity(boundaries);
        let mut failed_boundaries = Vec::new();
        let mut frames_read = 1;
        let mut truncated = false;

        for boundary in 0..boundaries {
            let frame = match source.read_next() {
                Ok(Some(frame)) => frame,
                Ok(None) => {
                    warn!(frames_read, expected, "Video ended early during motion analysis");
                    truncated = true;
                    break;
                }
                Err(e) => {
                    warn!(frames_read, error = %e, "Frame read failed during motion analysis");
                    truncated = true;
                    break;
                }
            };
            frames_read += 1;
            let curr_gray = frame_to_gray(&frame);
            let transform = match self.estimator.estimate(&prev_gray, &curr_gray) {
                Ok(t) => {
                    prev_gray = curr_gray;
                    t
                }
                Err(e) => {
                    // Keep the last good frame as reference so the next
                    // boundary picks up the motion missed here.
                    warn!(boundary, error = %e, "Motion estimation failed, assuming no motion");
                    failed_boundaries.push(boundary);
                    Transform2D::ZERO
                }
            };
            transforms.push(transform);

            if frames_read % PROGRESS_EVERY == 0 {
                info!(frames_read, expected, "Motion analysis progress");
            }
        }

        // Boundaries past an early end of stream count as no motion.
        transforms.resize(boundaries, Transform2D::ZERO);

        let trajectory = trajectory::build(&transforms);
        let smoothed = trajectory::smooth(&trajectory, self.params.smoothing_radius);
        let corrections =
            crate::stabilize::corrective_transforms(&transforms, &trajectory, &smoothed);
        info!(
            frames = frames_read,
            failed = failed_boundaries.len(),
            radius = self.params.smoothing_radius,
            "Motion analysis complete"
        );
        Ok(MotionAnalysis {
            transforms,
            trajectory,
            smoothed,
            corrections,
            failed_boundaries,
            frames_read,
            truncated,
        })
    }

    /// Pass 2: re-read the video and write corrected frames to `sink`.
    ///
    /// Writes one frame per correction. The sink is finished even when the
    /// source ends early.
    pub fn render<S, K>(
        &self,
        source: &mut S,
        sink: &mut K,
        analysis: &MotionAnalysis,
    ) -> Result<RenderSummary>
    where
        S: FrameSource + ?Sized,
        K: FrameSink + ?Sized,
    {
        let (width, height) = source.dimensions();
        let output_size = self.output_dimensions(width, height);
        source.seek(0)?;

        let total = analysis.corrections.len();
        let mut frames_written = 0;
        let mut truncated = false;
        for (index, correction) in analysis.corrections.iter().enumerate() {
            let frame = match source.read_next() {
                Ok(Some(frame)) => frame,
                Ok(None) => {
                    warn!(index, total, "Video ended early during rendering");
                    truncated = true;
                    break;
                }
                Err(e) => {
                    warn!(index, error = %e, "Frame read failed during rendering");
                    truncated = true;
                    break;
                }
            };
            let stabilized = render(&frame, correction, &self.params);
            let out = compose_output(&frame, stabilized, &self.params)?;
            sink.write_frame(&out)?;
            frames_written += 1;

            if frames_written % PROGRESS_EVERY == 0 {
                info!(frames_written, total, "Rendering progress");
            }
        }
        sink.finish()?;
        info!(frames_written, width = output_size.0, height = output_size.1, "Rendering complete");
        Ok(RenderSummary {
            frames_written,
            output_size,
            truncated,
        })
    }

    /// Both passes. `open_sink` receives the output frame size and rate so
    /// the sink can be created to match.
    pub fn run<S, K, F>(
        &self,
        source: &mut S,
        open_sink: F,
    ) -> Result<(MotionAnalysis, RenderSummary)>
    where
        S: FrameSource + ?Sized,
        K: FrameSink,
        F: FnOnce((u32, u32), FrameRate) -> Result<K>,
    {
        let analysis = self.analyze(source)?;
        let (width, height) = source.dimensions();
        let mut sink = open_sink(self.output_dimensions(width, height), source.frame_rate())?;
        let summary = self.render(source, &mut sink, &analysis)?;
        Ok((analysis, summary))
    }
}
