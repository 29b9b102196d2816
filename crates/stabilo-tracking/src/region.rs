//! Motion-compensated region tracking and temporal pixel averaging.
//!
//! A single anchor point at the centre of the region is followed with
//! Lucas-Kanade flow. The region moves with it and its pixels are summed
//! frame after frame, giving a mean image of whatever the region covers.

use crate::features::{good_features_to_track, FeatureParams};
use crate::point_tracker::PointTracker;
use crate::pyramid::{frame_to_gray, GrayImage, ImagePyramid};
use serde::{Deserialize, Serialize};
use stabilo_core::{Frame, FrameSource, Result, Roi, StabiloError};
use tracing::{debug, info, warn};

/// Inclusive range of frame indices. Either end may lie outside the video;
/// it is clamped before use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameRange {
    pub first: i64,
    pub last: i64,
}

impl FrameRange {
    pub const fn new(first: i64, last: i64) -> Self {
        Self { first, last }
    }

    /// Clamp into `[0, count - 1]`. Fails if nothing is left.
    pub fn clamp_to(self, count: usize) -> Result<(usize, usize)> {
        let first = self.first.max(0);
        let last = self.last.min(count as i64 - 1);
        if count == 0 || first > last {
            return Err(StabiloError::InvalidParameter(format!(
                "frame range [{}, {}] is empty for a video of {} frames",
                self.first, self.last, count
            )));
        }
        Ok((first as usize, last as usize))
    }
}

/// Per-pixel, per-channel running sums of equally sized frames.
#[derive(Debug, Clone)]
pub struct PixelAccumulator {
    width: u32,
    height: u32,
    sums: Vec<f64>,
    frames: usize,
}

impl PixelAccumulator {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            sums: vec![0.0; width as usize * height as usize * Frame::CHANNELS],
            frames: 0,
        }
    }

    pub fn add(&mut self, frame: &Frame) -> Result<()> {
        if frame.dimensions() != (self.width, self.height) {
            return Err(StabiloError::InvalidParameter(format!(
                "cannot accumulate a {}x{} frame into a {}x{} accumulator",
                frame.width, frame.height, self.width, self.height
            )));
        }
        for (sum, v) in self.sums.iter_mut().zip(&frame.data) {
            *sum += *v as f64;
        }
        self.frames += 1;
        Ok(())
    }

    /// Number of frames added so far.
    pub fn frames(&self) -> usize {
        self.frames
    }

    /// Mean frame, rounded half to even and saturated to `u8`.
    pub fn finalize(&self) -> Result<Frame> {
        if self.frames == 0 {
            return Err(StabiloError::InvalidParameter(
                "no frames were accumulated".into(),
            ));
        }
        let n = self.frames as f64;
        let data = self
            .sums
            .iter()
            .map(|s| (s / n).round_ties_even().clamp(0.0, 255.0) as u8)
            .collect();
        Frame::from_raw(self.width, self.height, data)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegionTrackerParams {
    pub flow: PointTracker,
    /// Re-detect the anchor after this many consecutive tracking losses.
    pub reanchor_after: Option<usize>,
    /// Detector used when re-anchoring inside the region.
    pub anchor_features: FeatureParams,
}

impl Default for RegionTrackerParams {
    fn default() -> Self {
        Self {
            flow: PointTracker::default(),
            reanchor_after: Some(10),
            anchor_features: FeatureParams {
                max_corners: 1,
                ..Default::default()
            },
        }
    }
}

/// Result of a region tracking run.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionAverage {
    pub mean: Frame,
    pub frames_accumulated: usize,
    pub tracking_losses: usize,
    /// Region position on the last accumulated frame.
    pub final_roi: Roi,
    /// The source ran out before the end of the range.
    pub truncated: bool,
    /// The clamped range that was requested.
    pub range: (usize, usize),
}

/// Follows a region through a video and averages its pixels.
#[derive(Debug, Clone, Default)]
pub struct RegionTracker {
    params: RegionTrackerParams,
}

impl RegionTracker {
    pub fn new(params: RegionTrackerParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &RegionTrackerParams {
        &self.params
    }

    /// Track `roi` over `range` and return the mean of the tracked pixels.
    ///
    /// Every frame in the clamped range is accumulated once. If the source
    /// ends early, the frames read so far are averaged.
    pub fn track<S: FrameSource + ?Sized>(
        &self,
        source: &mut S,
        roi: Roi,
        range: FrameRange,
    ) -> Result<RegionAverage> {
        let (first, last) = range.clamp_to(source.frame_count())?;
        if roi.width == 0 || roi.height == 0 {
            return Err(StabiloError::InvalidParameter(format!(
                "region {roi:?} is empty"
            )));
        }

        source.seek(first)?;
        let frame = source.read_next()?.ok_or_else(|| {
            StabiloError::Decoder(format!("frame {first} could not be read"))
        })?;
        let (width, height) = frame.dimensions();
        let mut roi = roi.clamped_to(width, height).ok_or_else(|| {
            StabiloError::InvalidParameter(format!(
                "region {roi:?} is larger than the {width}x{height} frame"
            ))
        })?;

        let levels = self.params.flow.pyramid_levels;
        let (cx, cy) = roi.center();
        let mut anchor = [cx as f32, cy as f32];
        let mut prev_pyr = ImagePyramid::build(&frame_to_gray(&frame), levels);
        let mut acc = PixelAccumulator::new(roi.width, roi.height);
        acc.add(&frame.crop(&roi)?)?;

        let mut tracking_losses = 0;
        let mut consecutive_losses = 0;
        let mut truncated = false;

        for index in first + 1..=last {
            let frame = match source.read_next() {
                Ok(Some(frame)) => frame,
                Ok(None) => {
                    warn!(index, last, "Video ended before the end of the region range");
                    truncated = true;
                    break;
                }
                Err(e) => {
                    warn!(index, error = %e, "Frame read failed, stopping region tracking");
                    truncated = true;
                    break;
                }
            };
            let curr_gray = frame_to_gray(&frame);
            let curr_pyr = ImagePyramid::build(&curr_gray, levels);
            let tracked = self.params.flow.track_pyramids(&prev_pyr, &curr_pyr, &[anchor]);

            match tracked.first().filter(|c| c.valid) {
                Some(c) => {
                    let [dx, dy] = [c.to[0] - anchor[0], c.to[1] - anchor[1]];
                    // Shift by whole pixels, truncating toward zero.
                    roi = roi.translated(dx as i32, dy as i32);
                    anchor = c.to;
                    consecutive_losses = 0;
                }
                None => {
                    tracking_losses += 1;
                    consecutive_losses += 1;
                    debug!(index, consecutive_losses, "Region anchor lost, holding position");
                    if self
                        .params
                        .reanchor_after
                        .is_some_and(|n| consecutive_losses >= n.max(1))
                    {
                        anchor = self.reanchor(&curr_gray, roi);
                        consecutive_losses = 0;
                        debug!(index, x = anchor[0], y = anchor[1], "Re-anchored region");
                    }
                }
            }
            roi = roi.clamped_to(width, height).unwrap_or(roi);
            acc.add(&frame.crop(&roi)?)?;
            prev_pyr = curr_pyr;
        }

        let mean = acc.finalize()?;
        info!(
            frames = acc.frames(),
            tracking_losses,
            first,
            last,
            "Region average complete"
        );
        Ok(RegionAverage {
            mean,
            frames_accumulated: acc.frames(),
            tracking_losses,
            final_roi: roi,
            truncated,
            range: (first, last),
        })
    }

    /// Strongest corner inside `roi`, or its centre if there is none.
    fn reanchor(&self, gray: &GrayImage, roi: Roi) -> [f32; 2] {
        let patch = gray.crop(roi.x as u32, roi.y as u32, roi.width, roi.height);
        match good_features_to_track(&patch, &self.params.anchor_features).first() {
            Some(p) => [p[0] + roi.x as f32, p[1] + roi.y as f32],
            None => {
                let (cx, cy) = roi.center();
                [cx as f32, cy as f32]
            }
        }
    }
}
