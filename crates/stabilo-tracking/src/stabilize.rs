//! Corrective transforms and per-frame rendering for video stabilization.

use crate::trajectory::Trajectory;
use crate::warp::warp_affine;
use glam::DVec2;
use serde::{Deserialize, Serialize};
use stabilo_core::{zoom_about, Frame, Result, Transform2D};

/// What each output frame contains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PreviewLayout {
    /// Original on the left, stabilized on the right.
    #[default]
    SideBySide,
    StabilizedOnly,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StabilizationParams {
    /// Moving-average radius in frames; the window is `2r + 1` wide.
    pub smoothing_radius: usize,
    /// Zoom about the frame centre applied after correction to hide the
    /// black border the warp leaves behind.
    pub border_zoom: f64,
    /// Composed frames wider than this are downscaled by half.
    pub preview_max_width: u32,
    pub layout: PreviewLayout,
}

impl Default for StabilizationParams {
    fn default() -> Self {
        Self {
            smoothing_radius: 50,
            border_zoom: 1.04,
            preview_max_width: 1920,
            layout: PreviewLayout::SideBySide,
        }
    }
}

/// `c[i] = t[i] + (smoothed[i] - trajectory[i])`.
///
/// Output length is the shortest of the three inputs.
pub fn corrective_transforms(
    transforms: &[Transform2D],
    trajectory: &Trajectory,
    smoothed: &Trajectory,
) -> Vec<Transform2D> {
    transforms
        .iter()
        .zip(trajectory.iter())
        .zip(smoothed.iter())
        .map(|((t, raw), smooth)| *t + (*smooth - *raw))
        .collect()
}

/// Scale the frame about its centre to push the warp's black edges out of
/// view.
pub fn fix_border(frame: &Frame, zoom: f64) -> Frame {
    let center = DVec2::new(frame.width as f64 / 2.0, frame.height as f64 / 2.0);
    warp_affine(frame, &zoom_about(center, zoom))
}

/// Apply one corrective transform followed by the border zoom.
pub fn render(frame: &Frame, correction: &Transform2D, params: &StabilizationParams) -> Frame {
    let warped = warp_affine(frame, &correction.to_affine());
    fix_border(&warped, params.border_zoom)
}

/// Original and stabilized frames side by side, halved when the pair is
/// wider than `max_width`.
pub fn compose_preview(original: &Frame, stabilized: &Frame, max_width: u32) -> Result<Frame> {
    let pair = Frame::hconcat(original, stabilized)?;
    if pair.width > max_width {
        Ok(pair.downscale_half())
    } else {
        Ok(pair)
    }
}

/// Build the frame written to the sink for the configured layout.
pub fn compose_output(
    original: &Frame,
    stabilized: Frame,
    params: &StabilizationParams,
) -> Result<Frame> {
    match params.layout {
        PreviewLayout::SideBySide => compose_preview(original, &stabilized, params.preview_max_width),
        PreviewLayout::StabilizedOnly => Ok(stabilized),
    }
}

/// Size of the frames [`compose_output`] produces for `width` x `height`
/// input.
pub fn output_dimensions(width: u32, height: u32, params: &StabilizationParams) -> (u32, u32) {
    match params.layout {
        PreviewLayout::StabilizedOnly => (width, height),
        PreviewLayout::SideBySide => {
            let combined = width * 2;
            if combined > params.preview_max_width {
                (combined / 2, height / 2)
            } else {
                (combined, height)
            }
        }
    }
}
