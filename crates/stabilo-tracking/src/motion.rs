//! Inter-frame camera motion estimation.
//!
//! Corners are detected in the previous frame, followed into the current
//! frame with sparse optical flow, and the surviving matches are fitted with
//! a RANSAC similarity that is then reduced to `(dx, dy, da)`.

use crate::features::{good_features_to_track, FeatureParams};
use crate::point_tracker::{Correspondence, PointTracker};
use crate::pyramid::GrayImage;
use crate::similarity::{estimate_similarity, EstimationFailure, RansacParams};
use serde::{Deserialize, Serialize};
use stabilo_core::Transform2D;
use tracing::debug;

/// Settings for every stage of motion estimation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EstimatorParams {
    pub features: FeatureParams,
    pub flow: PointTracker,
    pub ransac: RansacParams,
}

/// Result of a successful estimate, with diagnostics.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionEstimate {
    pub transform: Transform2D,
    /// Uniform scale of the fitted similarity; dropped from `transform`.
    pub scale: f64,
    pub features: usize,
    pub tracked: usize,
    pub inliers: usize,
}

/// Estimates the similarity motion between two consecutive frames.
///
/// Holds configuration only; no frame data survives between calls.
#[derive(Debug, Clone, Default)]
pub struct MotionEstimator {
    params: EstimatorParams,
}

impl MotionEstimator {
    pub fn new(params: EstimatorParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &EstimatorParams {
        &self.params
    }

    /// Camera motion from `prev` to `curr`.
    pub fn estimate(
        &self,
        prev: &GrayImage,
        curr: &GrayImage,
    ) -> Result<Transform2D, EstimationFailure> {
        self.estimate_detailed(prev, curr).map(|m| m.transform)
    }

    /// Like [`estimate`](Self::estimate) but also reports feature, track
    /// and inlier counts.
    pub fn estimate_detailed(
        &self,
        prev: &GrayImage,
        curr: &GrayImage,
    ) -> Result<MotionEstimate, EstimationFailure> {
        let features = good_features_to_track(prev, &self.params.features);
        let matches: Vec<Correspondence> = self
            .params
            .flow
            .track(prev, curr, &features)
            .into_iter()
            .filter(|c| c.valid)
            .collect();

        let src: Vec<[f32; 2]> = matches.iter().map(|c| c.from).collect();
        let dst: Vec<[f32; 2]> = matches.iter().map(|c| c.to).collect();
        let fit = estimate_similarity(&src, &dst, &self.params.ransac)?;

        let m = fit.matrix;
        let transform = Transform2D::from_affine(&m);
        let scale = m.matrix2.x_axis.length();
        debug!(
            features = features.len(),
            tracked = matches.len(),
            inliers = fit.inliers,
            dx = transform.dx,
            dy = transform.dy,
            da = transform.da,
            "Estimated inter-frame motion"
        );
        Ok(MotionEstimate {
            transform,
            scale,
            features: features.len(),
            tracked: matches.len(),
            inliers: fit.inliers,
        })
    }
}
