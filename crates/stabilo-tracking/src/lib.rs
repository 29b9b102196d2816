//! Stabilo Tracking - Motion estimation, trajectory smoothing and region
//! tracking.
//!
//! Everything here works on decoded frames and is independent of how they
//! were obtained; see `stabilo-media` for the ffmpeg adapters.

pub mod features;
pub mod motion;
pub mod pipeline;
pub mod point_tracker;
pub mod pyramid;
pub mod region;
pub mod similarity;
pub mod stabilize;
pub mod trajectory;
pub mod warp;

pub use features::{good_features_to_track, FeatureParams};
pub use motion::{EstimatorParams, MotionEstimate, MotionEstimator};
pub use pipeline::{MotionAnalysis, RenderSummary, Stabilizer};
pub use point_tracker::{Correspondence, PointTracker};
pub use pyramid::{compute_gradients, frame_to_gray, GrayImage, ImagePyramid};
pub use region::{FrameRange, PixelAccumulator, RegionAverage, RegionTracker, RegionTrackerParams};
pub use similarity::{estimate_similarity, EstimationFailure, RansacParams, SimilarityFit};
pub use stabilize::{
    compose_output, compose_preview, corrective_transforms, fix_border, output_dimensions,
    render, PreviewLayout, StabilizationParams,
};
pub use trajectory::{moving_average, smooth, Trajectory};
pub use warp::warp_affine;
