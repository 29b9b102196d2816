//! Robust 4-DOF similarity estimation (rotation, uniform scale, translation)
//! using RANSAC over point correspondences.

use glam::{DAffine2, DVec2};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why no motion could be estimated for a frame boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum EstimationFailure {
    #[error("only {found} valid correspondences, need at least {required}")]
    TooFewCorrespondences { found: usize, required: usize },

    #[error("no similarity model reached consensus")]
    NoConsensus,
}

/// RANSAC settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RansacParams {
    /// Maximum reprojection error for an inlier, in pixels.
    pub threshold: f64,
    pub max_iterations: u32,
    /// Desired probability of drawing at least one outlier-free sample.
    pub confidence: f64,
    /// Fewer valid correspondences (or inliers) than this is a failure.
    pub min_correspondences: usize,
    /// Seed for the sampler; fixed so runs are reproducible.
    pub seed: u64,
}

impl Default for RansacParams {
    fn default() -> Self {
        Self {
            threshold: 3.0,
            max_iterations: 2000,
            confidence: 0.99,
            min_correspondences: 2,
            seed: 12345,
        }
    }
}

/// A fitted similarity and the size of its consensus set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimilarityFit {
    pub matrix: DAffine2,
    pub inliers: usize,
}

/// Closed-form least-squares similarity mapping `src` onto `dst`.
///
/// Exact for two distinct points. Returns `None` when the source points are
/// all coincident.
pub fn fit_similarity(src: &[DVec2], dst: &[DVec2]) -> Option<DAffine2> {
    let n = src.len().min(dst.len());
    if n < 2 {
        return None;
    }
    let inv_n = 1.0 / n as f64;
    let src_mean = src[..n].iter().copied().sum::<DVec2>() * inv_n;
    let dst_mean = dst[..n].iter().copied().sum::<DVec2>() * inv_n;

    let mut norm = 0.0;
    let mut a = 0.0;
    let mut b = 0.0;
    for (s, d) in src[..n].iter().zip(&dst[..n]) {
        let p = *s - src_mean;
        let q = *d - dst_mean;
        norm += p.length_squared();
        a += p.x * q.x + p.y * q.y;
        b += p.x * q.y - p.y * q.x;
    }
    if norm < 1e-12 {
        return None;
    }
    a /= norm;
    b /= norm;
    let tx = dst_mean.x - (a * src_mean.x - b * src_mean.y);
    let ty = dst_mean.y - (b * src_mean.x + a * src_mean.y);
    Some(DAffine2::from_cols_array(&[a, b, -b, a, tx, ty]))
}

/// Number of RANSAC iterations needed to reach `confidence` given the
/// current outlier ratio, capped at `max_iterations`.
fn update_iterations(confidence: f64, outlier_ratio: f64, sample_size: i32, max_iterations: u32) -> u32 {
    let p = confidence.clamp(0.0, 1.0);
    let ep = outlier_ratio.clamp(0.0, 1.0);
    let num = (1.0 - p).max(f64::MIN_POSITIVE);
    let denom = 1.0 - (1.0 - ep).powi(sample_size);
    if denom < f64::MIN_POSITIVE {
        return 0;
    }
    let num = num.ln();
    let denom = denom.ln();
    if denom >= 0.0 || -num >= max_iterations as f64 * -denom {
        max_iterations
    } else {
        (num / denom).round() as u32
    }
}

fn count_inliers(m: &DAffine2, src: &[DVec2], dst: &[DVec2], threshold_sq: f64) -> Vec<usize> {
    src.iter()
        .zip(dst)
        .enumerate()
        .filter(|(_, (s, d))| (m.transform_point2(**s) - **d).length_squared() <= threshold_sq)
        .map(|(i, _)| i)
        .collect()
}

/// RANSAC similarity estimation from matched point lists.
///
/// Minimal samples are pairs of correspondences. The best consensus set is
/// refit with least squares before returning.
pub fn estimate_similarity(
    src: &[[f32; 2]],
    dst: &[[f32; 2]],
    params: &RansacParams,
) -> Result<SimilarityFit, EstimationFailure> {
    let n = src.len().min(dst.len());
    let required = params.min_correspondences.max(2);
    if n < required {
        return Err(EstimationFailure::TooFewCorrespondences { found: n, required });
    }
    let src: Vec<DVec2> = src[..n]
        .iter()
        .map(|p| DVec2::new(p[0] as f64, p[1] as f64))
        .collect();
    let dst: Vec<DVec2> = dst[..n]
        .iter()
        .map(|p| DVec2::new(p[0] as f64, p[1] as f64))
        .collect();
    let threshold_sq = params.threshold * params.threshold;

    let mut seed = params.seed;
    let mut next_index = || {
        seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1);
        (seed >> 33) as usize % n
    };

    let mut best: Option<(DAffine2, Vec<usize>)> = None;
    let mut iterations = params.max_iterations;
    let mut iter = 0;
    while iter < iterations {
        iter += 1;
        let i = next_index();
        let mut j = next_index();
        let mut tries = 0;
        while j == i && tries < 16 {
            j = next_index();
            tries += 1;
        }
        if j == i {
            j = (i + 1) % n;
        }
        let Some(model) = fit_similarity(&[src[i], src[j]], &[dst[i], dst[j]]) else {
            continue;
        };
        let inliers = count_inliers(&model, &src, &dst, threshold_sq);
        if best.as_ref().map_or(true, |(_, b)| inliers.len() > b.len()) {
            let outlier_ratio = 1.0 - inliers.len() as f64 / n as f64;
            iterations = update_iterations(params.confidence, outlier_ratio, 2, iterations);
            best = Some((model, inliers));
        }
    }

    let Some((model, inliers)) = best else {
        return Err(EstimationFailure::NoConsensus);
    };
    if inliers.len() < required {
        return Err(EstimationFailure::NoConsensus);
    }

    let inlier_src: Vec<DVec2> = inliers.iter().map(|&i| src[i]).collect();
    let inlier_dst: Vec<DVec2> = inliers.iter().map(|&i| dst[i]).collect();
    if let Some(refined) = fit_similarity(&inlier_src, &inlier_dst) {
        let refined_inliers = count_inliers(&refined, &src, &dst, threshold_sq);
        if refined_inliers.len() >= inliers.len() {
            return Ok(SimilarityFit {
                matrix: refined,
                inliers: refined_inliers.len(),
            });
        }
    }
    Ok(SimilarityFit {
        matrix: model,
        inliers: inliers.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid_points() -> Vec<[f32; 2]> {
        let mut pts = Vec::new();
        for gy in 0..6 {
            for gx in 0..6 {
                pts.push([20.0 + gx as f32 * 30.0, 15.0 + gy as f32 * 25.0]);
            }
        }
        pts
    }

    fn apply(m: &DAffine2, pts: &[[f32; 2]]) -> Vec<[f32; 2]> {
        pts.iter()
            .map(|p| {
                let q = m.transform_point2(DVec2::new(p[0] as f64, p[1] as f64));
                [q.x as f32, q.y as f32]
            })
            .collect()
    }

    #[test]
    fn test_recovers_exact_similarity() {
        let truth = DAffine2::from_scale_angle_translation(
            DVec2::splat(1.02),
            0.05,
            DVec2::new(5.0, -3.0),
        );
        let src = grid_points();
        let dst = apply(&truth, &src);
        let fit = estimate_similarity(&src, &dst, &RansacParams::default()).unwrap();
        assert_eq!(fit.inliers, src.len());
        assert!(fit.matrix.abs_diff_eq(truth, 1e-3));
    }

    #[test]
    fn test_rejects_outliers() {
        let truth = DAffine2::from_angle_translation(-0.03, DVec2::new(-2.0, 4.0));
        let src = grid_points();
        let mut dst = apply(&truth, &src);
        for (k, p) in dst.iter_mut().enumerate().step_by(4) {
            p[0] += 40.0 + k as f32;
            p[1] -= 25.0;
        }
        let fit = estimate_similarity(&src, &dst, &RansacParams::default()).unwrap();
        assert_eq!(fit.inliers, src.len() - src.len().div_ceil(4));
        assert!((fit.matrix.translation.x + 2.0).abs() < 0.05);
        assert!((fit.matrix.translation.y - 4.0).abs() < 0.05);
        let angle = fit.matrix.matrix2.x_axis.y.atan2(fit.matrix.matrix2.x_axis.x);
        assert!((angle + 0.03).abs() < 1e-3);
    }

    #[test]
    fn test_too_few_correspondences() {
        let err = estimate_similarity(&[[1.0, 1.0]], &[[2.0, 2.0]], &RansacParams::default())
            .unwrap_err();
        assert_eq!(
            err,
            EstimationFailure::TooFewCorrespondences {
                found: 1,
                required: 2
            }
        );
    }

    #[test]
    fn test_coincident_points_have_no_consensus() {
        let src = vec![[10.0, 10.0]; 5];
        let dst = vec![[12.0, 10.0]; 5];
        assert_eq!(
            estimate_similarity(&src, &dst, &RansacParams::default()).unwrap_err(),
            EstimationFailure::NoConsensus
        );
    }

    #[test]
    fn test_update_iterations() {
        assert_eq!(update_iterations(0.99, 0.0, 2, 2000), 0);
        assert_eq!(update_iterations(0.99, 1.0, 2, 2000), 2000);
        let half = update_iterations(0.99, 0.5, 2, 2000);
        assert!(half > 10 && half < 30, "{half}");
    }
}
