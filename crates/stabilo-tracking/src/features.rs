//! Shi-Tomasi corner detection ("good features to track").

use crate::pyramid::{compute_gradients, GrayImage};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Corner detector settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureParams {
    /// Maximum number of corners returned; 0 means unlimited.
    pub max_corners: usize,
    /// Minimum accepted response as a fraction of the strongest response.
    pub quality_level: f32,
    /// Minimum Euclidean distance between returned corners, in pixels.
    pub min_distance: f32,
    /// Side of the square neighbourhood the structure tensor is summed over.
    pub block_size: u32,
}

impl Default for FeatureParams {
    fn default() -> Self {
        Self {
            max_corners: 200,
            quality_level: 0.01,
            min_distance: 30.0,
            block_size: 3,
        }
    }
}

/// Minimum-eigenvalue corner response for every pixel.
pub fn corner_response(img: &GrayImage, block_size: u32) -> Vec<f32> {
    let (w, h) = (img.width as i32, img.height as i32);
    let (ix, iy) = compute_gradients(img);
    let r = (block_size.max(1) / 2) as i32;
    let mut response = vec![0.0f32; img.data.len()];
    response
        .par_chunks_mut(w.max(1) as usize)
        .enumerate()
        .for_each(|(y, row)| {
            let y = y as i32;
            for (x, out) in row.iter_mut().enumerate() {
                let x = x as i32;
                let (mut a, mut b, mut c) = (0.0f32, 0.0f32, 0.0f32);
                for wy in (y - r).max(0)..=(y + r).min(h - 1) {
                    for wx in (x - r).max(0)..=(x + r).min(w - 1) {
                        let i = (wy * w + wx) as usize;
                        a += ix[i] * ix[i];
                        b += ix[i] * iy[i];
                        c += iy[i] * iy[i];
                    }
                }
                let half_trace = (a + c) * 0.5;
                let disc = (((a - c) * 0.5).powi(2) + b * b).sqrt();
                *out = half_trace - disc;
            }
        });
    response
}

/// Detect up to `max_corners` strong, well-separated corners.
///
/// Corners must exceed `quality_level` times the best response and be a
/// 3x3 local maximum. They are accepted strongest first, skipping any that
/// fall within `min_distance` of an already accepted corner.
pub fn good_features_to_track(img: &GrayImage, params: &FeatureParams) -> Vec<[f32; 2]> {
    if img.width < 3 || img.height < 3 {
        return Vec::new();
    }
    let (w, h) = (img.width as i32, img.height as i32);
    let response = corner_response(img, params.block_size);

    let max_response = response.iter().copied().fold(0.0f32, f32::max);
    if max_response <= 0.0 {
        return Vec::new();
    }
    let threshold = max_response * params.quality_level;

    let mut candidates: Vec<(f32, i32, i32)> = Vec::new();
    for y in 1..h - 1 {
        for x in 1..w - 1 {
            let v = response[(y * w + x) as usize];
            if v <= threshold {
                continue;
            }
            let is_peak = (-1..=1).all(|dy| {
                (-1..=1).all(|dx| response[((y + dy) * w + x + dx) as usize] <= v)
            });
            if is_peak {
                candidates.push((v, x, y));
            }
        }
    }
    candidates.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(Ordering::Equal));

    let min_dist = params.min_distance.max(0.0);
    let min_dist_sq = min_dist * min_dist;
    let cell = min_dist.max(1.0);
    let grid_w = (w as f32 / cell).ceil() as i32 + 1;
    let grid_h = (h as f32 / cell).ceil() as i32 + 1;
    let mut grid: Vec<Vec<[f32; 2]>> = vec![Vec::new(); (grid_w * grid_h) as usize];

    let mut corners = Vec::new();
    for (_, x, y) in candidates {
        let p = [x as f32, y as f32];
        let gx = (p[0] / cell) as i32;
        let gy = (p[1] / cell) as i32;
        let crowded = min_dist > 0.0
            && ((gy - 1).max(0)..=(gy + 1).min(grid_h - 1)).any(|cy| {
                ((gx - 1).max(0)..=(gx + 1).min(grid_w - 1)).any(|cx| {
                    grid[(cy * grid_w + cx) as usize].iter().any(|q| {
                        let (dx, dy) = (q[0] - p[0], q[1] - p[1]);
                        dx * dx + dy * dy < min_dist_sq
                    })
                })
            });
        if crowded {
            continue;
        }
        grid[(gy * grid_w + gx) as usize].push(p);
        corners.push(p);
        if params.max_corners > 0 && corners.len() >= params.max_corners {
            break;
        }
    }
    corners
}
