//! Pyramidal Lucas-Kanade sparse optical flow.

use crate::pyramid::{GrayImage, ImagePyramid};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// A point in one frame paired with where it was found in the next.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Correspondence {
    pub from: [f32; 2],
    pub to: [f32; 2],
    pub valid: bool,
}

impl Correspondence {
    /// Displacement `to - from`.
    #[inline]
    pub fn displacement(&self) -> [f32; 2] {
        [self.to[0] - self.from[0], self.to[1] - self.from[1]]
    }
}

/// Lucas-Kanade optical flow point tracker with pyramidal support.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PointTracker {
    /// Side of the square integration window, in pixels at every level.
    pub window_size: u32,
    /// Number of pyramid levels including full resolution.
    pub pyramid_levels: u32,
    pub max_iterations: u32,
    /// Stop iterating once the update is shorter than this, in pixels.
    pub epsilon: f32,
    /// Minimum eigenvalue of the window's gradient matrix, normalised by the
    /// window area. Windows below it are too flat to track.
    pub min_eigen_threshold: f32,
}

impl PointTracker {
    pub fn new() -> Self {
        Self {
            window_size: 21,
            pyramid_levels: 4,
            max_iterations: 30,
            epsilon: 0.01,
            min_eigen_threshold: 1e-6,
        }
    }

    /// Track `points` from `prev` into `curr`, one correspondence per input
    /// point and in the same order.
    pub fn track(&self, prev: &GrayImage, curr: &GrayImage, points: &[[f32; 2]]) -> Vec<Correspondence> {
        let prev_pyr = ImagePyramid::build(prev, self.pyramid_levels);
        let curr_pyr = ImagePyramid::build(curr, self.pyramid_levels);
        self.track_pyramids(&prev_pyr, &curr_pyr, points)
    }

    /// Like [`track`](Self::track) with prebuilt pyramids.
    pub fn track_pyramids(
        &self,
        prev_pyr: &ImagePyramid,
        curr_pyr: &ImagePyramid,
        points: &[[f32; 2]],
    ) -> Vec<Correspondence> {
        points
            .par_iter()
            .map(|&from| match self.track_point(prev_pyr, curr_pyr, from) {
                Some(to) => Correspondence {
                    from,
                    to,
                    valid: true,
                },
                None => Correspondence {
                    from,
                    to: from,
                    valid: false,
                },
            })
            .collect()
    }

    /// Coarse-to-fine refinement of a single point.
    fn track_point(
        &self,
        prev_pyr: &ImagePyramid,
        curr_pyr: &ImagePyramid,
        position: [f32; 2],
    ) -> Option<[f32; 2]> {
        let levels = prev_pyr.levels.len().min(curr_pyr.levels.len());
        if levels == 0 {
            return None;
        }
        let hw = (self.window_size.max(3) / 2) as i32;
        let area = ((2 * hw + 1) * (2 * hw + 1)) as f32;
        let mut guess = [0.0f32, 0.0];

        for level in (0..levels).rev() {
            let scale = 1.0 / (1u32 << level) as f32;
            let px = position[0] * scale;
            let py = position[1] * scale;
            let prev_img = &prev_pyr.levels[level];
            let curr_img = &curr_pyr.levels[level];

            let mut template = Vec::with_capacity(area as usize);
            let mut g11 = 0.0f32;
            let mut g12 = 0.0f32;
            let mut g22 = 0.0f32;
            for wy in -hw..=hw {
                for wx in -hw..=hw {
                    let sx = px + wx as f32;
                    let sy = py + wy as f32;
                    let ix = (prev_img.sample(sx + 1.0, sy) - prev_img.sample(sx - 1.0, sy)) * 0.5;
                    let iy = (prev_img.sample(sx, sy + 1.0) - prev_img.sample(sx, sy - 1.0)) * 0.5;
                    g11 += ix * ix;
                    g12 += ix * iy;
                    g22 += iy * iy;
                    template.push((prev_img.sample(sx, sy), ix, iy));
                }
            }

            let det = g11 * g22 - g12 * g12;
            let min_eig =
                ((g11 + g22) - ((g11 - g22).powi(2) + 4.0 * g12 * g12).sqrt()) * 0.5 / area;
            if min_eig < self.min_eigen_threshold || det.abs() < f32::EPSILON {
                if level == 0 {
                    return None;
                }
                guess = [guess[0] * 2.0, guess[1] * 2.0];
                continue;
            }
            let inv_det = 1.0 / det;

            let mut dx = 0.0f32;
            let mut dy = 0.0f32;
            for _ in 0..self.max_iterations {
                let cx = px + guess[0] + dx;
                let cy = py + guess[1] + dy;
                let mut bx = 0.0f32;
                let mut by = 0.0f32;
                let mut k = 0;
                for wy in -hw..=hw {
                    for wx in -hw..=hw {
                        let (i, ix, iy) = template[k];
                        k += 1;
                        let it = i - curr_img.sample(cx + wx as f32, cy + wy as f32);
                        bx += ix * it;
                        by += iy * it;
                    }
                }
                let ddx = inv_det * (g22 * bx - g12 * by);
                let ddy = inv_det * (-g12 * bx + g11 * by);
                dx += ddx;
                dy += ddy;
                if !dx.is_finite() || !dy.is_finite() {
                    return None;
                }
                if ddx * ddx + ddy * ddy < self.epsilon * self.epsilon {
                    break;
                }
            }

            guess = if level > 0 {
                [(guess[0] + dx) * 2.0, (guess[1] + dy) * 2.0]
            } else {
                [guess[0] + dx, guess[1] + dy]
            };
        }

        let new_pos = [position[0] + guess[0], position[1] + guess[1]];
        let full = &curr_pyr.levels[0];
        if new_pos[0].is_finite() && new_pos[1].is_finite() && full.contains(new_pos[0], new_pos[1]) {
            Some(new_pos)
        } else {
            None
        }
    }
}

impl Default for PointTracker {
    fn default() -> Self {
        Self::new()
    }
}
