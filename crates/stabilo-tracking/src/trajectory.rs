//! Cumulative camera trajectory and its moving-average smoothing.

use serde::{Deserialize, Serialize};
use stabilo_core::Transform2D;
use std::ops::Index;

/// Cumulative camera path, one entry per frame boundary.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Trajectory {
    points: Vec<Transform2D>,
}

impl Trajectory {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn as_slice(&self) -> &[Transform2D] {
        &self.points
    }

    pub fn iter(&self) -> impl Iterator<Item = &Transform2D> {
        self.points.iter()
    }

    /// One component across the whole path.
    fn component(&self, pick: impl Fn(&Transform2D) -> f64) -> Vec<f64> {
        self.points.iter().map(pick).collect()
    }
}

impl From<Vec<Transform2D>> for Trajectory {
    fn from(points: Vec<Transform2D>) -> Self {
        Self { points }
    }
}

impl Index<usize> for Trajectory {
    type Output = Transform2D;

    fn index(&self, index: usize) -> &Transform2D {
        &self.points[index]
    }
}

/// Running component-wise sum of per-boundary transforms.
pub fn build(transforms: &[Transform2D]) -> Trajectory {
    let points = transforms
        .iter()
        .scan(Transform2D::ZERO, |acc, t| {
            *acc += *t;
            Some(*acc)
        })
        .collect();
    Trajectory { points }
}

/// Uniform moving average of width `2 * radius + 1` with edge replication.
///
/// Output length always equals input length. Indices past either end read
/// the nearest sample, so inputs shorter than the window are fine.
pub fn moving_average(curve: &[f64], radius: usize) -> Vec<f64> {
    let n = curve.len();
    if n == 0 || radius == 0 {
        return curve.to_vec();
    }
    let window = (2 * radius + 1) as f64;
    let last = n as isize - 1;
    let r = radius as isize;
    (0..n as isize)
        .map(|t| {
            let center = curve[t as usize];
            // Summing deviations from the centre keeps flat runs exact.
            let deviation: f64 = (t - r..=t + r)
                .map(|j| curve[j.clamp(0, last) as usize] - center)
                .sum();
            center + deviation / window
        })
        .collect()
}

/// Smooth each of `dx`, `dy` and `da` independently.
pub fn smooth(trajectory: &Trajectory, radius: usize) -> Trajectory {
    let dx = moving_average(&trajectory.component(|t| t.dx), radius);
    let dy = moving_average(&trajectory.component(|t| t.dy), radius);
    let da = moving_average(&trajectory.component(|t| t.da), radius);
    let points = dx
        .into_iter()
        .zip(dy)
        .zip(da)
        .map(|((dx, dy), da)| Transform2D::new(dx, dy, da))
        .collect();
    Trajectory { points }
}
