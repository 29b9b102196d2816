//! Geometric primitives: regions of interest and frame-to-frame motion.

use glam::{DAffine2, DVec2};
use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign, Sub};

/// Axis-aligned integer rectangle in pixel coordinates.
///
/// The origin is signed so that tracking may transiently push it off-frame
/// before it is clamped back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Roi {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Roi {
    /// Create a new region.
    #[inline]
    pub const fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Integer center point, `(x + w/2, y + h/2)`.
    #[inline]
    pub fn center(self) -> (i32, i32) {
        (
            self.x + (self.width / 2) as i32,
            self.y + (self.height / 2) as i32,
        )
    }

    /// Area in pixels.
    #[inline]
    pub fn area(self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Whether the region lies entirely inside a `width` x `height` frame.
    pub fn fits_within(self, width: u32, height: u32) -> bool {
        self.x >= 0
            && self.y >= 0
            && self.x as i64 + self.width as i64 <= width as i64
            && self.y as i64 + self.height as i64 <= height as i64
    }

    /// Move the region by an integer offset.
    #[inline]
    pub fn translated(self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
            ..self
        }
    }

    /// Slide the region back inside a `width` x `height` frame, keeping its
    /// size. Returns `None` if the region is larger than the frame.
    pub fn clamped_to(self, width: u32, height: u32) -> Option<Self> {
        if self.width > width || self.height > height {
            return None;
        }
        let max_x = (width - self.width) as i32;
        let max_y = (height - self.height) as i32;
        Some(Self {
            x: self.x.clamp(0, max_x),
            y: self.y.clamp(0, max_y),
            ..self
        })
    }
}

/// Inter-frame camera motion: translation plus rotation.
///
/// One value describes one frame boundary. Addition and subtraction are
/// component-wise, which is how trajectories are accumulated and corrected.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Transform2D {
    /// Horizontal translation in pixels
    pub dx: f64,
    /// Vertical translation in pixels
    pub dy: f64,
    /// Rotation in radians
    pub da: f64,
}

impl Transform2D {
    /// No motion. Also the stand-in for a boundary whose estimate failed.
    pub const ZERO: Self = Self {
        dx: 0.0,
        dy: 0.0,
        da: 0.0,
    };

    /// Create a new transform.
    #[inline]
    pub const fn new(dx: f64, dy: f64, da: f64) -> Self {
        Self { dx, dy, da }
    }

    /// Decompose a similarity matrix into translation and rotation.
    ///
    /// Scale is discarded; the angle is `atan2(m10, m00)`.
    pub fn from_affine(m: &DAffine2) -> Self {
        Self {
            dx: m.translation.x,
            dy: m.translation.y,
            da: m.matrix2.x_axis.y.atan2(m.matrix2.x_axis.x),
        }
    }

    /// Rigid 2x3 matrix `[[cos, -sin, dx], [sin, cos, dy]]`.
    pub fn to_affine(self) -> DAffine2 {
        DAffine2::from_angle_translation(self.da, DVec2::new(self.dx, self.dy))
    }

    /// Largest absolute component, handy for "near zero" checks.
    pub fn max_abs(self) -> f64 {
        self.dx.abs().max(self.dy.abs()).max(self.da.abs())
    }
}

impl Add for Transform2D {
    type Output = Self;

    #[inline]
    fn add(self, rhs: Self) -> Self {
        Self::new(self.dx + rhs.dx, self.dy + rhs.dy, self.da + rhs.da)
    }
}

impl AddAssign for Transform2D {
    #[inline]
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Sub for Transform2D {
    type Output = Self;

    #[inline]
    fn sub(self, rhs: Self) -> Self {
        Self::new(self.dx - rhs.dx, self.dy - rhs.dy, self.da - rhs.da)
    }
}

/// Uniform zoom by `scale` about `center`, with no rotation.
pub fn zoom_about(center: DVec2, scale: f64) -> DAffine2 {
    DAffine2::from_translation(center)
        * DAffine2::from_scale(DVec2::splat(scale))
        * DAffine2::from_translation(-center)
}
