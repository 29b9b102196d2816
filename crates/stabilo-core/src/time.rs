//! Frame rate representation.

use crate::error::{Result, StabiloError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Frame rate as a rational number (e.g., 30000/1001 for 29.97 fps).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FrameRate {
    /// Numerator (e.g., 30000)
    pub numerator: u32,
    /// Denominator (e.g., 1001)
    pub denominator: u32,
}

impl FrameRate {
    /// Create a new frame rate.
    #[inline]
    pub const fn new(numerator: u32, denominator: u32) -> Self {
        Self {
            numerator,
            denominator,
        }
    }

    /// Convert to frames per second as f64.
    #[inline]
    pub fn to_fps_f64(self) -> f64 {
        if self.denominator == 0 {
            return 0.0;
        }
        self.numerator as f64 / self.denominator as f64
    }

    /// Whether the rate describes a usable, positive frequency.
    #[inline]
    pub fn is_valid(self) -> bool {
        self.numerator > 0 && self.denominator > 0
    }

    /// Common frame rates
    pub const FPS_24: Self = Self::new(24, 1);
    pub const FPS_25: Self = Self::new(25, 1);
    pub const FPS_29_97: Self = Self::new(30000, 1001);
    pub const FPS_30: Self = Self::new(30, 1);
    pub const FPS_60: Self = Self::new(60, 1);
}

impl Default for FrameRate {
    fn default() -> Self {
        Self::FPS_30
    }
}

impl fmt::Display for FrameRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fps = self.to_fps_f64();
        if (fps - fps.round()).abs() < 0.001 {
            write!(f, "{} fps", fps.round() as u32)
        } else {
            write!(f, "{:.3} fps", fps)
        }
    }
}

/// Parses the `num/den` form ffprobe reports (`"30000/1001"`) as well as a
/// plain integer (`"25"`).
impl FromStr for FrameRate {
    type Err = StabiloError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || StabiloError::InvalidParameter(format!("invalid frame rate: {s:?}"));
        let s = s.trim();
        let rate = match s.split_once('/') {
            Some((num, den)) => Self::new(
                num.trim().parse().map_err(|_| invalid())?,
                den.trim().parse().map_err(|_| invalid())?,
            ),
            None => Self::new(s.parse().map_err(|_| invalid())?, 1),
        };
        if rate.is_valid() {
            Ok(rate)
        } else {
            Err(invalid())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rational() {
        let rate: FrameRate = "30000/1001".parse().unwrap();
        assert_eq!(rate, FrameRate::FPS_29_97);
        assert!((rate.to_fps_f64() - 29.97).abs() < 0.01);
    }

    #[test]
    fn test_parse_integer() {
        assert_eq!("25".parse::<FrameRate>().unwrap(), FrameRate::FPS_25);
    }

    #[test]
    fn test_parse_rejects_zero() {
        assert!("0/0".parse::<FrameRate>().is_err());
        assert!("abc".parse::<FrameRate>().is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(FrameRate::FPS_24.to_string(), "24 fps");
        assert_eq!(FrameRate::FPS_29_97.to_string(), "29.970 fps");
    }
}
