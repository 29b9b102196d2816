//! Frame buffer type for decoded video frames in CPU memory.
//!
//! Frames are packed 8-bit RGB with no row padding, which is exactly the
//! layout ffmpeg produces for `-pix_fmt rgb24` and what it accepts back on
//! the encoding side.

use crate::error::{Result, StabiloError};
use crate::geometry::Roi;

/// A packed RGB8 video frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Frame width in pixels
    pub width: u32,
    /// Frame height in pixels
    pub height: u32,
    /// Interleaved RGB samples, `width * height * 3` bytes
    pub data: Vec<u8>,
}

impl Frame {
    /// Number of interleaved channels per pixel.
    pub const CHANNELS: usize = 3;

    /// Create a black frame.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0u8; Self::byte_len(width, height)],
        }
    }

    /// Create a frame with every pixel set to `rgb`.
    pub fn filled(width: u32, height: u32, rgb: [u8; 3]) -> Self {
        let mut data = Vec::with_capacity(Self::byte_len(width, height));
        for _ in 0..(width as usize * height as usize) {
            data.extend_from_slice(&rgb);
        }
        Self {
            width,
            height,
            data,
        }
    }

    /// Wrap an existing RGB8 buffer.
    pub fn from_raw(width: u32, height: u32, data: Vec<u8>) -> Result<Self> {
        let expected = Self::byte_len(width, height);
        if data.len() != expected {
            return Err(StabiloError::InvalidParameter(format!(
                "RGB buffer for {}x{} must be {} bytes, got {}",
                width,
                height,
                expected,
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    #[inline]
    fn byte_len(width: u32, height: u32) -> usize {
        width as usize * height as usize * Self::CHANNELS
    }

    /// Frame dimensions as `(width, height)`.
    #[inline]
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Bytes per row.
    #[inline]
    pub fn stride(&self) -> usize {
        self.width as usize * Self::CHANNELS
    }

    /// Get a row of pixel data.
    #[inline]
    pub fn row(&self, y: u32) -> &[u8] {
        let start = y as usize * self.stride();
        &self.data[start..start + self.stride()]
    }

    /// Get a mutable row of pixel data.
    #[inline]
    pub fn row_mut(&mut self, y: u32) -> &mut [u8] {
        let stride = self.stride();
        let start = y as usize * stride;
        &mut self.data[start..start + stride]
    }

    /// Read one pixel. Panics when out of bounds.
    #[inline]
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 3] {
        let i = (y as usize * self.width as usize + x as usize) * Self::CHANNELS;
        [self.data[i], self.data[i + 1], self.data[i + 2]]
    }

    /// Write one pixel; out-of-bounds writes are ignored.
    #[inline]
    pub fn set_pixel(&mut self, x: u32, y: u32, rgb: [u8; 3]) {
        if x < self.width && y < self.height {
            let i = (y as usize * self.width as usize + x as usize) * Self::CHANNELS;
            self.data[i..i + 3].copy_from_slice(&rgb);
        }
    }

    /// Copy out the pixels under `roi`.
    ///
    /// The region must lie entirely inside the frame.
    pub fn crop(&self, roi: &Roi) -> Result<Frame> {
        if !roi.fits_within(self.width, self.height) {
            return Err(StabiloError::InvalidParameter(format!(
                "ROI {:?} exceeds frame bounds {}x{}",
                roi, self.width, self.height
            )));
        }
        let mut out = Frame::new(roi.width, roi.height);
        let x0 = roi.x as usize * Self::CHANNELS;
        let len = roi.width as usize * Self::CHANNELS;
        for row in 0..roi.height {
            let src = &self.row(roi.y as u32 + row)[x0..x0 + len];
            out.row_mut(row).copy_from_slice(src);
        }
        Ok(out)
    }

    /// Concatenate two frames of equal height side by side.
    pub fn hconcat(left: &Frame, right: &Frame) -> Result<Frame> {
        if left.height != right.height {
            return Err(StabiloError::InvalidParameter(format!(
                "cannot concatenate frames of height {} and {}",
                left.height, right.height
            )));
        }
        let mut out = Frame::new(left.width + right.width, left.height);
        let split = left.stride();
        for y in 0..left.height {
            let row = out.row_mut(y);
            row[..split].copy_from_slice(left.row(y));
            row[split..].copy_from_slice(right.row(y));
        }
        Ok(out)
    }

    /// Downscale by exactly 2x, averaging each 2x2 block.
    ///
    /// Output dimensions are `width / 2` by `height / 2`; a trailing odd
    /// column or row is dropped.
    pub fn downscale_half(&self) -> Frame {
        let (w, h) = (self.width / 2, self.height / 2);
        let mut out = Frame::new(w, h);
        for y in 0..h {
            let top = self.row(y * 2);
            let bottom = self.row(y * 2 + 1);
            let dst = out.row_mut(y);
            for x in 0..w as usize {
                let s = x * 2 * Self::CHANNELS;
                for c in 0..Self::CHANNELS {
                    let sum = top[s + c] as u32
                        + top[s + Self::CHANNELS + c] as u32
                        + bottom[s + c] as u32
                        + bottom[s + Self::CHANNELS + c] as u32;
                    dst[x * Self::CHANNELS + c] = ((sum + 2) / 4) as u8;
                }
            }
        }
        out
    }

    /// Create a test pattern frame (vertical color bars).
    pub fn test_pattern(width: u32, height: u32) -> Self {
        const BARS: [[u8; 3]; 8] = [
            [255, 255, 255], // White
            [255, 255, 0],   // Yellow
            [0, 255, 255],   // Cyan
            [0, 255, 0],     // Green
            [255, 0, 255],   // Magenta
            [255, 0, 0],     // Red
            [0, 0, 255],     // Blue
            [0, 0, 0],       // Black
        ];
        let mut frame = Self::new(width, height);
        for y in 0..height {
            let row = frame.row_mut(y);
            for x in 0..width {
                let bar = (x * 8 / width.max(1)) as usize;
                let i = x as usize * Self::CHANNELS;
                row[i..i + 3].copy_from_slice(&BARS[bar.min(7)]);
            }
        }
        frame
    }
}
