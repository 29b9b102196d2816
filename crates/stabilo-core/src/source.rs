//! Abstractions over where frames come from and where they go.
//!
//! The stabilization passes only ever need sequential reads plus a seek,
//! so decoders that can only restart from the beginning still qualify.

use crate::error::{Result, StabiloError};
use crate::frame::Frame;
use crate::geometry::Roi;
use crate::time::FrameRate;
use std::path::Path;

/// Seekable, sequential source of decoded frames.
pub trait FrameSource {
    /// Total number of frames reported by the container.
    fn frame_count(&self) -> usize;

    /// Frame dimensions as `(width, height)`.
    fn dimensions(&self) -> (u32, u32);

    /// Nominal frame rate.
    fn frame_rate(&self) -> FrameRate;

    /// Position the source so the next [`read_next`](Self::read_next)
    /// returns frame `index`.
    fn seek(&mut self, index: usize) -> Result<()>;

    /// Read the next frame, or `Ok(None)` once the stream is exhausted.
    fn read_next(&mut self) -> Result<Option<Frame>>;
}

/// Destination for rendered frames.
pub trait FrameSink {
    fn write_frame(&mut self, frame: &Frame) -> Result<()>;

    /// Flush and close the sink. Frames written so far remain valid output.
    fn finish(&mut self) -> Result<()>;
}

/// Chooses the region of interest on a reference frame.
pub trait RegionSelector {
    fn select(&mut self, frame: &Frame) -> Result<Roi>;
}

/// Persists a single still image.
pub trait ImageWriter {
    fn write(&self, frame: &Frame, path: &Path) -> Result<()>;
}

impl<S: FrameSource + ?Sized> FrameSource for &mut S {
    fn frame_count(&self) -> usize {
        (**self).frame_count()
    }

    fn dimensions(&self) -> (u32, u32) {
        (**self).dimensions()
    }

    fn frame_rate(&self) -> FrameRate {
        (**self).frame_rate()
    }

    fn seek(&mut self, index: usize) -> Result<()> {
        (**self).seek(index)
    }

    fn read_next(&mut self) -> Result<Option<Frame>> {
        (**self).read_next()
    }
}

impl<K: FrameSink + ?Sized> FrameSink for &mut K {
    fn write_frame(&mut self, frame: &Frame) -> Result<()> {
        (**self).write_frame(frame)
    }

    fn finish(&mut self) -> Result<()> {
        (**self).finish()
    }
}

/// Frame source backed by frames already in memory.
#[derive(Debug, Clone)]
pub struct MemorySource {
    frames: Vec<Frame>,
    frame_rate: FrameRate,
    position: usize,
}

impl MemorySource {
    /// All frames must share the same dimensions.
    pub fn new(frames: Vec<Frame>, frame_rate: FrameRate) -> Result<Self> {
        if let Some(first) = frames.first() {
            if let Some(bad) = frames.iter().position(|f| f.dimensions() != first.dimensions()) {
                return Err(StabiloError::InvalidParameter(format!(
                    "frame {} is {:?}, expected {:?}",
                    bad,
                    frames[bad].dimensions(),
                    first.dimensions()
                )));
            }
        }
        Ok(Self {
            frames,
            frame_rate,
            position: 0,
        })
    }

    /// Index of the frame the next read returns.
    pub fn position(&self) -> usize {
        self.position
    }
}

impl FrameSource for MemorySource {
    fn frame_count(&self) -> usize {
        self.frames.len()
    }

    fn dimensions(&self) -> (u32, u32) {
        self.frames.first().map_or((0, 0), Frame::dimensions)
    }

    fn frame_rate(&self) -> FrameRate {
        self.frame_rate
    }

    fn seek(&mut self, index: usize) -> Result<()> {
        if index > self.frames.len() {
            return Err(StabiloError::InvalidParameter(format!(
                "seek to frame {} past end ({} frames)",
                index,
                self.frames.len()
            )));
        }
        self.position = index;
        Ok(())
    }

    fn read_next(&mut self) -> Result<Option<Frame>> {
        let frame = self.frames.get(self.position).cloned();
        if frame.is_some() {
            self.position += 1;
        }
        Ok(frame)
    }
}

/// Frame sink that collects frames in memory.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    pub frames: Vec<Frame>,
    pub finished: bool,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl FrameSink for MemorySink {
    fn write_frame(&mut self, frame: &Frame) -> Result<()> {
        if self.finished {
            return Err(StabiloError::Encoder("sink already finished".into()));
        }
        self.frames.push(frame.clone());
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.finished = true;
        Ok(())
    }
}

/// Headless selector returning a preconfigured region.
#[derive(Debug, Clone, Copy)]
pub struct FixedRegion(pub Roi);

impl RegionSelector for FixedRegion {
    fn select(&mut self, frame: &Frame) -> Result<Roi> {
        if !self.0.fits_within(frame.width, frame.height) {
            return Err(StabiloError::InvalidParameter(format!(
                "configured ROI {:?} does not fit a {}x{} frame",
                self.0, frame.width, frame.height
            )));
        }
        Ok(self.0)
    }
}

/// Headless selector returning a centered region covering `fraction` of
/// each frame dimension.
#[derive(Debug, Clone, Copy)]
pub struct CenteredRegion {
    pub fraction: f64,
}

impl Default for CenteredRegion {
    fn default() -> Self {
        Self { fraction: 0.25 }
    }
}

impl RegionSelector for CenteredRegion {
    fn select(&mut self, frame: &Frame) -> Result<Roi> {
        if !(self.fraction > 0.0 && self.fraction <= 1.0) {
            return Err(StabiloError::InvalidParameter(format!(
                "region fraction must be in (0, 1], got {}",
                self.fraction
            )));
        }
        let w = ((frame.width as f64 * self.fraction).round() as u32).clamp(1, frame.width.max(1));
        let h =
            ((frame.height as f64 * self.fraction).round() as u32).clamp(1, frame.height.max(1));
        let x = ((frame.width - w) / 2) as i32;
        let y = ((frame.height - h) / 2) as i32;
        Ok(Roi::new(x, y, w, h))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frames(n: usize) -> Vec<Frame> {
        (0..n)
            .map(|i| Frame::filled(4, 4, [i as u8, 0, 0]))
            .collect()
    }

    #[test]
    fn test_memory_source_reads_in_order() {
        let mut src = MemorySource::new(frames(3), FrameRate::FPS_30).unwrap();
        assert_eq!(src.frame_count(), 3);
        assert_eq!(src.read_next().unwrap().unwrap().pixel(0, 0)[0], 0);
        assert_eq!(src.read_next().unwrap().unwrap().pixel(0, 0)[0], 1);
        assert_eq!(src.read_next().unwrap().unwrap().pixel(0, 0)[0], 2);
        assert!(src.read_next().unwrap().is_none());
    }

    #[test]
    fn test_memory_source_seek() {
        let mut src = MemorySource::new(frames(5), FrameRate::FPS_30).unwrap();
        src.seek(3).unwrap();
        assert_eq!(src.read_next().unwrap().unwrap().pixel(0, 0)[0], 3);
        src.seek(0).unwrap();
        assert_eq!(src.position(), 0);
        assert!(src.seek(6).is_err());
    }

    #[test]
    fn test_memory_source_rejects_mixed_sizes() {
        let frames = vec![Frame::new(4, 4), Frame::new(4, 5)];
        assert!(MemorySource::new(frames, FrameRate::FPS_30).is_err());
    }

    #[test]
    fn test_memory_sink() {
        let mut sink = MemorySink::new();
        sink.write_frame(&Frame::new(2, 2)).unwrap();
        sink.finish().unwrap();
        assert_eq!(sink.frames.len(), 1);
        assert!(sink.write_frame(&Frame::new(2, 2)).is_err());
    }

    #[test]
    fn test_centered_region() {
        let frame = Frame::new(100, 80);
        let roi = CenteredRegion { fraction: 0.5 }.select(&frame).unwrap();
        assert_eq!(roi, Roi::new(25, 20, 50, 40));
    }

    #[test]
    fn test_fixed_region_validates() {
        let frame = Frame::new(100, 80);
        assert!(FixedRegion(Roi::new(90, 0, 20, 20)).select(&frame).is_err());
        assert!(FixedRegion(Roi::new(10, 10, 20, 20)).select(&frame).is_ok());
    }
}
