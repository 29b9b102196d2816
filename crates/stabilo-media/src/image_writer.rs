//! Still image output through the `image` crate.

use image::RgbImage;
use stabilo_core::{Frame, ImageWriter, Result, StabiloError};
use std::path::Path;
use tracing::info;

/// Writes frames as image files; the format follows the file extension.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageFileWriter;

impl ImageWriter for ImageFileWriter {
    fn write(&self, frame: &Frame, path: &Path) -> Result<()> {
        let img = RgbImage::from_raw(frame.width, frame.height, frame.data.clone())
            .ok_or_else(|| StabiloError::Image("frame buffer does not match its size".into()))?;
        img.save(path)
            .map_err(|e| StabiloError::Image(format!("failed to write {}: {e}", path.display())))?;
        info!(path = %path.display(), width = frame.width, height = frame.height, "Saved image");
        Ok(())
    }
}

/// Read an image file back into a frame.
pub fn read_image(path: &Path) -> Result<Frame> {
    let img = image::open(path)
        .map_err(|e| StabiloError::Image(format!("failed to read {}: {e}", path.display())))?
        .into_rgb8();
    let (width, height) = img.dimensions();
    Frame::from_raw(width, height, img.into_raw())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_png_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pattern.png");
        let frame = Frame::test_pattern(32, 8);
        ImageFileWriter.write(&frame, &path).unwrap();
        assert_eq!(read_image(&path).unwrap(), frame);
    }

    #[test]
    fn test_jpeg_is_written() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mean.jpg");
        ImageFileWriter
            .write(&Frame::filled(16, 16, [120, 60, 30]), &path)
            .unwrap();
        let back = read_image(&path).unwrap();
        assert_eq!(back.dimensions(), (16, 16));
        let px = back.pixel(8, 8);
        assert!((px[0] as i32 - 120).abs() <= 4, "{px:?}");
    }

    #[test]
    fn test_unknown_extension_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = ImageFileWriter
            .write(&Frame::new(4, 4), &dir.path().join("mean.unknown"))
            .unwrap_err();
        assert!(matches!(err, StabiloError::Image(_)));
    }
}
