//! Synthetic footage shared by the integration tests.

use stabilo_core::{Frame, FrameRate, MemorySource};

/// Soft coloured blobs at fixed scene positions, viewed through a camera
/// offset by `(dx, dy)`. Rendered analytically, so shifts are exact up to
/// 8-bit quantisation.
pub fn scene_frame(width: u32, height: u32, dx: f32, dy: f32) -> Frame {
    let mut seed = 99u64;
    let mut rand = || {
        seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        ((seed >> 33) as f32) / (1u64 << 31) as f32
    };
    let blobs: Vec<(f32, f32, f32, [f32; 3])> = (0..50)
        .map(|_| {
            let x = rand() * width as f32;
            let y = rand() * height as f32;
            let sigma = 2.5 + rand() * 2.5;
            let colour = [rand() * 200.0, rand() * 200.0, rand() * 200.0];
            (x, y, sigma, colour)
        })
        .collect();

    let mut frame = Frame::new(width, height);
    for y in 0..height {
        for x in 0..width {
            let (sx, sy) = (x as f32 - dx, y as f32 - dy);
            let mut rgb = [20.0f32; 3];
            for &(bx, by, sigma, colour) in &blobs {
                let d2 = (sx - bx).powi(2) + (sy - by).powi(2);
                let w = (-d2 / (2.0 * sigma * sigma)).exp();
                for (c, v) in rgb.iter_mut().zip(colour) {
                    *c += w * v;
                }
            }
            frame.set_pixel(x, y, rgb.map(|v| v.round().clamp(0.0, 255.0) as u8));
        }
    }
    frame
}

/// Deterministic hand-held jitter: camera offset for frame `i`.
pub fn jitter(i: usize) -> (f32, f32) {
    let t = i as f32;
    ((t * 1.7).sin() * 3.0, (t * 2.3).cos() * 2.0)
}

pub fn shaky_video(count: usize) -> (MemorySource, Vec<(f32, f32)>) {
    let offsets: Vec<(f32, f32)> = (0..count).map(jitter).collect();
    let frames = offsets
        .iter()
        .map(|&(dx, dy)| scene_frame(160, 120, dx, dy))
        .collect();
    let source = MemorySource::new(frames, FrameRate::FPS_30).unwrap();
    (source, offsets)
}

pub fn static_video(count: usize) -> MemorySource {
    let frames = vec![scene_frame(160, 120, 0.0, 0.0); count];
    MemorySource::new(frames, FrameRate::FPS_30).unwrap()
}
