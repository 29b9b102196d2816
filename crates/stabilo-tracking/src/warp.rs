//! Affine frame warping with bilinear sampling and a black border.

use glam::{DAffine2, DVec2};
use rayon::prelude::*;
use stabilo_core::Frame;

const C: usize = Frame::CHANNELS;

/// Warp `src` by the forward transform `m`.
///
/// Every output pixel `p` samples the source at `m⁻¹ · p`. Source pixels
/// outside the frame read as black, so uncovered areas come out black and
/// edges blend into it. Output has the same size as the input.
pub fn warp_affine(src: &Frame, m: &DAffine2) -> Frame {
    let (w, h) = src.dimensions();
    let mut out = Frame::new(w, h);
    if w == 0 || h == 0 || m.matrix2.determinant().abs() < 1e-12 {
        return out;
    }
    let inv = m.inverse();
    let stride = src.stride();

    out.data
        .par_chunks_mut(stride)
        .enumerate()
        .for_each(|(y, row)| {
            for x in 0..w as usize {
                let p = inv.transform_point2(DVec2::new(x as f64, y as f64));
                let px = sample_bilinear(src, p.x, p.y);
                row[x * C..x * C + C].copy_from_slice(&px);
            }
        });
    out
}

/// Bilinear sample with out-of-frame neighbours treated as zero.
#[inline]
fn sample_bilinear(src: &Frame, x: f64, y: f64) -> [u8; 3] {
    let (w, h) = (src.width as i64, src.height as i64);
    if !(x > -1.0 && y > -1.0 && x < w as f64 && y < h as f64) {
        return [0; 3];
    }
    let x0 = x.floor();
    let y0 = y.floor();
    let fx = x - x0;
    let fy = y - y0;
    let (x0, y0) = (x0 as i64, y0 as i64);

    let taps = [
        (x0, y0, (1.0 - fx) * (1.0 - fy)),
        (x0 + 1, y0, fx * (1.0 - fy)),
        (x0, y0 + 1, (1.0 - fx) * fy),
        (x0 + 1, y0 + 1, fx * fy),
    ];
    let mut acc = [0.0f64; 3];
    for (tx, ty, weight) in taps {
        if tx < 0 || ty < 0 || tx >= w || ty >= h || weight == 0.0 {
            continue;
        }
        let i = (ty as usize * w as usize + tx as usize) * C;
        for (a, v) in acc.iter_mut().zip(&src.data[i..i + C]) {
            *a += weight * *v as f64;
        }
    }
    acc.map(|v| v.round().clamp(0.0, 255.0) as u8)
}
