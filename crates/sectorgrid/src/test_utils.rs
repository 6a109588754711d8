//! Synthetic image helpers shared by unit tests.

use image::{Rgb, RgbImage};

/// Render filled disks of `radius` at `centers` on a uniform background.
///
/// A pixel is inside a disk when its integer coordinate lies within `radius`
/// of the center.
pub(crate) fn draw_disks(
    w: u32,
    h: u32,
    centers: &[[f64; 2]],
    radius: f64,
    spot_value: u8,
    bg_value: u8,
) -> RgbImage {
    let mut img = RgbImage::from_pixel(w, h, Rgb([bg_value; 3]));
    let r2 = radius * radius;
    for &[cx, cy] in centers {
        let x0 = (cx - radius).floor().max(0.0) as u32;
        let y0 = (cy - radius).floor().max(0.0) as u32;
        let x1 = ((cx + radius).ceil() as u32).min(w.saturating_sub(1));
        let y1 = ((cy + radius).ceil() as u32).min(h.saturating_sub(1));
        for y in y0..=y1 {
            for x in x0..=x1 {
                let dx = x as f64 - cx;
                let dy = y as f64 - cy;
                if dx * dx + dy * dy <= r2 {
                    img.put_pixel(x, y, Rgb([spot_value; 3]));
                }
            }
        }
    }
    img
}

/// Render axis-aligned filled ellipses `(cx, cy, rx, ry)` via `imageproc`.
pub(crate) fn draw_ellipses(
    w: u32,
    h: u32,
    ellipses: &[(i32, i32, i32, i32)],
    spot_value: u8,
    bg_value: u8,
) -> RgbImage {
    let mut img = RgbImage::from_pixel(w, h, Rgb([bg_value; 3]));
    for &(cx, cy, rx, ry) in ellipses {
        imageproc::drawing::draw_filled_ellipse_mut(
            &mut img,
            (cx, cy),
            rx,
            ry,
            Rgb([spot_value; 3]),
        );
    }
    img
}

/// Gaussian-blur an `RgbImage` via `imageproc`.
pub(crate) fn blurred(img: &RgbImage, sigma: f32) -> RgbImage {
    imageproc::filter::gaussian_blur_f32(img, sigma)
}

/// Row-major centers of a `rows × cols` lattice starting at `origin`.
pub(crate) fn grid_centers(
    rows: usize,
    cols: usize,
    origin: [f64; 2],
    pitch: f64,
) -> Vec<[f64; 2]> {
    let mut out = Vec::with_capacity(rows * cols);
    for j in 0..rows {
        for i in 0..cols {
            out.push([origin[0] + i as f64 * pitch, origin[1] + j as f64 * pitch]);
        }
    }
    out
}

/// Circular ellipse estimates on the lattice from [`grid_centers`], ids from 1.
pub(crate) fn grid_ellipses(
    rows: usize,
    cols: usize,
    origin: [f64; 2],
    pitch: f64,
    radius: f64,
) -> Vec<crate::EllipseEstimate> {
    grid_centers(rows, cols, origin, pitch)
        .into_iter()
        .zip(1u32..)
        .map(|([x, y], id)| crate::EllipseEstimate::new(id, x, y, radius, radius, 0.0))
        .collect()
}
