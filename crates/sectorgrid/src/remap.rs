//! Sector remapping: raw scan image to a geometrically corrected fan.
//!
//! Source column `sx` is a radius `r = sx − rotation_center_x` and source row
//! `sy` an angle `θ = (sy − H/2) · slope`. The corrected image places each
//! sample at `(r cos θ, r sin θ)`. Output pixels are filled by inverse mapping
//! only, so the fan has no holes.

use std::f64::consts::{FRAC_PI_2, PI};

#[cfg(feature = "parallel")]
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::calib::{CalibrationModel, SLOPE_EPS};
use crate::error::SectorError;
use crate::pixel::PixelBuffer;

/// Remapping controls.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemapConfig {
    /// Empty margin around the fan (pixels).
    pub padding_px: f64,
    /// Upper bound on output canvas pixels.
    pub max_output_pixels: u64,
}

impl Default for RemapConfig {
    fn default() -> Self {
        Self {
            padding_px: 10.0,
            max_output_pixels: 64 * 1024 * 1024,
        }
    }
}

/// Mapping between source pixels and the corrected canvas.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SectorGeometry {
    pub src_width: u32,
    pub src_height: u32,
    pub slope: f64,
    pub rotation_center_x: f64,
    /// Full angular span `|slope| · src_height`.
    pub total_angle: f64,
    pub r_min: f64,
    pub r_max: f64,
    /// Cartesian position of canvas pixel (0, 0).
    pub origin: [f64; 2],
    pub width: u32,
    pub height: u32,
}

impl SectorGeometry {
    /// Fan geometry for a `src_width × src_height` source under `model`.
    pub fn new(
        model: &CalibrationModel,
        src_width: u32,
        src_height: u32,
        padding_px: f64,
    ) -> Result<Self, SectorError> {
        if !model.is_valid {
            return Err(SectorError::InvalidModel {
                reason: "model is not valid".to_string(),
            });
        }
        if !(model.slope.abs() >= SLOPE_EPS) || !model.rotation_center_x.is_finite() {
            return Err(SectorError::InvalidModel {
                reason: format!("degenerate slope {}", model.slope),
            });
        }
        let slope = model.slope;
        let rotation_center_x = model.rotation_center_x;
        let total_angle = slope.abs() * src_height as f64;
        let r_min = -rotation_center_x;
        let r_max = src_width as f64 - rotation_center_x;
        let half = 0.5 * total_angle;

        // Corners of the (r, θ) box, plus the axis crossings the arcs pass through.
        let mut angles = vec![-half, half];
        for a in [0.0, FRAC_PI_2, -FRAC_PI_2, PI, -PI] {
            if a.abs() < half {
                angles.push(a);
            }
        }
        let (mut x0, mut y0) = (f64::INFINITY, f64::INFINITY);
        let (mut x1, mut y1) = (f64::NEG_INFINITY, f64::NEG_INFINITY);
        for &r in &[r_min, r_max] {
            for &t in &angles {
                let (s, c) = t.sin_cos();
                x0 = x0.min(r * c);
                x1 = x1.max(r * c);
                y0 = y0.min(r * s);
                y1 = y1.max(r * s);
            }
        }
        let width = (x1 - x0 + 2.0 * padding_px).ceil();
        let height = (y1 - y0 + 2.0 * padding_px).ceil();
        let representable = |v: f64| v.is_finite() && v <= u32::MAX as f64;
        if !representable(width) || !representable(height) {
            return Err(SectorError::InvalidModel {
                reason: "canvas extent is not representable".to_string(),
            });
        }

        Ok(Self {
            src_width,
            src_height,
            slope,
            rotation_center_x,
            total_angle,
            r_min,
            r_max,
            origin: [x0 - padding_px, y0 - padding_px],
            width: width.max(0.0) as u32,
            height: height.max(0.0) as u32,
        })
    }

    pub fn pixel_count(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Source position sampled by canvas pixel `(px, py)`, if it lies inside
    /// the fan and the source image.
    #[inline]
    pub fn target_to_source(&self, px: f64, py: f64) -> Option<[f64; 2]> {
        let x = px + self.origin[0];
        let y = py + self.origin[1];
        let r = x.hypot(y);
        let theta = y.atan2(x);
        if r < self.r_min || r > self.r_max || theta.abs() > 0.5 * self.total_angle {
            return None;
        }
        let sx = r + self.rotation_center_x;
        let sy = theta / self.slope + 0.5 * self.src_height as f64;
        let inside = sx >= 0.0
            && sy >= 0.0
            && sx < self.src_width as f64
            && sy < self.src_height as f64;
        inside.then_some([sx, sy])
    }

    /// Canvas position of source point `(sx, sy)`.
    #[inline]
    pub fn source_to_target(&self, sx: f64, sy: f64) -> [f64; 2] {
        let r = sx - self.rotation_center_x;
        let theta = (sy - 0.5 * self.src_height as f64) * self.slope;
        let (s, c) = theta.sin_cos();
        [r * c - self.origin[0], r * s - self.origin[1]]
    }
}

/// Corrected image and the geometry that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct SectorImage {
    /// RGBA; pixels outside the fan are `[0, 0, 0, 0]`.
    pub buffer: PixelBuffer,
    pub geometry: SectorGeometry,
}

fn fill_row(row: &mut [u8], py: usize, src: &PixelBuffer, geo: &SectorGeometry) {
    for (px, out) in row.chunks_exact_mut(4).enumerate() {
        if let Some([sx, sy]) = geo.target_to_source(px as f64, py as f64) {
            out.copy_from_slice(&src.rgba(sx.floor() as u32, sy.floor() as u32));
        }
    }
}

/// Remap `buffer` into sector space with nearest-neighbor sampling.
pub fn remap_sector(
    buffer: &PixelBuffer,
    model: &CalibrationModel,
    config: &RemapConfig,
) -> Result<SectorImage, SectorError> {
    let geometry = SectorGeometry::new(model, buffer.width(), buffer.height(), config.padding_px)?;
    if geometry.pixel_count() > config.max_output_pixels {
        return Err(SectorError::CanvasTooLarge {
            width: geometry.width as u64,
            height: geometry.height as u64,
            max_pixels: config.max_output_pixels,
        });
    }

    let mut out = PixelBuffer::transparent(geometry.width, geometry.height);
    let stride = geometry.width as usize * 4;
    if stride > 0 {
        let data = out.as_raw_mut();
        #[cfg(feature = "parallel")]
        {
            data.par_chunks_mut(stride)
                .enumerate()
                .for_each(|(py, row)| fill_row(row, py, buffer, &geometry));
        }
        #[cfg(not(feature = "parallel"))]
        {
            data.chunks_mut(stride)
                .enumerate()
                .for_each(|(py, row)| fill_row(row, py, buffer, &geometry));
        }
    }

    tracing::debug!(
        "sector canvas {}x{}, r [{:.1}, {:.1}], span {:.4} rad",
        geometry.width,
        geometry.height,
        geometry.r_min,
        geometry.r_max,
        geometry.total_angle
    );
    Ok(SectorImage {
        buffer: out,
        geometry,
    })
}
