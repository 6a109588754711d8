//! Moment-based ellipse estimation.
//!
//! Raw moments `Σw, Σwx, Σwy, Σwxy, Σwx², Σwy²` are reduced to a centroid and
//! a 2×2 covariance. Its eigenvalues give the semi-axes as a 2-sigma radius:
//! a uniformly filled disk of radius `R` has variance `R²/4`, so `2√λ = R`.

mod refine;

pub use refine::{extract_ellipses, refine_region, RefineConfig};

use crate::region::EllipseEstimate;

/// Smallest reported semi-axis in pixels.
pub const MIN_SEMI_AXIS_PX: f64 = 1.0;

/// Weighted raw image moments up to second order.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RawMoments {
    pub m00: f64,
    pub m10: f64,
    pub m01: f64,
    pub m11: f64,
    pub m20: f64,
    pub m02: f64,
    /// Number of samples accumulated (regardless of weight).
    pub count: usize,
}

/// Geometry recovered from moments.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MomentEllipse {
    pub cx: f64,
    pub cy: f64,
    /// Semi-axis along `angle` (major).
    pub rx: f64,
    /// Semi-axis perpendicular to `angle` (minor).
    pub ry: f64,
    /// Major-axis orientation, `0.5 * atan2(2μ11, μ20 − μ02)`.
    pub angle: f64,
}

impl RawMoments {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accumulate one sample with weight `w`.
    #[inline]
    pub fn add(&mut self, x: f64, y: f64, w: f64) {
        self.m00 += w;
        self.m10 += w * x;
        self.m01 += w * y;
        self.m11 += w * x * y;
        self.m20 += w * x * x;
        self.m02 += w * y * y;
        self.count += 1;
    }

    /// Build from unit-weight samples.
    pub fn from_points(points: &[[f64; 2]]) -> Self {
        let mut m = Self::new();
        for &[x, y] in points {
            m.add(x, y, 1.0);
        }
        m
    }

    /// Build from `(x, y, w)` samples.
    pub fn from_weighted(samples: &[[f64; 3]]) -> Self {
        let mut m = Self::new();
        for &[x, y, w] in samples {
            m.add(x, y, w);
        }
        m
    }

    /// Weighted centroid, `None` for zero total weight.
    pub fn centroid(&self) -> Option<[f64; 2]> {
        if self.count == 0 || !(self.m00.abs() > 1e-12) {
            return None;
        }
        Some([self.m10 / self.m00, self.m01 / self.m00])
    }

    /// Normalized central moments `(μ20, μ02, μ11)`.
    pub fn central(&self) -> Option<(f64, f64, f64)> {
        let [xc, yc] = self.centroid()?;
        let mu20 = self.m20 / self.m00 - xc * xc;
        let mu02 = self.m02 / self.m00 - yc * yc;
        let mu11 = self.m11 / self.m00 - xc * yc;
        Some((mu20, mu02, mu11))
    }

    /// Centroid, semi-axes and orientation from the covariance eigen-decomposition.
    pub fn to_ellipse(&self) -> Option<MomentEllipse> {
        let [cx, cy] = self.centroid()?;
        let (mu20, mu02, mu11) = self.central()?;
        let (l1, l2) = covariance_eigenvalues(mu20, mu02, mu11);
        let ellipse = MomentEllipse {
            cx,
            cy,
            rx: (2.0 * l1.sqrt()).max(MIN_SEMI_AXIS_PX),
            ry: (2.0 * l2.sqrt()).max(MIN_SEMI_AXIS_PX),
            angle: 0.5 * (2.0 * mu11).atan2(mu20 - mu02),
        };
        let finite = ellipse.cx.is_finite()
            && ellipse.cy.is_finite()
            && ellipse.rx.is_finite()
            && ellipse.ry.is_finite()
            && ellipse.angle.is_finite();
        finite.then_some(ellipse)
    }
}

impl MomentEllipse {
    pub fn into_estimate(self, id: u32) -> EllipseEstimate {
        EllipseEstimate::new(id, self.cx, self.cy, self.rx, self.ry, self.angle)
    }

    /// max/min axis ratio.
    pub fn axis_ratio(&self) -> f64 {
        self.rx.max(self.ry) / self.rx.min(self.ry)
    }
}

/// Eigenvalues `(λ1 >= λ2)` of `[[μ20, μ11], [μ11, μ02]]`, clamped to >= 0.
#[inline]
pub fn covariance_eigenvalues(mu20: f64, mu02: f64, mu11: f64) -> (f64, f64) {
    let tr = mu20 + mu02;
    let disc = (4.0 * mu11 * mu11 + (mu20 - mu02).powi(2)).sqrt();
    (
        (0.5 * (tr + disc)).max(0.0),
        (0.5 * (tr - disc)).max(0.0),
    )
}
