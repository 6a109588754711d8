//! Candidate regions and the ellipse estimates produced from them.

use serde::{Deserialize, Serialize};

/// Shape of a candidate area.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RegionShape {
    /// Circle of the given radius.
    Circle { radius: f64 },
    /// Ellipse with semi-axes along its rotated frame.
    Ellipse {
        /// Semi-axis along the rotated x direction.
        rx: f64,
        /// Semi-axis along the rotated y direction.
        ry: f64,
        /// Rotation of the x semi-axis from +x, in radians.
        rotation: f64,
    },
}

/// A candidate spot area, supplied by an editor or generated by segmentation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub id: u32,
    pub center: [f64; 2],
    pub shape: RegionShape,
}

/// Inclusive integer pixel bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelBounds {
    pub x0: u32,
    pub y0: u32,
    pub x1: u32,
    pub y1: u32,
}

impl Region {
    pub fn circle(id: u32, center: [f64; 2], radius: f64) -> Self {
        Self {
            id,
            center,
            shape: RegionShape::Circle { radius },
        }
    }

    pub fn ellipse(id: u32, center: [f64; 2], rx: f64, ry: f64, rotation: f64) -> Self {
        Self {
            id,
            center,
            shape: RegionShape::Ellipse { rx, ry, rotation },
        }
    }

    /// `(rx, ry, rotation)`; circles report equal axes and zero rotation.
    pub fn semi_axes(&self) -> (f64, f64, f64) {
        match self.shape {
            RegionShape::Circle { radius } => (radius, radius, 0.0),
            RegionShape::Ellipse { rx, ry, rotation } => (rx, ry, rotation),
        }
    }

    /// Whether the point lies inside the region boundary.
    pub fn contains(&self, x: f64, y: f64) -> bool {
        let dx = x - self.center[0];
        let dy = y - self.center[1];
        match self.shape {
            RegionShape::Circle { radius } => dx * dx + dy * dy <= radius * radius,
            RegionShape::Ellipse { rx, ry, rotation } => {
                if rx <= 0.0 || ry <= 0.0 {
                    return false;
                }
                let (s, c) = rotation.sin_cos();
                let lx = dx * c + dy * s;
                let ly = -dx * s + dy * c;
                (lx / rx).powi(2) + (ly / ry).powi(2) <= 1.0
            }
        }
    }

    /// Pixel bounds of the region clipped to a `width x height` image.
    ///
    /// Returns `None` when the region lies entirely outside the image.
    pub fn bounding_box(&self, width: u32, height: u32) -> Option<PixelBounds> {
        if width == 0 || height == 0 {
            return None;
        }
        let (rx, ry, rot) = self.semi_axes();
        let [hw, hh] = bounding_half_extents(rx, ry, rot);
        let x0 = (self.center[0] - hw).floor();
        let y0 = (self.center[1] - hh).floor();
        let x1 = (self.center[0] + hw).ceil();
        let y1 = (self.center[1] + hh).ceil();
        if !(x0.is_finite() && y0.is_finite() && x1.is_finite() && y1.is_finite()) {
            return None;
        }
        let max_x = (width - 1) as f64;
        let max_y = (height - 1) as f64;
        if x1 < 0.0 || y1 < 0.0 || x0 > max_x || y0 > max_y {
            return None;
        }
        Some(PixelBounds {
            x0: x0.clamp(0.0, max_x) as u32,
            y0: y0.clamp(0.0, max_y) as u32,
            x1: x1.clamp(0.0, max_x) as u32,
            y1: y1.clamp(0.0, max_y) as u32,
        })
    }
}

/// Half width and half height of the axis-aligned box around a rotated ellipse.
#[inline]
pub fn bounding_half_extents(rx: f64, ry: f64, angle: f64) -> [f64; 2] {
    let (s, c) = angle.sin_cos();
    [
        ((rx * c).powi(2) + (ry * s).powi(2)).sqrt(),
        ((rx * s).powi(2) + (ry * c).powi(2)).sqrt(),
    ]
}

/// Calibration verdict for an ellipse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EllipseStatus {
    #[default]
    Active,
    Outlier,
}

/// A fitted spot ellipse.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EllipseEstimate {
    pub id: u32,
    /// Center x (pixels).
    pub cx: f64,
    /// Center y (pixels).
    pub cy: f64,
    /// Semi-axis along `angle` (pixels, >= 1).
    pub rx: f64,
    /// Semi-axis perpendicular to `angle` (pixels, >= 1).
    pub ry: f64,
    /// Orientation of the `rx` axis from +x, in radians.
    pub angle: f64,
    #[serde(default)]
    pub status: EllipseStatus,
}

impl EllipseEstimate {
    pub fn new(id: u32, cx: f64, cy: f64, rx: f64, ry: f64, angle: f64) -> Self {
        Self {
            id,
            cx,
            cy,
            rx,
            ry,
            angle,
            status: EllipseStatus::Active,
        }
    }

    /// Ellipse matching a region's own geometry.
    pub fn from_region(region: &Region) -> Self {
        let (rx, ry, rot) = region.semi_axes();
        Self::new(region.id, region.center[0], region.center[1], rx, ry, rot)
    }

    pub fn with_status(self, status: EllipseStatus) -> Self {
        Self { status, ..self }
    }

    pub fn is_active(&self) -> bool {
        self.status == EllipseStatus::Active
    }

    pub fn center(&self) -> [f64; 2] {
        [self.cx, self.cy]
    }

    /// Width / height of the axis-aligned bounding box.
    ///
    /// Invariant under swapping `rx`/`ry` together with a quarter-turn of `angle`.
    pub fn aspect_ratio(&self) -> f64 {
        let [hw, hh] = bounding_half_extents(self.rx, self.ry, self.angle);
        if hh <= 0.0 {
            return 0.0;
        }
        hw / hh
    }

    pub fn mean_radius(&self) -> f64 {
        0.5 * (self.rx + self.ry)
    }

    /// min/max semi-axis ratio in (0, 1].
    pub fn roundness(&self) -> f64 {
        let lo = self.rx.min(self.ry);
        let hi = self.rx.max(self.ry);
        if hi <= 0.0 {
            return 0.0;
        }
        lo / hi
    }

    /// Region with the same center and orientation, axes scaled by `scale`.
    pub fn to_region(&self, scale: f64) -> Region {
        Region::ellipse(
            self.id,
            [self.cx, self.cy],
            self.rx * scale,
            self.ry * scale,
            self.angle,
        )
    }
}
