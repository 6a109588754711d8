//! Calibration configs, model and outcome types.

use serde::{Deserialize, Serialize};

use crate::region::EllipseEstimate;

/// Slopes below this are treated as zero.
pub const SLOPE_EPS: f64 = 1e-10;

/// Outlier rule for the plain least-squares strategy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinearParams {
    /// Inlier bound in residual standard deviations.
    pub sigma_scale: f64,
    /// Floor on the inlier bound (aspect-ratio units).
    pub min_threshold: f64,
}

impl Default for LinearParams {
    fn default() -> Self {
        Self {
            sigma_scale: 2.0,
            min_threshold: 0.05,
        }
    }
}

/// Two-point RANSAC line fitting.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RansacLineConfig {
    /// Absolute residual bound for inliers.
    pub inlier_threshold: f64,
    /// Random pair trials when not exhaustive.
    pub max_trials: usize,
    /// Below this many points every pair is tried.
    pub exhaustive_below: usize,
    /// Random seed for reproducibility.
    pub seed: u64,
}

impl Default for RansacLineConfig {
    fn default() -> Self {
        Self {
            inlier_threshold: 0.15,
            max_trials: 500,
            exhaustive_below: 50,
            seed: 42,
        }
    }
}

/// Repeated fit-and-discard.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrimParams {
    pub iterations: usize,
    /// Share of the working set discarded per round, in percent.
    pub trim_percent: f64,
}

impl Default for TrimParams {
    fn default() -> Self {
        Self {
            iterations: 3,
            trim_percent: 10.0,
        }
    }
}

/// Calibration strategy and its parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum CalibrationMethod {
    Linear(LinearParams),
    Ransac(RansacLineConfig),
    IterativeTrim(TrimParams),
}

impl Default for CalibrationMethod {
    fn default() -> Self {
        Self::Ransac(RansacLineConfig::default())
    }
}

impl CalibrationMethod {
    pub fn kind(&self) -> MethodKind {
        match self {
            Self::Linear(_) => MethodKind::Linear,
            Self::Ransac(_) => MethodKind::Ransac,
            Self::IterativeTrim(_) => MethodKind::IterativeTrim,
        }
    }
}

/// Strategy tag recorded on a model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MethodKind {
    Linear,
    Ransac,
    IterativeTrim,
    /// Built from a known line rather than fitted.
    Fixed,
}

/// Linear aspect-ratio model `aspect = slope · x + intercept`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationModel {
    pub slope: f64,
    pub intercept: f64,
    /// Column of the rotation center, `−intercept / slope` (0 for a flat line).
    pub rotation_center_x: f64,
    /// Slope in degrees per pixel row.
    pub angular_resolution: f64,
    /// Coefficient of determination over inliers, in [0, 1].
    pub r_squared: f64,
    /// RMSE of inlier residuals.
    pub reprojection_error: f64,
    pub is_valid: bool,
    pub method: MethodKind,
    pub inlier_count: usize,
    pub sample_count: usize,
}

impl CalibrationModel {
    /// Placeholder returned when no line could be fitted.
    pub fn invalid(method: MethodKind, sample_count: usize) -> Self {
        Self {
            slope: 0.0,
            intercept: 0.0,
            rotation_center_x: 0.0,
            angular_resolution: 0.0,
            r_squared: 0.0,
            reprojection_error: 0.0,
            is_valid: false,
            method,
            inlier_count: 0,
            sample_count,
        }
    }

    /// A known line, trusted as valid when its slope is non-zero.
    pub fn from_line(slope: f64, intercept: f64) -> Self {
        let flat = slope.abs() < SLOPE_EPS;
        Self {
            slope,
            intercept,
            rotation_center_x: if flat { 0.0 } else { -intercept / slope },
            angular_resolution: slope.to_degrees(),
            r_squared: 1.0,
            reprojection_error: 0.0,
            is_valid: !flat && slope.is_finite() && intercept.is_finite(),
            method: MethodKind::Fixed,
            inlier_count: 0,
            sample_count: 0,
        }
    }

    /// Model aspect ratio at column `x`.
    #[inline]
    pub fn predict(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }
}

/// Fit over raw `(x, aspect)` samples.
#[derive(Debug, Clone, PartialEq)]
pub struct PointFit {
    pub model: CalibrationModel,
    /// Inlier indices in ascending order; `None` when no line was fitted.
    pub inliers: Option<Vec<usize>>,
}

/// Calibration result over an ellipse set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationOutcome {
    pub model: CalibrationModel,
    /// The input ellipses with statuses replaced.
    pub ellipses: Vec<EllipseEstimate>,
    /// Inlier indices into the input; empty when the fit reached no verdict.
    pub inliers: Vec<usize>,
}
