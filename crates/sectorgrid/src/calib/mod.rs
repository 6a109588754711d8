//! Robust calibration of the sector-scan model.
//!
//! Each spot contributes a sample `(cx, aspect)`, where `aspect` is the
//! width/height ratio of its axis-aligned bounding box. In a sector scan the
//! aspect ratio grows linearly with the distance from the rotation center, so
//! a line `aspect = slope · x + intercept` yields
//! - the rotation center column `−intercept / slope`,
//! - the angular scan rate `slope` (radians per source row).
//!
//! Three interchangeable strategies are provided: plain least squares with
//! a residual bound ([`fit_linear`]), two-point RANSAC ([`fit_ransac`]), and
//! iterative percentage trimming ([`fit_trimmed`]).

mod linear;
mod lsq;
mod ransac;
mod trim;
mod types;

pub use linear::fit_linear;
pub use ransac::{fit_ransac, fit_ransac_with_rng};
pub use trim::fit_trimmed;
pub use types::{
    CalibrationMethod, CalibrationModel, CalibrationOutcome, LinearParams, MethodKind, PointFit,
    RansacLineConfig, TrimParams, SLOPE_EPS,
};

use rand::Rng;

use crate::region::{EllipseEstimate, EllipseStatus};

/// Fewer samples than this never produce a verdict.
pub const MIN_SAMPLES: usize = 3;

/// Calibration samples `(cx, aspect)` in input order.
pub fn samples(ellipses: &[EllipseEstimate]) -> Vec<[f64; 2]> {
    ellipses.iter().map(|e| [e.cx, e.aspect_ratio()]).collect()
}

fn too_few(points: &[[f64; 2]], method: &CalibrationMethod) -> Option<PointFit> {
    (points.len() < MIN_SAMPLES).then(|| PointFit {
        model: CalibrationModel::invalid(method.kind(), points.len()),
        inliers: None,
    })
}

/// Fit raw samples with `method`. RANSAC is seeded from its config.
pub fn fit_points(points: &[[f64; 2]], method: &CalibrationMethod) -> PointFit {
    if let Some(fit) = too_few(points, method) {
        return fit;
    }
    match method {
        CalibrationMethod::Linear(p) => fit_linear(points, p),
        CalibrationMethod::Ransac(c) => fit_ransac(points, c),
        CalibrationMethod::IterativeTrim(p) => fit_trimmed(points, p),
    }
}

/// [`fit_points`] drawing RANSAC samples from `rng`.
pub fn fit_points_with_rng(
    points: &[[f64; 2]],
    method: &CalibrationMethod,
    rng: &mut impl Rng,
) -> PointFit {
    if let Some(fit) = too_few(points, method) {
        return fit;
    }
    match method {
        CalibrationMethod::Ransac(c) => fit_ransac_with_rng(points, c, rng),
        _ => fit_points(points, method),
    }
}

fn outcome(ellipses: &[EllipseEstimate], fit: PointFit) -> CalibrationOutcome {
    let model = fit.model;
    let Some(inliers) = fit.inliers else {
        // No verdict: statuses reset to active.
        tracing::warn!(
            "calibration failed on {} samples, model invalid",
            ellipses.len()
        );
        return CalibrationOutcome {
            model,
            ellipses: ellipses
                .iter()
                .map(|e| e.with_status(EllipseStatus::Active))
                .collect(),
            inliers: Vec::new(),
        };
    };

    let mut is_inlier = vec![false; ellipses.len()];
    for &i in &inliers {
        is_inlier[i] = true;
    }
    let ellipses = ellipses
        .iter()
        .zip(&is_inlier)
        .map(|(e, &keep)| {
            e.with_status(if keep {
                EllipseStatus::Active
            } else {
                EllipseStatus::Outlier
            })
        })
        .collect();

    if model.is_valid {
        tracing::info!(
            "calibration ({:?}): center x {:.2}, slope {:.3e}, R² {:.4}, {}/{} inliers",
            model.method,
            model.rotation_center_x,
            model.slope,
            model.r_squared,
            model.inlier_count,
            model.sample_count
        );
    } else {
        tracing::warn!(
            "calibration ({:?}) not valid: R² {:.4} with {} inliers",
            model.method,
            model.r_squared,
            model.inlier_count
        );
    }
    CalibrationOutcome {
        model,
        ellipses,
        inliers,
    }
}

/// Calibrate from an ellipse set; returns a fresh ellipse list with statuses set.
pub fn calibrate(ellipses: &[EllipseEstimate], method: &CalibrationMethod) -> CalibrationOutcome {
    outcome(ellipses, fit_points(&samples(ellipses), method))
}

/// [`calibrate`] drawing RANSAC samples from `rng`.
pub fn calibrate_with_rng(
    ellipses: &[EllipseEstimate],
    method: &CalibrationMethod,
    rng: &mut impl Rng,
) -> CalibrationOutcome {
    outcome(ellipses, fit_points_with_rng(&samples(ellipses), method, rng))
}
