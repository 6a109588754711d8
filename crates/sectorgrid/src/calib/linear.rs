//! Plain least squares with a residual bound.

use super::lsq::{fit_line, residual, summarize};
use super::types::{CalibrationModel, LinearParams, MethodKind, PointFit};

/// One OLS fit over every point; inliers are points whose residual is within
/// `max(sigma_scale · σ, min_threshold)`, σ the population standard deviation
/// of the residuals about their mean.
pub fn fit_linear(points: &[[f64; 2]], params: &LinearParams) -> PointFit {
    let all: Vec<usize> = (0..points.len()).collect();
    let Some((slope, intercept)) = fit_line(points, &all) else {
        return PointFit {
            model: CalibrationModel::invalid(MethodKind::Linear, points.len()),
            inliers: None,
        };
    };

    let residuals: Vec<f64> = points
        .iter()
        .map(|&p| residual(p, slope, intercept))
        .collect();
    let n = residuals.len() as f64;
    let mean = residuals.iter().sum::<f64>() / n;
    let sigma = (residuals.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / n).sqrt();
    let bound = (params.sigma_scale * sigma).max(params.min_threshold);

    let inliers: Vec<usize> = residuals
        .iter()
        .enumerate()
        .filter(|(_, r)| r.abs() <= bound)
        .map(|(i, _)| i)
        .collect();
    tracing::debug!(
        "linear fit: sigma {:.4}, bound {:.4}, {}/{} inliers",
        sigma,
        bound,
        inliers.len(),
        points.len()
    );

    PointFit {
        model: summarize(points, &inliers, slope, intercept, MethodKind::Linear),
        inliers: Some(inliers),
    }
}
