//! Ordinary least squares and inlier-only model statistics.

use super::types::{CalibrationModel, MethodKind, SLOPE_EPS};

/// `(slope, intercept)` of the OLS line through `points[idx]` for `idx` in `subset`.
///
/// `None` for fewer than two points or a near-singular system (all `x` equal).
pub(crate) fn fit_line(points: &[[f64; 2]], subset: &[usize]) -> Option<(f64, f64)> {
    let n = subset.len();
    if n < 2 {
        return None;
    }
    let nf = n as f64;
    let (mut sx, mut sy, mut sxx, mut sxy) = (0.0, 0.0, 0.0, 0.0);
    for &i in subset {
        let [x, y] = points[i];
        sx += x;
        sy += y;
        sxx += x * x;
        sxy += x * y;
    }
    let denom = nf * sxx - sx * sx;
    // Scale-aware singularity test.
    if denom.abs() <= 1e-12 * (nf * sxx).abs().max(1.0) {
        return None;
    }
    let slope = (nf * sxy - sx * sy) / denom;
    let intercept = (sy - slope * sx) / nf;
    (slope.is_finite() && intercept.is_finite()).then_some((slope, intercept))
}

#[inline]
pub(crate) fn residual(p: [f64; 2], slope: f64, intercept: f64) -> f64 {
    p[1] - (slope * p[0] + intercept)
}

/// Build the model for a line and its inlier set.
///
/// R² and RMSE are computed over `inliers` only. The model is valid when at
/// least three inliers remain and R² exceeds 0.5.
pub(crate) fn summarize(
    points: &[[f64; 2]],
    inliers: &[usize],
    slope: f64,
    intercept: f64,
    method: MethodKind,
) -> CalibrationModel {
    let n = inliers.len();
    let (r_squared, rmse) = if n == 0 {
        (0.0, 0.0)
    } else {
        let mean_y = inliers.iter().map(|&i| points[i][1]).sum::<f64>() / n as f64;
        let mut ss_res = 0.0;
        let mut ss_tot = 0.0;
        for &i in inliers {
            ss_res += residual(points[i], slope, intercept).powi(2);
            ss_tot += (points[i][1] - mean_y).powi(2);
        }
        // Constant aspect ratios explain nothing.
        let r2 = if ss_tot > 1e-20 {
            1.0 - ss_res / ss_tot
        } else {
            0.0
        };
        (r2.clamp(0.0, 1.0), (ss_res / n as f64).sqrt())
    };

    let rotation_center_x = if slope.abs() < SLOPE_EPS {
        0.0
    } else {
        -intercept / slope
    };
    CalibrationModel {
        slope,
        intercept,
        rotation_center_x,
        angular_resolution: slope.to_degrees(),
        r_squared,
        reprojection_error: rmse,
        is_valid: n >= 3 && r_squared > 0.5,
        method,
        inlier_count: n,
        sample_count: points.len(),
    }
}
