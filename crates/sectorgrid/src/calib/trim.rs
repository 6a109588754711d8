//! Iterative percentage trimming.

use super::lsq::{fit_line, residual, summarize};
use super::types::{CalibrationModel, MethodKind, PointFit, TrimParams};

/// Never trim the working set below this size.
const MIN_SURVIVORS: usize = 3;

/// Iterative percentage trim.
///
/// Each round fits the working set by least squares and discards the
/// `trim_percent` worst residuals (at least one point, never leaving fewer
/// than three). Survivors after the last round are the inliers.
pub fn fit_trimmed(points: &[[f64; 2]], params: &TrimParams) -> PointFit {
    let fail = || PointFit {
        model: CalibrationModel::invalid(MethodKind::IterativeTrim, points.len()),
        inliers: None,
    };
    let mut working: Vec<usize> = (0..points.len()).collect();

    for round in 0..params.iterations {
        let n = working.len();
        if n <= MIN_SURVIVORS {
            break;
        }
        let Some((slope, intercept)) = fit_line(points, &working) else {
            return fail();
        };
        let drop = ((n as f64 * params.trim_percent / 100.0).floor() as usize)
            .max(1)
            .min(n - MIN_SURVIVORS);

        let mut ranked: Vec<(usize, f64)> = working
            .iter()
            .map(|&i| (i, residual(points[i], slope, intercept).abs()))
            .collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
        working = ranked[drop..].iter().map(|&(i, _)| i).collect();
        working.sort_unstable();
        tracing::debug!("trim round {}: dropped {}, {} remain", round + 1, drop, working.len());
    }

    let Some((slope, intercept)) = fit_line(points, &working) else {
        return fail();
    };
    PointFit {
        model: summarize(points, &working, slope, intercept, MethodKind::IterativeTrim),
        inliers: Some(working),
    }
}
