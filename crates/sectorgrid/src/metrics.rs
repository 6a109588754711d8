//! Correction quality metrics.
//!
//! Three sub-scores in [0, 100], each an exponential decay of a defect
//! measure, are combined into a weighted final score:
//!
//! | score | defect | weight |
//! |---|---|---|
//! | roundness | `1 − mean(min/max axis)` | 0.40 |
//! | linearity | row RMS deviation / mean radius | 0.35 |
//! | consistency | mean of radius CV and spacing CV | 0.25 |

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::grid::{project, GridAssignment};
use crate::region::EllipseEstimate;

/// Metrics controls.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Gaps longer than this many mean radii are row breaks, not spacing.
    /// A gap of exactly this length still counts as spacing.
    pub row_break_scale: f64,
    /// Ignore ellipses the calibration marked as outliers.
    pub active_only: bool,
    /// Segmentation threshold used when re-detecting spots on a corrected image.
    pub detect_threshold: Option<u8>,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            row_break_scale: 5.0,
            active_only: true,
            detect_threshold: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CorrectionMetrics {
    pub mean_roundness: f64,
    pub radius_mean: f64,
    pub radius_std: f64,
    pub radius_cv: f64,
    pub spacing_mean: f64,
    pub spacing_std: f64,
    pub spacing_cv: f64,
    pub linearity_rms: f64,
    /// `linearity_rms / radius_mean`.
    pub linearity_relative: f64,
    pub score_roundness: f64,
    pub score_linearity: f64,
    pub score_consistency: f64,
    pub final_score: u32,
    pub sample_count: usize,
}

/// Population mean and standard deviation.
fn mean_std(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    (mean, var.sqrt())
}

fn cv(mean: f64, std: f64) -> f64 {
    if mean == 0.0 {
        0.0
    } else {
        std / mean
    }
}

fn dist(a: &EllipseEstimate, b: &EllipseEstimate) -> f64 {
    (b.cx - a.cx).hypot(b.cy - a.cy)
}

/// Consecutive center distances along each grid row, or along the dominant
/// axis when no row structure is available.
fn spacing_gaps(
    samples: &[EllipseEstimate],
    rows: Option<&[Vec<EllipseEstimate>]>,
    angle: f64,
) -> Vec<f64> {
    match rows {
        Some(rows) => rows
            .iter()
            .flat_map(|row| row.windows(2).map(|w| dist(&w[0], &w[1])))
            .collect(),
        None => {
            let mut sorted: Vec<(f64, f64, &EllipseEstimate)> = samples
                .iter()
                .map(|e| {
                    let [u, v] = project(angle, e.center());
                    (u, v, e)
                })
                .collect();
            sorted.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.total_cmp(&b.1)));
            sorted
                .windows(2)
                .map(|w| dist(w[0].2, w[1].2))
                .collect()
        }
    }
}

/// Pooled RMS of each row member's `v` about its row mean.
fn row_rms(rows: &[Vec<EllipseEstimate>], angle: f64) -> f64 {
    let mut sum_sq = 0.0;
    let mut count = 0usize;
    for row in rows.iter().filter(|r| r.len() >= 2) {
        let vs: Vec<f64> = row.iter().map(|e| project(angle, e.center())[1]).collect();
        let mean = vs.iter().sum::<f64>() / vs.len() as f64;
        sum_sq += vs.iter().map(|v| (v - mean).powi(2)).sum::<f64>();
        count += vs.len();
    }
    if count == 0 {
        0.0
    } else {
        (sum_sq / count as f64).sqrt()
    }
}

/// Score an ellipse set against an optional grid.
pub fn compute_metrics(
    ellipses: &[EllipseEstimate],
    grid: Option<&GridAssignment>,
    config: &MetricsConfig,
) -> CorrectionMetrics {
    let samples: Vec<EllipseEstimate> = ellipses
        .iter()
        .filter(|e| !config.active_only || e.is_active())
        .copied()
        .collect();
    if samples.is_empty() {
        return CorrectionMetrics::default();
    }
    let n = samples.len() as f64;

    let mean_roundness = samples.iter().map(EllipseEstimate::roundness).sum::<f64>() / n;
    let radii: Vec<f64> = samples.iter().map(EllipseEstimate::mean_radius).collect();
    let (radius_mean, radius_std) = mean_std(&radii);
    let radius_cv = cv(radius_mean, radius_std);

    // Grid rows restricted to the scored samples.
    let included: HashSet<u32> = samples.iter().map(|e| e.id).collect();
    let angle = grid.map_or(0.0, |g| g.angle);
    let rows: Option<Vec<Vec<EllipseEstimate>>> = grid.filter(|g| !g.rows.is_empty()).map(|g| {
        g.rows
            .iter()
            .map(|row| {
                row.members
                    .iter()
                    .filter(|e| included.contains(&e.id))
                    .copied()
                    .collect()
            })
            .collect()
    });

    let row_break = config.row_break_scale * radius_mean;
    let gaps: Vec<f64> = spacing_gaps(&samples, rows.as_deref(), angle)
        .into_iter()
        .filter(|&g| g <= row_break)
        .collect();
    let (spacing_mean, spacing_std) = mean_std(&gaps);
    let spacing_cv = cv(spacing_mean, spacing_std);

    let linearity_rms = rows.as_deref().map_or(0.0, |r| row_rms(r, angle));
    let linearity_relative = if radius_mean > 0.0 {
        linearity_rms / radius_mean
    } else {
        0.0
    };

    let score_roundness = 100.0 * (-3.0 * (1.0 - mean_roundness)).exp();
    let score_linearity = 100.0 * (-5.0 * linearity_relative).exp();
    let score_consistency = 100.0 * (-3.0 * (radius_cv + spacing_cv) / 2.0).exp();
    let final_score =
        (0.40 * score_roundness + 0.35 * score_linearity + 0.25 * score_consistency).round() as u32;

    tracing::debug!(
        "metrics over {} spots: roundness {:.3}, spacing {:.2}±{:.2}, linearity {:.3}px, score {}",
        samples.len(),
        mean_roundness,
        spacing_mean,
        spacing_std,
        linearity_rms,
        final_score
    );

    CorrectionMetrics {
        mean_roundness,
        radius_mean,
        radius_std,
        radius_cv,
        spacing_mean,
        spacing_std,
        spacing_cv,
        linearity_rms,
        linearity_relative,
        score_roundness,
        score_linearity,
        score_consistency,
        final_score,
        sample_count: samples.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{search_grid, GridSearchConfig};
    use crate::region::EllipseStatus;
    use crate::test_utils::grid_ellipses;
    use approx::assert_relative_eq;

    #[test]
    fn perfect_grid_scores_full_marks() {
        let ellipses = grid_ellipses(3, 3, [50.0, 50.0], 50.0, 10.0);
        let grid = search_grid(&ellipses, &GridSearchConfig::default()).unwrap();
        let m = compute_metrics(&ellipses, Some(&grid), &MetricsConfig::default());
        assert_eq!(m.sample_count, 9);
        assert_relative_eq!(m.mean_roundness, 1.0);
        assert_relative_eq!(m.radius_mean, 10.0);
        assert_relative_eq!(m.spacing_mean, 50.0, epsilon = 1e-9);
        assert!(m.spacing_cv < 0.02);
        assert_relative_eq!(m.linearity_rms, 0.0, epsilon = 1e-9);
        assert_eq!(m.final_score, 100);
    }

    #[test]
    fn spacing_without_grid_uses_dominant_axis() {
        let ellipses = grid_ellipses(3, 3, [50.0, 50.0], 50.0, 10.0);
        let m = compute_metrics(&ellipses, None, &MetricsConfig::default());
        assert_relative_eq!(m.spacing_mean, 50.0, epsilon = 1e-9);
        assert_eq!(m.linearity_rms, 0.0);
    }

    #[test]
    fn long_gaps_are_row_breaks() {
        // Row break at 5 × 8 = 40 px.
        let mut ellipses = grid_ellipses(1, 3, [20.0, 40.0], 30.0, 8.0);
        ellipses.push(EllipseEstimate::new(4, 200.0, 40.0, 8.0, 8.0, 0.0));
        let m = compute_metrics(&ellipses, None, &MetricsConfig::default());
        assert_relative_eq!(m.spacing_mean, 30.0, epsilon = 1e-9);
        assert_eq!(m.spacing_cv, 0.0);
    }

    #[test]
    fn gap_at_break_limit_is_spacing() {
        // 40 px pitch with radius 8 sits exactly on the 5 × radius limit.
        let ellipses = grid_ellipses(1, 3, [20.0, 40.0], 40.0, 8.0);
        let m = compute_metrics(&ellipses, None, &MetricsConfig::default());
        assert_relative_eq!(m.spacing_mean, 40.0, epsilon = 1e-12);

        let tight = MetricsConfig {
            row_break_scale: 4.9,
            ..Default::default()
        };
        assert_eq!(compute_metrics(&ellipses, None, &tight).spacing_mean, 0.0);
    }

    #[test]
    fn distorted_set_combines_sub_scores() {
        let mut ellipses = grid_ellipses(2, 4, [40.0, 40.0], 40.0, 8.0);
        ellipses[1].cy += 3.0;
        ellipses[2].rx = 12.0;
        ellipses[6].cx += 6.0;
        let grid = search_grid(&ellipses, &GridSearchConfig::default()).unwrap();
        let m = compute_metrics(&ellipses, Some(&grid), &MetricsConfig::default());
        assert!(m.linearity_rms > 0.0);
        assert!(m.mean_roundness < 1.0);
        for s in [m.score_roundness, m.score_linearity, m.score_consistency] {
            assert!((0.0..=100.0).contains(&s));
        }
        let expected = (0.40 * m.score_roundness
            + 0.35 * m.score_linearity
            + 0.25 * m.score_consistency)
            .round();
        assert_eq!(m.final_score, expected as u32);
        assert!(m.final_score < 100);
    }

    #[test]
    fn outliers_are_excluded_when_requested() {
        let mut ellipses = grid_ellipses(1, 4, [20.0, 40.0], 30.0, 5.0);
        ellipses[3] = EllipseEstimate::new(4, 110.0, 40.0, 20.0, 5.0, 0.0)
            .with_status(EllipseStatus::Outlier);
        let active = compute_metrics(&ellipses, None, &MetricsConfig::default());
        assert_eq!(active.sample_count, 3);
        assert_relative_eq!(active.mean_roundness, 1.0);

        let all = compute_metrics(
            &ellipses,
            None,
            &MetricsConfig {
                active_only: false,
                ..Default::default()
            },
        );
        assert_eq!(all.sample_count, 4);
        assert!(all.mean_roundness < 1.0);
    }

    #[test]
    fn empty_set_is_all_zero() {
        let m = compute_metrics(&[], None, &MetricsConfig::default());
        assert_eq!(m, CorrectionMetrics::default());
        assert_eq!(m.final_score, 0);
    }
}
