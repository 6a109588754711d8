//! Two-point RANSAC for the aspect-ratio line.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::lsq::{fit_line, residual, summarize};
use super::types::{CalibrationModel, MethodKind, PointFit, RansacLineConfig};

/// Best hypothesis so far.
struct Hypothesis {
    slope: f64,
    intercept: f64,
    inliers: Vec<usize>,
    error: f64,
}

impl Hypothesis {
    fn beats(&self, other: &Option<Hypothesis>) -> bool {
        match other {
            None => true,
            Some(o) => {
                self.inliers.len() > o.inliers.len()
                    || (self.inliers.len() == o.inliers.len() && self.error < o.error)
            }
        }
    }
}

fn evaluate(points: &[[f64; 2]], a: usize, b: usize, threshold: f64) -> Option<Hypothesis> {
    let [x0, y0] = points[a];
    let [x1, y1] = points[b];
    let dx = x1 - x0;
    // Near-vertical pairs do not define a usable line.
    if dx.abs() < 1e-10 {
        return None;
    }
    let slope = (y1 - y0) / dx;
    let intercept = y0 - slope * x0;
    let mut inliers = Vec::new();
    let mut error = 0.0;
    for (i, &p) in points.iter().enumerate() {
        let r = residual(p, slope, intercept).abs();
        if r < threshold {
            inliers.push(i);
            error += r;
        }
    }
    Some(Hypothesis {
        slope,
        intercept,
        inliers,
        error,
    })
}

/// Two distinct indices in `0..n` by a partial Fisher–Yates shuffle.
fn sample_pair(rng: &mut impl Rng, indices: &mut [usize]) -> (usize, usize) {
    let n = indices.len();
    debug_assert!(n >= 2);
    for i in 0..2 {
        let j = rng.gen_range(i..n);
        indices.swap(i, j);
    }
    (indices[0], indices[1])
}

/// RANSAC line fit with a caller-supplied random source.
///
/// Below `exhaustive_below` points every pair is tried; otherwise
/// `max_trials` random pairs are drawn. The hypothesis with the most inliers
/// wins, ties going to the lower summed absolute residual. The final line is
/// the least-squares refit over the winning inlier set.
pub fn fit_ransac_with_rng(
    points: &[[f64; 2]],
    config: &RansacLineConfig,
    rng: &mut impl Rng,
) -> PointFit {
    let n = points.len();
    let fail = || PointFit {
        model: CalibrationModel::invalid(MethodKind::Ransac, n),
        inliers: None,
    };
    if n < 2 {
        return fail();
    }

    let mut best: Option<Hypothesis> = None;
    let mut consider = |a: usize, b: usize| {
        if let Some(h) = evaluate(points, a, b, config.inlier_threshold) {
            if h.beats(&best) {
                best = Some(h);
            }
        }
    };
    let trials = if n < config.exhaustive_below {
        for a in 0..n {
            for b in a + 1..n {
                consider(a, b);
            }
        }
        n * (n - 1) / 2
    } else {
        let mut indices: Vec<usize> = (0..n).collect();
        for _ in 0..config.max_trials {
            let (a, b) = sample_pair(rng, &mut indices);
            consider(a, b);
        }
        config.max_trials
    };

    let Some(best) = best else {
        tracing::debug!("ransac: no usable pair among {} points", n);
        return fail();
    };
    let (slope, intercept) =
        fit_line(points, &best.inliers).unwrap_or((best.slope, best.intercept));
    tracing::debug!(
        "ransac: {} trials, best {} inliers of {}",
        trials,
        best.inliers.len(),
        n
    );
    PointFit {
        model: summarize(points, &best.inliers, slope, intercept, MethodKind::Ransac),
        inliers: Some(best.inliers),
    }
}

/// RANSAC line fit seeded from `config.seed`.
pub fn fit_ransac(points: &[[f64; 2]], config: &RansacLineConfig) -> PointFit {
    let mut rng = StdRng::seed_from_u64(config.seed);
    fit_ransac_with_rng(points, config, &mut rng)
}
