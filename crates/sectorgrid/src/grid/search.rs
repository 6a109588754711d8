//! Exhaustive-angle grid search.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashSet};
use std::f64::consts::{FRAC_PI_2, PI};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use super::cluster::{cluster_score, line_clusters};
use super::{make_line, mean_radius, project, GridAssignment, GridSearchConfig};
use crate::region::EllipseEstimate;

/// A spot pair, ordered by distance and then by scan order.
#[derive(Debug, Clone, Copy)]
struct Pair {
    dist: f64,
    a: usize,
    b: usize,
    heading: f64,
}

impl Ord for Pair {
    fn cmp(&self, other: &Self) -> Ordering {
        self.dist
            .total_cmp(&other.dist)
            .then(self.a.cmp(&other.a))
            .then(self.b.cmp(&other.b))
    }
}

impl PartialOrd for Pair {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Pair {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Pair {}

/// The `keep` closest separated pairs, closest first.
///
/// A max-heap holds at most `keep` pairs, so memory stays bounded by the
/// candidate cap rather than the pair count.
fn closest_pairs(ellipses: &[EllipseEstimate], min_sep: f64, keep: usize) -> Vec<Pair> {
    if keep == 0 {
        return Vec::new();
    }
    let mut heap: BinaryHeap<Pair> = BinaryHeap::new();
    for (a, ea) in ellipses.iter().enumerate() {
        for (b, eb) in ellipses.iter().enumerate().skip(a + 1) {
            let dx = eb.cx - ea.cx;
            let dy = eb.cy - ea.cy;
            let dist = dx.hypot(dy);
            if dist <= min_sep {
                continue;
            }
            let pair = Pair {
                dist,
                a,
                b,
                heading: dy.atan2(dx),
            };
            if heap.len() < keep {
                heap.push(pair);
            } else if heap.peek().is_some_and(|worst| pair < *worst) {
                heap.pop();
                heap.push(pair);
            }
        }
    }
    heap.into_sorted_vec()
}

/// Candidate orientations in evaluation order.
///
/// 0 and π/2 first, then the heading of every sufficiently separated pair and
/// its perpendicular, pairs ordered by increasing distance. Angles are folded
/// into `[0, π)` and de-duplicated, then capped at `max_candidates`. Headings
/// come from the `max_candidates` closest pairs only.
pub fn candidate_angles(ellipses: &[EllipseEstimate], config: &GridSearchConfig) -> Vec<f64> {
    let min_sep = config.min_pair_separation * mean_radius(ellipses);
    let cap = config.max_candidates.unwrap_or(usize::MAX);
    let pairs = closest_pairs(ellipses, min_sep, cap);

    let mut seen = HashSet::new();
    let mut out = Vec::new();
    let raw = [0.0, FRAC_PI_2]
        .into_iter()
        .chain(pairs.iter().flat_map(|p| [p.heading, p.heading + FRAC_PI_2]));
    for angle in raw {
        if out.len() >= cap {
            break;
        }
        let mut folded = angle.rem_euclid(PI);
        if folded >= PI - 1e-12 {
            folded = 0.0;
        }
        // Treat headings closer than a microradian as one candidate.
        if seen.insert((folded * 1e6).round() as i64) {
            out.push(folded);
        }
    }
    out
}

/// Row and column line clusters of `centers` at `angle`.
fn lines_at(
    centers: &[[f64; 2]],
    angle: f64,
    gap: f64,
) -> (Vec<Vec<(usize, f64)>>, Vec<Vec<(usize, f64)>>) {
    let (mut us, mut vs): (Vec<(usize, f64)>, Vec<(usize, f64)>) = centers
        .iter()
        .enumerate()
        .map(|(i, &p)| {
            let [u, v] = project(angle, p);
            ((i, u), (i, v))
        })
        .unzip();
    (line_clusters(&mut vs, gap), line_clusters(&mut us, gap))
}

fn score_angle(centers: &[[f64; 2]], angle: f64, gap: f64) -> usize {
    let (rows, cols) = lines_at(centers, angle, gap);
    cluster_score(&rows) + cluster_score(&cols)
}

/// Exhaustive-angle grid search.
///
/// Each candidate angle is scored by clustering `u` and `v` independently;
/// only line-shaped clusters count. The first angle with the highest score
/// wins. Returns `None` for fewer than two spots.
pub fn search_grid(
    ellipses: &[EllipseEstimate],
    config: &GridSearchConfig,
) -> Option<GridAssignment> {
    if ellipses.len() < 2 {
        return None;
    }
    let gap = (config.gap_scale * mean_radius(ellipses)).max(config.min_gap_px);
    let centers: Vec<[f64; 2]> = ellipses.iter().map(EllipseEstimate::center).collect();
    let angles = candidate_angles(ellipses, config);

    #[cfg(feature = "parallel")]
    let scores: Vec<usize> = angles
        .par_iter()
        .map(|&a| score_angle(&centers, a, gap))
        .collect();
    #[cfg(not(feature = "parallel"))]
    let scores: Vec<usize> = angles
        .iter()
        .map(|&a| score_angle(&centers, a, gap))
        .collect();

    let mut best: Option<(f64, usize)> = None;
    for (&angle, &score) in angles.iter().zip(&scores) {
        if best.map_or(true, |(_, s)| score > s) {
            best = Some((angle, score));
        }
    }
    let (angle, score) = best?;
    tracing::debug!(
        "grid search: {} candidates, best angle {:.4} rad (score {})",
        angles.len(),
        angle,
        score
    );

    let (row_clusters, col_clusters) = lines_at(&centers, angle, gap);
    let lines = |clusters: Vec<Vec<(usize, f64)>>, axis: usize| {
        clusters
            .into_iter()
            .zip(0i64..)
            .map(|(c, index)| {
                let members = c.iter().map(|&(i, _)| ellipses[i]).collect();
                make_line(angle, index, members, axis)
            })
            .collect::<Vec<_>>()
    };

    Some(GridAssignment {
        angle,
        rows: lines(row_clusters, 1),
        cols: lines(col_clusters, 0),
    })
}
