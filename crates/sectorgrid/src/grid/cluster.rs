//! 1-D gap clustering.

/// Split `(index, value)` samples into clusters of consecutive sorted values.
///
/// A new cluster starts whenever the gap to the previous value exceeds `gap`.
/// Clusters come out in ascending value order; each cluster is sorted too.
pub(crate) fn gap_clusters(samples: &mut [(usize, f64)], gap: f64) -> Vec<Vec<(usize, f64)>> {
    samples.sort_by(|a, b| a.1.total_cmp(&b.1));
    let mut out: Vec<Vec<(usize, f64)>> = Vec::new();
    let mut prev = f64::NEG_INFINITY;
    for &s in samples.iter() {
        match out.last_mut() {
            Some(cluster) if s.1 - prev <= gap => cluster.push(s),
            _ => out.push(vec![s]),
        }
        prev = s.1;
    }
    out
}

/// Spread of a sorted cluster along the clustered coordinate.
fn spread(cluster: &[(usize, f64)]) -> f64 {
    match (cluster.first(), cluster.last()) {
        (Some(a), Some(b)) => b.1 - a.1,
        _ => 0.0,
    }
}

/// Clusters that form a line: at least two members, spread no wider than `gap`.
///
/// Chained clusters, where each step is within `gap` but the whole run is not,
/// come from projecting a 2-D lattice at an off-grid angle and are dropped.
pub(crate) fn line_clusters(samples: &mut [(usize, f64)], gap: f64) -> Vec<Vec<(usize, f64)>> {
    gap_clusters(samples, gap)
        .into_iter()
        .filter(|c| c.len() >= 2 && spread(c) <= gap)
        .collect()
}

/// Sum of squared sizes over clusters with at least two members.
pub(crate) fn cluster_score(clusters: &[Vec<(usize, f64)>]) -> usize {
    clusters
        .iter()
        .map(Vec::len)
        .filter(|&n| n >= 2)
        .map(|n| n * n)
        .sum()
}
