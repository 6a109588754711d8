//! Grid resolution: rows and columns among spot centers.
//!
//! Two modes:
//! - exhaustive search over candidate orientations ([`search_grid`]),
//! - an explicit lattice spanned by three chosen spots ([`basis_grid`]).
//!
//! Both report an orientation `angle` and project centers onto
//! `u = x cos(angle) + y sin(angle)` and `v = −x sin(angle) + y cos(angle)`.
//! Rows share a `v`, columns share a `u`.

mod basis;
mod cluster;
mod search;

pub use basis::basis_grid;
pub use search::{candidate_angles, search_grid};

use serde::{Deserialize, Serialize};

use crate::error::SectorError;
use crate::region::EllipseEstimate;

/// Controls for both grid modes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GridSearchConfig {
    /// Pairs closer than this many mean radii do not contribute headings.
    pub min_pair_separation: f64,
    /// Cluster gap threshold, in mean radii.
    pub gap_scale: f64,
    /// Floor on the cluster gap threshold (pixels).
    pub min_gap_px: f64,
    /// Cap on evaluated candidate angles; `None` evaluates all of them.
    pub max_candidates: Option<usize>,
    /// Basis mode: maximum lattice residual as a fraction of the mean basis length.
    pub basis_tolerance: f64,
}

impl Default for GridSearchConfig {
    fn default() -> Self {
        Self {
            min_pair_separation: 1.5,
            gap_scale: 1.2,
            min_gap_px: 10.0,
            max_candidates: Some(2048),
            basis_tolerance: 0.4,
        }
    }
}

/// Three spot ids spanning a lattice: `origin`, the +x neighbor and the +y neighbor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridBasis {
    pub origin: u32,
    pub x_ref: u32,
    pub y_ref: u32,
}

/// One row or column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridLine {
    /// Lattice index (basis mode) or ordinal after sorting by `mean_coord` (search mode).
    pub index: i64,
    /// Members ordered along the line.
    pub members: Vec<EllipseEstimate>,
    /// Mean projected coordinate: `v` for rows, `u` for columns.
    pub mean_coord: f64,
}

/// Resolved grid structure. Only lines with at least two members are reported.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridAssignment {
    /// Orientation of the row direction (radians).
    pub angle: f64,
    pub rows: Vec<GridLine>,
    pub cols: Vec<GridLine>,
}

impl GridAssignment {
    /// `(u, v)` of a point in this grid's frame.
    #[inline]
    pub fn project(&self, p: [f64; 2]) -> [f64; 2] {
        project(self.angle, p)
    }
}

#[inline]
pub(crate) fn project(angle: f64, [x, y]: [f64; 2]) -> [f64; 2] {
    let (s, c) = angle.sin_cos();
    [x * c + y * s, -x * s + y * c]
}

/// Mean of `(rx + ry) / 2` over `ellipses`, 0 for an empty set.
pub(crate) fn mean_radius(ellipses: &[EllipseEstimate]) -> f64 {
    if ellipses.is_empty() {
        return 0.0;
    }
    ellipses.iter().map(EllipseEstimate::mean_radius).sum::<f64>() / ellipses.len() as f64
}

/// Build a line from members, ordering them by the along-line coordinate.
///
/// `axis` selects the coordinate the line shares (0: `u` for columns, 1: `v` for rows).
pub(crate) fn make_line(
    angle: f64,
    index: i64,
    mut members: Vec<EllipseEstimate>,
    axis: usize,
) -> GridLine {
    let along = 1 - axis;
    members.sort_by(|a, b| {
        project(angle, a.center())[along].total_cmp(&project(angle, b.center())[along])
    });
    let mean_coord = members
        .iter()
        .map(|e| project(angle, e.center())[axis])
        .sum::<f64>()
        / members.len().max(1) as f64;
    GridLine {
        index,
        members,
        mean_coord,
    }
}

/// Resolve the grid, by `basis` when given, otherwise by exhaustive search.
///
/// `Ok(None)` means no grid: fewer than two spots, or a collinear basis.
pub fn resolve_grid(
    ellipses: &[EllipseEstimate],
    basis: Option<&GridBasis>,
    config: &GridSearchConfig,
) -> Result<Option<GridAssignment>, SectorError> {
    match basis {
        Some(b) => basis_grid(ellipses, b, config),
        None => Ok(search_grid(ellipses, config)),
    }
}
