//! Lattice assignment from a 3-point basis.

use std::collections::BTreeMap;

use nalgebra::{Matrix2, Vector2};

use super::{make_line, GridAssignment, GridBasis, GridSearchConfig};
use crate::error::SectorError;
use crate::region::EllipseEstimate;

fn lookup(ellipses: &[EllipseEstimate], id: u32) -> Result<Vector2<f64>, SectorError> {
    ellipses
        .iter()
        .find(|e| e.id == id)
        .map(|e| Vector2::new(e.cx, e.cy))
        .ok_or(SectorError::UnknownEllipseId(id))
}

/// Assign spots to the lattice spanned by a 3-point basis.
///
/// With `u = x_ref − origin` and `v = y_ref − origin`, each center `p` is
/// expressed as `[i, j] = [u v]⁻¹ (p − origin)`. Rounded `(i, j)` is accepted
/// when the distance to `i·u + j·v` is below `basis_tolerance` times the mean
/// basis length. Accepted spots land in row `j` and column `i`.
///
/// The orientation is the heading of `u`. A collinear basis yields `Ok(None)`.
pub fn basis_grid(
    ellipses: &[EllipseEstimate],
    basis: &GridBasis,
    config: &GridSearchConfig,
) -> Result<Option<GridAssignment>, SectorError> {
    let GridBasis { origin, x_ref, y_ref } = *basis;
    if origin == x_ref || origin == y_ref {
        return Err(SectorError::DuplicateEllipseId(origin));
    }
    if x_ref == y_ref {
        return Err(SectorError::DuplicateEllipseId(x_ref));
    }
    let o = lookup(ellipses, origin)?;
    let u = lookup(ellipses, x_ref)? - o;
    let v = lookup(ellipses, y_ref)? - o;

    let m = Matrix2::new(u.x, v.x, u.y, v.y);
    let scale = u.norm() * v.norm();
    if !(scale > 0.0) || m.determinant().abs() < 1e-9 * scale {
        tracing::warn!("grid basis ({origin}, {x_ref}, {y_ref}) is collinear");
        return Ok(None);
    }
    let Some(inv) = m.try_inverse() else {
        return Ok(None);
    };
    let tolerance = config.basis_tolerance * 0.5 * (u.norm() + v.norm());

    let mut rows: BTreeMap<i64, Vec<EllipseEstimate>> = BTreeMap::new();
    let mut cols: BTreeMap<i64, Vec<EllipseEstimate>> = BTreeMap::new();
    let mut rejected = 0usize;
    for e in ellipses {
        let d = Vector2::new(e.cx, e.cy) - o;
        let ij = inv * d;
        let (i, j) = (ij.x.round(), ij.y.round());
        let residual = (d - (u * i + v * j)).norm();
        if residual < tolerance {
            rows.entry(j as i64).or_default().push(*e);
            cols.entry(i as i64).or_default().push(*e);
        } else {
            rejected += 1;
        }
    }
    tracing::debug!(
        "grid basis: {} spots on lattice, {} off lattice",
        ellipses.len() - rejected,
        rejected
    );

    let angle = u.y.atan2(u.x);
    let lines = |map: BTreeMap<i64, Vec<EllipseEstimate>>, axis: usize| {
        map.into_iter()
            .filter(|(_, members)| members.len() >= 2)
            .map(|(index, members)| make_line(angle, index, members, axis))
            .collect::<Vec<_>>()
    };
    Ok(Some(GridAssignment {
        angle,
        rows: lines(rows, 1),
        cols: lines(cols, 0),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::grid_ellipses;
    use approx::assert_relative_eq;

    fn basis(origin: u32, x_ref: u32, y_ref: u32) -> GridBasis {
        GridBasis { origin, x_ref, y_ref }
    }

    #[test]
    fn skewed_lattice_with_stray_point() {
        // u = (40, 5), v = (-6, 35)
        let mut ellipses = Vec::new();
        let mut id = 1;
        for j in 0..3 {
            for i in 0..4 {
                let x = 100.0 + 40.0 * i as f64 - 6.0 * j as f64;
                let y = 80.0 + 5.0 * i as f64 + 35.0 * j as f64;
                ellipses.push(EllipseEstimate::new(id, x, y, 6.0, 6.0, 0.0));
                id += 1;
            }
        }
        // Halfway between lattice points.
        ellipses.push(EllipseEstimate::new(99, 120.0, 100.0, 6.0, 6.0, 0.0));

        let grid = basis_grid(&ellipses, &basis(1, 2, 5), &GridSearchConfig::default())
            .unwrap()
            .unwrap();
        assert_relative_eq!(grid.angle, 5.0f64.atan2(40.0));
        assert_eq!(grid.rows.len(), 3);
        assert_eq!(grid.cols.len(), 4);
        assert_eq!(
            grid.rows.iter().map(|r| r.index).collect::<Vec<_>>(),
            vec![0, 1, 2]
        );
        assert!(grid.rows.iter().all(|r| r.members.len() == 4));
        assert!(grid
            .rows
            .iter()
            .flat_map(|r| &r.members)
            .all(|e| e.id != 99));
        let first: Vec<u32> = grid.rows[1].members.iter().map(|e| e.id).collect();
        assert_eq!(first, vec![5, 6, 7, 8]);
    }

    #[test]
    fn negative_indices_are_kept() {
        let ellipses = grid_ellipses(3, 3, [50.0, 50.0], 50.0, 10.0);
        // Origin at the center spot.
        let grid = basis_grid(&ellipses, &basis(5, 6, 8), &GridSearchConfig::default())
            .unwrap()
            .unwrap();
        assert_eq!(
            grid.rows.iter().map(|r| r.index).collect::<Vec<_>>(),
            vec![-1, 0, 1]
        );
        assert_eq!(
            grid.cols.iter().map(|c| c.index).collect::<Vec<_>>(),
            vec![-1, 0, 1]
        );
    }

    #[test]
    fn collinear_basis_is_no_grid() {
        let ellipses = grid_ellipses(1, 3, [10.0, 10.0], 20.0, 4.0);
        let r = basis_grid(&ellipses, &basis(1, 2, 3), &GridSearchConfig::default());
        assert_eq!(r, Ok(None));
    }

    #[test]
    fn bad_ids_are_errors() {
        let ellipses = grid_ellipses(2, 2, [10.0, 10.0], 20.0, 4.0);
        let cfg = GridSearchConfig::default();
        assert_eq!(
            basis_grid(&ellipses, &basis(1, 2, 42), &cfg),
            Err(SectorError::UnknownEllipseId(42))
        );
        assert_eq!(
            basis_grid(&ellipses, &basis(1, 1, 3), &cfg),
            Err(SectorError::DuplicateEllipseId(1))
        );
        assert_eq!(
            basis_grid(&ellipses, &basis(1, 3, 3), &cfg),
            Err(SectorError::DuplicateEllipseId(3))
        );
    }
}
