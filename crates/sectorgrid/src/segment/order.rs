//! Reading-order sort: rows of similar y, each row left to right.

use crate::region::EllipseEstimate;

/// Sort ellipses into reading order.
///
/// Rows are formed greedily after sorting by y: an ellipse joins the current
/// row while its `cy` is within `tolerance_scale * ry` of the row's first
/// member. Each row is then sorted by x.
pub fn sort_reading_order(
    ellipses: &[EllipseEstimate],
    tolerance_scale: f64,
) -> Vec<EllipseEstimate> {
    let mut by_y: Vec<EllipseEstimate> = ellipses.to_vec();
    by_y.sort_by(|a, b| a.cy.total_cmp(&b.cy));

    let mut out = Vec::with_capacity(by_y.len());
    let mut row: Vec<EllipseEstimate> = Vec::new();
    let mut row_y = 0.0;
    let mut row_tol = 0.0;

    for e in by_y {
        if row.is_empty() {
            row_y = e.cy;
            row_tol = e.ry.abs() * tolerance_scale;
        } else if (e.cy - row_y).abs() > row_tol {
            flush_row(&mut row, &mut out);
            row_y = e.cy;
            row_tol = e.ry.abs() * tolerance_scale;
        }
        row.push(e);
    }
    flush_row(&mut row, &mut out);
    out
}

fn flush_row(row: &mut Vec<EllipseEstimate>, out: &mut Vec<EllipseEstimate>) {
    row.sort_by(|a, b| a.cx.total_cmp(&b.cx));
    out.append(row);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jittered_rows_are_read_left_to_right() {
        let pts = [
            (2, 105.0, 52.0),
            (1, 10.0, 48.0),
            (5, 60.0, 101.0),
            (3, 58.0, 50.5),
            (4, 12.0, 99.0),
        ];
        let ellipses: Vec<EllipseEstimate> = pts
            .iter()
            .map(|&(id, x, y)| EllipseEstimate::new(id, x, y, 6.0, 6.0, 0.0))
            .collect();
        let ids: Vec<u32> = sort_reading_order(&ellipses, 1.5)
            .iter()
            .map(|e| e.id)
            .collect();
        assert_eq!(ids, vec![1, 3, 2, 4, 5]);
    }

    #[test]
    fn empty_is_empty() {
        assert!(sort_reading_order(&[], 1.5).is_empty());
    }
}
