//! Iterative 4-connected flood fill over a target mask.

use crate::moments::RawMoments;

/// One connected component's unit-weight moments.
#[derive(Debug, Clone, Copy)]
pub struct Component {
    pub moments: RawMoments,
}

/// Label 4-connected components of `mask` and accumulate their raw moments.
///
/// Uses an explicit stack and a flat visited array indexed by `y * width + x`.
/// Horizontal neighbors are guarded so fills never wrap across row edges.
pub fn connected_components(mask: &[bool], width: usize, height: usize) -> Vec<Component> {
    debug_assert_eq!(mask.len(), width * height);
    let n = width * height;
    let mut visited = vec![false; n];
    let mut stack: Vec<usize> = Vec::new();
    let mut out = Vec::new();

    for seed in 0..n {
        if visited[seed] || !mask[seed] {
            continue;
        }
        visited[seed] = true;
        stack.push(seed);
        let mut moments = RawMoments::new();

        while let Some(idx) = stack.pop() {
            let x = idx % width;
            let y = idx / width;
            moments.add(x as f64, y as f64, 1.0);

            let mut visit = |j: usize| {
                if !visited[j] && mask[j] {
                    visited[j] = true;
                    stack.push(j);
                }
            };
            if x > 0 {
                visit(idx - 1);
            }
            if x + 1 < width {
                visit(idx + 1);
            }
            if y > 0 {
                visit(idx - width);
            }
            if y + 1 < height {
                visit(idx + width);
            }
        }

        out.push(Component { moments });
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mask_from(rows: &[&str]) -> (Vec<bool>, usize, usize) {
        let h = rows.len();
        let w = rows[0].len();
        let mask = rows
            .iter()
            .flat_map(|r| r.chars().map(|c| c == '#'))
            .collect();
        (mask, w, h)
    }

    #[test]
    fn diagonal_pixels_are_separate() {
        let (mask, w, h) = mask_from(&["#..", ".#.", "..#"]);
        assert_eq!(connected_components(&mask, w, h).len(), 3);
    }

    #[test]
    fn fill_does_not_wrap_rows() {
        // Right edge of row 0 and left edge of row 1 are adjacent in memory.
        let (mask, w, h) = mask_from(&["...#", "#...", "...."]);
        let comps = connected_components(&mask, w, h);
        assert_eq!(comps.len(), 2);
        assert!(comps.iter().all(|c| c.moments.count == 1));
    }

    #[test]
    fn counts_and_centroid_of_block() {
        let (mask, w, h) = mask_from(&["......", ".###..", ".###..", "......"]);
        let comps = connected_components(&mask, w, h);
        assert_eq!(comps.len(), 1);
        assert_eq!(comps[0].moments.count, 6);
        assert_eq!(comps[0].moments.centroid(), Some([2.0, 1.5]));
    }

    #[test]
    fn large_component_does_not_overflow() {
        let (w, h) = (512, 512);
        let mask = vec![true; w * h];
        let comps = connected_components(&mask, w, h);
        assert_eq!(comps.len(), 1);
        assert_eq!(comps[0].moments.count, w * h);
    }
}
