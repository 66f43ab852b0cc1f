//! Row/column silhouette profiles for detecting room stretching,
//! cropping, or re-framing that local edge checks can miss.

use crate::verify::edges::EdgeGrid;

/// Per-scanline first/last strong-edge indices. `None` means the
/// scanline had no edge above the threshold.
pub struct BoundaryProfile {
    pub left: Vec<Option<usize>>,
    pub right: Vec<Option<usize>>,
    pub top: Vec<Option<usize>>,
    pub bottom: Vec<Option<usize>>,
}

impl BoundaryProfile {
    /// Per-row span between the first and last strong edge.
    pub fn widths(&self) -> Vec<Option<usize>> {
        self.left
            .iter()
            .zip(&self.right)
            .map(|(left, right)| match (left, right) {
                (Some(l), Some(r)) => Some(r.saturating_sub(*l)),
                _ => None,
            })
            .collect()
    }

    /// Per-column span between the top and bottom strong edge.
    pub fn heights(&self) -> Vec<Option<usize>> {
        self.top
            .iter()
            .zip(&self.bottom)
            .map(|(top, bottom)| match (top, bottom) {
                (Some(t), Some(b)) => Some(b.saturating_sub(*t)),
                _ => None,
            })
            .collect()
    }
}

/// Adaptive per-image threshold: mean + 0.8 x standard deviation of
/// the grid's own magnitudes. Absolute edge strength varies with image
/// contrast, so a fixed cut would misread flat or busy photos.
pub fn edge_presence_threshold(edges: &EdgeGrid) -> f32 {
    let cells = edges.cells();
    if cells.is_empty() {
        return 0.0;
    }
    let count = cells.len() as f32;
    let mean = cells.iter().sum::<f32>() / count;
    let variance = cells
        .iter()
        .map(|&cell| (cell - mean) * (cell - mean))
        .sum::<f32>()
        / count;
    mean + 0.8 * variance.sqrt()
}

pub fn build_profile(edges: &EdgeGrid, threshold: f32) -> BoundaryProfile {
    let n = edges.size();
    let mut left = vec![None; n];
    let mut right = vec![None; n];
    let mut top = vec![None; n];
    let mut bottom = vec![None; n];

    for y in 0..n {
        for x in 0..n {
            if edges.get(x, y) >= threshold {
                if left[y].is_none() {
                    left[y] = Some(x);
                }
                right[y] = Some(x);
            }
        }
    }
    for x in 0..n {
        for y in 0..n {
            if edges.get(x, y) >= threshold {
                if top[x].is_none() {
                    top[x] = Some(y);
                }
                bottom[x] = Some(y);
            }
        }
    }

    BoundaryProfile {
        left,
        right,
        top,
        bottom,
    }
}

/// Normalized mean absolute index difference over scanlines where both
/// sides found an edge. A pair with no valid overlap cannot testify
/// either way and contributes zero.
fn profile_array_difference(a: &[Option<usize>], b: &[Option<usize>], n: usize) -> f32 {
    let mut total = 0.0f32;
    let mut count = 0u32;
    for (va, vb) in a.iter().zip(b) {
        if let (Some(va), Some(vb)) = (va, vb) {
            total += (*va as f32 - *vb as f32).abs() / n as f32;
            count += 1;
        }
    }
    if count == 0 {
        0.0
    } else {
        total / count as f32
    }
}

/// Compare the two grids' silhouettes: left/right/top/bottom plus the
/// derived width/height spans, averaged and mapped to [0,1].
pub fn boundary_consistency(input: &EdgeGrid, output: &EdgeGrid) -> f32 {
    let n = input.size();
    let input_profile = build_profile(input, edge_presence_threshold(input));
    let output_profile = build_profile(output, edge_presence_threshold(output));

    let differences = [
        profile_array_difference(&input_profile.left, &output_profile.left, n),
        profile_array_difference(&input_profile.right, &output_profile.right, n),
        profile_array_difference(&input_profile.top, &output_profile.top, n),
        profile_array_difference(&input_profile.bottom, &output_profile.bottom, n),
        profile_array_difference(&input_profile.widths(), &output_profile.widths(), n),
        profile_array_difference(&input_profile.heights(), &output_profile.heights(), n),
    ];
    let average = differences.iter().sum::<f32>() / differences.len() as f32;
    (1.0 - average * 1.8).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A rectangular "room outline" from (x0,y0) to (x1,y1).
    fn room_outline(n: usize, x0: usize, y0: usize, x1: usize, y1: usize) -> EdgeGrid {
        let mut cells = vec![0.0f32; n * n];
        for x in x0..=x1 {
            cells[y0 * n + x] = 200.0;
            cells[y1 * n + x] = 200.0;
        }
        for y in y0..=y1 {
            cells[y * n + x0] = 200.0;
            cells[y * n + x1] = 200.0;
        }
        EdgeGrid::from_cells(n, cells)
    }

    #[test]
    fn identical_outlines_score_one() {
        let grid = room_outline(64, 10, 10, 50, 45);
        let score = boundary_consistency(&grid, &room_outline(64, 10, 10, 50, 45));
        assert!((score - 1.0).abs() < 1e-6, "got {score}");
    }

    #[test]
    fn sentinel_rows_are_skipped_not_counted() {
        // Outline occupies only part of the grid; rows outside it have
        // no strong edge on either side and must not affect the score.
        let a = room_outline(64, 20, 20, 40, 40);
        let b = room_outline(64, 20, 20, 40, 40);
        assert!((boundary_consistency(&a, &b) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn similarity_drops_monotonically_with_stretching() {
        let reference = room_outline(64, 16, 16, 40, 40);
        let mut previous = f32::MAX;
        for stretch in [0usize, 2, 4, 6, 8] {
            let stretched = room_outline(64, 16, 16, 40 + stretch, 40 + stretch);
            let score = boundary_consistency(&reference, &stretched);
            assert!(
                score <= previous + 1e-6,
                "stretch {stretch}: {score} > {previous}"
            );
            previous = score;
        }
        let widened = room_outline(64, 16, 16, 48, 48);
        assert!(boundary_consistency(&reference, &widened) < 1.0);
    }

    #[test]
    fn empty_grids_compare_as_identical() {
        let empty = EdgeGrid::from_cells(16, vec![0.0; 256]);
        let other = EdgeGrid::from_cells(16, vec![0.0; 256]);
        assert_eq!(boundary_consistency(&empty, &other), 1.0);
    }
}
