//! Gradient-magnitude edge maps highlighting structural boundaries.

use crate::verify::sampler::LumaGrid;

/// Per-cell non-negative gradient magnitude, same shape as the luma
/// grid it was derived from. Magnitudes are |dx| + |dy| over 8-bit
/// derived luma, so the per-cell maximum is 510.
pub struct EdgeGrid {
    n: usize,
    cells: Vec<f32>,
}

pub const MAX_EDGE_MAGNITUDE: f32 = 510.0;

impl EdgeGrid {
    pub fn size(&self) -> usize {
        self.n
    }

    pub fn get(&self, x: usize, y: usize) -> f32 {
        self.cells[y * self.n + x]
    }

    pub fn cells(&self) -> &[f32] {
        &self.cells
    }

    #[cfg(test)]
    pub fn from_cells(n: usize, cells: Vec<f32>) -> Self {
        assert_eq!(cells.len(), n * n);
        Self { n, cells }
    }
}

/// Horizontal plus vertical absolute luminance difference per cell.
/// The first row and column have no left/up neighbour and stay zero.
pub fn build_edge_map(luma: &LumaGrid) -> EdgeGrid {
    let n = luma.size();
    let mut cells = vec![0.0f32; n * n];
    for y in 1..n {
        for x in 1..n {
            let here = luma.get(x, y);
            let horizontal = (here - luma.get(x - 1, y)).abs();
            let vertical = (here - luma.get(x, y - 1)).abs();
            cells[y * n + x] = horizontal + vertical;
        }
    }
    EdgeGrid { n, cells }
}
