//! Average per-pixel color difference between two images.
//!
//! Not a structural check: this only confirms the edit is visually
//! substantial rather than a near-no-op that would pass every
//! geometry gate.

use crate::verify::sampler::{sample_rgb_grid, PixelImage};

/// Mean of (|dr| + |dg| + |db|) / 3 over matching sample cells, on a
/// 0-255 per-channel scale.
pub fn change_intensity(input: &PixelImage, output: &PixelImage, n: usize) -> f32 {
    let input_cells = sample_rgb_grid(input, n);
    let output_cells = sample_rgb_grid(output, n);
    if input_cells.is_empty() {
        return 0.0;
    }
    let mut total = 0.0f64;
    for (a, b) in input_cells.iter().zip(&output_cells) {
        let delta = (a[0] - b[0]).abs() + (a[1] - b[1]).abs() + (a[2] - b[2]).abs();
        total += (delta / 3.0) as f64;
    }
    (total / input_cells.len() as f64) as f32
}
