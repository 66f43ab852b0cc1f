//! Small-translation search between two edge maps.
//!
//! The model is allowed minor framing drift; a one- or two-cell crop
//! must not read as structural change. The search absorbs integer
//! shifts up to the configured radius before edge fidelity is judged.

use crate::verify::edges::{EdgeGrid, MAX_EDGE_MAGNITUDE};

#[derive(Debug, Clone, Copy)]
pub struct AlignmentResult {
    pub dx: i32,
    pub dy: i32,
    /// Similarity at the unshifted (0,0) position.
    pub direct_similarity: f32,
    /// Similarity at the chosen shift, never below `direct_similarity`.
    pub aligned_similarity: f32,
}

impl AlignmentResult {
    pub fn shift_magnitude(&self) -> f32 {
        ((self.dx * self.dx + self.dy * self.dy) as f32).sqrt()
    }
}

fn shifted_similarity(input: &EdgeGrid, output: &EdgeGrid, dx: i32, dy: i32) -> f32 {
    let n = input.size() as i32;
    let mut total = 0.0f64;
    let mut count = 0u32;
    for y in 0..n {
        let oy = y + dy;
        if oy < 0 || oy >= n {
            continue;
        }
        for x in 0..n {
            let ox = x + dx;
            if ox < 0 || ox >= n {
                continue;
            }
            let diff = input.get(x as usize, y as usize) - output.get(ox as usize, oy as usize);
            total += diff.abs() as f64;
            count += 1;
        }
    }
    if count == 0 {
        return 0.0;
    }
    let average = (total / count as f64) as f32;
    (1.0 - average / MAX_EDGE_MAGNITUDE).clamp(0.0, 1.0)
}

/// Exhaustive search over integer shifts in [-max_shift, max_shift]^2.
/// Returns (0,0) unless some shift strictly improves on the unshifted
/// score, so an already-aligned pair never reports spurious drift.
pub fn search_alignment(input: &EdgeGrid, output: &EdgeGrid, max_shift: i32) -> AlignmentResult {
    let direct = shifted_similarity(input, output, 0, 0);
    let mut best = AlignmentResult {
        dx: 0,
        dy: 0,
        direct_similarity: direct,
        aligned_similarity: direct,
    };
    for dy in -max_shift..=max_shift {
        for dx in -max_shift..=max_shift {
            if dx == 0 && dy == 0 {
                continue;
            }
            let similarity = shifted_similarity(input, output, dx, dy);
            if similarity > best.aligned_similarity {
                best.dx = dx;
                best.dy = dy;
                best.aligned_similarity = similarity;
            }
        }
    }
    best
}
