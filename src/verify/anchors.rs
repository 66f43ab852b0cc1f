//! Anchor points: strong, well-separated edge cells used as
//! check-points for layout preservation.

use crate::verify::edges::EdgeGrid;

#[derive(Debug, Clone, Copy)]
pub struct Anchor {
    pub x: usize,
    pub y: usize,
    pub strength: f32,
}

fn separated(a: (usize, usize), b: (usize, usize), min_separation: usize) -> bool {
    let dx = a.0 as i64 - b.0 as i64;
    let dy = a.1 as i64 - b.1 as i64;
    let min = min_separation as i64;
    dx * dx + dy * dy >= min * min
}

/// Strongest edge cells above the floor, ranked by strength, each
/// rejected if it sits within `min_separation` of an accepted anchor.
/// The separation keeps anchors spread across the room instead of
/// clustering along one strong edge.
pub fn select_anchors(
    edges: &EdgeGrid,
    max_anchors: usize,
    strength_floor: f32,
    min_separation: usize,
) -> Vec<Anchor> {
    let n = edges.size();
    let mut candidates = Vec::new();
    for y in 0..n {
        for x in 0..n {
            let strength = edges.get(x, y);
            if strength > strength_floor {
                candidates.push(Anchor { x, y, strength });
            }
        }
    }
    // Strength descending, scanline order as the deterministic tie-break.
    candidates.sort_by(|a, b| {
        b.strength
            .partial_cmp(&a.strength)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| (a.y, a.x).cmp(&(b.y, b.x)))
    });

    let mut accepted: Vec<Anchor> = Vec::new();
    for candidate in candidates {
        if accepted.len() >= max_anchors {
            break;
        }
        if accepted
            .iter()
            .all(|kept| separated((candidate.x, candidate.y), (kept.x, kept.y), min_separation))
        {
            accepted.push(candidate);
        }
    }
    accepted
}

/// For each anchor, the strongest output edge within `search_radius`
/// of the anchor position, relative to the anchor's own strength.
/// An input with nothing to check scores full confidence.
pub fn anchor_consistency(anchors: &[Anchor], output: &EdgeGrid, search_radius: usize) -> f32 {
    if anchors.is_empty() {
        return 1.0;
    }
    let n = output.size() as i64;
    let radius = search_radius as i64;
    let mut total = 0.0f32;
    for anchor in anchors {
        let mut best = 0.0f32;
        for dy in -radius..=radius {
            for dx in -radius..=radius {
                let x = anchor.x as i64 + dx;
                let y = anchor.y as i64 + dy;
                if x >= 0 && x < n && y >= 0 && y < n {
                    best = best.max(output.get(x as usize, y as usize));
                }
            }
        }
        total += (best / anchor.strength).clamp(0.0, 1.0);
    }
    total / anchors.len() as f32
}
