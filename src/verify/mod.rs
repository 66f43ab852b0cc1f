//! Structural layout verification.
//!
//! The generative model cannot be trusted to preserve room geometry,
//! and returns no structural metadata. These scorers compare coarse
//! 64x64 edge representations of the input and output photos and gate
//! the accept/retry decision: translation-tolerant edge similarity,
//! anchor-point survival, silhouette profiles, and a visible-change
//! floor.

pub mod align;
pub mod anchors;
pub mod boundary;
pub mod change;
pub mod decision;
pub mod edges;
pub mod sampler;

pub use decision::{FailureReason, VerificationMetrics, VerificationReport};
pub use sampler::{DecodeError, PixelImage};

use crate::verify::align::search_alignment;
use crate::verify::anchors::{anchor_consistency, select_anchors};
use crate::verify::boundary::boundary_consistency;
use crate::verify::change::change_intensity;
use crate::verify::edges::build_edge_map;
use crate::verify::sampler::sample_luma_grid;

#[derive(Debug, Clone, Copy)]
pub struct VerifyConfig {
    pub sample_resolution: usize,
    pub max_shift: i32,
    pub max_anchors: usize,
    pub anchor_strength_floor: f32,
    pub anchor_search_radius: usize,
    pub aligned_similarity_min: f32,
    pub shift_magnitude_max: f32,
    pub anchor_consistency_min: f32,
    pub boundary_consistency_min: f32,
    pub change_intensity_min: f32,
}

impl Default for VerifyConfig {
    fn default() -> Self {
        Self {
            sample_resolution: 64,
            max_shift: 4,
            max_anchors: 24,
            anchor_strength_floor: 18.0,
            anchor_search_radius: 2,
            aligned_similarity_min: 0.84,
            shift_magnitude_max: 2.2,
            anchor_consistency_min: 0.56,
            boundary_consistency_min: 0.68,
            change_intensity_min: 10.0,
        }
    }
}

impl VerifyConfig {
    /// Minimum anchor separation, roughly 7% of the grid side.
    pub fn anchor_min_separation(&self) -> usize {
        (self.sample_resolution * 7 / 100).max(2)
    }
}

/// Run the full scorer pipeline over an input/output pair and gate the
/// result against the configured thresholds.
pub fn verify_layout(
    input: &PixelImage,
    output: &PixelImage,
    config: &VerifyConfig,
) -> VerificationReport {
    let n = config.sample_resolution;
    let input_edges = build_edge_map(&sample_luma_grid(input, n));
    let output_edges = build_edge_map(&sample_luma_grid(output, n));

    let alignment = search_alignment(&input_edges, &output_edges, config.max_shift);
    let anchors = select_anchors(
        &input_edges,
        config.max_anchors,
        config.anchor_strength_floor,
        config.anchor_min_separation(),
    );
    let metrics = VerificationMetrics {
        direct_similarity: alignment.direct_similarity,
        aligned_similarity: alignment.aligned_similarity,
        shift: (alignment.dx, alignment.dy),
        shift_magnitude: alignment.shift_magnitude(),
        anchor_consistency: anchor_consistency(
            &anchors,
            &output_edges,
            config.anchor_search_radius,
        ),
        boundary_consistency: boundary_consistency(&input_edges, &output_edges),
        change_intensity: change_intensity(input, output, n),
    };
    decision::decide(metrics, config)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A synthetic "room": a bright back wall rectangle with a darker
    /// floor band and a window rectangle, enough structure for edges,
    /// anchors, and boundary profiles to latch onto.
    pub(crate) fn synthetic_room(width: u32, height: u32, wall: [u8; 3]) -> PixelImage {
        let mut rgb = image::RgbImage::from_pixel(width, height, image::Rgb([40, 36, 32]));
        let floor_top = height * 3 / 4;
        for y in 0..floor_top {
            for x in (width / 8)..(width * 7 / 8) {
                rgb.put_pixel(x, y, image::Rgb(wall));
            }
        }
        // Window cut-out on the back wall.
        for y in (height / 6)..(height / 2) {
            for x in (width / 3)..(width / 2) {
                rgb.put_pixel(x, y, image::Rgb([230, 240, 250]));
            }
        }
        PixelImage::from_rgb(rgb)
    }

    #[test]
    fn exact_copy_passes_and_is_flagged_too_subtle() {
        let room = synthetic_room(640, 480, [180, 170, 150]);
        let copy = synthetic_room(640, 480, [180, 170, 150]);
        let report = verify_layout(&room, &copy, &VerifyConfig::default());
        assert!(report.passed(), "failures: {:?}", report.failures);
        assert_eq!(report.metrics.shift, (0, 0));
        assert!((report.metrics.aligned_similarity - 1.0).abs() < 1e-6);
        assert_eq!(report.metrics.anchor_consistency, 1.0);
        assert!((report.metrics.boundary_consistency - 1.0).abs() < 1e-6);
        assert_eq!(report.metrics.change_intensity, 0.0);
        assert!(report.change_too_subtle);
    }

    #[test]
    fn recolor_passes_without_subtlety_flag() {
        let before = synthetic_room(640, 480, [180, 170, 150]);
        let after = synthetic_room(640, 480, [120, 150, 190]);
        let report = verify_layout(&before, &after, &VerifyConfig::default());
        assert!(report.passed(), "failures: {:?}", report.failures);
        assert!(!report.change_too_subtle);
    }

    #[test]
    fn heavily_restructured_output_fails() {
        let before = synthetic_room(640, 480, [180, 170, 150]);
        // Same palette, completely different geometry.
        let mut rgb = image::RgbImage::from_pixel(640, 480, image::Rgb([180, 170, 150]));
        for y in 300..480 {
            for x in 0..640 {
                rgb.put_pixel(x, y, image::Rgb([40, 36, 32]));
            }
        }
        let after = PixelImage::from_rgb(rgb);
        let report = verify_layout(&before, &after, &VerifyConfig::default());
        assert!(!report.passed());
        assert!(!report.failures.is_empty());
    }
}
