//! Threshold gating of the verification metrics into a pass/fail plus
//! typed failure reasons.

use serde::Serialize;

use crate::verify::VerifyConfig;

#[derive(Debug, Clone, Copy)]
pub struct VerificationMetrics {
    pub direct_similarity: f32,
    pub aligned_similarity: f32,
    pub shift: (i32, i32),
    pub shift_magnitude: f32,
    pub anchor_consistency: f32,
    pub boundary_consistency: f32,
    pub change_intensity: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    StructuralEdgesChanged,
    CameraOrGeometryShifted,
    FixturesOrOpeningsMoved,
    RoomBoundariesExpandedOrCompressed,
}

impl FailureReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureReason::StructuralEdgesChanged => "structural_edges_changed",
            FailureReason::CameraOrGeometryShifted => "camera_or_geometry_shifted",
            FailureReason::FixturesOrOpeningsMoved => "fixtures_or_openings_moved",
            FailureReason::RoomBoundariesExpandedOrCompressed => {
                "room_boundaries_expanded_or_compressed"
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct VerificationReport {
    pub metrics: VerificationMetrics,
    pub failures: Vec<FailureReason>,
    /// Soft flag, independent of pass/fail: the edit may be perfectly
    /// layout-safe and still invisible to the user.
    pub change_too_subtle: bool,
}

impl VerificationReport {
    pub fn passed(&self) -> bool {
        self.failures.is_empty()
    }
}

pub fn decide(metrics: VerificationMetrics, config: &VerifyConfig) -> VerificationReport {
    let mut failures = Vec::new();
    if metrics.aligned_similarity < config.aligned_similarity_min {
        failures.push(FailureReason::StructuralEdgesChanged);
    }
    if metrics.shift_magnitude > config.shift_magnitude_max {
        failures.push(FailureReason::CameraOrGeometryShifted);
    }
    if metrics.anchor_consistency < config.anchor_consistency_min {
        failures.push(FailureReason::FixturesOrOpeningsMoved);
    }
    if metrics.boundary_consistency < config.boundary_consistency_min {
        failures.push(FailureReason::RoomBoundariesExpandedOrCompressed);
    }
    let change_too_subtle = metrics.change_intensity < config.change_intensity_min;
    VerificationReport {
        metrics,
        failures,
        change_too_subtle,
    }
}
