use serde::{Deserialize, Serialize};

use crate::verify::{FailureReason, VerificationReport};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomType {
    Kitchen,
    Bathroom,
    Bedroom,
    LivingRoom,
    DiningRoom,
    Hallway,
    HomeOffice,
}

impl RoomType {
    /// Parsed by hand rather than serde so an unknown room type maps
    /// to its own rejection status instead of a generic body error.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "kitchen" => Some(RoomType::Kitchen),
            "bathroom" => Some(RoomType::Bathroom),
            "bedroom" => Some(RoomType::Bedroom),
            "living_room" => Some(RoomType::LivingRoom),
            "dining_room" => Some(RoomType::DiningRoom),
            "hallway" => Some(RoomType::Hallway),
            "home_office" => Some(RoomType::HomeOffice),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RoomType::Kitchen => "kitchen",
            RoomType::Bathroom => "bathroom",
            RoomType::Bedroom => "bedroom",
            RoomType::LivingRoom => "living room",
            RoomType::DiningRoom => "dining room",
            RoomType::Hallway => "hallway",
            RoomType::HomeOffice => "home office",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StylePreset {
    Modern,
    Scandinavian,
    Industrial,
    Rustic,
    Minimalist,
    Traditional,
    Coastal,
}

impl StylePreset {
    pub fn label(&self) -> &'static str {
        match self {
            StylePreset::Modern => "modern",
            StylePreset::Scandinavian => "Scandinavian",
            StylePreset::Industrial => "industrial",
            StylePreset::Rustic => "rustic",
            StylePreset::Minimalist => "minimalist",
            StylePreset::Traditional => "traditional",
            StylePreset::Coastal => "coastal",
        }
    }
}

/// Inbound request body, validated once at the boundary.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RestyleRequest {
    /// Base64-encoded source photograph.
    pub image: String,
    pub room_type: String,
    pub style: Option<StylePreset>,
    pub tone: Option<String>,
    pub material: Option<String>,
    pub fixture: Option<String>,
    /// Free-text alternative to a style preset.
    pub instructions: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct RestyleResponse {
    /// Base64-encoded edited image.
    pub image: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_text: Option<String>,
    pub remaining_daily_quota: i64,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub layout_warning: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub layout_failure_reasons: Vec<FailureReason>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub change_too_subtle: bool,
}

#[derive(Debug, Clone)]
pub struct GeneratedImage {
    pub bytes: Vec<u8>,
    pub text: Option<String>,
}

/// Terminal state of the generation loop. The transport must branch
/// on this explicitly; a best-effort image cannot be mistaken for a
/// verified one.
#[derive(Debug)]
pub enum RestyleOutcome {
    Accepted {
        image: GeneratedImage,
        report: VerificationReport,
    },
    BestEffort {
        image: GeneratedImage,
        failures: Vec<FailureReason>,
        change_too_subtle: bool,
    },
    /// The model explicitly asked for a clearer photo.
    Rejected { reason: String },
    /// No usable image was produced by any attempt.
    Failed { transport_error: Option<String> },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn room_type_parsing_is_case_insensitive() {
        assert_eq!(RoomType::parse("Bathroom"), Some(RoomType::Bathroom));
        assert_eq!(RoomType::parse(" living_room "), Some(RoomType::LivingRoom));
        assert_eq!(RoomType::parse("garage"), None);
    }

    #[test]
    fn unknown_request_fields_are_rejected() {
        let body = r#"{"image":"aGk=","room_type":"kitchen","surprise":true}"#;
        assert!(serde_json::from_str::<RestyleRequest>(body).is_err());
    }

    #[test]
    fn accepted_response_serializes_without_warning_flags() {
        let response = RestyleResponse {
            image: "aGk=".to_string(),
            model_text: None,
            remaining_daily_quota: 7,
            layout_warning: false,
            layout_failure_reasons: Vec::new(),
            change_too_subtle: false,
        };
        let json = serde_json::to_value(&response).unwrap();
        assert!(json.get("layout_warning").is_none());
        assert!(json.get("layout_failure_reasons").is_none());
        assert!(json.get("change_too_subtle").is_none());
    }

    #[test]
    fn best_effort_response_carries_ordered_reasons() {
        let response = RestyleResponse {
            image: "aGk=".to_string(),
            model_text: None,
            remaining_daily_quota: 3,
            layout_warning: true,
            layout_failure_reasons: vec![
                FailureReason::StructuralEdgesChanged,
                FailureReason::RoomBoundariesExpandedOrCompressed,
            ],
            change_too_subtle: false,
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["layout_warning"], true);
        assert_eq!(
            json["layout_failure_reasons"][0],
            "structural_edges_changed"
        );
        assert_eq!(
            json["layout_failure_reasons"][1],
            "room_boundaries_expanded_or_compressed"
        );
    }
}
