//! Instruction assembly for the generation attempts.
//!
//! Each attempt's text is a composition of named fragments so the
//! escalation policy can be tested without invoking the model: the
//! base brief, a visibility boost on every attempt, a layout lock from
//! the second attempt on, and a final geometry guardrail on the last
//! attempt only. Later attempts always contain the earlier text.

use crate::llm::CLEARER_PHOTO_SENTINEL;
use crate::restyle::types::{RestyleRequest, RoomType};

const VISIBILITY_SUFFIX: &str = "Make the renovation clearly visible: change wall finishes, \
flooring surfaces, cabinetry fronts, textiles, and fixture styling so the result reads as a \
genuine redesign, not a lighting tweak.";

const LAYOUT_LOCK_SUFFIX: &str = "STRICT LAYOUT LOCK: do not move, add, or remove walls, \
doors, windows, or any opening. Every fixture, counter, and appliance must stay in its exact \
position. Keep the camera position, angle, and framing identical to the source photo.";

const FINAL_GUARDRAIL_SUFFIX: &str = "FINAL GEOMETRY GUARDRAIL: the room boundaries in your \
output must coincide with the source photo at the pixel level. Wall corners, ceiling lines, \
and floor edges must not shift by even a few pixels. Restyle surfaces only.";

fn refusal_clause() -> String {
    format!(
        "If the photo is too blurry, dark, or obstructed to identify the room structure, do \
         not generate an image; reply with text starting with {CLEARER_PHOTO_SENTINEL}: \
         followed by a short explanation."
    )
}

fn dimension_clause(width: u32, height: u32) -> String {
    format!(
        "Preserve the exact pixel dimensions of {width}x{height} and the original orientation."
    )
}

/// The per-request brief, before any escalation suffix.
pub fn base_instruction(room: RoomType, request: &RestyleRequest) -> String {
    let mut text = format!(
        "Renovate the {} shown in this photo.",
        room.label()
    );

    if let Some(instructions) = request
        .instructions
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
    {
        text.push_str(&format!(" {instructions}"));
    } else if let Some(style) = request.style {
        text.push_str(&format!(
            " Apply a {} interior style throughout.",
            style.label()
        ));
        if let Some(tone) = request.tone.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
            text.push_str(&format!(" Favor {tone} tones."));
        }
        if let Some(material) = request
            .material
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
        {
            text.push_str(&format!(" Use {material} as a leading material."));
        }
        if let Some(fixture) = request
            .fixture
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
        {
            text.push_str(&format!(" Restyle fixtures toward {fixture}."));
        }
    }

    if let (Some(width), Some(height)) = (request.width, request.height) {
        text.push_str(&format!(" {}", dimension_clause(width, height)));
    }
    text.push_str(&format!(" {}", refusal_clause()));
    text
}

/// Assemble the full instruction for a given attempt. Pure function of
/// (base, attempt, max_attempts); attempt numbers start at 1.
pub fn compose_instruction(base: &str, attempt: usize, max_attempts: usize) -> String {
    let mut text = format!("{base}\n\n{VISIBILITY_SUFFIX}");
    if attempt >= 2 {
        text.push_str(&format!("\n\n{LAYOUT_LOCK_SUFFIX}"));
        if attempt >= max_attempts {
            text.push_str(&format!("\n\n{FINAL_GUARDRAIL_SUFFIX}"));
        }
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::restyle::types::StylePreset;

    fn preset_request() -> RestyleRequest {
        RestyleRequest {
            image: String::new(),
            room_type: "kitchen".to_string(),
            style: Some(StylePreset::Scandinavian),
            tone: Some("warm neutral".to_string()),
            material: Some("light oak".to_string()),
            fixture: Some("matte black hardware".to_string()),
            instructions: None,
            width: Some(1000),
            height: Some(1500),
        }
    }

    #[test]
    fn base_brief_includes_style_hints_and_dimensions() {
        let base = base_instruction(RoomType::Kitchen, &preset_request());
        assert!(base.contains("kitchen"));
        assert!(base.contains("Scandinavian"));
        assert!(base.contains("warm neutral"));
        assert!(base.contains("light oak"));
        assert!(base.contains("matte black hardware"));
        assert!(base.contains("1000x1500"));
        assert!(base.contains(CLEARER_PHOTO_SENTINEL));
    }

    #[test]
    fn free_text_overrides_the_preset() {
        let mut request = preset_request();
        request.instructions = Some("Paint everything sage green.".to_string());
        let base = base_instruction(RoomType::Bathroom, &request);
        assert!(base.contains("sage green"));
        assert!(!base.contains("Scandinavian"));
    }

    #[test]
    fn second_attempt_is_a_strict_superset_of_the_first() {
        let base = base_instruction(RoomType::Kitchen, &preset_request());
        let first = compose_instruction(&base, 1, 2);
        let second = compose_instruction(&base, 2, 2);
        assert!(second.starts_with(&first));
        assert!(second.len() > first.len());
        assert!(second.contains("STRICT LAYOUT LOCK"));
        assert!(!first.contains("STRICT LAYOUT LOCK"));
    }

    #[test]
    fn geometry_guardrail_appears_only_on_the_final_attempt() {
        let base = "brief";
        assert!(!compose_instruction(base, 1, 3).contains("FINAL GEOMETRY GUARDRAIL"));
        assert!(!compose_instruction(base, 2, 3).contains("FINAL GEOMETRY GUARDRAIL"));
        assert!(compose_instruction(base, 3, 3).contains("FINAL GEOMETRY GUARDRAIL"));
    }
}
