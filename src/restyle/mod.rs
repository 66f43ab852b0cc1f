//! Generation retry loop.
//!
//! Up to `max_attempts` sequential model calls, each verified against
//! the source photo. Failed verification escalates the instruction
//! text; exhaustion returns the last produced image as a best-effort
//! result with advisory warnings. Returning a usable-if-imperfect
//! image after quota was spent beats discarding it, and the tagged
//! outcome keeps the degradation explicit.

pub mod prompts;
pub mod types;

use tracing::{info, warn};

use crate::config::Config;
use crate::llm::{EditRequest, ImageEditor, ModelOutcome};
use crate::restyle::prompts::compose_instruction;
use crate::restyle::types::{GeneratedImage, RestyleOutcome};
use crate::verify::{verify_layout, PixelImage, VerificationReport};

pub async fn run_restyle<M: ImageEditor>(
    model: &M,
    source: &PixelImage,
    source_bytes: &[u8],
    source_mime: &str,
    base_instruction: &str,
    config: &Config,
) -> RestyleOutcome {
    let mut last_candidate: Option<(GeneratedImage, VerificationReport)> = None;
    let mut last_transport_error: Option<String> = None;

    for attempt in 1..=config.max_attempts {
        let instruction = compose_instruction(base_instruction, attempt, config.max_attempts);
        let request = EditRequest {
            image: source_bytes,
            mime_type: source_mime,
            instruction: &instruction,
        };

        let outcome = match model.edit(&request).await {
            Ok(outcome) => outcome,
            Err(err) => {
                warn!("Model call failed on attempt {attempt}: {err}");
                last_transport_error = Some(err.to_string());
                continue;
            }
        };

        match outcome {
            ModelOutcome::Refused { reason } => {
                info!("Model refused on attempt {attempt}: needs a clearer photo");
                return RestyleOutcome::Rejected { reason };
            }
            ModelOutcome::Empty => {
                warn!("Model returned no image and no refusal on attempt {attempt}");
                continue;
            }
            ModelOutcome::Edited { image, text } => {
                let decoded = match PixelImage::decode(&image) {
                    Ok(decoded) => decoded,
                    Err(err) => {
                        // Undecodable bytes are operationally the same
                        // as a failed attempt, not a system fault.
                        warn!("Model image failed to decode on attempt {attempt}: {err}");
                        continue;
                    }
                };

                let report = verify_layout(source, &decoded, &config.verify);
                info!(
                    attempt,
                    aligned_similarity = report.metrics.aligned_similarity,
                    shift_magnitude = report.metrics.shift_magnitude,
                    anchor_consistency = report.metrics.anchor_consistency,
                    boundary_consistency = report.metrics.boundary_consistency,
                    change_intensity = report.metrics.change_intensity,
                    passed = report.passed(),
                    too_subtle = report.change_too_subtle,
                    "Layout verification"
                );

                let candidate = GeneratedImage { bytes: image, text };
                if report.passed() && !report.change_too_subtle {
                    return RestyleOutcome::Accepted {
                        image: candidate,
                        report,
                    };
                }
                last_candidate = Some((candidate, report));
            }
        }
    }

    match last_candidate {
        Some((image, report)) => RestyleOutcome::BestEffort {
            image,
            failures: report.failures,
            change_too_subtle: report.change_too_subtle,
        },
        None => RestyleOutcome::Failed {
            transport_error: last_transport_error,
        },
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use super::*;
    use crate::verify::sampler::PixelImage;

    fn encode_png(rgb: &image::RgbImage) -> Vec<u8> {
        let mut bytes = Vec::new();
        image::DynamicImage::ImageRgb8(rgb.clone())
            .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        bytes
    }

    /// A structured source room and a same-layout recolor of it.
    fn room_pair() -> (image::RgbImage, image::RgbImage) {
        let paint = |wall: [u8; 3]| {
            let mut rgb = image::RgbImage::from_pixel(320, 240, image::Rgb([40, 36, 32]));
            for y in 0..180 {
                for x in 40..280 {
                    rgb.put_pixel(x, y, image::Rgb(wall));
                }
            }
            for y in 40..120 {
                for x in 110..160 {
                    rgb.put_pixel(x, y, image::Rgb([230, 240, 250]));
                }
            }
            rgb
        };
        (paint([180, 170, 150]), paint([120, 150, 190]))
    }

    /// A same-palette image with completely different geometry, which
    /// fails structural verification against the source room.
    fn restructured_room() -> image::RgbImage {
        let mut rgb = image::RgbImage::from_pixel(320, 240, image::Rgb([180, 170, 150]));
        for y in 150..240 {
            for x in 0..320 {
                rgb.put_pixel(x, y, image::Rgb([40, 36, 32]));
            }
        }
        rgb
    }

    struct ScriptedEditor {
        calls: AtomicUsize,
        instructions: Mutex<Vec<String>>,
        outcome: fn() -> anyhow::Result<ModelOutcome>,
    }

    impl ScriptedEditor {
        fn new(outcome: fn() -> anyhow::Result<ModelOutcome>) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                instructions: Mutex::new(Vec::new()),
                outcome,
            }
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl ImageEditor for ScriptedEditor {
        async fn edit(&self, request: &EditRequest<'_>) -> anyhow::Result<ModelOutcome> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.instructions
                .lock()
                .unwrap()
                .push(request.instruction.to_string());
            (self.outcome)()
        }
    }

    async fn run_with(editor: &ScriptedEditor) -> RestyleOutcome {
        let (source_rgb, _) = room_pair();
        let source_bytes = encode_png(&source_rgb);
        let source = PixelImage::from_rgb(source_rgb);
        let config = crate::config::Config::for_tests();
        run_restyle(editor, &source, &source_bytes, "image/png", "brief", &config).await
    }

    #[tokio::test]
    async fn verified_output_is_accepted_on_the_first_attempt() {
        let editor = ScriptedEditor::new(|| {
            let (_, recolored) = room_pair();
            Ok(ModelOutcome::Edited {
                image: encode_png(&recolored),
                text: Some("Done.".to_string()),
            })
        });
        let outcome = run_with(&editor).await;
        assert_eq!(editor.call_count(), 1);
        match outcome {
            RestyleOutcome::Accepted { report, .. } => {
                assert!(report.passed());
                assert!(!report.change_too_subtle);
            }
            other => panic!("expected Accepted, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn persistent_verification_failure_exhausts_attempts_into_best_effort() {
        let editor = ScriptedEditor::new(|| {
            Ok(ModelOutcome::Edited {
                image: encode_png(&restructured_room()),
                text: None,
            })
        });
        let outcome = run_with(&editor).await;
        assert_eq!(editor.call_count(), 2);
        match outcome {
            RestyleOutcome::BestEffort { failures, .. } => {
                assert!(!failures.is_empty());
            }
            other => panic!("expected BestEffort, got {other:?}"),
        }

        let instructions = editor.instructions.lock().unwrap();
        assert!(instructions[1].starts_with(instructions[0].as_str()));
        assert!(instructions[1].contains("STRICT LAYOUT LOCK"));
        assert!(instructions[1].contains("FINAL GEOMETRY GUARDRAIL"));
    }

    #[tokio::test]
    async fn refusal_short_circuits_after_one_call() {
        let editor = ScriptedEditor::new(|| {
            Ok(ModelOutcome::Refused {
                reason: "the photo is too dark".to_string(),
            })
        });
        let outcome = run_with(&editor).await;
        assert_eq!(editor.call_count(), 1);
        assert!(matches!(outcome, RestyleOutcome::Rejected { .. }));
    }

    #[tokio::test]
    async fn transient_failures_exhaust_into_failed_with_the_last_error() {
        let editor = ScriptedEditor::new(|| Err(anyhow::anyhow!("connection reset")));
        let outcome = run_with(&editor).await;
        assert_eq!(editor.call_count(), 2);
        match outcome {
            RestyleOutcome::Failed { transport_error } => {
                assert_eq!(transport_error.as_deref(), Some("connection reset"));
            }
            other => panic!("expected Failed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn undecodable_model_image_counts_as_a_failed_attempt() {
        let editor = ScriptedEditor::new(|| {
            Ok(ModelOutcome::Edited {
                image: b"not an image".to_vec(),
                text: None,
            })
        });
        let outcome = run_with(&editor).await;
        assert_eq!(editor.call_count(), 2);
        assert!(matches!(outcome, RestyleOutcome::Failed { .. }));
    }

    #[tokio::test]
    async fn too_subtle_output_is_retried_then_returned_with_the_flag() {
        let editor = ScriptedEditor::new(|| {
            let (source, _) = room_pair();
            Ok(ModelOutcome::Edited {
                image: encode_png(&source),
                text: None,
            })
        });
        let outcome = run_with(&editor).await;
        assert_eq!(editor.call_count(), 2);
        match outcome {
            RestyleOutcome::BestEffort {
                failures,
                change_too_subtle,
                ..
            } => {
                assert!(failures.is_empty());
                assert!(change_too_subtle);
            }
            other => panic!("expected BestEffort, got {other:?}"),
        }
    }
}
