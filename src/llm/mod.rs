pub mod gemini;
pub mod media;

use std::future::Future;

/// Refusal sentinel the image model emits as a text prefix when the
/// source photo is too unclear to edit. Parsed here, at the client
/// boundary, so the orchestrator only ever sees the typed outcome.
pub const CLEARER_PHOTO_SENTINEL: &str = "NEED_CLEARER_PHOTO";

#[derive(Debug, Clone)]
pub struct EditRequest<'a> {
    pub image: &'a [u8],
    pub mime_type: &'a str,
    pub instruction: &'a str,
}

/// What one model invocation produced.
#[derive(Debug, Clone)]
pub enum ModelOutcome {
    Edited {
        image: Vec<u8>,
        text: Option<String>,
    },
    Refused {
        reason: String,
    },
    Empty,
}

/// Seam for the opaque image-editing oracle. The production
/// implementation calls Gemini; orchestrator tests script their own.
pub trait ImageEditor: Send + Sync {
    fn edit(
        &self,
        request: &EditRequest<'_>,
    ) -> impl Future<Output = anyhow::Result<ModelOutcome>> + Send;
}

/// Split a model text into (sentinel-refusal reason, plain text).
pub fn parse_refusal(text: &str) -> Option<String> {
    let trimmed = text.trim_start();
    let rest = trimmed.strip_prefix(CLEARER_PHOTO_SENTINEL)?;
    Some(rest.trim_start_matches([':', ' ']).trim().to_string())
}
