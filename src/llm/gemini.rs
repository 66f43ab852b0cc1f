use std::time::Duration;

use anyhow::{anyhow, Result};
use base64::{engine::general_purpose, Engine as _};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::{debug, warn};

use crate::config::Config;
use crate::llm::media::{detect_mime_type, download_media, truncate_for_log};
use crate::llm::{parse_refusal, EditRequest, ImageEditor, ModelOutcome};
use crate::utils::http::get_http_client;
use crate::utils::timing::log_model_timing;

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    candidates: Option<Vec<GeminiCandidate>>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiContent>,
}

#[derive(Debug, Deserialize)]
struct GeminiContent {
    parts: Option<Vec<GeminiPart>>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum GeminiPart {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: GeminiInlineData,
    },
    FileData {
        #[serde(rename = "fileData")]
        file_data: GeminiFileData,
    },
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiInlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiFileData {
    file_uri: String,
    mime_type: Option<String>,
}

/// Gemini image-edit client. One invocation per call: transient
/// failures are surfaced as errors so the retry loop can count them
/// as attempts.
pub struct GeminiImageClient {
    api_key: String,
    model: String,
    safety_profile: String,
    timeout: Duration,
}

impl GeminiImageClient {
    pub fn from_config(config: &Config) -> Self {
        Self {
            api_key: config.gemini_api_key.clone(),
            model: config.gemini_image_model.clone(),
            safety_profile: config.gemini_safety_settings.clone(),
            timeout: Duration::from_secs(config.model_timeout_seconds),
        }
    }

    fn redact_api_key(&self, text: &str) -> String {
        let key = self.api_key.trim();
        if key.is_empty() {
            return text.to_string();
        }
        text.replace(key, "[redacted]")
    }

    fn build_safety_settings(&self) -> Vec<Value> {
        let threshold = match self.safety_profile.as_str() {
            "standard" => "BLOCK_MEDIUM_AND_ABOVE",
            "permissive" => "OFF",
            other => {
                warn!("Unknown GEMINI_SAFETY_SETTINGS value '{}', using standard.", other);
                "BLOCK_MEDIUM_AND_ABOVE"
            }
        };
        vec![
            json!({ "category": "HARM_CATEGORY_HARASSMENT", "threshold": threshold }),
            json!({ "category": "HARM_CATEGORY_HATE_SPEECH", "threshold": threshold }),
            json!({ "category": "HARM_CATEGORY_SEXUALLY_EXPLICIT", "threshold": threshold }),
            json!({ "category": "HARM_CATEGORY_DANGEROUS_CONTENT", "threshold": threshold }),
        ]
    }

    fn build_payload(&self, request: &EditRequest<'_>) -> Value {
        let mime_type = detect_mime_type(request.image)
            .unwrap_or_else(|| request.mime_type.to_string());
        let encoded = general_purpose::STANDARD.encode(request.image);
        let parts = vec![
            json!({ "text": request.instruction }),
            json!({
                "inlineData": {
                    "mimeType": mime_type,
                    "data": encoded
                }
            }),
        ];
        json!({
            "contents": [{ "role": "user", "parts": parts }],
            "generationConfig": {
                "responseModalities": ["TEXT", "IMAGE"]
            },
            "safetySettings": self.build_safety_settings(),
        })
    }

    async fn call_api(&self, payload: Value) -> Result<GeminiResponse> {
        let client = get_http_client();
        let url = format!(
            "https://generativelanguage.googleapis.com/v1beta/models/{}:generateContent?key={}",
            self.model, self.api_key
        );

        if tracing::enabled!(tracing::Level::DEBUG) {
            debug!(
                target: "llm.gemini",
                model = %self.model,
                payload = %summarize_payload(&payload)
            );
        }

        let response = client
            .post(&url)
            .timeout(self.timeout)
            .json(&payload)
            .send()
            .await
            .map_err(|err| {
                let err_text = self.redact_api_key(&err.to_string());
                warn!(
                    "Gemini request failed to send: {} (timeout={}, connect={})",
                    err_text,
                    err.is_timeout(),
                    err.is_connect()
                );
                anyhow!("Gemini request failed: {}", err_text)
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let (message, body_summary) = summarize_error_body(&body);
            warn!("Gemini API error: status={}, body={}", status, body_summary);
            let detail = message.unwrap_or(body_summary);
            return Err(anyhow!(
                "Gemini request failed with status {}: {}",
                status,
                detail
            ));
        }

        let value = response.json::<GeminiResponse>().await?;
        if tracing::enabled!(tracing::Level::DEBUG) {
            debug!(
                target: "llm.gemini",
                model = %self.model,
                response = %summarize_response(&value)
            );
        }
        Ok(value)
    }
}

fn summarize_payload(payload: &Value) -> Value {
    let mut summary = Map::new();
    if let Some(contents) = payload.get("contents").and_then(|value| value.as_array()) {
        let mut summarized = Vec::new();
        for content in contents {
            let parts = content
                .get("parts")
                .and_then(|value| value.as_array())
                .map(|parts| {
                    parts
                        .iter()
                        .map(|part| {
                            if let Some(text) = part.get("text").and_then(|v| v.as_str()) {
                                json!({ "text": truncate_for_log(text, 200) })
                            } else if let Some(inline) = part.get("inlineData") {
                                let mime = inline
                                    .get("mimeType")
                                    .and_then(|v| v.as_str())
                                    .unwrap_or("unknown");
                                let len = inline
                                    .get("data")
                                    .and_then(|v| v.as_str())
                                    .map(|v| v.len())
                                    .unwrap_or(0);
                                json!({ "inlineData": { "mimeType": mime, "dataLen": len } })
                            } else {
                                json!({ "unknownPart": true })
                            }
                        })
                        .collect::<Vec<_>>()
                })
                .unwrap_or_default();
            summarized.push(json!({ "parts": parts }));
        }
        summary.insert("contents".to_string(), Value::Array(summarized));
    }
    if let Some(config) = payload.get("generationConfig") {
        summary.insert("generationConfig".to_string(), config.clone());
    }
    Value::Object(summary)
}

fn summarize_response(response: &GeminiResponse) -> Value {
    let mut text_parts = 0usize;
    let mut image_parts = 0usize;
    let mut file_parts = 0usize;
    let mut text_preview = None;

    for candidate in response.candidates.as_deref().unwrap_or(&[]) {
        let Some(parts) = candidate.content.as_ref().and_then(|c| c.parts.as_ref()) else {
            continue;
        };
        for part in parts {
            match part {
                GeminiPart::Text { text } => {
                    text_parts += 1;
                    if text_preview.is_none() && !text.trim().is_empty() {
                        text_preview = Some(truncate_for_log(text, 200));
                    }
                }
                GeminiPart::InlineData { inline_data } => {
                    if inline_data.mime_type.starts_with("image/") {
                        image_parts += 1;
                    }
                }
                GeminiPart::FileData { .. } => file_parts += 1,
            }
        }
    }

    json!({
        "candidates": response.candidates.as_ref().map(|c| c.len()).unwrap_or(0),
        "textParts": text_parts,
        "imageParts": image_parts,
        "fileParts": file_parts,
        "textPreview": text_preview
    })
}

fn summarize_error_body(body: &str) -> (Option<String>, String) {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return (None, "empty response body".to_string());
    }

    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        let message = value
            .pointer("/error/message")
            .and_then(|v| v.as_str())
            .map(|v| v.to_string())
            .or_else(|| {
                value
                    .get("message")
                    .and_then(|v| v.as_str())
                    .map(|v| v.to_string())
            });
        return (message, truncate_for_log(&value.to_string(), 2000));
    }

    (None, truncate_for_log(trimmed, 2000))
}

fn collect_text(response: &GeminiResponse) -> Option<String> {
    let mut text_parts = Vec::new();
    for candidate in response.candidates.as_deref().unwrap_or(&[]) {
        let Some(parts) = candidate.content.as_ref().and_then(|c| c.parts.as_ref()) else {
            continue;
        };
        for part in parts {
            if let GeminiPart::Text { text } = part {
                if !text.trim().is_empty() {
                    text_parts.push(text.clone());
                }
            }
        }
    }
    if text_parts.is_empty() {
        None
    } else {
        Some(text_parts.join("\n"))
    }
}

async fn extract_first_image(response: &GeminiResponse) -> Option<Vec<u8>> {
    for candidate in response.candidates.as_deref().unwrap_or(&[]) {
        let Some(parts) = candidate.content.as_ref().and_then(|c| c.parts.as_ref()) else {
            continue;
        };
        for part in parts {
            match part {
                GeminiPart::InlineData { inline_data }
                    if inline_data.mime_type.starts_with("image/") =>
                {
                    if let Ok(bytes) = general_purpose::STANDARD.decode(&inline_data.data) {
                        return Some(bytes);
                    }
                }
                GeminiPart::FileData { file_data }
                    if file_data
                        .mime_type
                        .as_deref()
                        .map(|mime| mime.starts_with("image/"))
                        .unwrap_or(false) =>
                {
                    if let Some(bytes) = download_media(&file_data.file_uri).await {
                        return Some(bytes);
                    }
                }
                _ => {}
            }
        }
    }
    None
}

impl ImageEditor for GeminiImageClient {
    async fn edit(&self, request: &EditRequest<'_>) -> Result<ModelOutcome> {
        let payload = self.build_payload(request);
        let response = log_model_timing(&self.model, "edit_room_image", || async {
            self.call_api(payload).await
        })
        .await?;

        let text = collect_text(&response);
        if let Some(reason) = text.as_deref().and_then(parse_refusal) {
            return Ok(ModelOutcome::Refused { reason });
        }
        match extract_first_image(&response).await {
            Some(image) => Ok(ModelOutcome::Edited { image, text }),
            None => Ok(ModelOutcome::Empty),
        }
    }
}
