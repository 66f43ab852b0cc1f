use std::net::SocketAddr;

use axum::extract::rejection::JsonRejection;
use axum::extract::{ConnectInfo, State};
use axum::http::HeaderMap;
use axum::Json;
use base64::{engine::general_purpose, Engine as _};

use crate::error::ApiError;
use crate::llm::media::detect_mime_type;
use crate::quota::{check_quota, consume_daily_quota, identity_hash, today_key};
use crate::restyle::prompts::base_instruction;
use crate::restyle::run_restyle;
use crate::restyle::types::{
    GeneratedImage, RestyleOutcome, RestyleRequest, RestyleResponse, RoomType,
};
use crate::state::AppState;
use crate::utils::timing::RequestTimer;
use crate::verify::{FailureReason, PixelImage};

fn client_address(headers: &HeaderMap, socket: SocketAddr) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| socket.ip().to_string())
}

fn user_agent(headers: &HeaderMap) -> String {
    headers
        .get("user-agent")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("")
        .to_string()
}

struct ValidatedRequest {
    request: RestyleRequest,
    room: RoomType,
    image_bytes: Vec<u8>,
    source: PixelImage,
    mime_type: String,
}

/// Boundary validation: everything here fails fast with no model call
/// and no quota consumption.
fn validate(
    body: Result<Json<RestyleRequest>, JsonRejection>,
    state: &AppState,
) -> Result<ValidatedRequest, ApiError> {
    let Json(request) =
        body.map_err(|rejection| ApiError::InvalidRequest(rejection.body_text()))?;

    let image_bytes = general_purpose::STANDARD
        .decode(request.image.trim())
        .map_err(|_| ApiError::InvalidRequest("image is not valid base64".to_string()))?;
    if image_bytes.is_empty() {
        return Err(ApiError::InvalidRequest("image is empty".to_string()));
    }
    if image_bytes.len() > state.config.max_image_bytes {
        return Err(ApiError::ImageTooLarge(state.config.max_image_bytes));
    }

    let room = RoomType::parse(&request.room_type)
        .ok_or_else(|| ApiError::UnsupportedRoomType(request.room_type.clone()))?;

    if request.style.is_none()
        && request
            .instructions
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .is_none()
    {
        return Err(ApiError::InvalidRequest(
            "either a style or free-text instructions are required".to_string(),
        ));
    }
    if let Some(instructions) = request.instructions.as_deref() {
        if instructions.chars().count() > state.config.max_instruction_chars {
            return Err(ApiError::InvalidRequest(format!(
                "instructions exceed the {} character limit",
                state.config.max_instruction_chars
            )));
        }
    }

    let source = PixelImage::decode(&image_bytes)
        .map_err(|err| ApiError::InvalidRequest(format!("unsupported image: {err}")))?;
    let mime_type =
        detect_mime_type(&image_bytes).unwrap_or_else(|| "image/jpeg".to_string());

    Ok(ValidatedRequest {
        request,
        room,
        image_bytes,
        source,
        mime_type,
    })
}

fn encode_response(
    image: GeneratedImage,
    remaining: i64,
    failures: Vec<FailureReason>,
    change_too_subtle: bool,
) -> RestyleResponse {
    RestyleResponse {
        image: general_purpose::STANDARD.encode(image.bytes),
        model_text: image.text,
        remaining_daily_quota: remaining,
        layout_warning: !failures.is_empty(),
        layout_failure_reasons: failures,
        change_too_subtle,
    }
}

pub async fn restyle(
    State(state): State<AppState>,
    ConnectInfo(socket): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    body: Result<Json<RestyleRequest>, JsonRejection>,
) -> Result<Json<RestyleResponse>, ApiError> {
    let identity = identity_hash(
        &state.config.identity_salt,
        &client_address(&headers, socket),
        &user_agent(&headers),
    );
    let mut timer = RequestTimer::start(crate::quota::RESTYLE_ENDPOINT, &identity);

    let result = handle(&state, &identity, body).await;
    match &result {
        Ok(response) => {
            let status = if response.layout_warning || response.change_too_subtle {
                "best_effort"
            } else {
                "success"
            };
            timer.complete(status, None);
        }
        Err(err) => timer.complete("error", Some(err.code())),
    }
    result.map(Json)
}

async fn handle(
    state: &AppState,
    identity: &str,
    body: Result<Json<RestyleRequest>, JsonRejection>,
) -> Result<RestyleResponse, ApiError> {
    let validated = validate(body, state)?;
    let day = today_key();
    check_quota(&state.db, &state.config, identity, &day).await?;

    let base = base_instruction(validated.room, &validated.request);
    let outcome = run_restyle(
        state.model.as_ref(),
        &validated.source,
        &validated.image_bytes,
        &validated.mime_type,
        &base,
        &state.config,
    )
    .await;

    match outcome {
        RestyleOutcome::Accepted { image, .. } => {
            let remaining = consume_daily_quota(&state.db, &state.config, identity, &day).await;
            Ok(encode_response(image, remaining, Vec::new(), false))
        }
        RestyleOutcome::BestEffort {
            image,
            failures,
            change_too_subtle,
        } => {
            // Best-effort still consumed a model call and still hands
            // the user an image, so it draws down the daily quota.
            let remaining = consume_daily_quota(&state.db, &state.config, identity, &day).await;
            Ok(encode_response(
                image,
                remaining,
                failures,
                change_too_subtle,
            ))
        }
        RestyleOutcome::Rejected { reason } => Err(ApiError::NeedsClearerPhoto(reason)),
        RestyleOutcome::Failed {
            transport_error: Some(detail),
        } => Err(ApiError::UpstreamError(detail)),
        RestyleOutcome::Failed {
            transport_error: None,
        } => Err(ApiError::GenerationFailed),
    }
}
