use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

/// Request-level failures, each with a stable machine-readable code
/// and its own HTTP status. Verification failures never appear here:
/// they stay inside the retry loop and degrade to response warnings.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    #[error("Image exceeds the {0} byte limit")]
    ImageTooLarge(usize),
    #[error("Unsupported room type: {0}")]
    UnsupportedRoomType(String),
    #[error("Daily generation quota exhausted")]
    DailyQuotaExceeded { retry_after_seconds: i64 },
    #[error("Too many generations in a short window")]
    BurstLimitExceeded { retry_after_seconds: i64 },
    #[error("The model needs a clearer photo: {0}")]
    NeedsClearerPhoto(String),
    #[error("No usable image could be generated")]
    GenerationFailed,
    #[error("Upstream model error: {0}")]
    UpstreamError(String),
}

impl ApiError {
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::InvalidRequest(_) => "invalid_request",
            ApiError::ImageTooLarge(_) => "image_too_large",
            ApiError::UnsupportedRoomType(_) => "unsupported_room_type",
            ApiError::DailyQuotaExceeded { .. } => "daily_quota_exceeded",
            ApiError::BurstLimitExceeded { .. } => "burst_limit_exceeded",
            ApiError::NeedsClearerPhoto(_) => "needs_clearer_photo",
            ApiError::GenerationFailed => "generation_failed",
            ApiError::UpstreamError(_) => "upstream_error",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::ImageTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::UnsupportedRoomType(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::DailyQuotaExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,
            ApiError::BurstLimitExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,
            ApiError::NeedsClearerPhoto(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::GenerationFailed => StatusCode::BAD_GATEWAY,
            ApiError::UpstreamError(_) => StatusCode::BAD_GATEWAY,
        }
    }

    fn retry_after_seconds(&self) -> Option<i64> {
        match self {
            ApiError::DailyQuotaExceeded {
                retry_after_seconds,
            }
            | ApiError::BurstLimitExceeded {
                retry_after_seconds,
            } => Some(*retry_after_seconds),
            _ => None,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut body = json!({
            "code": self.code(),
            "message": self.to_string(),
        });
        if let Some(seconds) = self.retry_after_seconds() {
            body["retry_after_seconds"] = json!(seconds);
        }
        let mut response = (self.status(), Json(body)).into_response();
        if let Some(seconds) = self.retry_after_seconds() {
            if let Ok(value) = seconds.to_string().parse() {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }
        response
    }
}
