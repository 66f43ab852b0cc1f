use std::env;

use anyhow::Result;

use crate::verify::VerifyConfig;

/// Immutable service configuration, built once at startup from the
/// environment and passed explicitly to the handlers, orchestrator,
/// and scorers.
#[derive(Debug, Clone)]
pub struct Config {
    pub bind_address: String,
    pub log_level: String,
    pub database_url: String,
    pub gemini_api_key: String,
    pub gemini_image_model: String,
    pub gemini_safety_settings: String,
    pub model_timeout_seconds: u64,
    pub max_attempts: usize,
    pub daily_quota_limit: i64,
    pub burst_limit: i64,
    pub burst_window_seconds: i64,
    pub identity_salt: String,
    pub max_image_bytes: usize,
    pub max_instruction_chars: usize,
    pub verify: VerifyConfig,
}

fn env_string(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn env_f32(name: &str, default: f32) -> f32 {
    env::var(name)
        .ok()
        .and_then(|value| value.parse::<f32>().ok())
        .unwrap_or(default)
}

fn env_i64(name: &str, default: i64) -> i64 {
    env::var(name)
        .ok()
        .and_then(|value| value.parse::<i64>().ok())
        .unwrap_or(default)
}

fn env_u64(name: &str, default: u64) -> u64 {
    env::var(name)
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .unwrap_or(default)
}

fn env_usize(name: &str, default: usize) -> usize {
    env::var(name)
        .ok()
        .and_then(|value| value.parse::<usize>().ok())
        .unwrap_or(default)
}

fn normalize_database_url(value: String) -> String {
    if value.starts_with("sqlite+aiosqlite://") {
        return value.replacen("sqlite+aiosqlite://", "sqlite://", 1);
    }
    value
}

impl Config {
    pub fn load() -> Result<Self> {
        let gemini_api_key = env::var("GEMINI_API_KEY").unwrap_or_default();
        if gemini_api_key.trim().is_empty() {
            return Err(anyhow::anyhow!("GEMINI_API_KEY is required"));
        }
        let identity_salt = env::var("IDENTITY_SALT").unwrap_or_default();
        if identity_salt.trim().is_empty() {
            return Err(anyhow::anyhow!("IDENTITY_SALT is required"));
        }

        let verify = VerifyConfig {
            sample_resolution: env_usize("VERIFY_SAMPLE_RESOLUTION", 64),
            max_shift: env_i64("VERIFY_MAX_SHIFT", 4) as i32,
            max_anchors: env_usize("VERIFY_MAX_ANCHORS", 24),
            anchor_strength_floor: env_f32("VERIFY_ANCHOR_STRENGTH_FLOOR", 18.0),
            anchor_search_radius: env_usize("VERIFY_ANCHOR_SEARCH_RADIUS", 2),
            aligned_similarity_min: env_f32("VERIFY_ALIGNED_SIMILARITY_MIN", 0.84),
            shift_magnitude_max: env_f32("VERIFY_SHIFT_MAGNITUDE_MAX", 2.2),
            anchor_consistency_min: env_f32("VERIFY_ANCHOR_CONSISTENCY_MIN", 0.56),
            boundary_consistency_min: env_f32("VERIFY_BOUNDARY_CONSISTENCY_MIN", 0.68),
            change_intensity_min: env_f32("VERIFY_CHANGE_INTENSITY_MIN", 10.0),
        };

        Ok(Config {
            bind_address: env_string("BIND_ADDRESS", "127.0.0.1:8080"),
            log_level: env_string("LOG_LEVEL", "info").to_lowercase(),
            database_url: normalize_database_url(env_string(
                "DATABASE_URL",
                "sqlite://restyle.db?mode=rwc",
            )),
            gemini_api_key,
            gemini_image_model: env_string("GEMINI_IMAGE_MODEL", "gemini-3-pro-image-preview"),
            gemini_safety_settings: env_string("GEMINI_SAFETY_SETTINGS", "standard"),
            model_timeout_seconds: env_u64("MODEL_TIMEOUT_SECONDS", 90),
            max_attempts: env_usize("MAX_GENERATION_ATTEMPTS", 2).max(1),
            daily_quota_limit: env_i64("DAILY_QUOTA_LIMIT", 8),
            burst_limit: env_i64("BURST_LIMIT", 4),
            burst_window_seconds: env_i64("BURST_WINDOW_SECONDS", 900),
            identity_salt,
            max_image_bytes: env_usize("MAX_IMAGE_BYTES", 8 * 1024 * 1024),
            max_instruction_chars: env_usize("MAX_INSTRUCTION_CHARS", 600),
            verify,
        })
    }

    #[cfg(test)]
    pub fn for_tests() -> Self {
        Config {
            bind_address: "127.0.0.1:0".to_string(),
            log_level: "info".to_string(),
            database_url: "sqlite::memory:".to_string(),
            gemini_api_key: "test-key".to_string(),
            gemini_image_model: "test-model".to_string(),
            gemini_safety_settings: "standard".to_string(),
            model_timeout_seconds: 5,
            max_attempts: 2,
            daily_quota_limit: 8,
            burst_limit: 4,
            burst_window_seconds: 900,
            identity_salt: "test-salt".to_string(),
            max_image_bytes: 8 * 1024 * 1024,
            max_instruction_chars: 600,
            verify: VerifyConfig::default(),
        }
    }
}
