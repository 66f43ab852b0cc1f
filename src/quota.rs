use chrono::Utc;
use sha2::{Digest, Sha256};
use tracing::warn;

use crate::config::Config;
use crate::db::Database;
use crate::error::ApiError;

pub const RESTYLE_ENDPOINT: &str = "restyle";

/// Privacy-preserving caller identity: a salted SHA-256 over network
/// and device signals, hex-truncated. Raw addresses are never stored
/// or logged.
pub fn identity_hash(salt: &str, remote_address: &str, user_agent: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(b"|");
    hasher.update(remote_address.as_bytes());
    hasher.update(b"|");
    hasher.update(user_agent.as_bytes());
    let digest = hasher.finalize();
    let mut hex = String::with_capacity(32);
    for byte in &digest[..16] {
        hex.push_str(&format!("{byte:02x}"));
    }
    hex
}

pub fn today_key() -> String {
    Utc::now().format("%Y-%m-%d").to_string()
}

fn seconds_until_midnight_utc() -> i64 {
    let now = Utc::now();
    let next_day = (now.date_naive() + chrono::Days::new(1))
        .and_hms_opt(0, 0, 0)
        .expect("midnight is always a valid time");
    (next_day - now.naive_utc()).num_seconds().max(1)
}

/// Gate run before any model call: burst window first, then the daily
/// quota. Neither counter is incremented here; the daily increment
/// happens only after a response is produced.
pub async fn check_quota(
    db: &Database,
    config: &Config,
    identity: &str,
    day: &str,
) -> Result<(), ApiError> {
    let now_ms = Utc::now().timestamp_millis();
    let window_ms = config.burst_window_seconds * 1_000;
    match db
        .burst_count_and_record(identity, RESTYLE_ENDPOINT, now_ms, window_ms)
        .await
    {
        Ok(prior) => {
            if prior >= config.burst_limit {
                return Err(ApiError::BurstLimitExceeded {
                    retry_after_seconds: config.burst_window_seconds,
                });
            }
        }
        Err(err) => {
            // The burst window is a secondary control; if its storage
            // is unavailable the daily limit still stands alone.
            warn!("Burst limit check unavailable, falling back to daily quota: {err}");
        }
    }

    let count = db
        .daily_count(identity, day)
        .await
        .map_err(|err| ApiError::UpstreamError(format!("quota store unavailable: {err}")))?;
    if count >= config.daily_quota_limit {
        return Err(ApiError::DailyQuotaExceeded {
            retry_after_seconds: seconds_until_midnight_utc(),
        });
    }
    Ok(())
}

/// Called once per request that produced any response, successful or
/// best-effort. Returns the remaining daily quota.
pub async fn consume_daily_quota(
    db: &Database,
    config: &Config,
    identity: &str,
    day: &str,
) -> i64 {
    match db.increment_daily_count(identity, day).await {
        Ok(count) => (config.daily_quota_limit - count).max(0),
        Err(err) => {
            warn!("Failed to persist daily quota increment: {err}");
            0
        }
    }
}
