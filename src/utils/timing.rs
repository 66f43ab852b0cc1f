use std::time::Instant;

use chrono::{DateTime, Utc};
use tracing::info;

#[derive(Debug)]
pub struct RequestTimer {
    endpoint: String,
    identity_hash: String,
    started_at: DateTime<Utc>,
    started_perf: Instant,
    completed: bool,
}

impl RequestTimer {
    pub fn start(endpoint: &str, identity_hash: &str) -> Self {
        let timer = RequestTimer {
            endpoint: endpoint.to_string(),
            identity_hash: identity_hash.to_string(),
            started_at: Utc::now(),
            started_perf: Instant::now(),
            completed: false,
        };
        info!(
            target: "restyle.timing",
            "event=request_received endpoint={} identity={} received_at={}",
            timer.endpoint,
            timer.identity_hash,
            timer.started_at.to_rfc3339()
        );
        timer
    }

    pub fn complete(&mut self, status: &str, detail: Option<&str>) {
        if self.completed {
            return;
        }
        self.completed = true;
        let completed_at = Utc::now();
        let duration = self.started_perf.elapsed().as_secs_f64();
        info!(
            target: "restyle.timing",
            "event=request_completed endpoint={} identity={} started_at={} completed_at={} duration_s={:.3} status={} detail={}",
            self.endpoint,
            self.identity_hash,
            self.started_at.to_rfc3339(),
            completed_at.to_rfc3339(),
            duration,
            status,
            detail.unwrap_or_default()
        );
    }
}

pub async fn log_model_timing<T, F, Fut>(model: &str, operation: &str, call: F) -> Result<T, anyhow::Error>
where
    F: FnOnce() -> Fut,
    Fut: std::future::Future<Output = Result<T, anyhow::Error>>,
{
    let started_at = Utc::now();
    let started_perf = Instant::now();
    info!(
        target: "restyle.timing",
        "event=model_request model={} operation={} started_at={}",
        model,
        operation,
        started_at.to_rfc3339()
    );

    let result = call().await;
    let status = if result.is_ok() { "success" } else { "error" };

    let completed_at = Utc::now();
    let duration = started_perf.elapsed().as_secs_f64();
    info!(
        target: "restyle.timing",
        "event=model_response model={} operation={} completed_at={} duration_s={:.3} status={}",
        model,
        operation,
        completed_at.to_rfc3339(),
        duration,
        status
    );

    result
}
