use std::net::SocketAddr;

use anyhow::Context;
use axum::routing::{get, post};
use axum::Router;
use dotenvy::dotenv;
use tracing::{error, info};

mod config;
mod db;
mod error;
mod handlers;
mod llm;
mod quota;
mod restyle;
mod state;
mod utils;
mod verify;

use config::Config;
use db::Database;
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let config = match Config::load() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Configuration error: {err}");
            std::process::exit(1);
        }
    };

    let _logging_guards = utils::logging::init_logging(&config.log_level);
    info!(
        model = %config.gemini_image_model,
        max_attempts = config.max_attempts,
        daily_quota = config.daily_quota_limit,
        "Starting room restyle service"
    );

    let db = Database::init(&config.database_url)
        .await
        .context("failed to open quota database")?;
    let bind_address = config.bind_address.clone();
    let state = AppState::new(config, db);

    let app = Router::new()
        .route("/healthz", get(handlers::healthz))
        .route("/v1/restyle", post(handlers::restyle::restyle))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("failed to bind {bind_address}"))?;
    info!("Listening on {bind_address}");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("server exited")?;

    info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {err}");
    }
}
