mod cli;
mod config;
mod handlers;
mod telemetry;
#[cfg(test)]
mod tests;

use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use axum::{
    routing::{get, post},
    Router,
};
use clap::Parser;
use metrics_exporter_prometheus::PrometheusHandle;
use tokio::signal;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use berth_core::SignalingService;

use crate::cli::Cli;
use crate::config::ServerConfig;
use crate::handlers::{AppState, SharedState};
use crate::telemetry::Telemetry;

#[tokio::main]
async fn main() -> Result<()> {
    let mut cli = Cli::parse();

    if let Some(command) = cli.command.take() {
        telemetry::init_logging()?;
        return cli::run_client(command).await;
    }

    let telemetry = Telemetry::init()?;
    let config = ServerConfig::try_from(&cli)?;
    info!(
        listen_addr = %config.listen_addr,
        handoff_timeout_secs = config.handoff_timeout.as_secs(),
        "starting berth relay"
    );

    run(config, telemetry.metrics_handle()).await
}

async fn run(config: ServerConfig, metrics: PrometheusHandle) -> Result<()> {
    let service = SignalingService::new(config.handoff_timeout);
    let state = Arc::new(AppState {
        service,
        metrics,
        started_at: Instant::now(),
    });

    let router = build_router(state);
    let listener = tokio::net::TcpListener::bind(config.listen_addr)
        .await
        .context("failed to bind listener")?;

    info!("berth relay listening on {}", config.listen_addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server shutdown with error")?;

    tokio::time::sleep(config.shutdown_grace).await;
    info!("graceful shutdown complete");

    Ok(())
}

fn build_router(state: SharedState) -> Router {
    Router::new()
        .route("/handshake", post(handlers::handshake))
        .route("/inform", post(handlers::inform))
        .route("/store", post(handlers::store))
        .route("/store/:id", get(handlers::fetch))
        .route("/exchange", post(handlers::exchange))
        .route("/healthz", get(handlers::healthz))
        .route("/debug/stats", get(handlers::stats))
        .route("/metrics", get(handlers::metrics))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

async fn shutdown_signal() {
    let _ = signal::ctrl_c().await;
}
