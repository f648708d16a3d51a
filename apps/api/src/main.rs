mod config;
mod dashboard;
mod errors;
mod generation;
mod intake;
mod models;
mod routes;
mod state;
mod tiers;
mod video_client;
mod workflow;

use anyhow::{Context, Result};
use std::net::SocketAddr;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::routes::build_router;
use crate::state::AppState;
use crate::video_client::build_video_service;
use crate::workflow::store::SessionStore;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on malformed env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("vidcv_api={},tower_http={}", &config.rust_log, &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting VidCV API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize the video backend
    let video = build_video_service(&config).context("Failed to initialize video backend")?;
    info!(
        backend = config.video_backend.as_str(),
        tier = %config.subscription_tier,
        "Video backend initialized"
    );

    let sessions = SessionStore::new();
    sessions.spawn_idle_sweeper(config.session_idle);
    info!(idle_secs = config.session_idle.as_secs(), "Idle session sweeper started");

    let state = AppState {
        video,
        sessions,
        config: config.clone(),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict origins once the web client has a fixed host

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
