//! hygrolog daemon
//!
//! Polls a temperature/humidity sensor, appends readings to a history log and
//! serves the current value and recent history over HTTP.

mod config;
mod state;
mod tasks;
mod web;

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use config::Config;
use state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Setup logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config/default.toml".to_string());

    let config = Config::load(&config_path).context("Failed to load configuration")?;
    info!("Loaded configuration from: {}", config_path);

    // Initialize application state
    let state = Arc::new(AppState::new(&config));
    let shutdown = CancellationToken::new();

    // Start background loops
    let (warmed_up_tx, warmed_up_rx) = oneshot::channel();
    let poll_handle = tokio::spawn(tasks::poll_loop(
        state.clone(),
        config.poll_interval(),
        shutdown.clone(),
        warmed_up_tx,
    ));
    let flush_handle = tokio::spawn(tasks::flush_loop(
        state.clone(),
        config.flush_interval(),
        shutdown.clone(),
        warmed_up_rx,
    ));

    // Setup Unix signal handlers
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;
    let signal_shutdown = shutdown.clone();
    tokio::spawn(async move {
        tokio::select! {
            _ = sigterm.recv() => info!("Received SIGTERM, shutting down"),
            _ = sigint.recv() => info!("Received SIGINT, shutting down"),
        }
        signal_shutdown.cancel();
    });

    // Optionally start web server
    if config.web.enable {
        let app = web::create_router(state.clone(), &config.web.public_dir);
        let addr: SocketAddr = config.listen.parse().context("Invalid listen address")?;
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind {}", addr))?;
        info!("Web server listening on http://{}", addr);

        let server_shutdown = shutdown.clone();
        let result = axum::serve(listener, app)
            .with_graceful_shutdown(async move { server_shutdown.cancelled().await })
            .await;

        // Make sure the loops stop even if the server ended on its own.
        shutdown.cancel();
        result.context("Web server failed")?;
    } else {
        info!("Web server disabled");
        shutdown.cancelled().await;
    }

    for (name, handle) in [("poll", poll_handle), ("flush", flush_handle)] {
        if let Err(e) = handle.await {
            warn!("{} loop ended abnormally: {}", name, e);
        }
    }

    info!("Shutdown complete");
    Ok(())
}
