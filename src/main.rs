//! Pill Dispenser Console
//!
//! Web console for a two-drum pill dispenser.

use pill_dispenser_console::{api, bus, client, config, console, mode_guard, poller, routes};

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pill_dispenser_console=debug,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        "Starting Pill Dispenser Console v{} ({})",
        env!("PDC_VERSION"),
        env!("PDC_GIT_SHA")
    );

    // Load configuration
    let config = config::load_config()?;
    tracing::info!(
        "Configuration loaded, port: {}, dispenser: {}",
        config.port,
        config.backend_url
    );

    let client = client::DispenserClient::new(&config.backend_url, config.request_timeout())
        .with_context(|| format!("Invalid backend_url {:?}", config.backend_url))?;

    // Create event bus
    let bus = bus::create_bus();
    tracing::info!("Event bus initialized");

    let mode = mode_guard::ModeGuard::new(config.mode_lock_timeout(), bus.clone());
    let poller = poller::Poller::new(client.clone(), bus.clone(), config.poll.intervals());
    let console = Arc::new(console::Console::new(
        client,
        bus.clone(),
        mode,
        poller.clone(),
    ));

    let state = api::AppState::new(console.clone(), config.clone());
    let app = routes::router(state);

    // Start server with graceful shutdown
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Listening on http://{}", addr);

    // Initial load runs behind the listener; the pollers' first tick fires immediately
    tokio::spawn(console::initial_load(console));
    poller.start();

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Stopping pollers...");
    poller.stop();
    tracing::info!("Shutdown complete");

    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl+C, shutting down..."),
        _ = terminate => tracing::info!("Received SIGTERM, shutting down..."),
    }
}
