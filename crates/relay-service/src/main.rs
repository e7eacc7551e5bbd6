//! Signaling Relay
//!
//! Entry point for the Parley signaling relay. Brokers SDP offer/answer
//! and ICE candidate messages between call participants through
//! per-identity mailboxes, and records call history.

use relay_service::config::Config;
use relay_service::observability::metrics;
use relay_service::repositories::{CallHistoryRepository, MailboxRepository};
use relay_service::routes::{self, AppState};
use relay_service::tasks;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "relay_service=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Signaling Relay");

    // Load configuration
    let config = Config::from_env().map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    info!(
        relay_id = %config.relay_id,
        bind_address = %config.bind_address,
        signal_ttl_seconds = config.signal_ttl_seconds,
        sweep_interval_seconds = config.sweep_interval_seconds,
        "Configuration loaded successfully"
    );

    // Install the Prometheus recorder before any metric is recorded
    let metrics_handle = metrics::init_metrics_recorder().map_err(|e| {
        error!("Failed to install metrics recorder: {}", e);
        e
    })?;

    let signal_ttl = Duration::from_secs(config.signal_ttl_seconds);
    let sweep_interval = Duration::from_secs(config.sweep_interval_seconds);
    let bind_address = config.bind_address.clone();

    // Create application state
    let state = Arc::new(AppState {
        mailboxes: Arc::new(MailboxRepository::new()),
        history: Arc::new(CallHistoryRepository::new()),
        config,
        metrics_handle,
    });

    // Start the stale-signal sweeper
    let cancel_token = CancellationToken::new();
    let sweeper_handle = tokio::spawn(tasks::run_signal_sweeper(
        Arc::clone(&state.mailboxes),
        signal_ttl,
        sweep_interval,
        cancel_token.clone(),
    ));

    // Build application routes
    let app = routes::build_routes(Arc::clone(&state));

    // Parse bind address
    let addr: SocketAddr = bind_address.parse().map_err(|e| {
        error!("Invalid bind address: {}", e);
        e
    })?;

    info!("Signaling Relay listening on {}", addr);

    // Start server with graceful shutdown support
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    // Stop the sweeper after the server stops accepting requests
    cancel_token.cancel();
    if let Err(e) = sweeper_handle.await {
        warn!("Sweeper task did not exit cleanly: {}", e);
    }

    info!("Signaling Relay shutdown complete");

    Ok(())
}

/// Listens for shutdown signals (SIGTERM, SIGINT).
/// Returns when a shutdown signal is received and drain period is complete.
async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Received SIGINT, starting graceful shutdown..."),
            Err(e) => error!("Failed to listen for SIGINT: {}", e),
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received SIGTERM, starting graceful shutdown...");
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    // Graceful shutdown drain period
    let drain_secs: u64 = std::env::var("RELAY_DRAIN_SECONDS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(5);

    if drain_secs > 0 {
        warn!("Draining connections for {} seconds...", drain_secs);
        tokio::time::sleep(Duration::from_secs(drain_secs)).await;
        info!("Drain period complete");
    } else {
        info!("Skipping drain period (RELAY_DRAIN_SECONDS=0)");
    }
}
