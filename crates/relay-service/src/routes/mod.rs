//! HTTP routes for the relay service.
//!
//! Defines the Axum router and application state.

use crate::config::Config;
use crate::handlers;
use crate::repositories::{CallHistoryRepository, MailboxRepository};
use axum::{
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

/// Application state shared across all handlers.
///
/// The repositories are `Arc`ed so background tasks (the sweeper) can
/// share them with the handlers.
pub struct AppState {
    /// Per-identity signal mailboxes.
    pub mailboxes: Arc<MailboxRepository>,

    /// Append-only call history.
    pub history: Arc<CallHistoryRepository>,

    /// Service configuration.
    pub config: Config,

    /// Handle for rendering the Prometheus snapshot.
    pub metrics_handle: PrometheusHandle,
}

/// Build the application routes.
///
/// Creates an Axum router with:
/// - `/signal` - send (POST), destructive poll (GET), flush (DELETE)
/// - `/calls` - record (POST), list (GET)
/// - `/health`, `/ready`, `/metrics` - probes and metrics exposition
/// - TraceLayer for request logging
/// - 30 second request timeout
pub fn build_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route(
            "/signal",
            post(handlers::send_signal)
                .get(handlers::poll_signals)
                .delete(handlers::clear_signals),
        )
        .route(
            "/calls",
            post(handlers::record_call).get(handlers::list_calls),
        )
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .route("/metrics", get(handlers::metrics_handler))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(30)))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_build_routes_accepts_fresh_state() {
        let config = Config::from_vars(&HashMap::new()).expect("default config loads");
        let handle = metrics_exporter_prometheus::PrometheusBuilder::new()
            .build_recorder()
            .handle();
        let state = Arc::new(AppState {
            mailboxes: Arc::new(MailboxRepository::new()),
            history: Arc::new(CallHistoryRepository::new()),
            config,
            metrics_handle: handle,
        });

        // Router construction itself exercises route/method registration.
        let _router = build_routes(state);
    }
}
