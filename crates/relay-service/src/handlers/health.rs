//! Health check handlers.
//!
//! Provides health check endpoints for liveness and readiness probes.
//!
//! - `/health`: Liveness probe - returns OK if the process is running
//! - `/ready`: Readiness probe - reports instance id and mailbox depth

use crate::models::ReadinessResponse;
use crate::routes::AppState;
use axum::extract::State;
use axum::Json;
use std::sync::Arc;

/// Liveness probe handler.
///
/// Returns a simple "OK" response to indicate the process is running.
/// Does NOT inspect any state - failure means the process is hung.
pub async fn health_check() -> &'static str {
    "OK"
}

/// Readiness probe handler.
///
/// The relay has no external dependencies; readiness reports the
/// instance id and current queue depth so operators can see a relay
/// that is accumulating undrained mailboxes.
#[tracing::instrument(skip_all, name = "relay.health.readiness")]
pub async fn readiness_check(State(state): State<Arc<AppState>>) -> Json<ReadinessResponse> {
    Json(ReadinessResponse {
        status: "ready",
        relay_id: state.config.relay_id.clone(),
        mailbox_depth: state.mailboxes.total_depth(),
    })
}
