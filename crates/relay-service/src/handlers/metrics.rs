//! Prometheus metrics exposition handler.

use crate::routes::AppState;
use axum::extract::State;
use std::sync::Arc;

/// Handler for GET /metrics
///
/// Renders the current metrics snapshot in Prometheus text exposition
/// format.
pub async fn metrics_handler(State(state): State<Arc<AppState>>) -> String {
    state.metrics_handle.render()
}
