//! Call history handlers.
//!
//! Implements the history endpoints:
//!
//! - `POST /calls` - append one record for a terminated call attempt
//! - `GET /calls?username=<identity>` - list records involving an identity

use crate::errors::RelayError;
use crate::models::IdentityQuery;
use crate::observability::metrics;
use crate::routes::AppState;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use common::types::valid_identity;
use signal_protocol::{CallHistoryList, CallHistoryRecord, RecordCallRequest};
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Handler for POST /calls
///
/// Appends one history record. The relay stamps the record id and, when
/// the client omitted it, the start timestamp.
///
/// # Response
///
/// - 201 Created: record stored, body carries the stored record
/// - 400 Bad Request: malformed body; nothing is stored
#[instrument(skip_all, name = "relay.calls.record")]
pub async fn record_call(
    State(state): State<Arc<AppState>>,
    body: axum::body::Bytes,
) -> Result<(StatusCode, Json<CallHistoryRecord>), RelayError> {
    let request: RecordCallRequest = serde_json::from_slice(&body).map_err(|e| {
        debug!(target: "relay.handlers.calls", error = %e, "Invalid call record body");
        RelayError::InvalidMessage("Invalid call record body".to_string())
    })?;

    request.validate()?;

    let outcome = request.outcome.as_str();
    let record = state.history.append(request);

    metrics::record_history_write(outcome);

    info!(
        target: "relay.handlers.calls",
        caller = %record.caller,
        recipient = %record.recipient,
        outcome,
        duration_seconds = record.duration_seconds,
        "Call record stored"
    );

    Ok((StatusCode::CREATED, Json(record)))
}

/// Handler for GET /calls
///
/// Returns every record where the identity is caller or recipient,
/// newest first. No pagination at this scale.
#[instrument(skip_all, name = "relay.calls.list")]
pub async fn list_calls(
    State(state): State<Arc<AppState>>,
    Query(query): Query<IdentityQuery>,
) -> Result<Json<CallHistoryList>, RelayError> {
    let identity = match query.username.as_deref() {
        Some(identity) if valid_identity(identity) => identity,
        _ => {
            return Err(RelayError::BadRequest(
                "username query parameter is required".to_string(),
            ))
        }
    };

    let calls = state.history.list_for(identity);

    Ok(Json(CallHistoryList { calls }))
}
