//! Signal mailbox handlers.
//!
//! Implements the signaling endpoints:
//!
//! - `POST /signal` - append a signal to the recipient's mailbox
//! - `GET /signal?username=<identity>` - drain the identity's mailbox
//! - `DELETE /signal?username=<identity>` - discard the identity's mailbox
//!
//! Polling is destructive: a drain returns all queued messages in FIFO
//! order and empties the mailbox in the same repository critical section,
//! so a message is delivered to at most one poll.

use crate::errors::RelayError;
use crate::models::{ClearSignalsResponse, IdentityQuery};
use crate::observability::metrics;
use crate::routes::AppState;
use axum::{
    extract::{Query, State},
    Json,
};
use common::types::valid_identity;
use signal_protocol::{SendSignalAck, SendSignalRequest, SignalBatch};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, instrument};

/// Resolve the `username` query parameter or reject with 400.
fn require_identity(query: &IdentityQuery) -> Result<&str, RelayError> {
    match query.username.as_deref() {
        Some(identity) if valid_identity(identity) => Ok(identity),
        _ => Err(RelayError::BadRequest(
            "username query parameter is required".to_string(),
        )),
    }
}

/// Handler for POST /signal
///
/// Validates the envelope (non-empty identities, recognized kind) and
/// appends the signal to the recipient's mailbox with a server-assigned
/// sequence number and timestamp. There is no recipient existence check:
/// unknown recipients simply accumulate an unread mailbox until the
/// sweeper expires it.
///
/// # Response
///
/// - 200 OK: signal stored, body carries the assigned sequence number
/// - 400 Bad Request: malformed envelope; nothing is stored
#[instrument(skip_all, name = "relay.signal.send")]
pub async fn send_signal(
    State(state): State<Arc<AppState>>,
    body: axum::body::Bytes,
) -> Result<Json<SendSignalAck>, RelayError> {
    let start = Instant::now();

    // Deserialize manually so malformed bodies (including unknown signal
    // kinds) return 400, not axum's default 422.
    let request: SendSignalRequest = serde_json::from_slice(&body).map_err(|e| {
        debug!(target: "relay.handlers.signal", error = %e, "Invalid signal body");
        metrics::record_signal_rejected();
        RelayError::InvalidMessage("Invalid signal body".to_string())
    })?;

    request.validate().inspect_err(|_| {
        metrics::record_signal_rejected();
    })?;

    let kind = request.kind.as_str();
    let message = state.mailboxes.append(request);

    metrics::record_signal_stored(kind);
    metrics::update_mailbox_depth(state.mailboxes.total_depth());
    metrics::record_http_request("/signal", start.elapsed());

    info!(
        target: "relay.handlers.signal",
        from = %message.from,
        to = %message.to,
        kind,
        seq = message.seq,
        "Signal stored"
    );

    Ok(Json(SendSignalAck { seq: message.seq }))
}

/// Handler for GET /signal
///
/// Returns all queued messages for the identity in FIFO order and
/// atomically clears the mailbox. An empty batch is a valid response,
/// not an error.
#[instrument(skip_all, name = "relay.signal.poll")]
pub async fn poll_signals(
    State(state): State<Arc<AppState>>,
    Query(query): Query<IdentityQuery>,
) -> Result<Json<SignalBatch>, RelayError> {
    let start = Instant::now();
    let identity = require_identity(&query)?;

    let signals = state.mailboxes.drain(identity);

    metrics::record_poll(signals.len());
    metrics::update_mailbox_depth(state.mailboxes.total_depth());
    metrics::record_http_request("/signal", start.elapsed());

    if !signals.is_empty() {
        debug!(
            target: "relay.handlers.signal",
            identity,
            delivered = signals.len(),
            "Mailbox drained"
        );
    }

    Ok(Json(SignalBatch { signals }))
}

/// Handler for DELETE /signal
///
/// Explicit flush, used at session teardown to avoid acting on stale
/// signaling from a previous call attempt. Never fails for a valid
/// identity; clearing an absent mailbox reports zero discarded.
#[instrument(skip_all, name = "relay.signal.clear")]
pub async fn clear_signals(
    State(state): State<Arc<AppState>>,
    Query(query): Query<IdentityQuery>,
) -> Result<Json<ClearSignalsResponse>, RelayError> {
    let identity = require_identity(&query)?;

    let cleared = state.mailboxes.clear(identity);

    metrics::record_clear(cleared);
    metrics::update_mailbox_depth(state.mailboxes.total_depth());

    if cleared > 0 {
        debug!(
            target: "relay.handlers.signal",
            identity,
            cleared,
            "Mailbox cleared"
        );
    }

    Ok(Json(ClearSignalsResponse { cleared }))
}
