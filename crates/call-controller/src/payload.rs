//! Client payload envelope for signaling messages.
//!
//! The relay treats payloads as opaque; the shape below is the contract
//! between Parley clients. Offers carry the call kind alongside the
//! session description so the callee knows which devices to acquire
//! before it ever touches the SDP. Candidates are forwarded raw.

use crate::errors::CallError;
use common::types::CallKind;
use serde_json::{json, Value};

/// Build an offer payload: call kind plus the proposed description.
#[must_use]
pub fn offer(kind: CallKind, description: &Value) -> Value {
    json!({
        "callType": kind.as_str(),
        "description": description,
    })
}

/// Build an answer payload wrapping the accepted description.
#[must_use]
pub fn answer(description: &Value) -> Value {
    json!({
        "description": description,
    })
}

/// Parse an offer payload into call kind and description.
pub fn parse_offer(payload: &Value) -> Result<(CallKind, Value), CallError> {
    let kind = match payload.get("callType").and_then(Value::as_str) {
        Some("video") => CallKind::Video,
        Some("voice") => CallKind::Voice,
        other => {
            return Err(CallError::InvalidSignal(format!(
                "offer payload has unrecognized callType {:?}",
                other
            )))
        }
    };

    let description = payload
        .get("description")
        .cloned()
        .ok_or_else(|| CallError::InvalidSignal("offer payload missing description".to_string()))?;

    Ok((kind, description))
}

/// Parse an answer payload into its description.
pub fn parse_answer(payload: &Value) -> Result<Value, CallError> {
    payload
        .get("description")
        .cloned()
        .ok_or_else(|| CallError::InvalidSignal("answer payload missing description".to_string()))
}
