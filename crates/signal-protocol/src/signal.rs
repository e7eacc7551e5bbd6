//! Signaling message types.
//!
//! A signal is one unit of session-negotiation data (SDP offer, SDP
//! answer, or ICE candidate) exchanged between two call participants via
//! the relay's per-identity mailboxes. Payloads are opaque to the relay
//! and passed through unmodified.

use crate::error::ProtocolError;
use chrono::{DateTime, Utc};
use common::types::valid_identity;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Kind of signaling message.
///
/// Wire names match the relay contract: `offer`, `answer`,
/// `ice-candidate`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SignalKind {
    /// Caller's proposed session description.
    Offer,
    /// Callee's accepted/adjusted session description.
    Answer,
    /// A connectivity option for the underlying transport to attempt.
    #[serde(rename = "ice-candidate")]
    Candidate,
}

impl SignalKind {
    /// Returns the wire name of the kind.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            SignalKind::Offer => "offer",
            SignalKind::Answer => "answer",
            SignalKind::Candidate => "ice-candidate",
        }
    }
}

/// A stored signaling message, as returned by `GET /signal`.
///
/// Immutable once stored; the relay deletes it on delivery, it is never
/// updated in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalMessage {
    /// Sender identity.
    pub from: String,

    /// Recipient identity.
    pub to: String,

    /// Message kind.
    #[serde(rename = "type")]
    pub kind: SignalKind,

    /// Opaque session-description or candidate blob.
    #[serde(rename = "signal")]
    pub payload: Value,

    /// Monotonic sequence number assigned by the relay on receipt.
    /// Insertion order within one mailbox equals delivery order.
    pub seq: u64,

    /// Receipt timestamp assigned by the relay.
    pub created_at: DateTime<Utc>,
}

/// Body of `POST /signal`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendSignalRequest {
    /// Sender identity.
    pub from: String,

    /// Recipient identity.
    pub to: String,

    /// Message kind.
    #[serde(rename = "type")]
    pub kind: SignalKind,

    /// Opaque payload, forwarded verbatim.
    #[serde(rename = "signal")]
    pub payload: Value,
}

impl SendSignalRequest {
    /// Validate the structural invariants the relay enforces at its
    /// boundary: both identities non-empty. The payload is opaque and
    /// deliberately not inspected.
    pub fn validate(&self) -> Result<(), ProtocolError> {
        if !valid_identity(&self.from) {
            return Err(ProtocolError::InvalidMessage(
                "sender identity must be non-empty".to_string(),
            ));
        }
        if !valid_identity(&self.to) {
            return Err(ProtocolError::InvalidMessage(
                "recipient identity must be non-empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Acknowledgment body for a stored signal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendSignalAck {
    /// Sequence number the relay assigned to the stored message.
    pub seq: u64,
}

/// Response body for `GET /signal`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SignalBatch {
    /// Drained messages in FIFO order. Empty is a valid response.
    pub signals: Vec<SignalMessage>,
}
