//! Call history wire types.
//!
//! One record is appended per terminated call attempt, by whichever side
//! initiated teardown. Records are append-only and never mutated.

use crate::error::ProtocolError;
use chrono::{DateTime, Utc};
use common::types::{valid_identity, CallKind, CallOutcome};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A completed call attempt, as stored and listed by the relay.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallHistoryRecord {
    /// Unique record identifier.
    pub id: Uuid,

    /// Identity that placed the call.
    pub caller: String,

    /// Identity that was called.
    pub recipient: String,

    /// Voice or video.
    #[serde(rename = "type")]
    pub kind: CallKind,

    /// Connected duration in seconds; zero for calls that never connected.
    #[serde(rename = "duration")]
    pub duration_seconds: u64,

    /// When the call attempt started.
    pub started_at: DateTime<Utc>,

    /// How the attempt ended.
    #[serde(rename = "status")]
    pub outcome: CallOutcome,
}

/// Body of `POST /calls`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordCallRequest {
    /// Identity that placed the call.
    pub caller: String,

    /// Identity that was called.
    pub recipient: String,

    /// Voice or video.
    #[serde(rename = "type")]
    pub kind: CallKind,

    /// Connected duration in seconds.
    #[serde(rename = "duration")]
    pub duration_seconds: u64,

    /// How the attempt ended.
    #[serde(rename = "status")]
    pub outcome: CallOutcome,

    /// When the attempt started. Optional on the wire; the relay stamps
    /// receipt time when absent so client clock skew cannot reorder the
    /// history list.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
}

impl RecordCallRequest {
    /// Validate participant identities.
    pub fn validate(&self) -> Result<(), ProtocolError> {
        if !valid_identity(&self.caller) {
            return Err(ProtocolError::InvalidMessage(
                "caller identity must be non-empty".to_string(),
            ));
        }
        if !valid_identity(&self.recipient) {
            return Err(ProtocolError::InvalidMessage(
                "recipient identity must be non-empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Response body for `GET /calls`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CallHistoryList {
    /// Matching records, newest first.
    pub calls: Vec<CallHistoryRecord>,
}
