//! Common data types for Parley components.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a call session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CallId(pub Uuid);

impl CallId {
    /// Create a new random call ID
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for CallId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for CallId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Kind of call media.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallKind {
    /// Audio only.
    Voice,
    /// Audio and video.
    Video,
}

impl CallKind {
    /// Returns the string representation of the kind.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            CallKind::Voice => "voice",
            CallKind::Video => "video",
        }
    }
}

/// Which side of the call this controller is.
///
/// Exactly one side of a completed session is the caller (it sent the
/// first offer); the role never flips for the lifetime of the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallRole {
    /// Initiated the call and sent the offer.
    Caller,
    /// Received the offer and sent the answer.
    Callee,
}

impl CallRole {
    /// Returns the string representation of the role.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            CallRole::Caller => "caller",
            CallRole::Callee => "callee",
        }
    }
}

/// Final outcome of a terminated call attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallOutcome {
    /// The call connected and was hung up normally.
    Completed,
    /// The callee never answered within the dial window.
    Missed,
    /// The callee explicitly rejected the call.
    Declined,
}

impl CallOutcome {
    /// Returns the string representation of the outcome.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            CallOutcome::Completed => "completed",
            CallOutcome::Missed => "missed",
            CallOutcome::Declined => "declined",
        }
    }
}

/// Whether a string is usable as a mailbox identity.
///
/// Identities are opaque usernames supplied by the identity provider;
/// the only structural requirement is that they are non-empty after
/// trimming whitespace.
#[must_use]
pub fn valid_identity(identity: &str) -> bool {
    !identity.trim().is_empty()
}
