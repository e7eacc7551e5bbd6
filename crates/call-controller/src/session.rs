//! Call session data and lifecycle states.
//!
//! A `CallSession` is one client's view of an in-progress or completed
//! call attempt. The wire carries no session id; the id below is local,
//! and inbound signals route by remote identity.

use chrono::{DateTime, Utc};
use common::types::{CallId, CallKind, CallOutcome, CallRole};
use serde::Serialize;

/// Lifecycle state of a call session.
///
/// Terminal states are `Ended` and `Failed`; every transition into one
/// of them releases the local media tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CallState {
    /// No negotiation has happened yet.
    Idle,
    /// Offer sent, waiting for the callee's answer.
    Dialing,
    /// Offer answered locally, waiting for the transport to connect.
    Ringing,
    /// Media is flowing; the duration timer is running.
    Connected,
    /// Terminated normally (hangup, timeout, decline).
    Ended,
    /// Terminated by a media/transport failure.
    Failed,
}

impl CallState {
    /// Whether the session has finished and discarded its resources.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, CallState::Ended | CallState::Failed)
    }

    /// Whether candidate exchange is still meaningful in this state.
    ///
    /// Candidates may legitimately arrive slightly before or after the
    /// answer, so every non-terminal in-call state accepts them.
    #[must_use]
    pub fn accepts_candidates(&self) -> bool {
        matches!(
            self,
            CallState::Dialing | CallState::Ringing | CallState::Connected
        )
    }
}

/// One client's view of a call attempt.
#[derive(Debug, Clone, Serialize)]
pub struct CallSession {
    /// Local identifier, generated at call start.
    pub id: CallId,

    /// The signed-in identity on this side.
    pub local_party: String,

    /// The identity on the other side.
    pub remote_party: String,

    /// Fixed at creation; never flips.
    pub role: CallRole,

    /// Voice or video.
    pub kind: CallKind,

    /// Current lifecycle state.
    pub state: CallState,

    /// When the attempt started.
    pub started_at: DateTime<Utc>,

    /// When the transport connected, if it ever did.
    pub connected_at: Option<DateTime<Utc>>,

    /// When the session reached a terminal state.
    pub ended_at: Option<DateTime<Utc>>,
}

impl CallSession {
    /// Fresh session in `Idle`.
    #[must_use]
    pub fn new(local_party: String, remote_party: String, role: CallRole, kind: CallKind) -> Self {
        Self {
            id: CallId::new(),
            local_party,
            remote_party,
            role,
            kind,
            state: CallState::Idle,
            started_at: Utc::now(),
            connected_at: None,
            ended_at: None,
        }
    }

    /// The identity that placed the call.
    #[must_use]
    pub fn caller(&self) -> &str {
        match self.role {
            CallRole::Caller => &self.local_party,
            CallRole::Callee => &self.remote_party,
        }
    }

    /// The identity that was called.
    #[must_use]
    pub fn recipient(&self) -> &str {
        match self.role {
            CallRole::Caller => &self.remote_party,
            CallRole::Callee => &self.local_party,
        }
    }

    /// Connected duration in whole seconds; zero if never connected.
    #[must_use]
    pub fn duration_seconds(&self) -> u64 {
        match (self.connected_at, self.ended_at) {
            (Some(connected), Some(ended)) => {
                u64::try_from((ended - connected).num_seconds()).unwrap_or(0)
            }
            _ => 0,
        }
    }

    /// The outcome a teardown from the current state records.
    ///
    /// A connected call completes; a call torn down before connecting
    /// was declined if this side is the callee walking away from its own
    /// ring, and missed otherwise (cancelled dial, timeout, failure).
    #[must_use]
    pub fn teardown_outcome(&self) -> CallOutcome {
        match (self.state, self.role) {
            (CallState::Connected, _) => CallOutcome::Completed,
            (CallState::Ringing, CallRole::Callee) => CallOutcome::Declined,
            _ => CallOutcome::Missed,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn session(role: CallRole) -> CallSession {
        CallSession::new(
            "alice".to_string(),
            "bob".to_string(),
            role,
            CallKind::Video,
        )
    }

    #[test]
    fn test_terminal_states() {
        assert!(CallState::Ended.is_terminal());
        assert!(CallState::Failed.is_terminal());
        assert!(!CallState::Connected.is_terminal());
        assert!(!CallState::Dialing.is_terminal());
    }

    #[test]
    fn test_candidate_window() {
        assert!(CallState::Dialing.accepts_candidates());
        assert!(CallState::Ringing.accepts_candidates());
        assert!(CallState::Connected.accepts_candidates());
        assert!(!CallState::Idle.accepts_candidates());
        assert!(!CallState::Ended.accepts_candidates());
    }

    #[test]
    fn test_caller_recipient_follow_role() {
        let as_caller = session(CallRole::Caller);
        assert_eq!(as_caller.caller(), "alice");
        assert_eq!(as_caller.recipient(), "bob");

        let as_callee = session(CallRole::Callee);
        assert_eq!(as_callee.caller(), "bob");
        assert_eq!(as_callee.recipient(), "alice");
    }

    #[test]
    fn test_duration_requires_connection() {
        let mut s = session(CallRole::Caller);
        assert_eq!(s.duration_seconds(), 0);

        let connected = Utc::now();
        s.connected_at = Some(connected);
        s.ended_at = Some(connected + Duration::seconds(42));
        assert_eq!(s.duration_seconds(), 42);
    }

    #[test]
    fn test_teardown_outcome() {
        let mut s = session(CallRole::Caller);
        s.state = CallState::Connected;
        assert_eq!(s.teardown_outcome(), CallOutcome::Completed);

        s.state = CallState::Dialing;
        assert_eq!(s.teardown_outcome(), CallOutcome::Missed);

        let mut callee = session(CallRole::Callee);
        callee.state = CallState::Ringing;
        assert_eq!(callee.teardown_outcome(), CallOutcome::Declined);
    }
}
