//! Relay service models.
//!
//! Wire types shared with the client live in `signal-protocol`; these are
//! the relay-only response shapes.

use serde::{Deserialize, Serialize};

/// Readiness check response.
///
/// Returned by the `/ready` endpoint (readiness probe).
#[derive(Debug, Clone, Serialize)]
pub struct ReadinessResponse {
    /// Service readiness status ("ready" or "not_ready").
    pub status: &'static str,

    /// Relay instance identifier.
    pub relay_id: String,

    /// Undelivered signals currently queued across all mailboxes.
    pub mailbox_depth: usize,
}

/// Response body for `DELETE /signal`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClearSignalsResponse {
    /// Number of undelivered messages discarded.
    pub cleared: usize,
}

/// Query parameters naming the mailbox to operate on.
///
/// `username` is optional at the extractor level so a missing parameter
/// maps to the relay's 400 envelope instead of axum's default rejection.
#[derive(Debug, Clone, Deserialize)]
pub struct IdentityQuery {
    /// Mailbox identity.
    pub username: Option<String>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_readiness_response_serialization() {
        let ready = ReadinessResponse {
            status: "ready",
            relay_id: "relay-test-0001".to_string(),
            mailbox_depth: 3,
        };

        let json = serde_json::to_string(&ready).unwrap();
        assert!(json.contains("\"status\":\"ready\""));
        assert!(json.contains("\"relay_id\":\"relay-test-0001\""));
        assert!(json.contains("\"mailbox_depth\":3"));
    }

    #[test]
    fn test_identity_query_optional_username() {
        let query: IdentityQuery = serde_json::from_str("{}").unwrap();
        assert!(query.username.is_none());
    }
}
