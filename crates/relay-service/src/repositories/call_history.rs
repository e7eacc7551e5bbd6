//! Append-only call history store.
//!
//! History is best-effort by contract: writes always succeed here, and
//! records are never mutated after insertion.

use chrono::Utc;
use signal_protocol::{CallHistoryRecord, RecordCallRequest};
use std::sync::{Mutex, PoisonError};
use uuid::Uuid;

/// In-memory call history store.
pub struct CallHistoryRepository {
    records: Mutex<Vec<CallHistoryRecord>>,
}

impl CallHistoryRepository {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            records: Mutex::new(Vec::new()),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<CallHistoryRecord>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append one record, stamping `id` and, when the client omitted it,
    /// `started_at`.
    pub fn append(&self, request: RecordCallRequest) -> CallHistoryRecord {
        let record = CallHistoryRecord {
            id: Uuid::new_v4(),
            caller: request.caller,
            recipient: request.recipient,
            kind: request.kind,
            duration_seconds: request.duration_seconds,
            started_at: request.started_at.unwrap_or_else(Utc::now),
            outcome: request.outcome,
        };

        self.lock().push(record.clone());
        record
    }

    /// All records where `identity` is caller or recipient, newest first.
    pub fn list_for(&self, identity: &str) -> Vec<CallHistoryRecord> {
        self.lock()
            .iter()
            .rev()
            .filter(|record| record.caller == identity || record.recipient == identity)
            .cloned()
            .collect()
    }

    /// Total number of stored records.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether the store holds no records.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

impl Default for CallHistoryRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use chrono::Duration;
    use common::types::{CallKind, CallOutcome};

    fn request(caller: &str, recipient: &str, outcome: CallOutcome) -> RecordCallRequest {
        RecordCallRequest {
            caller: caller.to_string(),
            recipient: recipient.to_string(),
            kind: CallKind::Voice,
            duration_seconds: 30,
            outcome,
            started_at: None,
        }
    }

    #[test]
    fn test_append_stamps_id_and_started_at() {
        let repo = CallHistoryRepository::new();
        let before = Utc::now() - Duration::seconds(1);

        let record = repo.append(request("alice", "bob", CallOutcome::Completed));

        assert!(record.started_at >= before);
        assert_eq!(repo.len(), 1);
    }

    #[test]
    fn test_list_for_matches_either_side() {
        let repo = CallHistoryRepository::new();
        repo.append(request("alice", "bob", CallOutcome::Completed));
        repo.append(request("carol", "alice", CallOutcome::Missed));
        repo.append(request("carol", "dave", CallOutcome::Declined));

        let for_alice = repo.list_for("alice");
        assert_eq!(for_alice.len(), 2);
        let for_dave = repo.list_for("dave");
        assert_eq!(for_dave.len(), 1);
        assert!(repo.list_for("nobody").is_empty());
    }

    #[test]
    fn test_list_for_is_newest_first() {
        let repo = CallHistoryRepository::new();
        let first = repo.append(request("alice", "bob", CallOutcome::Missed));
        let second = repo.append(request("bob", "alice", CallOutcome::Completed));

        let listed = repo.list_for("alice");
        assert_eq!(listed.first().map(|r| r.id), Some(second.id));
        assert_eq!(listed.last().map(|r| r.id), Some(first.id));
    }

    #[test]
    fn test_client_supplied_started_at_is_kept() {
        let repo = CallHistoryRepository::new();
        let started = Utc::now() - Duration::minutes(5);
        let mut req = request("alice", "bob", CallOutcome::Completed);
        req.started_at = Some(started);

        let record = repo.append(req);
        assert_eq!(record.started_at, started);
    }
}
