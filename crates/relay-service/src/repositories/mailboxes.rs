//! Per-identity signal mailboxes.
//!
//! The mailbox map is the only state shared between call participants.
//! Every operation takes the single store lock for its whole duration,
//! so sends, drains, and clears against the same mailbox never observe
//! partial state.
//!
//! Delivery contract:
//! - insertion order within one mailbox equals delivery order (FIFO)
//! - polling is destructive: a message survives at most one drain
//! - mailboxes are created implicitly on first send, with no recipient
//!   existence check

use chrono::{DateTime, Utc};
use signal_protocol::{SendSignalRequest, SignalMessage};
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, PoisonError};

/// In-memory mailbox store.
pub struct MailboxRepository {
    inner: Mutex<MailboxState>,
}

struct MailboxState {
    /// Next sequence number; monotonic across the whole relay process.
    next_seq: u64,
    boxes: HashMap<String, VecDeque<SignalMessage>>,
}

impl MailboxRepository {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(MailboxState {
                next_seq: 0,
                boxes: HashMap::new(),
            }),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MailboxState> {
        // A poisoned lock only means another thread panicked mid-append;
        // the queue itself is always left structurally intact.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append a validated signal to the recipient's mailbox.
    ///
    /// Assigns the server-side `seq` and `created_at` and returns the
    /// stored message.
    pub fn append(&self, request: SendSignalRequest) -> SignalMessage {
        let mut state = self.lock();
        let seq = state.next_seq;
        state.next_seq += 1;

        let message = SignalMessage {
            from: request.from,
            to: request.to,
            kind: request.kind,
            payload: request.payload,
            seq,
            created_at: Utc::now(),
        };

        state
            .boxes
            .entry(message.to.clone())
            .or_default()
            .push_back(message.clone());

        message
    }

    /// Drain the mailbox for `identity`: return all queued messages in
    /// FIFO order and clear the mailbox in the same critical section.
    pub fn drain(&self, identity: &str) -> Vec<SignalMessage> {
        let mut state = self.lock();
        match state.boxes.remove(identity) {
            Some(queue) => queue.into(),
            None => Vec::new(),
        }
    }

    /// Discard all queued messages for `identity`.
    ///
    /// Returns the number of messages dropped. Clearing an absent
    /// mailbox is a no-op, not an error.
    pub fn clear(&self, identity: &str) -> usize {
        let mut state = self.lock();
        state.boxes.remove(identity).map_or(0, |queue| queue.len())
    }

    /// Drop every stored message older than `cutoff`, across all
    /// mailboxes. Surviving messages keep their relative order. Empty
    /// mailboxes are pruned from the map.
    ///
    /// Returns the number of messages dropped.
    pub fn sweep_older_than(&self, cutoff: DateTime<Utc>) -> usize {
        let mut state = self.lock();
        let mut swept = 0;

        for queue in state.boxes.values_mut() {
            let before = queue.len();
            queue.retain(|message| message.created_at >= cutoff);
            swept += before - queue.len();
        }

        state.boxes.retain(|_, queue| !queue.is_empty());
        swept
    }

    /// Total number of undelivered messages across all mailboxes.
    pub fn total_depth(&self) -> usize {
        self.lock().boxes.values().map(VecDeque::len).sum()
    }
}

impl Default for MailboxRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use chrono::Duration;
    use serde_json::json;
    use signal_protocol::SignalKind;

    fn request(from: &str, to: &str, kind: SignalKind, marker: u64) -> SendSignalRequest {
        SendSignalRequest {
            from: from.to_string(),
            to: to.to_string(),
            kind,
            payload: json!({ "marker": marker }),
        }
    }

    #[test]
    fn test_poll_returns_fifo_order() {
        let repo = MailboxRepository::new();
        repo.append(request("alice", "bob", SignalKind::Offer, 1));
        repo.append(request("alice", "bob", SignalKind::Candidate, 2));
        repo.append(request("carol", "bob", SignalKind::Candidate, 3));

        let drained = repo.drain("bob");
        assert_eq!(drained.len(), 3);
        let markers: Vec<u64> = drained
            .iter()
            .map(|m| m.payload["marker"].as_u64().unwrap())
            .collect();
        assert_eq!(markers, vec![1, 2, 3]);

        let seqs: Vec<u64> = drained.iter().map(|m| m.seq).collect();
        let mut sorted = seqs.clone();
        sorted.sort_unstable();
        assert_eq!(seqs, sorted);
    }

    #[test]
    fn test_poll_is_destructive() {
        let repo = MailboxRepository::new();
        repo.append(request("alice", "bob", SignalKind::Offer, 1));

        assert_eq!(repo.drain("bob").len(), 1);
        assert!(repo.drain("bob").is_empty());
    }

    #[test]
    fn test_mailboxes_are_isolated() {
        let repo = MailboxRepository::new();
        repo.append(request("alice", "bob", SignalKind::Offer, 1));
        repo.append(request("bob", "alice", SignalKind::Answer, 2));

        assert_eq!(repo.drain("alice").len(), 1);
        assert_eq!(repo.drain("bob").len(), 1);
    }

    #[test]
    fn test_clear_drops_without_delivering() {
        let repo = MailboxRepository::new();
        repo.append(request("alice", "bob", SignalKind::Candidate, 1));
        repo.append(request("alice", "bob", SignalKind::Candidate, 2));

        assert_eq!(repo.clear("bob"), 2);
        assert!(repo.drain("bob").is_empty());
        assert_eq!(repo.clear("bob"), 0);
        assert_eq!(repo.clear("nobody"), 0);
    }

    #[test]
    fn test_sweep_drops_only_stale_messages() {
        let repo = MailboxRepository::new();
        let stale = repo.append(request("alice", "bob", SignalKind::Offer, 1));
        repo.append(request("alice", "bob", SignalKind::Candidate, 2));

        // Everything is younger than a cutoff in the past.
        assert_eq!(repo.sweep_older_than(stale.created_at - Duration::seconds(1)), 0);

        // A cutoff after the first message drops exactly the first one.
        let cutoff = stale.created_at + Duration::microseconds(1);
        let swept = repo.sweep_older_than(cutoff);
        assert!(swept <= 2);
        let remaining = repo.drain("bob");
        assert_eq!(swept + remaining.len(), 2);
    }

    #[test]
    fn test_total_depth_counts_all_mailboxes() {
        let repo = MailboxRepository::new();
        assert_eq!(repo.total_depth(), 0);
        repo.append(request("alice", "bob", SignalKind::Offer, 1));
        repo.append(request("bob", "alice", SignalKind::Answer, 2));
        assert_eq!(repo.total_depth(), 2);
        repo.drain("bob");
        assert_eq!(repo.total_depth(), 1);
    }

    #[test]
    fn test_seq_is_monotonic_across_mailboxes() {
        let repo = MailboxRepository::new();
        let first = repo.append(request("alice", "bob", SignalKind::Offer, 1));
        let second = repo.append(request("carol", "dave", SignalKind::Offer, 2));
        assert!(second.seq > first.seq);
    }
}
