//! Signal transport seam and its HTTP binding.
//!
//! The state machine only ever sees `send`/`poll`/`clear`, so the
//! polling HTTP binding below can be replaced by a push-based one
//! without touching any call logic.

use async_trait::async_trait;
use reqwest::Client;
use signal_protocol::{SendSignalRequest, SignalBatch, SignalMessage};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tracing::{instrument, warn};

/// Default timeout for relay requests in seconds.
const RELAY_REQUEST_TIMEOUT_SECS: u64 = 10;

/// Errors from the signaling transport.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The relay could not be reached.
    #[error("Relay unreachable: {0}")]
    Unreachable(String),

    /// The relay answered with a non-success status.
    #[error("Relay rejected request: {0}")]
    Rejected(String),
}

/// Abstract Send/Poll/Clear transport to the signaling relay.
#[async_trait]
pub trait SignalTransport: Send + Sync {
    /// Deliver one signal to the recipient's mailbox.
    async fn send(&self, request: SendSignalRequest) -> Result<(), TransportError>;

    /// Drain the identity's mailbox. Destructive: messages are returned
    /// at most once.
    async fn poll(&self, identity: &str) -> Result<Vec<SignalMessage>, TransportError>;

    /// Discard everything queued for the identity.
    async fn clear(&self, identity: &str) -> Result<(), TransportError>;
}

/// HTTP binding against the relay's `/signal` endpoints.
#[derive(Clone)]
pub struct HttpSignalTransport {
    /// HTTP client with configured timeouts.
    client: Client,

    /// Base URL of the relay (e.g., "http://localhost:8080").
    base_url: String,
}

impl HttpSignalTransport {
    /// Create a new transport against the given relay.
    ///
    /// # Errors
    ///
    /// Returns `TransportError::Unreachable` if the HTTP client cannot
    /// be built.
    pub fn new(base_url: impl Into<String>) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(RELAY_REQUEST_TIMEOUT_SECS))
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| {
                warn!(target: "call.transport", error = %e, "Failed to build HTTP client");
                TransportError::Unreachable(e.to_string())
            })?;

        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    fn check_status(response: &reqwest::Response) -> Result<(), TransportError> {
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(TransportError::Rejected(format!(
                "relay returned {}",
                status
            )))
        }
    }
}

#[async_trait]
impl SignalTransport for HttpSignalTransport {
    #[instrument(skip(self, request), fields(to = %request.to, kind = request.kind.as_str()))]
    async fn send(&self, request: SendSignalRequest) -> Result<(), TransportError> {
        let url = format!("{}/signal", self.base_url);

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| TransportError::Unreachable(e.to_string()))?;

        Self::check_status(&response)
    }

    #[instrument(skip(self))]
    async fn poll(&self, identity: &str) -> Result<Vec<SignalMessage>, TransportError> {
        let url = format!("{}/signal", self.base_url);

        let response = self
            .client
            .get(&url)
            .query(&[("username", identity)])
            .send()
            .await
            .map_err(|e| TransportError::Unreachable(e.to_string()))?;

        Self::check_status(&response)?;

        let batch: SignalBatch = response
            .json()
            .await
            .map_err(|e| TransportError::Rejected(format!("invalid poll body: {}", e)))?;

        Ok(batch.signals)
    }

    #[instrument(skip(self))]
    async fn clear(&self, identity: &str) -> Result<(), TransportError> {
        let url = format!("{}/signal", self.base_url);

        let response = self
            .client
            .delete(&url)
            .query(&[("username", identity)])
            .send()
            .await
            .map_err(|e| TransportError::Unreachable(e.to_string()))?;

        Self::check_status(&response)
    }
}

// ============================================================================
// Mock implementation
// ============================================================================

/// In-memory transport for tests: a local mailbox map with the same
/// FIFO/consume-once semantics as the relay, plus a failure switch for
/// exercising the poll loop's retry path.
pub struct MockSignalTransport {
    boxes: Mutex<HashMap<String, VecDeque<SignalMessage>>>,
    next_seq: Mutex<u64>,
    fail: AtomicBool,
}

impl MockSignalTransport {
    /// Empty transport.
    #[must_use]
    pub fn new() -> Self {
        Self {
            boxes: Mutex::new(HashMap::new()),
            next_seq: Mutex::new(0),
            fail: AtomicBool::new(false),
        }
    }

    /// Make every subsequent operation fail (until switched back).
    pub fn set_failing(&self, failing: bool) {
        self.fail.store(failing, Ordering::SeqCst);
    }

    fn check_failing(&self) -> Result<(), TransportError> {
        if self.fail.load(Ordering::SeqCst) {
            Err(TransportError::Unreachable(
                "mock transport failing".to_string(),
            ))
        } else {
            Ok(())
        }
    }

    /// Messages currently queued for an identity (non-destructive peek).
    pub fn queued_for(&self, identity: &str) -> Vec<SignalMessage> {
        self.boxes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(identity)
            .map(|queue| queue.iter().cloned().collect())
            .unwrap_or_default()
    }
}

impl Default for MockSignalTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SignalTransport for MockSignalTransport {
    async fn send(&self, request: SendSignalRequest) -> Result<(), TransportError> {
        self.check_failing()?;

        let seq = {
            let mut next = self.next_seq.lock().unwrap_or_else(PoisonError::into_inner);
            let seq = *next;
            *next += 1;
            seq
        };

        let message = SignalMessage {
            from: request.from,
            to: request.to,
            kind: request.kind,
            payload: request.payload,
            seq,
            created_at: chrono::Utc::now(),
        };

        self.boxes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(message.to.clone())
            .or_default()
            .push_back(message);

        Ok(())
    }

    async fn poll(&self, identity: &str) -> Result<Vec<SignalMessage>, TransportError> {
        self.check_failing()?;

        Ok(self
            .boxes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(identity)
            .map(Into::into)
            .unwrap_or_default())
    }

    async fn clear(&self, identity: &str) -> Result<(), TransportError> {
        self.check_failing()?;

        self.boxes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(identity);
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;
    use signal_protocol::SignalKind;

    fn request(from: &str, to: &str) -> SendSignalRequest {
        SendSignalRequest {
            from: from.to_string(),
            to: to.to_string(),
            kind: SignalKind::Offer,
            payload: json!({}),
        }
    }

    #[tokio::test]
    async fn test_mock_transport_is_consume_once() {
        let transport = MockSignalTransport::new();
        transport.send(request("alice", "bob")).await.unwrap();

        assert_eq!(transport.poll("bob").await.unwrap().len(), 1);
        assert!(transport.poll("bob").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_mock_transport_failure_switch() {
        let transport = MockSignalTransport::new();
        transport.set_failing(true);
        assert!(transport.poll("bob").await.is_err());
        assert!(transport.send(request("alice", "bob")).await.is_err());

        transport.set_failing(false);
        transport.send(request("alice", "bob")).await.unwrap();
        assert_eq!(transport.queued_for("bob").len(), 1);
    }
}
