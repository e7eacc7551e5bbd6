//! Best-effort call history sink.
//!
//! History never blocks call teardown: the actor logs and swallows any
//! write failure. The relay keeps the authoritative list.

use async_trait::async_trait;
use reqwest::Client;
use signal_protocol::{CallHistoryList, CallHistoryRecord, RecordCallRequest};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tracing::{instrument, warn};

/// Default timeout for history requests in seconds.
const HISTORY_REQUEST_TIMEOUT_SECS: u64 = 10;

/// Errors from the history sink.
#[derive(Debug, thiserror::Error)]
pub enum HistoryError {
    /// The record could not be written.
    #[error("History write failed: {0}")]
    Write(String),

    /// The history list could not be fetched.
    #[error("History read failed: {0}")]
    Read(String),
}

/// Where terminated call attempts are recorded.
#[async_trait]
pub trait CallHistorySink: Send + Sync {
    /// Append one record.
    async fn record(&self, request: RecordCallRequest) -> Result<(), HistoryError>;
}

/// HTTP binding against the relay's `/calls` endpoints.
#[derive(Clone)]
pub struct HttpCallHistorySink {
    client: Client,
    base_url: String,
}

impl HttpCallHistorySink {
    /// Create a new sink against the given relay.
    ///
    /// # Errors
    ///
    /// Returns `HistoryError::Write` if the HTTP client cannot be built.
    pub fn new(base_url: impl Into<String>) -> Result<Self, HistoryError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(HISTORY_REQUEST_TIMEOUT_SECS))
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| {
                warn!(target: "call.history", error = %e, "Failed to build HTTP client");
                HistoryError::Write(e.to_string())
            })?;

        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    /// Fetch the history list for an identity, newest first. Used by
    /// the UI's history view, not by the state machine.
    #[instrument(skip(self))]
    pub async fn list_for(&self, identity: &str) -> Result<Vec<CallHistoryRecord>, HistoryError> {
        let url = format!("{}/calls", self.base_url);

        let response = self
            .client
            .get(&url)
            .query(&[("username", identity)])
            .send()
            .await
            .map_err(|e| HistoryError::Read(e.to_string()))?;

        if !response.status().is_success() {
            return Err(HistoryError::Read(format!(
                "relay returned {}",
                response.status()
            )));
        }

        let list: CallHistoryList = response
            .json()
            .await
            .map_err(|e| HistoryError::Read(format!("invalid history body: {}", e)))?;

        Ok(list.calls)
    }
}

#[async_trait]
impl CallHistorySink for HttpCallHistorySink {
    #[instrument(skip(self, request), fields(caller = %request.caller, recipient = %request.recipient))]
    async fn record(&self, request: RecordCallRequest) -> Result<(), HistoryError> {
        let url = format!("{}/calls", self.base_url);

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| HistoryError::Write(e.to_string()))?;

        if !response.status().is_success() {
            return Err(HistoryError::Write(format!(
                "relay returned {}",
                response.status()
            )));
        }

        Ok(())
    }
}

// ============================================================================
// Mock implementation
// ============================================================================

/// In-memory sink for tests; records everything it is handed.
pub struct MockCallHistorySink {
    records: Mutex<Vec<RecordCallRequest>>,
}

impl MockCallHistorySink {
    /// Empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self {
            records: Mutex::new(Vec::new()),
        }
    }

    /// Everything recorded so far, in write order.
    pub fn records(&self) -> Vec<RecordCallRequest> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Default for MockCallHistorySink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CallHistorySink for MockCallHistorySink {
    async fn record(&self, request: RecordCallRequest) -> Result<(), HistoryError> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request);
        Ok(())
    }
}
