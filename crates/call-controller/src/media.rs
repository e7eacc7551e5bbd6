//! Media capture and peer transport seams.
//!
//! Actual device capture, codec negotiation, and NAT traversal live in
//! an external media-session library; the controller only needs the
//! operations below. `MockMediaBackend` is the scripted implementation
//! used by the test suites.

use async_trait::async_trait;
use common::types::CallKind;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::mpsc;

/// Errors from the media layer.
#[derive(Debug, thiserror::Error)]
pub enum MediaError {
    /// Capture denied or absent (no camera/microphone, or the user
    /// refused the permission prompt).
    #[error("Media unavailable: {0}")]
    Unavailable(String),

    /// The peer session rejected a description or candidate.
    #[error("Media session error: {0}")]
    Session(String),
}

/// Connectivity state reported by the underlying peer transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectivityState {
    /// Media is flowing.
    Connected,
    /// The remote side went away.
    Disconnected,
    /// Negotiation or transport failed.
    Failed,
}

/// Events pushed up by the media session.
#[derive(Debug)]
pub enum MediaEvent {
    /// A new local connectivity candidate was discovered and should be
    /// relayed to the remote party.
    LocalCandidate(Value),

    /// The transport's connectivity state changed.
    Connectivity(ConnectivityState),
}

/// Local capture tracks for one call.
///
/// Mute/video toggles flip the `enabled` flags only; no signaling
/// message is sent for them. Tracks are released exactly once, on the
/// session's terminal transition.
#[derive(Debug)]
pub struct LocalTracks {
    audio_enabled: AtomicBool,
    video_enabled: AtomicBool,
    released: AtomicBool,
}

impl LocalTracks {
    /// Fresh tracks for a call of the given kind. Voice calls hold no
    /// live video track.
    #[must_use]
    pub fn new(kind: CallKind) -> Self {
        Self {
            audio_enabled: AtomicBool::new(true),
            video_enabled: AtomicBool::new(kind == CallKind::Video),
            released: AtomicBool::new(false),
        }
    }

    /// Whether the microphone track is currently enabled.
    pub fn audio_enabled(&self) -> bool {
        self.audio_enabled.load(Ordering::SeqCst)
    }

    /// Whether the camera track is currently enabled.
    pub fn video_enabled(&self) -> bool {
        self.video_enabled.load(Ordering::SeqCst)
    }

    /// Flip the microphone track; returns the new enabled state.
    pub fn toggle_audio(&self) -> bool {
        !self.audio_enabled.fetch_xor(true, Ordering::SeqCst)
    }

    /// Flip the camera track; returns the new enabled state.
    pub fn toggle_video(&self) -> bool {
        !self.video_enabled.fetch_xor(true, Ordering::SeqCst)
    }

    /// Release the capture. Returns true the first time, false after.
    pub fn release(&self) -> bool {
        !self.released.swap(true, Ordering::SeqCst)
    }

    /// Whether the capture has been released.
    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::SeqCst)
    }
}

/// One live peer media session: local tracks plus the peer transport.
#[async_trait]
pub trait MediaSession: Send + Sync {
    /// Produce the local session description for an outgoing call.
    async fn create_offer(&self) -> Result<Value, MediaError>;

    /// Apply a remote offer and produce the answering description.
    async fn create_answer(&self, offer: &Value) -> Result<Value, MediaError>;

    /// Apply the remote answer to a session that produced the offer.
    async fn apply_answer(&self, answer: &Value) -> Result<(), MediaError>;

    /// Feed a remote connectivity candidate to the transport.
    async fn apply_candidate(&self, candidate: &Value) -> Result<(), MediaError>;

    /// Take the session's event stream. Yields local candidates and
    /// connectivity updates; can be taken once.
    fn take_events(&self) -> Option<mpsc::UnboundedReceiver<MediaEvent>>;

    /// The local capture tracks owned by this session.
    fn tracks(&self) -> Arc<LocalTracks>;

    /// Tear down the peer transport and release the local tracks.
    /// Synchronous: device resources must not outlive the session even
    /// if the remote party never acknowledges the end.
    fn close(&self);
}

/// Factory for media sessions.
#[async_trait]
pub trait MediaBackend: Send + Sync {
    /// Acquire local capture for a call of the given kind and wrap it in
    /// a fresh peer session.
    async fn acquire(&self, kind: CallKind) -> Result<Arc<dyn MediaSession>, MediaError>;
}

// ============================================================================
// Mock implementation
// ============================================================================

/// Scripted media backend for tests.
///
/// Sessions record what was applied to them and let the test drive
/// connectivity transitions explicitly.
pub struct MockMediaBackend {
    fail_acquire: bool,
    sessions: Mutex<Vec<Arc<MockMediaSession>>>,
}

impl MockMediaBackend {
    /// Backend whose acquisitions always succeed.
    #[must_use]
    pub fn available() -> Self {
        Self {
            fail_acquire: false,
            sessions: Mutex::new(Vec::new()),
        }
    }

    /// Backend that refuses capture, as when the user denies the
    /// permission prompt.
    #[must_use]
    pub fn unavailable() -> Self {
        Self {
            fail_acquire: true,
            sessions: Mutex::new(Vec::new()),
        }
    }

    /// All sessions handed out so far, in acquisition order.
    pub fn sessions(&self) -> Vec<Arc<MockMediaSession>> {
        self.sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl MediaBackend for MockMediaBackend {
    async fn acquire(&self, kind: CallKind) -> Result<Arc<dyn MediaSession>, MediaError> {
        if self.fail_acquire {
            return Err(MediaError::Unavailable("capture denied".to_string()));
        }

        let session = Arc::new(MockMediaSession::new(kind));
        self.sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Arc::clone(&session));
        Ok(session)
    }
}

/// Scripted media session.
pub struct MockMediaSession {
    kind: CallKind,
    tracks: Arc<LocalTracks>,
    events_tx: mpsc::UnboundedSender<MediaEvent>,
    events_rx: Mutex<Option<mpsc::UnboundedReceiver<MediaEvent>>>,
    applied_answers: Mutex<Vec<Value>>,
    applied_candidates: Mutex<Vec<Value>>,
    closed: AtomicBool,
}

impl MockMediaSession {
    fn new(kind: CallKind) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            kind,
            tracks: Arc::new(LocalTracks::new(kind)),
            events_tx,
            events_rx: Mutex::new(Some(events_rx)),
            applied_answers: Mutex::new(Vec::new()),
            applied_candidates: Mutex::new(Vec::new()),
            closed: AtomicBool::new(false),
        }
    }

    /// Simulate the transport discovering a local candidate.
    pub fn emit_local_candidate(&self, candidate: Value) {
        let _ = self.events_tx.send(MediaEvent::LocalCandidate(candidate));
    }

    /// Simulate a connectivity state change.
    pub fn emit_connectivity(&self, state: ConnectivityState) {
        let _ = self.events_tx.send(MediaEvent::Connectivity(state));
    }

    /// Remote answers applied so far.
    pub fn applied_answers(&self) -> Vec<Value> {
        self.applied_answers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Remote candidates applied so far.
    pub fn applied_candidates(&self) -> Vec<Value> {
        self.applied_candidates
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Whether `close` has been called.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MediaSession for MockMediaSession {
    async fn create_offer(&self) -> Result<Value, MediaError> {
        Ok(json!({ "sdp": format!("mock-offer-{}", self.kind.as_str()), "type": "offer" }))
    }

    async fn create_answer(&self, offer: &Value) -> Result<Value, MediaError> {
        if offer.get("sdp").is_none() {
            return Err(MediaError::Session("offer missing sdp".to_string()));
        }
        Ok(json!({ "sdp": format!("mock-answer-{}", self.kind.as_str()), "type": "answer" }))
    }

    async fn apply_answer(&self, answer: &Value) -> Result<(), MediaError> {
        self.applied_answers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(answer.clone());
        Ok(())
    }

    async fn apply_candidate(&self, candidate: &Value) -> Result<(), MediaError> {
        self.applied_candidates
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(candidate.clone());
        Ok(())
    }

    fn take_events(&self) -> Option<mpsc::UnboundedReceiver<MediaEvent>> {
        self.events_rx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    fn tracks(&self) -> Arc<LocalTracks> {
        Arc::clone(&self.tracks)
    }

    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.tracks.release();
    }
}
