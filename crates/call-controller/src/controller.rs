//! The call session controller.
//!
//! One instance per signed-in identity. The identity is a constructor
//! parameter - never ambient state - so the core stays testable in
//! isolation. The controller routes inbound signals to the active call,
//! resolves glare, enforces the single-live-capture invariant, and
//! surfaces incoming calls and state changes to the UI through an event
//! channel.

use crate::actor::{CallActor, CallHandle};
use crate::config::ControllerConfig;
use crate::errors::CallError;
use crate::history::CallHistorySink;
use crate::media::MediaBackend;
use crate::payload;
use crate::session::{CallSession, CallState};
use crate::transport::{SignalTransport, TransportError};
use chrono::Utc;
use common::types::{valid_identity, CallKind, CallOutcome, CallRole};
use serde_json::Value;
use signal_protocol::{SendSignalRequest, SignalKind, SignalMessage};
use std::sync::{Arc, Mutex as StdMutex, PoisonError};
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info, instrument, warn};

/// Events surfaced to the UI collaborator.
#[derive(Debug)]
pub enum CallEvent {
    /// An offer was discovered in the mailbox. The UI answers with
    /// `accept_incoming` or `decline_incoming`.
    IncomingCall {
        /// The raw offer, passed back verbatim on accept/decline.
        offer: SignalMessage,
        /// Voice or video, parsed from the offer payload.
        kind: CallKind,
    },

    /// A tracked session changed state.
    StateChanged {
        /// Snapshot after the transition.
        call: CallSession,
    },
}

/// An offer the UI has not answered yet, with candidates that arrived
/// ahead of the accept.
struct PendingIncoming {
    offer: SignalMessage,
    candidates: Vec<Value>,
}

struct ControllerState {
    active: Option<CallHandle>,
    pending_incoming: Option<PendingIncoming>,
}

/// Client-side call controller for one signed-in identity.
pub struct CallController {
    identity: String,
    transport: Arc<dyn SignalTransport>,
    media: Arc<dyn MediaBackend>,
    history: Arc<dyn CallHistorySink>,
    config: ControllerConfig,
    events_tx: mpsc::UnboundedSender<CallEvent>,
    events_rx: StdMutex<Option<mpsc::UnboundedReceiver<CallEvent>>>,
    state: Mutex<ControllerState>,
}

impl CallController {
    /// Create a controller for `identity`.
    ///
    /// # Errors
    ///
    /// Returns `CallError::InvalidPeer` if the identity is not a usable
    /// mailbox key.
    pub fn new(
        identity: impl Into<String>,
        transport: Arc<dyn SignalTransport>,
        media: Arc<dyn MediaBackend>,
        history: Arc<dyn CallHistorySink>,
        config: ControllerConfig,
    ) -> Result<Self, CallError> {
        let identity = identity.into();
        if !valid_identity(&identity) {
            return Err(CallError::InvalidPeer);
        }

        let (events_tx, events_rx) = mpsc::unbounded_channel();

        Ok(Self {
            identity,
            transport,
            media,
            history,
            config,
            events_tx,
            events_rx: StdMutex::new(Some(events_rx)),
            state: Mutex::new(ControllerState {
                active: None,
                pending_incoming: None,
            }),
        })
    }

    /// The signed-in identity this controller polls for.
    #[must_use]
    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// Controller tunables.
    #[must_use]
    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    /// Take the UI event stream. Can be taken once.
    pub fn take_events(&self) -> Option<mpsc::UnboundedReceiver<CallEvent>> {
        self.events_rx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    /// The currently tracked call, if it has not reached a terminal
    /// state.
    pub async fn active_call(&self) -> Option<CallHandle> {
        let state = self.state.lock().await;
        state
            .active
            .as_ref()
            .filter(|handle| !handle.current().state.is_terminal())
            .cloned()
    }

    /// Place a call to `remote_party`.
    ///
    /// Acquires local capture, creates and posts the offer, and returns
    /// a handle to the dialing session.
    ///
    /// # Errors
    ///
    /// - `MediaUnavailable` if capture is denied; no signal is sent and
    ///   the session never leaves idle
    /// - `CallInProgress` if another call is live (one capture at a time)
    /// - `Transport` if the offer cannot be posted
    #[instrument(skip(self), fields(local = %self.identity))]
    pub async fn place_call(
        &self,
        remote_party: &str,
        kind: CallKind,
    ) -> Result<CallHandle, CallError> {
        if !valid_identity(remote_party) || remote_party == self.identity {
            return Err(CallError::InvalidPeer);
        }

        let mut state = self.state.lock().await;
        if state
            .active
            .as_ref()
            .is_some_and(|handle| !handle.current().state.is_terminal())
        {
            return Err(CallError::CallInProgress);
        }

        // Capture before any signal leaves this client; a denied
        // permission aborts with nothing on the wire.
        let media = self.media.acquire(kind).await?;

        let description = match media.create_offer().await {
            Ok(description) => description,
            Err(e) => {
                media.close();
                return Err(e.into());
            }
        };

        let request = SendSignalRequest {
            from: self.identity.clone(),
            to: remote_party.to_string(),
            kind: SignalKind::Offer,
            payload: payload::offer(kind, &description),
        };

        if let Err(e) = self.transport.send(request).await {
            media.close();
            return Err(e.into());
        }

        let mut session = CallSession::new(
            self.identity.clone(),
            remote_party.to_string(),
            CallRole::Caller,
            kind,
        );
        session.state = CallState::Dialing;

        info!(
            target: "call.controller",
            call_id = %session.id,
            remote = remote_party,
            kind = kind.as_str(),
            "Placing call"
        );

        let handle = CallActor::spawn(
            session,
            media,
            Arc::clone(&self.transport),
            Arc::clone(&self.history),
            self.events_tx.clone(),
            self.config.dial_timeout,
        );

        let _ = self.events_tx.send(CallEvent::StateChanged {
            call: handle.current(),
        });
        state.active = Some(handle.clone());

        Ok(handle)
    }

    /// Accept a discovered offer: acquire capture, apply any candidates
    /// that arrived ahead of the accept, post the answer, and return a
    /// handle to the ringing session.
    ///
    /// # Errors
    ///
    /// - `MediaUnavailable` if capture is denied; no signal is sent
    /// - `CallInProgress` if another call is live
    /// - `InvalidSignal` if the offer payload is malformed
    #[instrument(skip(self, offer), fields(local = %self.identity, from = %offer.from))]
    pub async fn accept_incoming(&self, offer: &SignalMessage) -> Result<CallHandle, CallError> {
        let mut state = self.state.lock().await;
        if state
            .active
            .as_ref()
            .is_some_and(|handle| !handle.current().state.is_terminal())
        {
            return Err(CallError::CallInProgress);
        }

        let pending_matches = state
            .pending_incoming
            .as_ref()
            .is_some_and(|pending| pending.offer.from == offer.from && pending.offer.seq == offer.seq);
        let buffered = if pending_matches {
            state
                .pending_incoming
                .take()
                .map(|pending| pending.candidates)
                .unwrap_or_default()
        } else {
            Vec::new()
        };

        let (kind, description) = payload::parse_offer(&offer.payload)?;

        let media = self.media.acquire(kind).await?;

        let answer_description = match media.create_answer(&description).await {
            Ok(description) => description,
            Err(e) => {
                media.close();
                return Err(e.into());
            }
        };

        // Candidates may legitimately arrive before the accept; feed the
        // buffered ones to the fresh session in arrival order.
        for candidate in &buffered {
            if let Err(e) = media.apply_candidate(candidate).await {
                debug!(
                    target: "call.controller",
                    error = %e,
                    "Buffered candidate rejected"
                );
            }
        }

        let request = SendSignalRequest {
            from: self.identity.clone(),
            to: offer.from.clone(),
            kind: SignalKind::Answer,
            payload: payload::answer(&answer_description),
        };

        if let Err(e) = self.transport.send(request).await {
            media.close();
            return Err(e.into());
        }

        let mut session = CallSession::new(
            self.identity.clone(),
            offer.from.clone(),
            CallRole::Callee,
            kind,
        );
        session.state = CallState::Ringing;

        info!(
            target: "call.controller",
            call_id = %session.id,
            caller = %offer.from,
            kind = kind.as_str(),
            "Accepted incoming call"
        );

        let handle = CallActor::spawn(
            session,
            media,
            Arc::clone(&self.transport),
            Arc::clone(&self.history),
            self.events_tx.clone(),
            self.config.dial_timeout,
        );

        let _ = self.events_tx.send(CallEvent::StateChanged {
            call: handle.current(),
        });
        state.active = Some(handle.clone());

        Ok(handle)
    }

    /// Reject a discovered offer. No signal is sent back (the caller's
    /// dial times out on its side); the declining side records the
    /// attempt, as the side that initiated teardown.
    #[instrument(skip(self, offer), fields(local = %self.identity, from = %offer.from))]
    pub async fn decline_incoming(&self, offer: &SignalMessage) {
        {
            let mut state = self.state.lock().await;
            let matches = state
                .pending_incoming
                .as_ref()
                .is_some_and(|pending| pending.offer.from == offer.from);
            if matches {
                state.pending_incoming = None;
            }
        }

        let kind = payload::parse_offer(&offer.payload)
            .map(|(kind, _)| kind)
            .unwrap_or(CallKind::Voice);

        let request = signal_protocol::RecordCallRequest {
            caller: offer.from.clone(),
            recipient: self.identity.clone(),
            kind,
            duration_seconds: 0,
            outcome: CallOutcome::Declined,
            started_at: Some(Utc::now()),
        };

        info!(
            target: "call.controller",
            caller = %offer.from,
            "Declined incoming call"
        );

        if let Err(e) = self.history.record(request).await {
            warn!(
                target: "call.controller",
                error = %e,
                "History write failed; declined record dropped"
            );
        }
    }

    /// Drain the mailbox once and run every discovered signal through
    /// the state machine. Returns how many signals were processed.
    pub async fn poll_once(&self) -> Result<usize, TransportError> {
        let signals = self.transport.poll(&self.identity).await?;
        let count = signals.len();
        for message in signals {
            self.handle_signal(message).await;
        }
        Ok(count)
    }

    /// Route one inbound signal.
    ///
    /// Offers open (or glare-resolve into) an incoming call; answers and
    /// candidates go to the active session; anything unroutable is a
    /// delivery gap, dropped silently.
    pub async fn handle_signal(&self, message: SignalMessage) {
        if message.to != self.identity {
            debug!(
                target: "call.controller",
                to = %message.to,
                "Misrouted signal dropped"
            );
            return;
        }

        match message.kind {
            SignalKind::Offer => self.handle_offer(message).await,
            SignalKind::Answer | SignalKind::Candidate => self.route_to_active(message).await,
        }
    }

    async fn handle_offer(&self, message: SignalMessage) {
        let kind = match payload::parse_offer(&message.payload) {
            Ok((kind, _)) => kind,
            Err(e) => {
                debug!(
                    target: "call.controller",
                    from = %message.from,
                    error = %e,
                    "Malformed offer dropped"
                );
                return;
            }
        };

        let mut state = self.state.lock().await;

        let mut supersede_dial = false;
        if let Some(active) = &state.active {
            let current = active.current();
            if !current.state.is_terminal() {
                if current.remote_party != message.from {
                    debug!(
                        target: "call.controller",
                        from = %message.from,
                        busy_with = %current.remote_party,
                        "Offer while busy with another party dropped"
                    );
                    return;
                }

                if current.state == CallState::Dialing && current.role == CallRole::Caller {
                    // Glare: both parties dialed each other. The
                    // lexicographically smaller identity's offer wins.
                    if glare_winner(&self.identity, &message.from) == self.identity {
                        debug!(
                            target: "call.controller",
                            from = %message.from,
                            "Glare: local offer wins, remote offer ignored"
                        );
                        return;
                    }
                    info!(
                        target: "call.controller",
                        from = %message.from,
                        "Glare: remote offer wins, abandoning local dial"
                    );
                    supersede_dial = true;
                } else {
                    debug!(
                        target: "call.controller",
                        from = %message.from,
                        "Duplicate offer for tracked session dropped"
                    );
                    return;
                }
            }
        }

        if supersede_dial {
            // Drop the controller's reference right away so the accept
            // path is not blocked while the actor winds down.
            if let Some(active) = state.active.take() {
                active.abandon();
            }
        }

        state.pending_incoming = Some(PendingIncoming {
            offer: message.clone(),
            candidates: Vec::new(),
        });

        let _ = self
            .events_tx
            .send(CallEvent::IncomingCall { offer: message, kind });
    }

    async fn route_to_active(&self, message: SignalMessage) {
        let mut state = self.state.lock().await;

        if let Some(active) = &state.active {
            let current = active.current();
            if !current.state.is_terminal() && current.remote_party == message.from {
                active.deliver_signal(message);
                return;
            }
        }

        // Candidates may outrun the accept: buffer them with the pending
        // offer they belong to.
        if message.kind == SignalKind::Candidate {
            if let Some(pending) = state.pending_incoming.as_mut() {
                if pending.offer.from == message.from {
                    pending.candidates.push(message.payload);
                    return;
                }
            }
        }

        debug!(
            target: "call.controller",
            from = %message.from,
            kind = message.kind.as_str(),
            "Unroutable signal dropped"
        );
    }
}

/// Deterministic glare tie-break: the lexicographically smaller identity
/// keeps its offer; the other side abandons its dial and rings instead.
#[must_use]
pub fn glare_winner<'a>(a: &'a str, b: &'a str) -> &'a str {
    if a <= b {
        a
    } else {
        b
    }
}
