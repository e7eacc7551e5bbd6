//! Per-call actor task.
//!
//! Each active or pending call runs as one tokio task that owns the
//! media session for its lifetime. All communication goes through the
//! actor's command mailbox (`tokio::sync::mpsc`), with `oneshot` replies
//! for request/response commands; the poll loop is the sole producer of
//! inbound signals, the actor the sole consumer.
//!
//! Terminal transitions release the local tracks synchronously before
//! any network I/O, so device resources are never leaked even if the
//! remote party or the relay has gone away.

use crate::controller::CallEvent;
use crate::errors::CallError;
use crate::history::CallHistorySink;
use crate::media::{ConnectivityState, MediaEvent, MediaSession};
use crate::payload;
use crate::session::{CallSession, CallState};
use crate::transport::SignalTransport;
use chrono::Utc;
use common::types::{CallId, CallOutcome, CallRole};
use signal_protocol::{SendSignalRequest, SignalKind, SignalMessage};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Commands accepted by a `CallActor`.
#[derive(Debug)]
pub(crate) enum CallCommand {
    /// An inbound signal routed to this call by the controller.
    Signal(SignalMessage),

    /// Hang up. Idempotent: ending an already-terminal call just
    /// returns the final session.
    End {
        respond_to: oneshot::Sender<CallSession>,
    },

    /// Silently drop the session (glare loser): release media, no
    /// history record, no mailbox clear.
    Abandon,

    /// Flip the microphone track. Local effect only; no signaling.
    ToggleMute {
        respond_to: oneshot::Sender<Result<bool, CallError>>,
    },

    /// Flip the camera track. Local effect only; no signaling.
    ToggleVideo {
        respond_to: oneshot::Sender<Result<bool, CallError>>,
    },
}

/// Cheap cloneable handle to a running call actor.
#[derive(Clone)]
pub struct CallHandle {
    id: CallId,
    remote_party: String,
    cmd_tx: mpsc::UnboundedSender<CallCommand>,
    state_rx: watch::Receiver<CallSession>,
}

impl CallHandle {
    /// Local id of the call this handle controls.
    #[must_use]
    pub fn id(&self) -> CallId {
        self.id
    }

    /// Identity on the other side of the call.
    #[must_use]
    pub fn remote_party(&self) -> &str {
        &self.remote_party
    }

    /// Latest published session snapshot.
    #[must_use]
    pub fn current(&self) -> CallSession {
        self.state_rx.borrow().clone()
    }

    /// Subscribe to session snapshots.
    #[must_use]
    pub fn state_receiver(&self) -> watch::Receiver<CallSession> {
        self.state_rx.clone()
    }

    /// Wait until the session reaches a terminal state and return it.
    pub async fn wait_terminal(&self) -> CallSession {
        let mut rx = self.state_rx.clone();
        loop {
            {
                let session = rx.borrow_and_update();
                if session.state.is_terminal() {
                    return session.clone();
                }
            }
            if rx.changed().await.is_err() {
                return self.current();
            }
        }
    }

    /// Hang up. Safe to invoke from any state; a second call is a
    /// no-op that returns the already-final session.
    pub async fn end(&self) -> CallSession {
        let (respond_to, response) = oneshot::channel();
        if self.cmd_tx.send(CallCommand::End { respond_to }).is_ok() {
            if let Ok(session) = response.await {
                return session;
            }
        }
        // Actor already exited; the watch channel holds the final state.
        self.current()
    }

    /// Flip the microphone track; returns the new enabled state.
    pub async fn toggle_mute(&self) -> Result<bool, CallError> {
        let (respond_to, response) = oneshot::channel();
        self.cmd_tx
            .send(CallCommand::ToggleMute { respond_to })
            .map_err(|_| CallError::CallEnded)?;
        response.await.map_err(|_| CallError::CallEnded)?
    }

    /// Flip the camera track; returns the new enabled state.
    pub async fn toggle_video(&self) -> Result<bool, CallError> {
        let (respond_to, response) = oneshot::channel();
        self.cmd_tx
            .send(CallCommand::ToggleVideo { respond_to })
            .map_err(|_| CallError::CallEnded)?;
        response.await.map_err(|_| CallError::CallEnded)?
    }

    /// Route an inbound signal to the actor. Dropped if the actor has
    /// already exited (DeliveryGap).
    pub(crate) fn deliver_signal(&self, message: SignalMessage) {
        let _ = self.cmd_tx.send(CallCommand::Signal(message));
    }

    /// Glare resolution: drop the dial without recording history.
    pub(crate) fn abandon(&self) {
        let _ = self.cmd_tx.send(CallCommand::Abandon);
    }
}

/// The per-call task state.
pub(crate) struct CallActor {
    session: CallSession,
    media: Arc<dyn MediaSession>,
    transport: Arc<dyn SignalTransport>,
    history: Arc<dyn CallHistorySink>,
    events_tx: mpsc::UnboundedSender<CallEvent>,
    state_tx: watch::Sender<CallSession>,
    history_written: bool,
}

impl CallActor {
    /// Spawn the actor for a session already in `Dialing` or `Ringing`
    /// and return its handle.
    pub(crate) fn spawn(
        session: CallSession,
        media: Arc<dyn MediaSession>,
        transport: Arc<dyn SignalTransport>,
        history: Arc<dyn CallHistorySink>,
        events_tx: mpsc::UnboundedSender<CallEvent>,
        dial_timeout: Duration,
    ) -> CallHandle {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(session.clone());

        let handle = CallHandle {
            id: session.id,
            remote_party: session.remote_party.clone(),
            cmd_tx,
            state_rx,
        };

        let media_events = media.take_events();
        let actor = CallActor {
            session,
            media,
            transport,
            history,
            events_tx,
            state_tx,
            history_written: false,
        };

        tokio::spawn(actor.run(cmd_rx, media_events, dial_timeout));

        handle
    }

    async fn run(
        mut self,
        mut cmd_rx: mpsc::UnboundedReceiver<CallCommand>,
        mut media_events: Option<mpsc::UnboundedReceiver<MediaEvent>>,
        dial_timeout: Duration,
    ) {
        // Only the caller's dial is bounded; the callee's ring ends when
        // the caller gives up and the transport never connects.
        let dial_deadline = (self.session.role == CallRole::Caller
            && self.session.state == CallState::Dialing)
            .then(|| Instant::now() + dial_timeout);

        let mut media_open = media_events.is_some();

        loop {
            let dialing = self.session.state == CallState::Dialing;

            tokio::select! {
                cmd = cmd_rx.recv() => match cmd {
                    Some(cmd) => self.handle_command(cmd).await,
                    None => {
                        // Every handle dropped without an explicit end;
                        // tear down so devices are not leaked.
                        let outcome = self.session.teardown_outcome();
                        self.teardown(CallState::Ended, outcome, true).await;
                    }
                },
                event = recv_media(&mut media_events), if media_open => match event {
                    Some(event) => self.handle_media_event(event).await,
                    None => media_open = false,
                },
                () = sleep_until_deadline(dial_deadline), if dialing && dial_deadline.is_some() => {
                    info!(
                        target: "call.actor",
                        call_id = %self.session.id,
                        remote = %self.session.remote_party,
                        "Dial timed out with no answer"
                    );
                    self.teardown(CallState::Ended, CallOutcome::Missed, true).await;
                }
            }

            if self.session.state.is_terminal() {
                break;
            }
        }
    }

    async fn handle_command(&mut self, cmd: CallCommand) {
        match cmd {
            CallCommand::Signal(message) => self.handle_signal(message).await,
            CallCommand::End { respond_to } => {
                if !self.session.state.is_terminal() {
                    let outcome = self.session.teardown_outcome();
                    self.teardown(CallState::Ended, outcome, true).await;
                }
                let _ = respond_to.send(self.session.clone());
            }
            CallCommand::Abandon => {
                if !self.session.state.is_terminal() {
                    debug!(
                        target: "call.actor",
                        call_id = %self.session.id,
                        "Dial abandoned (superseded by inbound offer)"
                    );
                    let outcome = self.session.teardown_outcome();
                    self.teardown(CallState::Ended, outcome, false).await;
                }
            }
            CallCommand::ToggleMute { respond_to } => {
                let result = if self.session.state.is_terminal() {
                    Err(CallError::CallEnded)
                } else {
                    Ok(self.media.tracks().toggle_audio())
                };
                let _ = respond_to.send(result);
            }
            CallCommand::ToggleVideo { respond_to } => {
                let result = if self.session.state.is_terminal() {
                    Err(CallError::CallEnded)
                } else {
                    Ok(self.media.tracks().toggle_video())
                };
                let _ = respond_to.send(result);
            }
        }
    }

    async fn handle_signal(&mut self, message: SignalMessage) {
        match message.kind {
            SignalKind::Answer => self.handle_answer(message).await,
            SignalKind::Candidate => {
                if self.session.state.accepts_candidates() {
                    if let Err(e) = self.media.apply_candidate(&message.payload).await {
                        debug!(
                            target: "call.actor",
                            call_id = %self.session.id,
                            error = %e,
                            "Transport rejected remote candidate"
                        );
                    }
                } else {
                    debug!(
                        target: "call.actor",
                        call_id = %self.session.id,
                        "Candidate outside candidate window dropped"
                    );
                }
            }
            SignalKind::Offer => {
                // The controller already resolved glare; anything that
                // reaches the actor is a duplicate or late offer.
                debug!(
                    target: "call.actor",
                    call_id = %self.session.id,
                    from = %message.from,
                    "Duplicate offer for tracked session ignored"
                );
            }
        }
    }

    async fn handle_answer(&mut self, message: SignalMessage) {
        if self.session.state != CallState::Dialing || self.session.role != CallRole::Caller {
            debug!(
                target: "call.actor",
                call_id = %self.session.id,
                state = ?self.session.state,
                "Late or misdirected answer ignored"
            );
            return;
        }

        let description = match payload::parse_answer(&message.payload) {
            Ok(description) => description,
            Err(e) => {
                debug!(
                    target: "call.actor",
                    call_id = %self.session.id,
                    error = %e,
                    "Malformed answer payload ignored"
                );
                return;
            }
        };

        match self.media.apply_answer(&description).await {
            Ok(()) => self.transition_connected(),
            Err(e) => {
                warn!(
                    target: "call.actor",
                    call_id = %self.session.id,
                    error = %e,
                    "Applying answer failed"
                );
                self.teardown(CallState::Failed, CallOutcome::Missed, true)
                    .await;
            }
        }
    }

    async fn handle_media_event(&mut self, event: MediaEvent) {
        match event {
            MediaEvent::LocalCandidate(candidate) => {
                // Candidate exchange is suppressed once terminal.
                if self.session.state.is_terminal() {
                    return;
                }
                let request = SendSignalRequest {
                    from: self.session.local_party.clone(),
                    to: self.session.remote_party.clone(),
                    kind: SignalKind::Candidate,
                    payload: candidate,
                };
                if let Err(e) = self.transport.send(request).await {
                    warn!(
                        target: "call.actor",
                        call_id = %self.session.id,
                        error = %e,
                        "Failed to relay local candidate"
                    );
                }
            }
            MediaEvent::Connectivity(state) => self.handle_connectivity(state).await,
        }
    }

    async fn handle_connectivity(&mut self, state: ConnectivityState) {
        match state {
            ConnectivityState::Connected => {
                // The caller connects when the answer is applied; the
                // callee connects when the transport reports it.
                if self.session.state == CallState::Ringing {
                    self.transition_connected();
                }
            }
            ConnectivityState::Disconnected => match self.session.state {
                // Remote hangup: the other side tore its session down.
                CallState::Connected => {
                    self.teardown(CallState::Ended, CallOutcome::Completed, true)
                        .await;
                }
                CallState::Dialing | CallState::Ringing => {
                    self.teardown(CallState::Failed, CallOutcome::Missed, true)
                        .await;
                }
                _ => {}
            },
            ConnectivityState::Failed => {
                if !self.session.state.is_terminal() {
                    let outcome = if self.session.state == CallState::Connected {
                        CallOutcome::Completed
                    } else {
                        CallOutcome::Missed
                    };
                    self.teardown(CallState::Failed, outcome, true).await;
                }
            }
        }
    }

    fn transition_connected(&mut self) {
        self.session.state = CallState::Connected;
        self.session.connected_at = Some(Utc::now());
        info!(
            target: "call.actor",
            call_id = %self.session.id,
            remote = %self.session.remote_party,
            role = self.session.role.as_str(),
            "Call connected"
        );
        self.publish();
    }

    /// Move to a terminal state: release devices, optionally flush the
    /// mailbox and write the history record, publish the final snapshot.
    async fn teardown(&mut self, terminal: CallState, outcome: CallOutcome, write_history: bool) {
        if self.session.state.is_terminal() {
            return;
        }

        let was_connected = self.session.state == CallState::Connected;
        self.session.state = terminal;
        self.session.ended_at = Some(Utc::now());

        // Devices first; nothing below may delay the release.
        self.media.close();

        if was_connected {
            if let Err(e) = self.transport.clear(&self.session.local_party).await {
                debug!(
                    target: "call.actor",
                    call_id = %self.session.id,
                    error = %e,
                    "Mailbox clear failed at teardown"
                );
            }
        }

        if write_history && !self.history_written {
            self.history_written = true;
            let request = signal_protocol::RecordCallRequest {
                caller: self.session.caller().to_string(),
                recipient: self.session.recipient().to_string(),
                kind: self.session.kind,
                duration_seconds: self.session.duration_seconds(),
                outcome,
                started_at: Some(self.session.started_at),
            };
            if let Err(e) = self.history.record(request).await {
                warn!(
                    target: "call.actor",
                    call_id = %self.session.id,
                    error = %e,
                    "History write failed; record dropped"
                );
            }
        }

        info!(
            target: "call.actor",
            call_id = %self.session.id,
            remote = %self.session.remote_party,
            state = ?self.session.state,
            outcome = outcome.as_str(),
            duration_seconds = self.session.duration_seconds(),
            "Call ended"
        );
        self.publish();
    }

    fn publish(&self) {
        let _ = self.state_tx.send(self.session.clone());
        let _ = self.events_tx.send(CallEvent::StateChanged {
            call: self.session.clone(),
        });
    }
}

async fn recv_media(events: &mut Option<mpsc::UnboundedReceiver<MediaEvent>>) -> Option<MediaEvent> {
    match events {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

async fn sleep_until_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
