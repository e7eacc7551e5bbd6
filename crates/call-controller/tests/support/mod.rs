//! Shared fixtures for call-controller integration tests.

// Not every test binary uses every fixture.
#![allow(dead_code)]

use call_controller::{
    CallController, CallEvent, CallHandle, CallHistorySink, CallSession, CallState,
    ControllerConfig, MediaBackend, MockCallHistorySink, MockMediaBackend, MockSignalTransport,
    SignalTransport,
};
use common::types::CallKind;
use signal_protocol::SignalMessage;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// A controller wired to mocks, with direct access to all of them.
pub struct TestClient {
    pub controller: Arc<CallController>,
    pub media: Arc<MockMediaBackend>,
    pub history: Arc<MockCallHistorySink>,
    pub events: mpsc::UnboundedReceiver<CallEvent>,
}

/// Config with a dial timeout generous enough that handshakes never
/// trip it on a slow machine.
pub fn test_config() -> ControllerConfig {
    ControllerConfig {
        poll_interval: Duration::from_millis(50),
        dial_timeout: Duration::from_secs(5),
    }
}

/// Config with a short dial timeout for missed-call tests.
pub fn short_dial_config() -> ControllerConfig {
    ControllerConfig {
        poll_interval: Duration::from_millis(50),
        dial_timeout: Duration::from_millis(200),
    }
}

/// Build a controller for `identity` on a shared mock transport.
pub fn test_client(identity: &str, transport: &Arc<MockSignalTransport>) -> TestClient {
    test_client_with(identity, transport, test_config())
}

/// Build a controller with an explicit config.
pub fn test_client_with(
    identity: &str,
    transport: &Arc<MockSignalTransport>,
    config: ControllerConfig,
) -> TestClient {
    let media = Arc::new(MockMediaBackend::available());
    let history = Arc::new(MockCallHistorySink::new());
    let transport_dyn: Arc<dyn SignalTransport> = transport.clone();
    let media_dyn: Arc<dyn MediaBackend> = media.clone();
    let history_dyn: Arc<dyn CallHistorySink> = history.clone();
    let controller = Arc::new(
        CallController::new(identity, transport_dyn, media_dyn, history_dyn, config)
            .expect("controller should build"),
    );
    let events = controller.take_events().expect("events taken once");

    TestClient {
        controller,
        media,
        history,
        events,
    }
}

/// Wait until the handle publishes the target state.
pub async fn wait_for_state(
    handle: &CallHandle,
    target: CallState,
    timeout: Duration,
) -> CallSession {
    let deadline = tokio::time::Instant::now() + timeout;
    let mut rx = handle.state_receiver();
    loop {
        {
            let current = rx.borrow_and_update().clone();
            if current.state == target {
                return current;
            }
        }
        let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
        assert!(
            !remaining.is_zero(),
            "timed out waiting for state {:?}, current {:?}",
            target,
            handle.current().state
        );
        if tokio::time::timeout(remaining, rx.changed()).await.is_err() {
            let current = handle.current();
            assert!(
                current.state == target,
                "timed out waiting for state {:?}, current {:?}",
                target,
                current.state
            );
            return current;
        }
    }
}

/// Wait for the next `IncomingCall` event.
pub async fn wait_for_incoming(
    events: &mut mpsc::UnboundedReceiver<CallEvent>,
    timeout: Duration,
) -> (SignalMessage, CallKind) {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
        assert!(!remaining.is_zero(), "timed out waiting for incoming call");
        match tokio::time::timeout(remaining, events.recv()).await {
            Ok(Some(CallEvent::IncomingCall { offer, kind })) => return (offer, kind),
            Ok(Some(CallEvent::StateChanged { .. })) => {}
            Ok(None) => unreachable!("event channel closed while waiting for incoming call"),
            Err(_) => unreachable!("timed out waiting for incoming call"),
        }
    }
}
