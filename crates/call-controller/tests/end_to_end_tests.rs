//! End-to-end call flow against a real in-process relay.
//!
//! Uses the HTTP transport and history bindings against
//! `TestRelayServer`, with the poll loops running on their real
//! fixed-interval schedule.

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod support;

use call_controller::{
    tasks, CallController, CallHistorySink, CallState, ConnectivityState, ControllerConfig,
    HttpCallHistorySink, HttpSignalTransport, MediaBackend, MediaSession, MockMediaBackend,
    SignalTransport,
};
use common::types::CallKind;
use relay_test_utils::TestRelayServer;
use std::sync::Arc;
use std::time::Duration;
use support::{wait_for_incoming, wait_for_state};
use tokio_util::sync::CancellationToken;

const WAIT: Duration = Duration::from_secs(5);

struct E2eClient {
    controller: Arc<CallController>,
    media: Arc<MockMediaBackend>,
    events: tokio::sync::mpsc::UnboundedReceiver<call_controller::CallEvent>,
    cancel: CancellationToken,
}

fn e2e_client(identity: &str, relay_url: &str) -> E2eClient {
    let transport: Arc<dyn SignalTransport> =
        Arc::new(HttpSignalTransport::new(relay_url).expect("transport"));
    let history: Arc<dyn CallHistorySink> =
        Arc::new(HttpCallHistorySink::new(relay_url).expect("history"));
    let media = Arc::new(MockMediaBackend::available());
    let media_dyn: Arc<dyn MediaBackend> = media.clone();

    let config = ControllerConfig {
        poll_interval: Duration::from_millis(50),
        dial_timeout: Duration::from_secs(10),
    };

    let controller = Arc::new(
        CallController::new(identity, transport, media_dyn, history, config)
            .expect("controller should build"),
    );
    let events = controller.take_events().expect("events taken once");

    // Real recurring poll task, as the client runs it.
    let cancel = CancellationToken::new();
    tokio::spawn(tasks::run_mailbox_poll(
        Arc::clone(&controller),
        cancel.clone(),
    ));

    E2eClient {
        controller,
        media,
        events,
        cancel,
    }
}

#[tokio::test]
async fn test_video_call_end_to_end() {
    let server = TestRelayServer::spawn().await.expect("relay");

    let alice = e2e_client("alice", &server.url());
    let mut bob = e2e_client("bob", &server.url());

    // Alice dials; her offer travels through the real relay.
    let alice_call = alice
        .controller
        .place_call("bob", CallKind::Video)
        .await
        .expect("alice dials");

    // Bob's poll loop discovers the offer.
    let (offer, kind) = wait_for_incoming(&mut bob.events, WAIT).await;
    assert_eq!(offer.from, "alice");
    assert_eq!(kind, CallKind::Video);

    let bob_call = bob
        .controller
        .accept_incoming(&offer)
        .await
        .expect("bob answers");

    // Alice's poll loop finds the answer and connects her side.
    wait_for_state(&alice_call, CallState::Connected, WAIT).await;

    // Bob's transport comes up.
    bob.media
        .sessions()
        .first()
        .unwrap()
        .emit_connectivity(ConnectivityState::Connected);
    wait_for_state(&bob_call, CallState::Connected, WAIT).await;

    // Candidates round-trip through the relay in both directions.
    alice
        .media
        .sessions()
        .first()
        .unwrap()
        .emit_local_candidate(serde_json::json!({"candidate": "host 192.0.2.1 udp"}));
    bob.media
        .sessions()
        .first()
        .unwrap()
        .emit_local_candidate(serde_json::json!({"candidate": "host 198.51.100.7 udp"}));

    let deadline = tokio::time::Instant::now() + WAIT;
    loop {
        let alice_got = !alice
            .media
            .sessions()
            .first()
            .unwrap()
            .applied_candidates()
            .is_empty();
        let bob_got = !bob
            .media
            .sessions()
            .first()
            .unwrap()
            .applied_candidates()
            .is_empty();
        if alice_got && bob_got {
            break;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "candidates did not round-trip"
        );
        tokio::time::sleep(Duration::from_millis(25)).await;
    }

    // Alice hangs up; her record lands on the relay.
    let ended = alice_call.end().await;
    assert_eq!(ended.state, CallState::Ended);
    assert!(alice.media.sessions().first().unwrap().tracks().is_released());

    let history = HttpCallHistorySink::new(server.url()).expect("history client");
    let deadline = tokio::time::Instant::now() + WAIT;
    loop {
        let calls = history.list_for("alice").await.expect("list");
        if !calls.is_empty() {
            let record = calls.first().unwrap();
            assert_eq!(record.caller, "alice");
            assert_eq!(record.recipient, "bob");
            assert_eq!(record.kind, CallKind::Video);
            break;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "history record never appeared"
        );
        tokio::time::sleep(Duration::from_millis(25)).await;
    }

    alice.cancel.cancel();
    bob.cancel.cancel();
}

#[tokio::test]
async fn test_clear_on_teardown_flushes_stale_signals() {
    let server = TestRelayServer::spawn().await.expect("relay");

    let alice = e2e_client("alice", &server.url());
    let mut bob = e2e_client("bob", &server.url());

    let alice_call = alice
        .controller
        .place_call("bob", CallKind::Voice)
        .await
        .expect("alice dials");
    let (offer, _) = wait_for_incoming(&mut bob.events, WAIT).await;
    let bob_call = bob
        .controller
        .accept_incoming(&offer)
        .await
        .expect("bob answers");
    wait_for_state(&alice_call, CallState::Connected, WAIT).await;
    bob.media
        .sessions()
        .first()
        .unwrap()
        .emit_connectivity(ConnectivityState::Connected);
    wait_for_state(&bob_call, CallState::Connected, WAIT).await;

    let ended = alice_call.end().await;
    assert_eq!(ended.state, CallState::Ended);

    // Ending from connected flushed alice's mailbox on the relay, so a
    // fresh poll finds nothing stale from the finished call.
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(alice
        .controller
        .active_call()
        .await
        .map(|handle| handle.current().state.is_terminal())
        .unwrap_or(true));

    alice.cancel.cancel();
    bob.cancel.cancel();
}
