// Tests for the per-session driver task and its handle

mod common;

use common::{general_physician, transcript, Harness};
use medvoice::session::{LifecycleState, SessionError, SessionHandle, SessionStatus, Speaker};
use medvoice::transport::TransportEvent;
use std::time::Duration;
use tokio::sync::watch;

async fn wait_for_state(status: &mut watch::Receiver<SessionStatus>, state: LifecycleState) {
    tokio::time::timeout(Duration::from_secs(2), status.wait_for(|s| s.state == state))
        .await
        .expect("timed out waiting for state")
        .expect("driver stopped");
}

#[tokio::test]
async fn test_handle_drives_call_from_transport_events() {
    let h = Harness::new().await;
    let handle = SessionHandle::spawn(h.controller());
    let mut status = handle.subscribe();

    let connected = handle.connect(general_physician()).await.unwrap();
    assert_eq!(connected.state, LifecycleState::Connecting);

    let events = h.transports.events();
    events.send(TransportEvent::CallStarted).await.unwrap();
    wait_for_state(&mut status, LifecycleState::Active).await;

    events
        .send(transcript(Speaker::User, true, "I feel dizzy"))
        .await
        .unwrap();
    events
        .send(transcript(Speaker::Agent, false, "Since when"))
        .await
        .unwrap();

    // Commands queue behind events already delivered to the driver
    tokio::time::timeout(
        Duration::from_secs(2),
        status.wait_for(|s| s.transcript_entries == 1 && s.live.len() == 1),
    )
    .await
    .unwrap()
    .unwrap();

    let snapshot = handle.transcript().await.unwrap();
    assert_eq!(snapshot.entries.len(), 1);
    assert_eq!(snapshot.entries[0].text, "I feel dizzy");
    assert_eq!(snapshot.live[0].speaker, Speaker::Agent);

    let outcome = handle.disconnect().await.unwrap();
    assert!(outcome.is_stored());
    assert_eq!(handle.status().state, LifecycleState::Ended);
}

#[tokio::test]
async fn test_handle_reports_rejected_commands() {
    let h = Harness::new().await;
    let handle = SessionHandle::spawn(h.controller());

    let err = handle.disconnect().await.unwrap_err();
    assert_eq!(err, SessionError::NotConnected(LifecycleState::Idle));

    handle.connect(general_physician()).await.unwrap();
    let err = handle.connect(general_physician()).await.unwrap_err();
    assert_eq!(err, SessionError::AlreadyInProgress(LifecycleState::Connecting));
}

#[tokio::test]
async fn test_dropping_last_handle_releases_resources() {
    let h = Harness::new().await;
    let handle = SessionHandle::spawn(h.controller());
    handle.connect(general_physician()).await.unwrap();
    assert_eq!(h.transports.disconnects(), 0);

    drop(handle);

    let released = async {
        while h.transports.disconnects() == 0 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    };
    tokio::time::timeout(Duration::from_secs(2), released)
        .await
        .expect("driver should release the transport on shutdown");

    assert_eq!(h.audio.stopped(), 1);
    // Shutdown never generates a report
    assert!(h.summarizer.requests().is_empty());
}

#[tokio::test]
async fn test_handle_clones_share_one_session() {
    let h = Harness::new().await;
    let handle = SessionHandle::spawn(h.controller());
    let other = handle.clone();

    handle.connect(general_physician()).await.unwrap();
    assert_eq!(other.status().state, LifecycleState::Connecting);
    assert_eq!(other.session_id(), h.session_id);
}
