// Integration tests for the reconnecting status transport.
//
// Time is paused: the runtime auto-advances the clock whenever every task
// is idle, so reconnect delays resolve instantly but keep their ordering.
#![allow(clippy::unwrap_used)]

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time::{Instant, timeout};

use coop_core::{
    BackoffStrategy, ConnectionState, DoorStatus, ReconnectPolicy, ReconnectingTransport,
    ScriptedConnector, SnapshotStore, TransportEvent,
};

const TIME_FRAME: &str = r#"{"type":"time","value":"7:05 AM"}"#;
const DOOR_OPEN_FRAME: &str = r#"{"type":"doorStatus","value":"open"}"#;

fn transport(
    connector: &ScriptedConnector,
    policy: ReconnectPolicy,
) -> (ReconnectingTransport, Arc<SnapshotStore>) {
    let store = Arc::new(SnapshotStore::new());
    let transport = ReconnectingTransport::new(Arc::new(connector.clone()), policy, Arc::clone(&store));
    (transport, store)
}

async fn next_event(events: &mut broadcast::Receiver<TransportEvent>) -> TransportEvent {
    timeout(Duration::from_secs(300), events.recv())
        .await
        .expect("timed out waiting for transport event")
        .unwrap()
}

async fn wait_for_event(
    events: &mut broadcast::Receiver<TransportEvent>,
    pred: impl Fn(&TransportEvent) -> bool,
) -> TransportEvent {
    loop {
        let event = next_event(events).await;
        if pred(&event) {
            return event;
        }
    }
}

#[tokio::test(start_paused = true)]
async fn reconnects_after_remote_close_with_fixed_delay() {
    let connector = ScriptedConnector::new();
    let mut first = connector.accept_next();
    let _second = connector.accept_next();
    let (transport, _store) = transport(&connector, ReconnectPolicy::default());
    let mut events = transport.events();

    transport.connect().await;
    assert_eq!(next_event(&mut events).await, TransportEvent::Opened);
    assert_eq!(transport.state(), ConnectionState::Open);

    first.close();
    assert_eq!(
        next_event(&mut events).await,
        TransportEvent::Closed { reason: None }
    );
    let closed_at = Instant::now();

    assert_eq!(
        next_event(&mut events).await,
        TransportEvent::ReconnectScheduled {
            attempt: 1,
            delay: Duration::from_secs(3),
        }
    );
    assert_eq!(next_event(&mut events).await, TransportEvent::Opened);
    assert!(closed_at.elapsed() >= Duration::from_secs(3));
    assert_eq!(connector.attempts(), 2);
    assert_eq!(transport.state(), ConnectionState::Open);

    transport.disconnect().await;
}

#[tokio::test(start_paused = true)]
async fn frames_update_snapshot_and_malformed_frames_are_dropped() {
    let connector = ScriptedConnector::new();
    let session = connector.accept_next();
    let (transport, store) = transport(&connector, ReconnectPolicy::default());
    let mut events = transport.events();
    let mut snapshots = store.subscribe();

    transport.connect().await;
    assert_eq!(next_event(&mut events).await, TransportEvent::Opened);

    assert!(session.send(TIME_FRAME));
    assert!(session.send("not json at all"));
    assert!(session.send(r#"{"type":"mystery","value":1}"#));
    assert!(session.send(r#"{"type":"indicators","value":[true]}"#));
    assert!(session.send(DOOR_OPEN_FRAME));

    let snapshot = loop {
        let snapshot = timeout(Duration::from_secs(5), snapshots.changed())
            .await
            .unwrap()
            .unwrap();
        if snapshot.state.door_status == DoorStatus::Open {
            break snapshot;
        }
    };

    assert_eq!(snapshot.state.current_time, "7:05 AM");
    assert_eq!(snapshot.seq, 2);
    assert_eq!(snapshot.live_seq, 2);
    assert_eq!(transport.state(), ConnectionState::Open);

    transport.disconnect().await;
}

#[tokio::test(start_paused = true)]
async fn disconnect_during_slow_connect_stops_all_mutation() {
    let connector = ScriptedConnector::new();
    connector.set_latency(Duration::from_secs(5));
    let session = connector.accept_next();
    let (transport, store) = transport(&connector, ReconnectPolicy::default());

    transport.connect().await;
    assert_eq!(transport.state(), ConnectionState::Connecting);
    tokio::time::sleep(Duration::from_secs(1)).await;

    transport.disconnect().await;
    assert_eq!(transport.state(), ConnectionState::Closed);

    session.send(TIME_FRAME);
    tokio::time::sleep(Duration::from_secs(30)).await;

    assert_eq!(store.current().seq, 0);
    assert_eq!(connector.attempts(), 1);
    assert_eq!(transport.state(), ConnectionState::Closed);
}

#[tokio::test(start_paused = true)]
async fn disconnect_while_open_detaches_the_connection() {
    let connector = ScriptedConnector::new();
    let session = connector.accept_next();
    let (transport, store) = transport(&connector, ReconnectPolicy::default());
    let mut events = transport.events();

    transport.connect().await;
    assert_eq!(next_event(&mut events).await, TransportEvent::Opened);

    transport.disconnect().await;
    assert!(!session.send(TIME_FRAME));
    tokio::time::sleep(Duration::from_secs(10)).await;

    assert_eq!(store.current().seq, 0);
    assert_eq!(connector.attempts(), 1);
}

#[tokio::test(start_paused = true)]
async fn connect_during_reconnect_delay_retries_immediately() {
    let connector = ScriptedConnector::new();
    let (transport, _store) = transport(&connector, ReconnectPolicy::fixed(Duration::from_secs(60)));
    let mut events = transport.events();

    transport.connect().await;
    assert!(matches!(
        next_event(&mut events).await,
        TransportEvent::ConnectFailed { .. }
    ));
    assert!(matches!(
        next_event(&mut events).await,
        TransportEvent::ReconnectScheduled { attempt: 1, .. }
    ));
    assert_eq!(transport.state(), ConnectionState::Closed);

    let _session = connector.accept_next();
    let kicked_at = Instant::now();
    transport.connect().await;

    wait_for_event(&mut events, |e| *e == TransportEvent::Opened).await;
    assert!(kicked_at.elapsed() < Duration::from_secs(1));
    assert_eq!(connector.attempts(), 2);

    transport.disconnect().await;
}

#[tokio::test(start_paused = true)]
async fn repeated_connects_during_delay_collapse_into_one_retry() {
    let delay = Duration::from_secs(60);
    let connector = ScriptedConnector::new();
    let (transport, _store) = transport(&connector, ReconnectPolicy::fixed(delay));
    let mut events = transport.events();

    transport.connect().await;
    wait_for_event(&mut events, |e| {
        matches!(e, TransportEvent::ReconnectScheduled { attempt: 1, .. })
    })
    .await;

    // Both land before the driver wakes up.
    transport.connect().await;
    transport.connect().await;

    wait_for_event(&mut events, |e| {
        matches!(e, TransportEvent::ReconnectScheduled { attempt: 2, .. })
    })
    .await;
    assert_eq!(connector.attempts(), 2);
    let scheduled_at = Instant::now();

    wait_for_event(&mut events, |e| {
        matches!(e, TransportEvent::ConnectFailed { .. })
    })
    .await;
    assert!(
        scheduled_at.elapsed() >= delay,
        "retry came after {:?}",
        scheduled_at.elapsed()
    );
    assert_eq!(connector.attempts(), 3);

    transport.disconnect().await;
}

#[tokio::test(start_paused = true)]
async fn state_passes_closed_then_reconnecting_then_open() {
    let connector = ScriptedConnector::new();
    connector.set_latency(Duration::from_secs(1));
    connector.refuse_next("refused");
    let _session = connector.accept_next();
    let (transport, _store) = transport(&connector, ReconnectPolicy::default());

    let mut states = transport.subscribe_state();
    let mut seen = vec![*states.borrow_and_update()];
    transport.connect().await;
    while seen.last() != Some(&ConnectionState::Open) {
        timeout(Duration::from_secs(300), states.changed())
            .await
            .unwrap()
            .unwrap();
        seen.push(*states.borrow_and_update());
    }

    assert_eq!(
        seen,
        [
            ConnectionState::Closed,
            ConnectionState::Connecting,
            ConnectionState::Closed,
            ConnectionState::Reconnecting,
            ConnectionState::Open,
        ]
    );

    transport.disconnect().await;
}

#[tokio::test(start_paused = true)]
async fn connect_is_idempotent_while_open() {
    let connector = ScriptedConnector::new();
    let _session = connector.accept_next();
    let (transport, _store) = transport(&connector, ReconnectPolicy::default());
    let mut events = transport.events();

    transport.connect().await;
    assert_eq!(next_event(&mut events).await, TransportEvent::Opened);
    transport.connect().await;
    transport.connect().await;
    tokio::time::sleep(Duration::from_secs(10)).await;

    assert_eq!(connector.attempts(), 1);
    assert_eq!(transport.state(), ConnectionState::Open);

    transport.disconnect().await;
}

#[tokio::test(start_paused = true)]
async fn gives_up_after_max_retries() {
    let connector = ScriptedConnector::new();
    let policy = ReconnectPolicy {
        strategy: BackoffStrategy::Fixed(Duration::from_secs(1)),
        max_retries: Some(2),
    };
    let (transport, _store) = transport(&connector, policy);
    let mut events = transport.events();

    transport.connect().await;
    let gave_up = wait_for_event(&mut events, |e| {
        matches!(e, TransportEvent::GaveUp { .. })
    })
    .await;

    assert_eq!(gave_up, TransportEvent::GaveUp { attempts: 2 });
    assert_eq!(connector.attempts(), 3);
    assert_eq!(transport.state(), ConnectionState::Closed);
}

#[tokio::test(start_paused = true)]
async fn stream_failure_is_reported_and_retried() {
    let connector = ScriptedConnector::new();
    let mut first = connector.accept_next();
    let _second = connector.accept_next();
    let (transport, _store) = transport(&connector, ReconnectPolicy::default());
    let mut events = transport.events();

    transport.connect().await;
    assert_eq!(next_event(&mut events).await, TransportEvent::Opened);

    first.fail("connection reset");
    match next_event(&mut events).await {
        TransportEvent::Closed { reason: Some(reason) } => {
            assert!(reason.contains("connection reset"), "reason: {reason}");
        }
        other => panic!("expected failed close, got {other:?}"),
    }

    wait_for_event(&mut events, |e| *e == TransportEvent::Opened).await;
    transport.disconnect().await;
}
