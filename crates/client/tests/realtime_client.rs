mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use common::{settle, MockConnector};
use linkup_client::{
    ClientError, ConnectionState, Listener, PageOrigin, RealtimeClient, RealtimeConfig,
};
use linkup_shared::{Session, SessionUpdated, EVENT_CLOSE, EVENT_OPEN};
use serde_json::{json, Value};
use tokio::time::sleep;

fn client() -> (RealtimeClient, MockConnector) {
    let connector = MockConnector::default();
    let client = RealtimeClient::with_connector(RealtimeConfig::default(), connector.clone());
    (client, connector)
}

fn counter() -> (Arc<AtomicUsize>, Listener) {
    let hits = Arc::new(AtomicUsize::new(0));
    let seen = hits.clone();
    let listener = Listener::new(move |_| {
        seen.fetch_add(1, Ordering::SeqCst);
    });
    (hits, listener)
}

fn recorder() -> (Arc<Mutex<Vec<Value>>>, Listener) {
    let payloads: Arc<Mutex<Vec<Value>>> = Arc::default();
    let sink = payloads.clone();
    let listener = Listener::new(move |payload| sink.lock().unwrap().push(payload.clone()));
    (payloads, listener)
}

/// Connect and complete the handshake on socket 0.
async fn open_client() -> (RealtimeClient, MockConnector) {
    let (client, connector) = client();
    client.connect("tok").unwrap();
    settle().await;
    connector.accept(0);
    settle().await;
    assert_eq!(client.state(), ConnectionState::Open);
    (client, connector)
}

#[tokio::test(start_paused = true)]
async fn connect_builds_address_from_origin_and_token() {
    let connector = MockConnector::default();
    let config = RealtimeConfig::new(PageOrigin::new(true, "app.example.com"));
    let client = RealtimeClient::with_connector(config, connector.clone());
    assert_eq!(client.state(), ConnectionState::Idle);

    client.connect("abc123").unwrap();
    settle().await;

    assert_eq!(connector.count(), 1);
    assert_eq!(
        connector.url(0),
        "wss://app.example.com/ws/mobile?token=abc123"
    );
    assert_eq!(client.state(), ConnectionState::Connecting);
}

#[tokio::test(start_paused = true)]
async fn open_fires_once_then_send_writes_one_envelope() {
    let (client, connector) = client();
    let (opens, on_open) = counter();
    let _sub = client.on(EVENT_OPEN, on_open);

    client.connect("tok").unwrap();
    settle().await;
    connector.accept(0);
    settle().await;

    assert_eq!(opens.load(Ordering::SeqCst), 1);
    assert_eq!(client.state(), ConnectionState::Open);

    client.send("chat", json!({"a": 1})).unwrap();
    settle().await;

    let written = connector.written(0);
    assert_eq!(written.len(), 1);
    let frame = written[0].as_object().unwrap();
    assert_eq!(frame.len(), 3);
    assert_eq!(frame["type"], "chat");
    assert_eq!(frame["payload"], json!({"a": 1}));
    assert!(frame["timestamp"].is_i64());
}

#[tokio::test(start_paused = true)]
async fn send_before_open_is_dropped_not_queued() {
    let (client, connector) = client();

    // Idle: no transport at all
    client.send("chat", json!("early")).unwrap();
    client.connect("tok").unwrap();
    settle().await;

    // Connecting: transport exists but is not ready
    client.send("chat", json!("still early")).unwrap();
    settle().await;
    assert!(connector.written(0).is_empty());

    connector.accept(0);
    settle().await;
    assert!(connector.written(0).is_empty());
}

#[tokio::test(start_paused = true)]
async fn unexpected_close_reconnects_after_fixed_delay() {
    let (client, connector) = open_client().await;
    let (closes, on_close) = counter();
    let _sub = client.on(EVENT_CLOSE, on_close);

    connector.drop_connection(0);
    settle().await;

    assert_eq!(closes.load(Ordering::SeqCst), 1);
    assert_eq!(client.state(), ConnectionState::ClosedPendingReconnect);

    sleep(Duration::from_millis(2_900)).await;
    assert_eq!(connector.count(), 1);

    sleep(Duration::from_millis(200)).await;
    assert_eq!(connector.count(), 2);
    assert_eq!(connector.url(1), connector.url(0));
    assert_eq!(client.state(), ConnectionState::Connecting);
    assert_eq!(closes.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn failed_attempts_retry_indefinitely_at_fixed_interval() {
    let (client, connector) = client();
    let (closes, on_close) = counter();
    let _sub = client.on(EVENT_CLOSE, on_close);

    client.connect("tok").unwrap();
    settle().await;

    for attempt in 0..5 {
        connector.drop_connection(attempt);
        settle().await;
        sleep(Duration::from_millis(3_000)).await;
        assert_eq!(connector.count(), attempt + 2);
    }

    assert_eq!(closes.load(Ordering::SeqCst), 5);
    assert_eq!(client.state(), ConnectionState::Connecting);
}

#[tokio::test(start_paused = true)]
async fn reconnect_clears_once_connection_opens() {
    let (client, connector) = open_client().await;

    connector.drop_connection(0);
    settle().await;
    sleep(Duration::from_millis(3_100)).await;
    connector.accept(1);
    settle().await;

    assert_eq!(client.state(), ConnectionState::Open);
    sleep(Duration::from_secs(10)).await;
    assert_eq!(connector.count(), 2);
}

#[tokio::test(start_paused = true)]
async fn connect_while_open_replaces_transport() {
    let (client, connector) = open_client().await;
    let (closes, on_close) = counter();
    let (chats, on_chat) = counter();
    let _closes = client.on(EVENT_CLOSE, on_close);
    let _chats = client.on("chat", on_chat);

    client.connect("second").unwrap();
    settle().await;

    assert!(connector.is_closed(0));
    assert_eq!(connector.count(), 2);
    assert!(connector.url(1).ends_with("token=second"));
    assert_eq!(client.state(), ConnectionState::Connecting);

    // The old socket is detached: nothing it reports reaches listeners
    connector.push_text(0, r#"{"type":"chat","payload":null,"timestamp":1}"#);
    connector.drop_connection(0);
    settle().await;
    assert_eq!(chats.load(Ordering::SeqCst), 0);
    assert_eq!(closes.load(Ordering::SeqCst), 0);

    sleep(Duration::from_secs(10)).await;
    assert_eq!(connector.count(), 2);
    assert!(!connector.is_closed(1));
}

#[tokio::test(start_paused = true)]
async fn heartbeat_runs_only_while_open() {
    let (_client, connector) = open_client().await;

    sleep(Duration::from_millis(29_900)).await;
    assert!(connector.written(0).is_empty());

    sleep(Duration::from_millis(200)).await;
    let written = connector.written(0);
    assert_eq!(written.len(), 1);
    assert_eq!(written[0]["type"], "heartbeat");
    assert_eq!(written[0]["payload"], json!({}));

    sleep(Duration::from_secs(30)).await;
    assert_eq!(connector.written(0).len(), 2);

    connector.drop_connection(0);
    settle().await;
    sleep(Duration::from_secs(120)).await;

    // Socket 1 was opened by the reconnect but never accepted
    assert_eq!(connector.written(0).len(), 2);
    assert!(connector.count() >= 2);
    assert!(connector.written(1).is_empty());
}

#[tokio::test(start_paused = true)]
async fn disconnect_stops_heartbeat_and_reconnect() {
    let (client, connector) = open_client().await;
    let (closes, on_close) = counter();
    let _sub = client.on(EVENT_CLOSE, on_close);

    client.disconnect().unwrap();
    settle().await;

    assert!(connector.is_closed(0));
    assert_eq!(client.state(), ConnectionState::Disconnected);

    sleep(Duration::from_secs(120)).await;
    assert_eq!(connector.count(), 1);
    assert!(connector.written(0).is_empty());
    assert_eq!(closes.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn disconnect_cancels_pending_reconnect() {
    let (client, connector) = open_client().await;

    connector.drop_connection(0);
    settle().await;
    assert_eq!(client.state(), ConnectionState::ClosedPendingReconnect);

    client.disconnect().unwrap();
    settle().await;
    sleep(Duration::from_secs(60)).await;

    assert_eq!(connector.count(), 1);
    assert_eq!(client.state(), ConnectionState::Disconnected);
}

#[tokio::test(start_paused = true)]
async fn disconnect_from_close_listener_wins_over_reconnect() {
    let (client, connector) = open_client().await;
    let handle = client.clone();
    let _sub = client.on(
        EVENT_CLOSE,
        Listener::new(move |_| {
            handle.disconnect().unwrap();
        }),
    );

    connector.drop_connection(0);
    settle().await;
    sleep(Duration::from_secs(10)).await;

    assert_eq!(connector.count(), 1);
    assert_eq!(client.state(), ConnectionState::Disconnected);
}

#[tokio::test(start_paused = true)]
async fn disconnect_is_idempotent_and_connect_starts_over() {
    let (client, connector) = open_client().await;

    client.disconnect().unwrap();
    client.disconnect().unwrap();
    settle().await;
    assert_eq!(client.state(), ConnectionState::Disconnected);

    client.connect("again").unwrap();
    settle().await;
    assert_eq!(connector.count(), 2);
    assert_eq!(client.state(), ConnectionState::Connecting);
}

#[tokio::test(start_paused = true)]
async fn malformed_inbound_is_dropped() {
    let (client, connector) = open_client().await;
    let (chats, on_chat) = recorder();
    let (opens, on_open) = counter();
    let _chat = client.on("chat", on_chat);
    let _open = client.on(EVENT_OPEN, on_open);

    connector.push_text(0, "not json");
    connector.push_text(0, "[1, 2, 3]");
    connector.push_text(0, r#"{"payload": {"a": 1}}"#);
    settle().await;

    assert!(chats.lock().unwrap().is_empty());
    assert_eq!(opens.load(Ordering::SeqCst), 0);
    assert_eq!(client.state(), ConnectionState::Open);

    connector.push_text(0, r#"{"type":"chat","payload":{"a":2},"timestamp":5}"#);
    settle().await;
    assert_eq!(*chats.lock().unwrap(), vec![json!({"a": 2})]);
}

#[tokio::test(start_paused = true)]
async fn only_current_listeners_receive_messages() {
    let (client, connector) = open_client().await;
    let (first, on_first) = counter();
    let (second, on_second) = counter();
    let (other, on_other) = counter();

    let _first = client.on("chat", on_first.clone());
    let _again = client.on("chat", on_first.clone());
    let second_sub = client.on("chat", on_second);
    let _other = client.on("presence", on_other);

    let chat = r#"{"type":"chat","payload":{},"timestamp":1}"#;
    connector.push_text(0, chat);
    settle().await;
    assert_eq!(first.load(Ordering::SeqCst), 1);
    assert_eq!(second.load(Ordering::SeqCst), 1);
    assert_eq!(other.load(Ordering::SeqCst), 0);

    client.off("chat", &on_first);
    second_sub.unsubscribe();
    connector.push_text(0, chat);
    settle().await;
    assert_eq!(first.load(Ordering::SeqCst), 1);
    assert_eq!(second.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn typed_listener_skips_mismatched_payloads() {
    let (client, connector) = open_client().await;
    let seen: Arc<Mutex<Vec<Option<Session>>>> = Arc::default();
    let sink = seen.clone();
    let _sub = client.on_message(move |update: SessionUpdated| {
        sink.lock().unwrap().push(update.session);
    });

    connector.push_text(
        0,
        r#"{"type":"session_update","payload":{"session":"nope"},"timestamp":1}"#,
    );
    connector.push_text(
        0,
        r#"{"type":"session_update","payload":{"session":{"id":"s-9"}},"timestamp":2}"#,
    );
    settle().await;

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].as_ref().unwrap().id, "s-9");
}

#[tokio::test(start_paused = true)]
async fn panicking_listener_does_not_stop_the_client() {
    let (client, connector) = open_client().await;
    let _boom = client.on("boom", Listener::new(|_| panic!("listener bug")));
    let (chats, on_chat) = counter();
    let _chat = client.on("chat", on_chat);

    connector.push_text(0, r#"{"type":"boom","payload":null,"timestamp":1}"#);
    connector.push_text(0, r#"{"type":"chat","payload":null,"timestamp":2}"#);
    settle().await;

    assert_eq!(chats.load(Ordering::SeqCst), 1);
    assert_eq!(client.state(), ConnectionState::Open);
}

#[tokio::test(start_paused = true)]
async fn shutdown_closes_every_handle() {
    let (client, connector) = open_client().await;
    let other = client.clone();

    client.shutdown().unwrap();
    settle().await;

    assert!(connector.is_closed(0));
    assert_eq!(other.state(), ConnectionState::Disconnected);
    assert!(matches!(other.connect("tok"), Err(ClientError::Closed)));
    assert!(matches!(
        other.send("chat", Value::Null),
        Err(ClientError::Closed)
    ));
}
