use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use futures_util::{SinkExt, StreamExt};
use listener::{FeedConfig, WsFeed};
use secrecy::SecretString;
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::mpsc, time::timeout};
use tokio_tungstenite::{
    accept_hdr_async,
    tungstenite::{
        handshake::server::{ErrorResponse, Request, Response},
        Message,
    },
};
use triggers::{ClientId, RealtimeError, RealtimeFeed, TriggerEvent};

const WAIT: Duration = Duration::from_secs(2);

#[derive(Debug, Clone)]
struct Handshake {
    path: String,
    api_key: Option<String>,
}

/// What the in-process server does next on the open socket.
#[derive(Debug)]
enum ServerAction {
    Text(String),
    /// Close this socket and keep accepting.
    Close,
    /// Close this socket and stop listening.
    Shutdown,
}

/// In-process feed endpoint. Frames the client sends arrive on `frames`;
/// actions pushed into `outbound` are applied to the open socket.
struct FeedServer {
    base_url: String,
    feed_url: String,
    frames: mpsc::UnboundedReceiver<Value>,
    outbound: mpsc::UnboundedSender<ServerAction>,
    handshakes: Arc<Mutex<Vec<Handshake>>>,
}

impl FeedServer {
    async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (frames_tx, frames) = mpsc::unbounded_channel();
        let (outbound, mut outbound_rx) = mpsc::unbounded_channel::<ServerAction>();
        let handshakes = Arc::new(Mutex::new(Vec::new()));
        let recorded = handshakes.clone();

        tokio::spawn(async move {
            // Connections are served one at a time.
            while let Ok((stream, _)) = listener.accept().await {
                let recorded = recorded.clone();
                let callback = move |request: &Request, response: Response| {
                    recorded.lock().unwrap().push(Handshake {
                        path: request.uri().path().to_string(),
                        api_key: request
                            .headers()
                            .get("x-api-key")
                            .and_then(|v| v.to_str().ok())
                            .map(str::to_string),
                    });
                    Ok::<_, ErrorResponse>(response)
                };
                let Ok(ws) = accept_hdr_async(stream, callback).await else {
                    continue;
                };
                let (mut write, mut read) = ws.split();

                loop {
                    tokio::select! {
                        Some(action) = outbound_rx.recv() => match action {
                            ServerAction::Text(text) => {
                                if write.send(Message::Text(text.into())).await.is_err() {
                                    break;
                                }
                            }
                            ServerAction::Close => {
                                let _ = write.close().await;
                                break;
                            }
                            ServerAction::Shutdown => {
                                let _ = write.close().await;
                                return;
                            }
                        },
                        incoming = read.next() => match incoming {
                            Some(Ok(Message::Text(text))) => {
                                if let Ok(value) = serde_json::from_str::<Value>(text.as_str()) {
                                    let _ = frames_tx.send(value);
                                }
                            }
                            Some(Ok(_)) => {}
                            _ => break,
                        }
                    }
                }
            }
        });

        Self {
            base_url: format!("http://{addr}"),
            feed_url: format!("ws://{addr}/api/v1/client/feed"),
            frames,
            outbound,
            handshakes,
        }
    }

    async fn next_frame(&mut self) -> Value {
        timeout(WAIT, self.frames.recv())
            .await
            .expect("timed out waiting for a client frame")
            .expect("server stopped")
    }

    fn push(&self, frame: Value) {
        self.send(ServerAction::Text(frame.to_string()));
    }

    fn send(&self, action: ServerAction) {
        self.outbound.send(action).unwrap();
    }

    fn handshakes(&self) -> Vec<Handshake> {
        self.handshakes.lock().unwrap().clone()
    }
}

fn api_key() -> SecretString {
    SecretString::from("test-key".to_string())
}

fn client(id: &str) -> ClientId {
    ClientId::new(id).unwrap()
}

fn feed_for(server: &FeedServer) -> WsFeed {
    WsFeed::new(FeedConfig::new().with_url(&server.feed_url).unwrap())
}

fn fast_reconnecting_feed(server: &FeedServer, attempts: u32) -> WsFeed {
    WsFeed::new(
        FeedConfig::new()
            .with_url(&server.feed_url)
            .unwrap()
            .with_connect_timeout(Duration::from_secs(1))
            .with_reconnect(attempts, Duration::from_millis(50)),
    )
}

async fn next_event(rx: &mut mpsc::UnboundedReceiver<TriggerEvent>) -> TriggerEvent {
    timeout(WAIT, rx.recv())
        .await
        .expect("timed out waiting for an event")
        .expect("sink closed")
}

async fn connect_and_subscribe(
    server: &mut FeedServer,
    feed: &WsFeed,
    id: &str,
) -> mpsc::UnboundedReceiver<TriggerEvent> {
    feed.connect(&server.base_url, &api_key()).await.unwrap();
    let (tx, rx) = mpsc::unbounded_channel();
    feed.subscribe(&client(id), tx).await.unwrap();
    let frame = server.next_frame().await;
    assert_eq!(
        frame,
        json!({ "event": "subscribe", "channel": format!("private-{id}_triggers") })
    );
    rx
}

#[tokio::test]
async fn test_handshake_sends_api_key_to_derived_url() {
    let server = FeedServer::start().await;
    let feed = WsFeed::new(FeedConfig::default());

    feed.connect(&server.base_url, &api_key()).await.unwrap();
    assert!(feed.is_connected().await);

    let handshakes = server.handshakes();
    assert_eq!(handshakes.len(), 1);
    assert_eq!(handshakes[0].path, "/api/v1/client/feed");
    assert_eq!(handshakes[0].api_key.as_deref(), Some("test-key"));
}

#[tokio::test]
async fn test_connect_reuses_open_connection() {
    let server = FeedServer::start().await;
    let feed = feed_for(&server);

    feed.connect(&server.base_url, &api_key()).await.unwrap();
    feed.connect(&server.base_url, &api_key()).await.unwrap();

    assert_eq!(server.handshakes().len(), 1);
}

#[tokio::test]
async fn test_trigger_frames_reach_the_subscribed_sink() {
    let mut server = FeedServer::start().await;
    let feed = feed_for(&server);
    let mut rx = connect_and_subscribe(&mut server, &feed, "c1").await;

    server.push(json!({
        "event": "trigger_to_client",
        "channel": "private-c1_triggers",
        "data": {
            "appName": "slack",
            "payload": { "text": "hello" },
            "metadata": { "id": "ti_1", "triggerName": "slack_receive_message" }
        }
    }));

    let event = next_event(&mut rx).await;
    assert_eq!(event.app_name, "slack");
    assert_eq!(event.payload, json!({ "text": "hello" }));
    assert_eq!(event.metadata.trigger_name, "slack_receive_message");
}

#[tokio::test]
async fn test_string_encoded_data_is_decoded() {
    let mut server = FeedServer::start().await;
    let feed = feed_for(&server);
    let mut rx = connect_and_subscribe(&mut server, &feed, "c1").await;

    server.push(json!({
        "event": "trigger_to_client",
        "channel": "private-c1_triggers",
        "data": json!({ "appName": "github" }).to_string()
    }));

    assert_eq!(next_event(&mut rx).await.app_name, "github");
}

#[tokio::test]
async fn test_bad_frames_are_skipped() {
    let mut server = FeedServer::start().await;
    let feed = feed_for(&server);
    let mut rx = connect_and_subscribe(&mut server, &feed, "c1").await;

    server.send(ServerAction::Text("not json at all".to_string()));
    server.push(json!({
        "event": "trigger_to_client",
        "channel": "private-c1_triggers",
        "data": "{broken"
    }));
    server.push(json!({
        "event": "trigger_to_client",
        "channel": "private-c1_triggers",
        "data": { "appName": "notion" }
    }));

    assert_eq!(next_event(&mut rx).await.app_name, "notion");
    assert!(feed.is_connected().await);
}

#[tokio::test]
async fn test_events_for_other_clients_are_not_delivered() {
    let mut server = FeedServer::start().await;
    let feed = feed_for(&server);
    let mut rx = connect_and_subscribe(&mut server, &feed, "c1").await;

    server.push(json!({
        "event": "trigger_to_client",
        "channel": "private-c2_triggers",
        "data": { "appName": "slack" }
    }));
    server.push(json!({
        "event": "trigger_to_client",
        "channel": "private-c1_triggers",
        "data": { "appName": "github" }
    }));

    assert_eq!(next_event(&mut rx).await.app_name, "github");
}

#[tokio::test]
async fn test_ping_is_answered_with_pong() {
    let mut server = FeedServer::start().await;
    let feed = feed_for(&server);
    feed.connect(&server.base_url, &api_key()).await.unwrap();

    server.push(json!({ "event": "ping" }));

    assert_eq!(server.next_frame().await, json!({ "event": "pong" }));
}

#[tokio::test]
async fn test_unsubscribe_sends_frame_and_releases_sink() {
    let mut server = FeedServer::start().await;
    let feed = feed_for(&server);
    let mut rx = connect_and_subscribe(&mut server, &feed, "c1").await;

    feed.unsubscribe(&client("c1")).await.unwrap();

    assert_eq!(
        server.next_frame().await,
        json!({ "event": "unsubscribe", "channel": "private-c1_triggers" })
    );
    assert!(feed.registry().is_empty());
    assert!(timeout(WAIT, rx.recv()).await.unwrap().is_none());

    // A second unsubscribe is a no-op.
    feed.unsubscribe(&client("c1")).await.unwrap();
}

#[tokio::test]
async fn test_subscribe_requires_connection() {
    let feed = WsFeed::new(FeedConfig::default());
    let (tx, _rx) = mpsc::unbounded_channel();

    let err = feed.subscribe(&client("c1"), tx).await.unwrap_err();

    assert_eq!(err, RealtimeError::NotConnected);
    assert!(feed.registry().is_empty());
}

#[tokio::test]
async fn test_unreachable_feed_is_a_connect_error() {
    let feed = WsFeed::new(
        FeedConfig::new()
            .with_url("ws://127.0.0.1:1/feed")
            .unwrap()
            .with_connect_timeout(Duration::from_secs(1)),
    );

    let err = feed
        .connect("http://127.0.0.1:1", &api_key())
        .await
        .unwrap_err();

    assert!(matches!(err, RealtimeError::Connect { .. }));
    assert!(!feed.is_connected().await);
}

#[tokio::test]
async fn test_reconnect_resubscribes_registered_clients() {
    let mut server = FeedServer::start().await;
    let feed = feed_for(&server);
    let _rx = connect_and_subscribe(&mut server, &feed, "c1").await;

    feed.disconnect().await;
    assert!(!feed.is_connected().await);

    feed.connect(&server.base_url, &api_key()).await.unwrap();

    assert_eq!(
        server.next_frame().await,
        json!({ "event": "subscribe", "channel": "private-c1_triggers" })
    );
    assert_eq!(server.handshakes().len(), 2);
}

#[tokio::test]
async fn test_resubscribing_a_registered_client_sends_no_duplicate_frame() {
    let mut server = FeedServer::start().await;
    let feed = feed_for(&server);
    let _old_rx = connect_and_subscribe(&mut server, &feed, "c1").await;

    feed.disconnect().await;
    feed.connect(&server.base_url, &api_key()).await.unwrap();
    assert_eq!(
        server.next_frame().await,
        json!({ "event": "subscribe", "channel": "private-c1_triggers" })
    );

    let (tx, mut rx) = mpsc::unbounded_channel();
    feed.subscribe(&client("c1"), tx).await.unwrap();
    server.push(json!({ "event": "ping" }));

    // The replacement registration queued nothing, so the pong comes next.
    assert_eq!(server.next_frame().await, json!({ "event": "pong" }));

    server.push(json!({
        "event": "trigger_to_client",
        "channel": "private-c1_triggers",
        "data": { "appName": "slack" }
    }));
    assert_eq!(next_event(&mut rx).await.app_name, "slack");
}

#[tokio::test]
async fn test_dropped_socket_is_reopened_and_resubscribed() {
    let mut server = FeedServer::start().await;
    let feed = fast_reconnecting_feed(&server, 3);
    let mut rx = connect_and_subscribe(&mut server, &feed, "c1").await;

    server.send(ServerAction::Close);

    assert_eq!(
        server.next_frame().await,
        json!({ "event": "subscribe", "channel": "private-c1_triggers" })
    );
    assert_eq!(server.handshakes().len(), 2);
    assert!(feed.is_connected().await);

    server.push(json!({
        "event": "trigger_to_client",
        "channel": "private-c1_triggers",
        "data": { "appName": "github" }
    }));
    assert_eq!(next_event(&mut rx).await.app_name, "github");
}

#[tokio::test]
async fn test_feed_gives_up_and_releases_sinks_when_server_is_gone() {
    let mut server = FeedServer::start().await;
    let feed = fast_reconnecting_feed(&server, 2);
    let mut rx = connect_and_subscribe(&mut server, &feed, "c1").await;

    server.send(ServerAction::Shutdown);

    // The sink is dropped, so the subscriber sees its channel end.
    assert!(timeout(WAIT, rx.recv()).await.unwrap().is_none());
    timeout(WAIT, feed.closed())
        .await
        .expect("feed never reported closed");
    assert!(feed.registry().is_empty());
    assert_eq!(server.handshakes().len(), 1);
}
