//! [`RealtimeFeed`] over a single WebSocket connection.

use std::sync::Arc;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use secrecy::{ExposeSecret, SecretString};
use tokio::{
    net::TcpStream,
    sync::{mpsc, watch, Mutex},
    task::JoinHandle,
    time::{sleep, timeout},
};
use tokio_tungstenite::{
    connect_async,
    tungstenite::{client::IntoClientRequest, http::HeaderValue, Message},
    MaybeTlsStream, WebSocketStream,
};
use tracing::{debug, error, info, instrument, warn};
use triggers::{ClientId, EventSink, RealtimeError, RealtimeFeed};
use url::Url;

use crate::{FeedConfig, FeedFrame, HandlerRegistry};

/// Header carrying the platform API key on the WebSocket handshake.
pub const API_KEY_HEADER: &str = "x-api-key";

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// A live socket: the queue feeding its writer, and the task driving it.
#[derive(Debug)]
struct FeedConnection {
    outgoing: mpsc::UnboundedSender<Message>,
    task: JoinHandle<()>,
}

impl FeedConnection {
    fn is_alive(&self) -> bool {
        !self.task.is_finished()
    }

    fn queue(&self, frame: &FeedFrame) -> Result<(), RealtimeError> {
        self.outgoing
            .send(text_message(frame)?)
            .map_err(|_| RealtimeError::NotConnected)
    }
}

/// Where and how the connection task (re)opens its socket.
#[derive(Debug)]
struct Endpoint {
    url: Url,
    api_key: HeaderValue,
    config: FeedConfig,
}

/// Why [`drive`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Ended {
    /// The outgoing queue was closed by `disconnect` or by dropping the feed.
    Requested,
    /// The server closed the socket or it failed.
    Lost,
}

enum Reconnect {
    Reopened(WsStream),
    Cancelled,
    GaveUp,
}

/// WebSocket client that routes `trigger_to_client` frames to per-client
/// sinks.
///
/// One connection is shared by every subscription. It is opened by the first
/// [`RealtimeFeed::connect`] and reused by later calls. When the server drops
/// the socket the feed reconnects with exponential backoff and re-subscribes
/// every registered client. If all attempts fail, every registration is
/// released (so subscribers see their channel end) and [`WsFeed::closed`]
/// resolves.
#[derive(Debug)]
pub struct WsFeed {
    config: FeedConfig,
    registry: Arc<HandlerRegistry>,
    connection: Mutex<Option<FeedConnection>>,
    closed: Arc<watch::Sender<bool>>,
}

impl WsFeed {
    pub fn new(config: FeedConfig) -> Self {
        let (closed, _) = watch::channel(false);
        Self {
            config,
            registry: Arc::new(HandlerRegistry::new()),
            connection: Mutex::new(None),
            closed: Arc::new(closed),
        }
    }

    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    /// `true` while the connection task runs, including while it is
    /// reconnecting.
    pub async fn is_connected(&self) -> bool {
        self.connection
            .lock()
            .await
            .as_ref()
            .is_some_and(FeedConnection::is_alive)
    }

    /// Resolves once the current connection has ended, either through
    /// [`WsFeed::disconnect`] or because reconnecting gave up.
    pub async fn closed(&self) {
        let mut closed = self.closed.subscribe();
        // The sender lives as long as `self`, so this only ends on `true`.
        let _ = closed.wait_for(|closed| *closed).await;
    }

    /// Closes the socket. Registrations are kept and re-sent on the next
    /// connect.
    pub async fn disconnect(&self) {
        if let Some(connection) = self.connection.lock().await.take() {
            // Dropping the queue makes the connection task close the socket.
            drop(connection.outgoing);
            if let Err(e) = connection.task.await {
                warn!(error = %e, "Feed connection task failed");
            }
            info!("Realtime feed disconnected");
        }
    }
}

impl Drop for WsFeed {
    fn drop(&mut self) {
        if let Some(connection) = self.connection.get_mut().take() {
            connection.task.abort();
        }
    }
}

#[async_trait]
impl RealtimeFeed for WsFeed {
    #[instrument(skip_all)]
    async fn connect(&self, base_url: &str, api_key: &SecretString) -> Result<(), RealtimeError> {
        let mut guard = self.connection.lock().await;
        if guard.as_ref().is_some_and(FeedConnection::is_alive) {
            debug!("Reusing realtime feed connection");
            return Ok(());
        }

        let url = self
            .config
            .resolve_url(base_url)
            .map_err(|e| RealtimeError::Connect {
                url: base_url.to_string(),
                message: e.to_string(),
            })?;
        let mut key =
            HeaderValue::from_str(api_key.expose_secret()).map_err(|e| RealtimeError::Connect {
                url: url.to_string(),
                message: e.to_string(),
            })?;
        key.set_sensitive(true);
        let endpoint = Endpoint {
            url,
            api_key: key,
            config: self.config.clone(),
        };
        let stream = open(&endpoint).await?;

        let (outgoing, queued) = mpsc::unbounded_channel();
        for client_id in self.registry.client_ids() {
            let _ = outgoing.send(text_message(&FeedFrame::subscribe(&client_id))?);
        }

        info!(url = %endpoint.url, "Realtime feed connected");
        self.closed.send_replace(false);
        let task = tokio::spawn(run_connection(
            stream,
            queued,
            endpoint,
            self.registry.clone(),
            self.closed.clone(),
        ));
        *guard = Some(FeedConnection { outgoing, task });
        Ok(())
    }

    #[instrument(skip_all, fields(client_id = %client_id))]
    async fn subscribe(&self, client_id: &ClientId, sink: EventSink) -> Result<(), RealtimeError> {
        let guard = self.connection.lock().await;
        let connection = guard
            .as_ref()
            .filter(|c| c.is_alive())
            .ok_or(RealtimeError::NotConnected)?;

        if self.registry.register(client_id.clone(), sink) {
            // Registered clients are already subscribed on this connection.
            debug!("Replaced existing feed registration");
            return Ok(());
        }
        connection.queue(&FeedFrame::subscribe(client_id))
    }

    #[instrument(skip_all, fields(client_id = %client_id))]
    async fn unsubscribe(&self, client_id: &ClientId) -> Result<(), RealtimeError> {
        if !self.registry.remove(client_id) {
            return Ok(());
        }

        let guard = self.connection.lock().await;
        match guard.as_ref().filter(|c| c.is_alive()) {
            Some(connection) => connection.queue(&FeedFrame::unsubscribe(client_id)),
            None => Ok(()),
        }
    }
}

fn text_message(frame: &FeedFrame) -> Result<Message, RealtimeError> {
    let text = frame.encode().map_err(|e| RealtimeError::Send {
        message: e.to_string(),
    })?;
    Ok(Message::Text(text.into()))
}

async fn open(endpoint: &Endpoint) -> Result<WsStream, RealtimeError> {
    let connect_error = |message: String| RealtimeError::Connect {
        url: endpoint.url.to_string(),
        message,
    };

    let mut request = endpoint
        .url
        .as_str()
        .into_client_request()
        .map_err(|e| connect_error(e.to_string()))?;
    request
        .headers_mut()
        .insert(API_KEY_HEADER, endpoint.api_key.clone());

    let connect_timeout = endpoint.config.connect_timeout;
    match timeout(connect_timeout, connect_async(request)).await {
        Ok(Ok((stream, _response))) => Ok(stream),
        Ok(Err(e)) => Err(connect_error(e.to_string())),
        Err(_) => Err(connect_error(format!(
            "handshake timed out after {connect_timeout:?}"
        ))),
    }
}

/// Owns the socket for the lifetime of one `connect`, reopening it when the
/// server drops it.
async fn run_connection(
    mut stream: WsStream,
    mut queued: mpsc::UnboundedReceiver<Message>,
    endpoint: Endpoint,
    registry: Arc<HandlerRegistry>,
    closed: Arc<watch::Sender<bool>>,
) {
    loop {
        if drive(stream, &mut queued, &registry).await == Ended::Requested {
            break;
        }

        warn!(url = %endpoint.url, "Realtime feed connection lost; reconnecting");
        match reconnect(&endpoint, &mut queued, &registry).await {
            Reconnect::Reopened(reopened) => stream = reopened,
            Reconnect::Cancelled => break,
            Reconnect::GaveUp => {
                error!(
                    url = %endpoint.url,
                    attempts = endpoint.config.max_reconnect_attempts,
                    registrations = registry.len(),
                    "Giving up on realtime feed; releasing every registration"
                );
                registry.clear();
                break;
            }
        }
    }

    closed.send_replace(true);
    debug!("Realtime feed connection task finished");
}

/// Reopens the socket with exponential backoff and subscribes every
/// registered client on it.
async fn reconnect(
    endpoint: &Endpoint,
    queued: &mut mpsc::UnboundedReceiver<Message>,
    registry: &HandlerRegistry,
) -> Reconnect {
    for attempt in 1..=endpoint.config.max_reconnect_attempts {
        let delay = sleep(endpoint.config.reconnect_delay(attempt));
        tokio::pin!(delay);
        loop {
            tokio::select! {
                () = &mut delay => break,
                // Frames queued while offline are superseded by the
                // re-subscription below.
                message = queued.recv() => {
                    if message.is_none() {
                        return Reconnect::Cancelled;
                    }
                }
            }
        }

        let mut stream = match open(endpoint).await {
            Ok(stream) => stream,
            Err(e) => {
                warn!(attempt, error = %e, "Realtime feed reconnect failed");
                continue;
            }
        };

        // Drain before reading the registry so a concurrent subscribe is
        // either covered here or queued after.
        while queued.try_recv().is_ok() {}
        match resubscribe(&mut stream, registry).await {
            Ok(()) => {
                info!(attempt, url = %endpoint.url, "Realtime feed reconnected");
                return Reconnect::Reopened(stream);
            }
            Err(e) => warn!(attempt, error = %e, "Realtime feed re-subscribe failed"),
        }
    }
    Reconnect::GaveUp
}

async fn resubscribe(stream: &mut WsStream, registry: &HandlerRegistry) -> Result<(), RealtimeError> {
    for client_id in registry.client_ids() {
        stream
            .send(text_message(&FeedFrame::subscribe(&client_id))?)
            .await
            .map_err(|e| RealtimeError::Send {
                message: e.to_string(),
            })?;
    }
    Ok(())
}

/// Drives one socket until either side closes it.
async fn drive(
    stream: WsStream,
    queued: &mut mpsc::UnboundedReceiver<Message>,
    registry: &HandlerRegistry,
) -> Ended {
    let (mut write, mut read) = stream.split();

    loop {
        tokio::select! {
            outgoing = queued.recv() => {
                let Some(message) = outgoing else {
                    let _ = write.close().await;
                    return Ended::Requested;
                };
                if let Err(e) = write.send(message).await {
                    warn!(error = %e, "Failed to write to realtime feed");
                    return Ended::Lost;
                }
            }
            incoming = read.next() => {
                let reply = match incoming {
                    Some(Ok(Message::Text(text))) => handle_text(text.as_str(), registry),
                    Some(Ok(Message::Ping(data))) => Some(Message::Pong(data)),
                    Some(Ok(Message::Close(frame))) => {
                        info!(?frame, "Realtime feed closed by server");
                        return Ended::Lost;
                    }
                    Some(Ok(_)) => None,
                    Some(Err(e)) => {
                        warn!(error = %e, "Realtime feed read failed");
                        return Ended::Lost;
                    }
                    None => return Ended::Lost,
                };

                if let Some(reply) = reply {
                    if let Err(e) = write.send(reply).await {
                        warn!(error = %e, "Failed to answer realtime feed");
                        return Ended::Lost;
                    }
                }
            }
        }
    }
}

/// Routes one text frame. Returns the reply to send, if any.
fn handle_text(text: &str, registry: &HandlerRegistry) -> Option<Message> {
    let frame = match FeedFrame::decode(text) {
        Ok(frame) => frame,
        Err(e) => {
            warn!(error = %e, "Skipping undecodable feed frame");
            return None;
        }
    };

    if frame.is_ping() {
        return match FeedFrame::pong().encode() {
            Ok(pong) => Some(Message::Text(pong.into())),
            Err(e) => {
                warn!(error = %e, "Could not encode pong");
                None
            }
        };
    }

    if !frame.is_trigger() {
        debug!(event = %frame.event, "Ignoring feed frame");
        return None;
    }

    let routed = frame
        .client_id()
        .and_then(|client_id| Ok((client_id, frame.trigger_event()?)));
    match routed {
        Ok((client_id, event)) => {
            registry.dispatch(&client_id, event);
        }
        Err(e) => warn!(error = %e, "Skipping undecodable trigger event"),
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn client(id: &str) -> ClientId {
        ClientId::new(id).unwrap()
    }

    #[test]
    fn test_handle_text_routes_trigger_to_client() {
        let registry = HandlerRegistry::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        registry.register(client("c1"), tx);

        let frame = json!({
            "event": "trigger_to_client",
            "channel": "private-c1_triggers",
            "data": { "appName": "slack" }
        });
        assert!(handle_text(&frame.to_string(), &registry).is_none());
        assert_eq!(rx.try_recv().unwrap().app_name, "slack");
    }

    #[test]
    fn test_handle_text_answers_ping() {
        let registry = HandlerRegistry::new();
        let reply = handle_text(r#"{"event":"ping"}"#, &registry);
        match reply {
            Some(Message::Text(text)) => {
                let frame = FeedFrame::decode(text.as_str()).unwrap();
                assert_eq!(frame.event, "pong");
            }
            other => panic!("expected pong, got {other:?}"),
        }
    }

    #[test]
    fn test_handle_text_skips_garbage() {
        let registry = HandlerRegistry::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        registry.register(client("c1"), tx);

        assert!(handle_text("{not json", &registry).is_none());
        assert!(handle_text(
            r#"{"event":"trigger_to_client","channel":"private-c1_triggers","data":"{oops"}"#,
            &registry
        )
        .is_none());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_handle_text_ignores_other_events() {
        let registry = HandlerRegistry::new();
        let reply = handle_text(r#"{"event":"subscription_succeeded"}"#, &registry);
        assert!(reply.is_none());
    }
}
