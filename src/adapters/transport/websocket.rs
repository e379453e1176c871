//! WebSocket transport built on `tokio-tungstenite`.
//!
//! [`WebSocketTransport::connect`] validates the address and returns at once;
//! a supervisor task owns the socket and handles:
//!
//! - **Handshake**: `identify` frame sent first on every (re)connect
//! - **Outbound**: frames queued through an unbounded channel, so emits made
//!   while the socket is down are flushed once it is back
//! - **Inbound**: text frames decoded and fanned out to listeners
//! - **Reconnection**: exponential backoff per [`ReconnectPolicy`]
//! - **Keepalive**: periodic WebSocket pings
//!
//! ```text
//! emit() ──► write_tx ──► ┌────────────┐ ──► socket sink
//!                         │ supervisor │
//! on()  ◄── listeners ◄── └────────────┘ ◄── socket stream
//! ```

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use secrecy::ExposeSecret;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch, Notify};
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::handshake::client::Request;
use tokio_tungstenite::tungstenite::http::header::AUTHORIZATION;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use crate::domain::realtime::{
    ClientEvent, ListenerId, ListenerTable, CONNECT_EVENT, DISCONNECT_EVENT,
};
use crate::ports::{
    ConnectOptions, PayloadCallback, SocketConnection, SocketTransport, TransportError,
};

use super::wire::WireFrame;

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Connection state of a WebSocket connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Connecting,
    Open,
    Reconnecting,
    Disconnected,
    Closed,
}

/// Transport opening WebSocket connections on the current tokio runtime.
#[derive(Debug, Clone, Default)]
pub struct WebSocketTransport;

impl WebSocketTransport {
    /// Creates the transport.
    pub fn new() -> Self {
        Self
    }
}

impl SocketTransport for WebSocketTransport {
    fn connect(
        &self,
        url: &str,
        options: &ConnectOptions,
    ) -> Result<Arc<dyn SocketConnection>, TransportError> {
        // Validate eagerly so a bad address fails construction
        build_request(url, options)?;
        let runtime =
            tokio::runtime::Handle::try_current().map_err(|_| TransportError::NoRuntime)?;

        let (write_tx, write_rx) = mpsc::unbounded_channel::<String>();
        let (status_tx, _) = watch::channel(ConnectionStatus::Connecting);

        let shared = Arc::new(Shared {
            url: url.to_string(),
            listeners: ListenerTable::new(),
            write_tx,
            status_tx,
            closed: AtomicBool::new(false),
            shutdown: Notify::new(),
        });

        runtime.spawn(run_supervisor(shared.clone(), options.clone(), write_rx));

        tracing::debug!(url = %url, "WebSocket connection scheduled");
        Ok(Arc::new(WebSocketConnection { shared }))
    }
}

/// State shared between the connection handle and its supervisor task.
struct Shared {
    url: String,
    listeners: ListenerTable<Value>,
    write_tx: mpsc::UnboundedSender<String>,
    status_tx: watch::Sender<ConnectionStatus>,
    closed: AtomicBool,
    shutdown: Notify,
}

impl Shared {
    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn set_status(&self, status: ConnectionStatus) {
        self.status_tx.send_replace(status);
    }
}

/// Handle to a supervised WebSocket connection.
///
/// Dropping the last handle closes the connection.
pub struct WebSocketConnection {
    shared: Arc<Shared>,
}

impl WebSocketConnection {
    /// Current connection state.
    pub fn status(&self) -> ConnectionStatus {
        *self.shared.status_tx.borrow()
    }
}

impl Drop for WebSocketConnection {
    fn drop(&mut self) {
        self.close();
    }
}

#[async_trait]
impl SocketConnection for WebSocketConnection {
    fn url(&self) -> &str {
        &self.shared.url
    }

    fn emit(&self, event: &str, payload: Value) -> Result<(), TransportError> {
        if self.shared.is_closed() {
            return Err(TransportError::Closed);
        }
        let text = WireFrame::new(event, payload).encode()?;
        self.shared
            .write_tx
            .send(text)
            .map_err(|_| TransportError::Closed)
    }

    fn on(&self, event: &str, callback: PayloadCallback) -> ListenerId {
        self.shared.listeners.add(event, callback)
    }

    fn off(&self, listener: ListenerId) {
        self.shared.listeners.remove(listener);
    }

    fn close(&self) {
        if self.shared.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.shared.shutdown.notify_one();
        self.shared.set_status(ConnectionStatus::Closed);
        tracing::debug!(url = %self.shared.url, "WebSocket connection closed");
    }

    fn is_closed(&self) -> bool {
        self.shared.is_closed()
    }

    async fn wait_open(&self, timeout: Duration) -> Result<(), TransportError> {
        let mut status_rx = self.shared.status_tx.subscribe();

        let wait = async move {
            loop {
                let status = *status_rx.borrow_and_update();
                match status {
                    ConnectionStatus::Open => return Ok(()),
                    ConnectionStatus::Closed => return Err(TransportError::Closed),
                    _ => {}
                }
                if status_rx.changed().await.is_err() {
                    return Err(TransportError::Closed);
                }
            }
        };

        tokio::time::timeout(timeout, wait)
            .await
            .map_err(|_| TransportError::Timeout)?
    }
}

/// Builds the upgrade request, attaching the bearer token if any.
fn build_request(url: &str, options: &ConnectOptions) -> Result<Request, TransportError> {
    if !url.starts_with("ws://") && !url.starts_with("wss://") {
        return Err(TransportError::InvalidUrl {
            url: url.to_string(),
            reason: "expected ws:// or wss:// scheme".to_string(),
        });
    }

    let mut request = url
        .into_client_request()
        .map_err(|e| TransportError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    if let Some(token) = &options.auth_token {
        let value = HeaderValue::from_str(&format!("Bearer {}", token.expose_secret()))
            .map_err(|_| TransportError::ConnectFailed("auth token is not a valid header".into()))?;
        request.headers_mut().insert(AUTHORIZATION, value);
    }

    Ok(request)
}

/// Owns the socket for the lifetime of the connection, reconnecting as the
/// policy allows.
async fn run_supervisor(
    shared: Arc<Shared>,
    options: ConnectOptions,
    mut write_rx: mpsc::UnboundedReceiver<String>,
) {
    let mut failures = 0usize;
    let mut connected_before = false;

    loop {
        if shared.is_closed() {
            break;
        }

        let request = match build_request(&shared.url, &options) {
            Ok(request) => request,
            Err(e) => {
                tracing::error!(url = %shared.url, error = %e, "Cannot build WebSocket request");
                break;
            }
        };

        shared.set_status(if connected_before {
            ConnectionStatus::Reconnecting
        } else {
            ConnectionStatus::Connecting
        });

        let result = tokio::select! {
            result = tokio_tungstenite::connect_async(request) => result,
            _ = shared.shutdown.notified() => break,
        };

        match result {
            Ok((socket, _response)) => {
                tracing::info!(
                    url = %shared.url,
                    reconnected = connected_before,
                    "WebSocket connected"
                );
                shared.set_status(ConnectionStatus::Open);

                let reason = run_session(
                    &shared,
                    socket,
                    &options,
                    &mut write_rx,
                    connected_before,
                    failures,
                )
                .await;
                connected_before = true;
                failures = 0;

                if shared.is_closed() {
                    break;
                }
                shared.set_status(ConnectionStatus::Disconnected);
                tracing::warn!(url = %shared.url, reason = %reason, "WebSocket disconnected");
                shared
                    .listeners
                    .dispatch(DISCONNECT_EVENT, &json!({ "reason": reason }));
            }
            Err(e) => {
                tracing::warn!(url = %shared.url, error = %e, "WebSocket connect failed");
                shared.set_status(ConnectionStatus::Disconnected);
            }
        }

        failures += 1;
        if !options.reconnect.allows(failures) {
            tracing::error!(
                url = %shared.url,
                attempts = failures,
                "Giving up on WebSocket connection"
            );
            shared.closed.store(true, Ordering::SeqCst);
            break;
        }

        let delay = options.reconnect.delay_for(failures);
        tracing::info!(
            url = %shared.url,
            delay_ms = delay.as_millis() as u64,
            attempt = failures,
            "Reconnecting WebSocket"
        );

        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = shared.shutdown.notified() => break,
        }
    }

    shared.set_status(ConnectionStatus::Closed);
}

/// Drives one open socket until it drops or the connection is closed.
///
/// Returns the reason the session ended.
async fn run_session(
    shared: &Shared,
    socket: Socket,
    options: &ConnectOptions,
    write_rx: &mut mpsc::UnboundedReceiver<String>,
    reconnected: bool,
    attempt: usize,
) -> String {
    let (mut sink, mut stream) = socket.split();

    match WireFrame::new(ClientEvent::Identify.as_str(), options.handshake_payload()).encode() {
        Ok(text) => {
            if let Err(e) = sink.send(Message::Text(text)).await {
                return format!("handshake failed: {}", e);
            }
        }
        Err(e) => tracing::warn!(error = %e, "Skipping handshake"),
    }

    shared.listeners.dispatch(
        CONNECT_EVENT,
        &json!({ "reconnected": reconnected, "attempt": attempt }),
    );

    let mut keepalive = options.keepalive_interval.map(|period| {
        let mut interval = tokio::time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        interval
    });

    loop {
        tokio::select! {
            _ = shared.shutdown.notified() => {
                let _ = sink.send(Message::Close(None)).await;
                return "client closed".to_string();
            }
            outbound = write_rx.recv() => match outbound {
                Some(text) => {
                    if let Err(e) = sink.send(Message::Text(text)).await {
                        return format!("write failed: {}", e);
                    }
                }
                None => return "write channel closed".to_string(),
            },
            inbound = stream.next() => match inbound {
                Some(Ok(Message::Text(text))) => dispatch_text(shared, &text),
                Some(Ok(Message::Close(_))) => return "server closed".to_string(),
                Some(Ok(Message::Binary(_))) => {
                    tracing::warn!(url = %shared.url, "Ignoring unsupported binary frame");
                }
                // Ping/pong are answered by tungstenite
                Some(Ok(_)) => {}
                Some(Err(e)) => return format!("read failed: {}", e),
                None => return "stream ended".to_string(),
            },
            _ = next_tick(&mut keepalive) => {
                if let Err(e) = sink.send(Message::Ping(Vec::new())).await {
                    return format!("keepalive failed: {}", e);
                }
            }
        }
    }
}

async fn next_tick(interval: &mut Option<Interval>) {
    match interval {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}

fn dispatch_text(shared: &Shared, text: &str) {
    let frame = match WireFrame::decode(text) {
        Ok(frame) => frame,
        Err(e) => {
            tracing::warn!(url = %shared.url, error = %e, "Dropping malformed frame");
            return;
        }
    };

    if frame.event == CONNECT_EVENT || frame.event == DISCONNECT_EVENT {
        tracing::debug!(event = %frame.event, "Ignoring reserved event from server");
        return;
    }

    let delivered = shared.listeners.dispatch(&frame.event, &frame.data);
    tracing::trace!(event = %frame.event, listeners = delivered, "Dispatched server event");
}
