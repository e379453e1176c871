//! In-memory socket transport for testing.
//!
//! Provides synchronous, deterministic event delivery for unit tests:
//! emitted frames are captured for assertions and "server" events are
//! injected by the test.
//!
//! # Example
//!
//! ```ignore
//! let transport = Arc::new(InMemoryTransport::new());
//! transport.fail_connections_to("/notifications");
//!
//! let sockets = RealtimeSockets::new(transport.clone(), &config);
//! let handles = sockets.initialize_sockets();
//!
//! let fields = transport.latest_connection_to("/fields").unwrap();
//! fields.server_emit("field:availability-changed", json!({"fieldId": 3}));
//! ```

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::domain::realtime::{
    ClientEvent, ListenerId, ListenerTable, CONNECT_EVENT, DISCONNECT_EVENT,
};
use crate::ports::{
    ConnectOptions, PayloadCallback, SocketConnection, SocketTransport, TransportError,
};

/// In-memory transport for testing.
///
/// Features:
/// - Connection capture for assertions
/// - Forced connect failures per URL fragment
/// - Handshake recorded like a real adapter would send it
pub struct InMemoryTransport {
    connections: RwLock<Vec<Arc<InMemoryConnection>>>,
    failing: RwLock<Vec<String>>,
    attempts: AtomicUsize,
}

impl InMemoryTransport {
    /// Creates a transport that accepts every connection.
    pub fn new() -> Self {
        Self {
            connections: RwLock::new(Vec::new()),
            failing: RwLock::new(Vec::new()),
            attempts: AtomicUsize::new(0),
        }
    }

    // === Test Helpers ===

    /// Makes every connect to a URL containing `fragment` fail.
    pub fn fail_connections_to(&self, fragment: impl Into<String>) {
        self.failing.write().push(fragment.into());
    }

    /// Lifts a failure installed by [`fail_connections_to`](Self::fail_connections_to).
    pub fn restore_connections_to(&self, fragment: &str) {
        self.failing.write().retain(|f| f != fragment);
    }

    /// Number of `connect` calls, failed ones included.
    pub fn connect_attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Every connection opened so far, in order.
    pub fn connections(&self) -> Vec<Arc<InMemoryConnection>> {
        self.connections.read().clone()
    }

    /// Connections whose URL contains `fragment`, in order.
    pub fn connections_to(&self, fragment: &str) -> Vec<Arc<InMemoryConnection>> {
        self.connections
            .read()
            .iter()
            .filter(|c| c.url.contains(fragment))
            .cloned()
            .collect()
    }

    /// Most recent connection whose URL contains `fragment`.
    pub fn latest_connection_to(&self, fragment: &str) -> Option<Arc<InMemoryConnection>> {
        self.connections_to(fragment).pop()
    }

    /// Most recent connection whose URL equals `url`.
    pub fn latest_connection(&self, url: &str) -> Option<Arc<InMemoryConnection>> {
        self.connections
            .read()
            .iter()
            .rev()
            .find(|c| c.url == url)
            .cloned()
    }
}

impl Default for InMemoryTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl SocketTransport for InMemoryTransport {
    fn connect(
        &self,
        url: &str,
        options: &ConnectOptions,
    ) -> Result<Arc<dyn SocketConnection>, TransportError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);

        if url.is_empty() {
            return Err(TransportError::InvalidUrl {
                url: url.to_string(),
                reason: "empty address".to_string(),
            });
        }
        if self.failing.read().iter().any(|f| url.contains(f.as_str())) {
            return Err(TransportError::ConnectFailed(format!(
                "connection to {} refused",
                url
            )));
        }

        let connection = Arc::new(InMemoryConnection::new(url, options.clone()));
        self.connections.write().push(connection.clone());
        Ok(connection)
    }
}

/// One in-memory connection.
///
/// Lifecycle listeners are stored alongside event listeners, exactly like
/// the WebSocket adapter does.
pub struct InMemoryConnection {
    url: String,
    options: ConnectOptions,
    listeners: ListenerTable<Value>,
    emitted: RwLock<Vec<(String, Value)>>,
    closed: AtomicBool,
}

impl InMemoryConnection {
    fn new(url: &str, options: ConnectOptions) -> Self {
        let connection = Self {
            url: url.to_string(),
            listeners: ListenerTable::new(),
            emitted: RwLock::new(Vec::new()),
            closed: AtomicBool::new(false),
            options,
        };
        connection.record_handshake();
        connection
    }

    fn record_handshake(&self) {
        self.emitted.write().push((
            ClientEvent::Identify.as_str().to_string(),
            self.options.handshake_payload(),
        ));
    }

    // === Test Helpers ===

    /// Options the connection was opened with.
    pub fn options(&self) -> &ConnectOptions {
        &self.options
    }

    /// Simulates the server pushing `event`.
    ///
    /// Returns the number of listeners invoked (0 once closed).
    pub fn server_emit(&self, event: &str, payload: Value) -> usize {
        if self.is_closed() {
            return 0;
        }
        self.listeners.dispatch(event, &payload)
    }

    /// Simulates the underlying socket dropping.
    pub fn simulate_disconnect(&self, reason: &str) {
        self.listeners
            .dispatch(DISCONNECT_EVENT, &json!({ "reason": reason }));
    }

    /// Simulates the underlying socket coming back on the same connection.
    ///
    /// Records a fresh handshake and dispatches a reconnect lifecycle event.
    pub fn simulate_reconnect(&self) {
        self.record_handshake();
        self.listeners.dispatch(
            CONNECT_EVENT,
            &json!({ "reconnected": true, "attempt": 1 }),
        );
    }

    /// Every frame emitted so far, handshakes included.
    pub fn emitted(&self) -> Vec<(String, Value)> {
        self.emitted.read().clone()
    }

    /// Payloads of frames emitted under `event`.
    pub fn emitted_named(&self, event: &str) -> Vec<Value> {
        self.emitted
            .read()
            .iter()
            .filter(|(name, _)| name == event)
            .map(|(_, payload)| payload.clone())
            .collect()
    }

    /// Rooms named in `join` frames, in emission order.
    pub fn joined_rooms(&self) -> Vec<String> {
        self.room_frames(ClientEvent::JoinRoom)
    }

    /// Rooms named in `leave` frames, in emission order.
    pub fn left_rooms(&self) -> Vec<String> {
        self.room_frames(ClientEvent::LeaveRoom)
    }

    fn room_frames(&self, event: ClientEvent) -> Vec<String> {
        self.emitted_named(event.as_str())
            .into_iter()
            .filter_map(|payload| payload["room"].as_str().map(str::to_string))
            .collect()
    }

    /// Clears captured frames (for test isolation).
    pub fn clear_emitted(&self) {
        self.emitted.write().clear();
    }

    /// Listeners registered for `event`.
    pub fn listener_count(&self, event: &str) -> usize {
        self.listeners.count(event)
    }
}

#[async_trait]
impl SocketConnection for InMemoryConnection {
    fn url(&self) -> &str {
        &self.url
    }

    fn emit(&self, event: &str, payload: Value) -> Result<(), TransportError> {
        if self.is_closed() {
            return Err(TransportError::Closed);
        }
        self.emitted.write().push((event.to_string(), payload));
        Ok(())
    }

    fn on(&self, event: &str, callback: PayloadCallback) -> ListenerId {
        self.listeners.add(event, callback)
    }

    fn off(&self, listener: ListenerId) {
        self.listeners.remove(listener);
    }

    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    async fn wait_open(&self, _timeout: Duration) -> Result<(), TransportError> {
        if self.is_closed() {
            return Err(TransportError::Closed);
        }
        Ok(())
    }
}
