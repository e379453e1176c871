//! SocketTransport port - Interface for event-based socket connections.
//!
//! The real-time layer never speaks a wire protocol itself. It needs a
//! bidirectional connection that can emit named events, register listeners
//! for named events, and be closed. Adapters supply that on top of a real
//! socket (WebSocket) or in memory for tests.
//!
//! ## Lifecycle events
//!
//! Adapters dispatch two reserved events to listeners registered on the
//! connection itself:
//!
//! - [`CONNECT_EVENT`](crate::domain::realtime::CONNECT_EVENT) every time the
//!   connection opens, with `{ "reconnected": bool, "attempt": n }`
//! - [`DISCONNECT_EVENT`](crate::domain::realtime::DISCONNECT_EVENT) every
//!   time it drops, with `{ "reason": string }`

use async_trait::async_trait;
use secrecy::SecretString;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

use crate::domain::foundation::{ClientId, UserId};
use crate::domain::realtime::{Listener, ListenerId};

/// Errors that can occur in transport operations.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TransportError {
    /// The server address cannot be used to open a connection.
    #[error("Invalid socket URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    /// The adapter needs an async runtime and none is running.
    #[error("No async runtime available to drive the connection")]
    NoRuntime,

    /// The connection could not be established.
    #[error("Connection failed: {0}")]
    ConnectFailed(String),

    /// The connection was closed locally.
    #[error("Connection closed")]
    Closed,

    /// Waiting for the connection to open took too long.
    #[error("Timed out waiting for connection")]
    Timeout,

    /// A payload could not be encoded.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Callback receiving a raw event payload.
pub type PayloadCallback = Listener<Value>;

/// Transport-level reconnection policy.
///
/// Delays grow exponentially from `initial_delay`, doubling per attempt,
/// capped at `max_delay`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// Whether the adapter reconnects on its own after a drop.
    pub enabled: bool,
    /// Attempts before giving up; 0 means unlimited.
    pub max_attempts: usize,
    /// Delay before the first attempt.
    pub initial_delay: Duration,
    /// Upper bound for any delay.
    pub max_delay: Duration,
}

impl ReconnectPolicy {
    /// Policy that never reconnects.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    /// Delay before the given 1-based attempt.
    pub fn delay_for(&self, attempt: usize) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16) as u32;
        self.initial_delay
            .saturating_mul(2u32.saturating_pow(exponent))
            .min(self.max_delay)
    }

    /// Whether the given 1-based attempt may run.
    pub fn allows(&self, attempt: usize) -> bool {
        self.enabled && (self.max_attempts == 0 || attempt <= self.max_attempts)
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            max_attempts: 0,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_millis(8_000),
        }
    }
}

/// Options handed to [`SocketTransport::connect`].
#[derive(Debug, Clone)]
pub struct ConnectOptions {
    /// Identity announced in the handshake.
    pub client_id: ClientId,
    /// Signed-in user, if any.
    pub user_id: Option<UserId>,
    /// Bearer token presented on connect.
    pub auth_token: Option<SecretString>,
    /// Transport-level reconnection.
    pub reconnect: ReconnectPolicy,
    /// Interval between keepalive pings; `None` disables them.
    pub keepalive_interval: Option<Duration>,
}

impl ConnectOptions {
    /// Options for the given client with default policies.
    pub fn new(client_id: ClientId) -> Self {
        Self {
            client_id,
            user_id: None,
            auth_token: None,
            reconnect: ReconnectPolicy::default(),
            keepalive_interval: None,
        }
    }

    /// Sets the user announced in the handshake.
    pub fn with_user(mut self, user_id: UserId) -> Self {
        self.user_id = Some(user_id);
        self
    }

    /// Sets the bearer token.
    pub fn with_auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(SecretString::new(token.into()));
        self
    }

    /// Sets the reconnection policy.
    pub fn with_reconnect(mut self, policy: ReconnectPolicy) -> Self {
        self.reconnect = policy;
        self
    }

    /// Payload of the `identify` handshake event.
    pub fn handshake_payload(&self) -> Value {
        json!({
            "clientId": self.client_id.to_string(),
            "userId": self.user_id.map(|u| u.value()),
        })
    }
}

/// A live, event-based socket connection.
///
/// Implementations must:
/// - Deliver events for one event name to listeners in emission order
/// - Make `off` and `close` idempotent
/// - Never invoke listeners while holding locks that `on`/`off`/`emit` take
#[async_trait]
pub trait SocketConnection: Send + Sync {
    /// Address this connection was opened against.
    fn url(&self) -> &str;

    /// Sends an event to the server.
    ///
    /// Adapters may buffer while the underlying socket is (re)connecting.
    /// Fails with [`TransportError::Closed`] after `close`.
    fn emit(&self, event: &str, payload: Value) -> Result<(), TransportError>;

    /// Registers a listener for a server event or lifecycle event.
    fn on(&self, event: &str, callback: PayloadCallback) -> ListenerId;

    /// Removes one listener. Unknown ids are ignored.
    fn off(&self, listener: ListenerId);

    /// Closes the connection and stops any reconnection.
    fn close(&self);

    /// Whether `close` was called (or the adapter gave up reconnecting).
    fn is_closed(&self) -> bool;

    /// Resolves once the connection is open.
    async fn wait_open(&self, timeout: Duration) -> Result<(), TransportError>;
}

/// Factory for socket connections.
///
/// `connect` returns immediately; establishing the socket happens in the
/// background. Errors returned here are construction errors (bad address,
/// no runtime), never network errors.
pub trait SocketTransport: Send + Sync {
    /// Opens a connection to `url`.
    fn connect(
        &self,
        url: &str,
        options: &ConnectOptions,
    ) -> Result<Arc<dyn SocketConnection>, TransportError>;
}
