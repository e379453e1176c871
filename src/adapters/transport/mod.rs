//! Socket transport adapters.
//!
//! Adapters implement the [`SocketTransport`](crate::ports::SocketTransport)
//! port for different environments:
//!
//! - `WebSocketTransport` - `tokio-tungstenite` client with reconnection
//! - `InMemoryTransport` - Synchronous, in-process transport for testing

mod in_memory;
mod websocket;
mod wire;

pub use in_memory::{InMemoryConnection, InMemoryTransport};
pub use websocket::{ConnectionStatus, WebSocketConnection, WebSocketTransport};
pub use wire::WireFrame;
