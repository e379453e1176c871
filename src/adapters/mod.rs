//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the real-time layer to external systems:
//! - `transport` - Socket transports (WebSocket, in-memory)

pub mod transport;

pub use transport::{InMemoryConnection, InMemoryTransport, WebSocketTransport};
