//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the real-time layer and the outside world. Adapters implement these ports.
//!
//! ## Transport Ports
//!
//! - `SocketTransport` - Factory opening event-based socket connections
//! - `SocketConnection` - One live connection: emit, on/off, close

mod socket_transport;

pub use socket_transport::{
    ConnectOptions, PayloadCallback, ReconnectPolicy, SocketConnection, SocketTransport,
    TransportError,
};
