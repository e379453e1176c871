//! Application layer - Channel lifecycle and domain subscriptions.
//!
//! This layer coordinates the transport port with the real-time domain:
//! it owns channel connections, room membership and listener fan-out.

pub mod sockets;

pub use sockets::{
    BookingSocket, ChannelHandle, ConnectionRegistry, FieldAvailabilitySocket,
    NotificationSocket, RealtimeSockets, RoomChange, RoomRegistry, SocketHandles, Subscription,
};
