//! Real-time socket layer.
//!
//! ```text
//! RealtimeSockets
//! ├── FieldAvailabilitySocket ─┐
//! ├── NotificationSocket ──────┼──► ConnectionRegistry ──► SocketTransport
//! └── BookingSocket ───────────┘        └── ChannelHandle per Channel
//!                                             └── RoomRegistry
//! ```

mod bookings;
mod channel;
mod connection_registry;
mod facade;
mod field_availability;
mod notifications;
mod room_registry;
mod subscription;

pub use bookings::BookingSocket;
pub use channel::ChannelHandle;
pub use connection_registry::ConnectionRegistry;
pub use facade::{RealtimeSockets, SocketHandles};
pub use field_availability::FieldAvailabilitySocket;
pub use notifications::NotificationSocket;
pub use room_registry::{RoomChange, RoomRegistry};
pub use subscription::Subscription;
