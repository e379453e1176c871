//! Real-time vocabulary: channels, rooms, event names and payloads.

mod channel;
mod events;
mod init_state;
mod listeners;
pub mod payloads;
mod room;

pub use channel::Channel;
pub use events::{ClientEvent, ServerEvent, SocketEvent, CONNECT_EVENT, DISCONNECT_EVENT};
pub use init_state::InitializationState;
pub use listeners::{Listener, ListenerId, ListenerTable, RemovedListener};
pub use payloads::{
    BookingChange, FieldAvailabilityChange, NotificationMessage, NotificationReadReceipt,
    PaymentStatus, PaymentSummary, TimeSlot,
};
pub use room::RoomId;
