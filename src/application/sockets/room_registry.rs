//! Per-channel room membership.
//!
//! The registry records which rooms a channel *wants* to be in and sends the
//! matching `join`/`leave` frames. Membership is optimistic: a room is
//! recorded before its frame goes out, so repeated joins collapse into one
//! frame and the recorded set can be replayed onto a fresh connection.
//!
//! ```text
//! Channel: fields
//! ├── field-availability
//! ├── field:3
//! └── field:7
//! ```

use parking_lot::RwLock;
use serde_json::json;
use std::collections::BTreeSet;

use crate::domain::realtime::{ClientEvent, RoomId};
use crate::ports::SocketConnection;

/// Outcome of a join or leave request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomChange {
    /// Membership changed and a frame was sent.
    Applied,
    /// Membership already matched the request; nothing was sent.
    Unchanged,
    /// The channel has no live connection; nothing was recorded.
    ChannelUnavailable,
}

impl RoomChange {
    /// Whether membership changed.
    pub fn is_applied(&self) -> bool {
        matches!(self, RoomChange::Applied)
    }
}

/// Desired room membership for one channel.
///
/// Rooms are kept ordered so replay is deterministic.
#[derive(Debug, Default)]
pub struct RoomRegistry {
    rooms: RwLock<BTreeSet<RoomId>>,
}

impl RoomRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `room` and emits `join` if it was not already recorded.
    pub fn join(&self, connection: &dyn SocketConnection, room: &RoomId) -> RoomChange {
        // Lock released before touching the transport
        let inserted = self.rooms.write().insert(room.clone());
        if !inserted {
            tracing::debug!(room = %room, url = %connection.url(), "Room already joined");
            return RoomChange::Unchanged;
        }

        send_room_frame(connection, ClientEvent::JoinRoom, room);
        tracing::debug!(room = %room, url = %connection.url(), "Joined room");
        RoomChange::Applied
    }

    /// Forgets `room` and emits `leave` if it was recorded.
    pub fn leave(&self, connection: &dyn SocketConnection, room: &RoomId) -> RoomChange {
        let removed = self.rooms.write().remove(room);
        if !removed {
            tracing::debug!(room = %room, url = %connection.url(), "Room not joined");
            return RoomChange::Unchanged;
        }

        send_room_frame(connection, ClientEvent::LeaveRoom, room);
        tracing::debug!(room = %room, url = %connection.url(), "Left room");
        RoomChange::Applied
    }

    /// Re-emits `join` for every recorded room, in lexical order.
    ///
    /// Returns the number of rooms replayed.
    pub fn replay(&self, connection: &dyn SocketConnection) -> usize {
        let rooms = self.rooms();
        for room in &rooms {
            send_room_frame(connection, ClientEvent::JoinRoom, room);
        }
        if !rooms.is_empty() {
            tracing::debug!(count = rooms.len(), url = %connection.url(), "Replayed room joins");
        }
        rooms.len()
    }

    /// Recorded rooms, in lexical order.
    pub fn rooms(&self) -> Vec<RoomId> {
        self.rooms.read().iter().cloned().collect()
    }

    /// Whether `room` is recorded.
    pub fn contains(&self, room: &RoomId) -> bool {
        self.rooms.read().contains(room)
    }

    /// Number of recorded rooms.
    pub fn len(&self) -> usize {
        self.rooms.read().len()
    }

    /// Whether no room is recorded.
    pub fn is_empty(&self) -> bool {
        self.rooms.read().is_empty()
    }

    /// Forgets every room without sending anything.
    pub fn clear(&self) {
        self.rooms.write().clear();
    }
}

fn send_room_frame(connection: &dyn SocketConnection, event: ClientEvent, room: &RoomId) {
    if let Err(error) = connection.emit(event.as_str(), json!({ "room": room.as_str() })) {
        tracing::debug!(
            room = %room,
            event = event.as_str(),
            error = %error,
            "Room frame not sent"
        );
    }
}
