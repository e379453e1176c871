//! Socket event names and the envelope delivered to subscribers.
//!
//! Event names are the logical contract with the server. Server-pushed
//! events are listed in [`ServerEvent`], client-emitted ones in
//! [`ClientEvent`]. Payloads stay opaque JSON; typed views live in
//! [`super::payloads`].

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::foundation::Timestamp;

/// Lifecycle event dispatched by transports whenever a connection opens.
///
/// Payload: `{ "reconnected": bool, "attempt": n }`.
pub const CONNECT_EVENT: &str = "connect";

/// Lifecycle event dispatched by transports whenever a connection drops.
///
/// Payload: `{ "reason": string }`.
pub const DISCONNECT_EVENT: &str = "disconnect";

/// Events pushed by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServerEvent {
    /// A field's slots changed (booking made, slot blocked, ...).
    FieldAvailabilityChanged,
    /// Availability snapshot, usually answering an explicit request.
    FieldAvailabilityUpdate,
    /// A booking was created.
    BookingCreated,
    /// A booking or its payment changed.
    BookingUpdated,
    /// A booking was cancelled.
    BookingCancelled,
    /// A notification was created for the user.
    NotificationCreated,
    /// A notification was marked read.
    NotificationRead,
}

impl ServerEvent {
    /// Every server event.
    pub const ALL: [ServerEvent; 7] = [
        ServerEvent::FieldAvailabilityChanged,
        ServerEvent::FieldAvailabilityUpdate,
        ServerEvent::BookingCreated,
        ServerEvent::BookingUpdated,
        ServerEvent::BookingCancelled,
        ServerEvent::NotificationCreated,
        ServerEvent::NotificationRead,
    ];

    /// Wire name of the event.
    pub fn as_str(&self) -> &'static str {
        match self {
            ServerEvent::FieldAvailabilityChanged => "field:availability-changed",
            ServerEvent::FieldAvailabilityUpdate => "field:availability-update",
            ServerEvent::BookingCreated => "booking:created",
            ServerEvent::BookingUpdated => "booking:updated",
            ServerEvent::BookingCancelled => "booking:cancelled",
            ServerEvent::NotificationCreated => "notification:new",
            ServerEvent::NotificationRead => "notification:read",
        }
    }

    /// Looks up a server event by wire name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|event| event.as_str() == name)
    }
}

impl fmt::Display for ServerEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Events emitted by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClientEvent {
    /// Join a room. Payload: `{ "room": string }`.
    JoinRoom,
    /// Leave a room. Payload: `{ "room": string }`.
    LeaveRoom,
    /// Connection handshake announcing the client identity.
    Identify,
    /// Ask the server to push an availability snapshot for a field.
    RequestAvailability,
}

impl ClientEvent {
    /// Wire name of the event.
    pub fn as_str(&self) -> &'static str {
        match self {
            ClientEvent::JoinRoom => "join",
            ClientEvent::LeaveRoom => "leave",
            ClientEvent::Identify => "identify",
            ClientEvent::RequestAvailability => "field:request-availability",
        }
    }
}

impl fmt::Display for ClientEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An event as delivered to a subscriber callback.
///
/// The payload is passed through exactly as the server sent it. Server-side
/// error events are not distinguished here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SocketEvent {
    /// Wire name of the event.
    pub event: String,
    /// Raw payload.
    pub payload: serde_json::Value,
    /// When the local channel dispatched the event.
    pub received_at: Timestamp,
}

impl SocketEvent {
    /// Wraps a payload received for `event`.
    pub fn new(event: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            event: event.into(),
            payload,
            received_at: Timestamp::now(),
        }
    }

    /// The server event this envelope carries, if it is a known one.
    pub fn server_event(&self) -> Option<ServerEvent> {
        ServerEvent::from_name(&self.event)
    }

    /// Deserialize payload to a specific type.
    pub fn payload_as<T: for<'de> Deserialize<'de>>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.payload.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn server_event_names_roundtrip() {
        for event in ServerEvent::ALL {
            assert_eq!(ServerEvent::from_name(event.as_str()), Some(event));
        }
        assert_eq!(ServerEvent::from_name("booking:exploded"), None);
    }

    #[test]
    fn lifecycle_events_are_not_server_events() {
        assert_eq!(ServerEvent::from_name(CONNECT_EVENT), None);
        assert_eq!(ServerEvent::from_name(DISCONNECT_EVENT), None);
    }

    #[test]
    fn client_event_names() {
        assert_eq!(ClientEvent::JoinRoom.as_str(), "join");
        assert_eq!(ClientEvent::LeaveRoom.to_string(), "leave");
    }

    #[test]
    fn socket_event_payload_as_deserializes() {
        #[derive(Debug, Deserialize, PartialEq)]
        struct Reading {
            value: i32,
        }

        let event = SocketEvent::new("booking:updated", json!({"value": 42}));
        let reading: Reading = event.payload_as().unwrap();
        assert_eq!(reading.value, 42);
        assert_eq!(event.server_event(), Some(ServerEvent::BookingUpdated));
    }

    #[test]
    fn socket_event_payload_as_returns_error_on_mismatch() {
        #[derive(Debug, Deserialize)]
        #[allow(dead_code)]
        struct Reading {
            value: i32,
        }

        let event = SocketEvent::new("booking:updated", json!({"other": "x"}));
        assert!(event.payload_as::<Reading>().is_err());
    }
}
