//! Composition root for the real-time layer.
//!
//! `RealtimeSockets` builds the [`ConnectionRegistry`] once and injects it
//! into the domain modules, so every consumer shares the same three
//! channels.
//!
//! # Example
//!
//! ```ignore
//! let sockets = RealtimeSockets::new(Arc::new(WebSocketTransport::new()), &config.socket);
//! let handles = sockets.initialize_sockets();
//! tracing::info!(state = %handles.state(), "Sockets initialized");
//!
//! sockets.bookings().join_user_booking_room(user_id);
//! let _updates = sockets.bookings().subscribe_to_booking_updates(|event| {
//!     tracing::info!(payload = %event.payload, "Booking updated");
//! });
//! ```

use std::sync::Arc;

use crate::config::SocketConfig;
use crate::domain::foundation::ClientId;
use crate::domain::realtime::{Channel, InitializationState, RoomId};
use crate::ports::SocketTransport;

use super::bookings::BookingSocket;
use super::channel::ChannelHandle;
use super::connection_registry::ConnectionRegistry;
use super::field_availability::FieldAvailabilitySocket;
use super::notifications::NotificationSocket;
use super::room_registry::RoomChange;

/// Result of [`RealtimeSockets::initialize_sockets`].
///
/// A `None` slot is a channel that failed to connect.
#[derive(Debug, Clone, Default)]
pub struct SocketHandles {
    pub root: Option<ChannelHandle>,
    pub fields: Option<ChannelHandle>,
    pub notifications: Option<ChannelHandle>,
}

impl SocketHandles {
    /// Handle for `channel`.
    pub fn get(&self, channel: Channel) -> Option<&ChannelHandle> {
        match channel {
            Channel::Root => self.root.as_ref(),
            Channel::Fields => self.fields.as_ref(),
            Channel::Notifications => self.notifications.as_ref(),
        }
    }

    /// Channels that failed to initialize.
    pub fn missing(&self) -> Vec<Channel> {
        Channel::ALL
            .into_iter()
            .filter(|c| self.get(*c).is_none())
            .collect()
    }

    /// How many channels came up.
    pub fn state(&self) -> InitializationState {
        let live = Channel::ALL
            .iter()
            .filter(|c| self.get(**c).is_some())
            .count();
        InitializationState::from_counts(live, Channel::ALL.len())
    }
}

/// Entry point for consumers of the real-time layer.
#[derive(Clone)]
pub struct RealtimeSockets {
    registry: Arc<ConnectionRegistry>,
    field_availability: FieldAvailabilitySocket,
    notifications: NotificationSocket,
    bookings: BookingSocket,
}

impl RealtimeSockets {
    /// Wires the registry and domain modules. Opens nothing.
    pub fn new(transport: Arc<dyn SocketTransport>, config: &SocketConfig) -> Self {
        Self::from_registry(Arc::new(ConnectionRegistry::new(transport, config)))
    }

    /// Wires the domain modules around an existing registry.
    pub fn from_registry(registry: Arc<ConnectionRegistry>) -> Self {
        Self {
            field_availability: FieldAvailabilitySocket::new(registry.clone()),
            notifications: NotificationSocket::new(registry.clone()),
            bookings: BookingSocket::new(registry.clone()),
            registry,
        }
    }

    /// Initializes root, fields and notifications in sequence.
    ///
    /// A failing channel does not stop the others. Safe to call again:
    /// live channels are returned as they are, and channels whose
    /// connection died are reopened.
    pub fn initialize_sockets(&self) -> SocketHandles {
        let handles = SocketHandles {
            root: self.init_socket(),
            fields: self.init_fields_socket(),
            notifications: self.init_notification_socket(),
        };

        let state = handles.state();
        if state == InitializationState::FullyInitialized {
            tracing::info!(state = %state, "Sockets initialized");
        } else {
            tracing::warn!(
                state = %state,
                missing = ?handles.missing(),
                "Sockets partially initialized"
            );
        }
        handles
    }

    /// Closes every channel.
    pub fn shutdown(&self) {
        self.registry.disconnect_all();
    }

    /// Shared connection registry.
    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    /// Identity announced in every handshake.
    pub fn client_id(&self) -> ClientId {
        self.registry.client_id()
    }

    /// Field availability rooms and events.
    pub fn field_availability(&self) -> &FieldAvailabilitySocket {
        &self.field_availability
    }

    /// Notification rooms and events.
    pub fn notifications(&self) -> &NotificationSocket {
        &self.notifications
    }

    /// Booking rooms and events.
    pub fn bookings(&self) -> &BookingSocket {
        &self.bookings
    }

    // === Root channel ===

    /// Returns the root channel, connecting it if needed.
    pub fn init_socket(&self) -> Option<ChannelHandle> {
        self.registry.init(Channel::Root)
    }

    /// Returns the root channel without connecting.
    pub fn get_socket(&self) -> Option<ChannelHandle> {
        self.registry.get(Channel::Root)
    }

    /// Closes the root channel.
    pub fn disconnect_socket(&self) {
        self.registry.disconnect(Channel::Root);
    }

    /// Joins `room` on the root channel if it is live.
    pub fn join_room(&self, room: &RoomId) -> RoomChange {
        self.registry.join(Channel::Root, room)
    }

    /// Leaves `room` on the root channel if it is live.
    pub fn leave_room(&self, room: &RoomId) -> RoomChange {
        self.registry.leave(Channel::Root, room)
    }

    // === Fields channel ===

    /// Returns the fields channel, connecting it if needed.
    pub fn init_fields_socket(&self) -> Option<ChannelHandle> {
        self.registry.init(Channel::Fields)
    }

    /// Returns the fields channel without connecting.
    pub fn get_fields_socket(&self) -> Option<ChannelHandle> {
        self.registry.get(Channel::Fields)
    }

    /// Closes the fields channel.
    pub fn disconnect_fields_socket(&self) {
        self.registry.disconnect(Channel::Fields);
    }

    /// Joins `room` on the fields channel if it is live.
    pub fn join_fields_room(&self, room: &RoomId) -> RoomChange {
        self.registry.join(Channel::Fields, room)
    }

    /// Leaves `room` on the fields channel if it is live.
    pub fn leave_fields_room(&self, room: &RoomId) -> RoomChange {
        self.registry.leave(Channel::Fields, room)
    }

    // === Notifications channel ===

    /// Returns the notifications channel, connecting it if needed.
    pub fn init_notification_socket(&self) -> Option<ChannelHandle> {
        self.registry.init(Channel::Notifications)
    }

    /// Returns the notifications channel without connecting.
    pub fn get_notification_socket(&self) -> Option<ChannelHandle> {
        self.registry.get(Channel::Notifications)
    }

    /// Closes the notifications channel.
    pub fn disconnect_notification_socket(&self) {
        self.registry.disconnect(Channel::Notifications);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::transport::InMemoryTransport;
    use crate::domain::foundation::FieldId;

    fn sockets() -> (Arc<InMemoryTransport>, RealtimeSockets) {
        let transport = Arc::new(InMemoryTransport::new());
        let sockets = RealtimeSockets::new(transport.clone(), &SocketConfig::default());
        (transport, sockets)
    }

    #[test]
    fn construction_opens_nothing() {
        let (transport, sockets) = sockets();
        assert_eq!(transport.connect_attempts(), 0);
        assert!(sockets.get_socket().is_none());
    }

    #[test]
    fn initialize_sockets_brings_up_every_channel() {
        let (transport, sockets) = sockets();

        let handles = sockets.initialize_sockets();

        assert_eq!(handles.state(), InitializationState::FullyInitialized);
        assert!(handles.missing().is_empty());
        assert_eq!(transport.connections().len(), 3);
    }

    #[test]
    fn one_failing_channel_leaves_others_usable() {
        let (transport, sockets) = sockets();
        transport.fail_connections_to("/notifications");

        let handles = sockets.initialize_sockets();

        assert_eq!(handles.state(), InitializationState::PartiallyInitialized);
        assert_eq!(handles.missing(), vec![Channel::Notifications]);
        assert!(handles.root.is_some());
        assert!(handles.fields.is_some());
    }

    #[test]
    fn retry_reuses_live_channels() {
        let (transport, sockets) = sockets();
        transport.fail_connections_to("/fields");
        let first = sockets.initialize_sockets();
        transport.restore_connections_to("/fields");

        let second = sockets.initialize_sockets();

        assert_eq!(second.state(), InitializationState::FullyInitialized);
        assert!(first
            .root
            .as_ref()
            .unwrap()
            .same_channel(second.root.as_ref().unwrap()));
        assert_eq!(transport.connections().len(), 3);
    }

    #[test]
    fn all_channels_failing_is_uninitialized() {
        let (transport, sockets) = sockets();
        transport.fail_connections_to("ws://");

        assert_eq!(
            sockets.initialize_sockets().state(),
            InitializationState::Uninitialized
        );
    }

    #[test]
    fn per_channel_wrappers_route_to_their_channel() {
        let (transport, sockets) = sockets();
        sockets.initialize_sockets();
        let room = RoomId::field(FieldId::new(1));

        assert_eq!(sockets.join_fields_room(&room), RoomChange::Applied);
        assert_eq!(sockets.join_room(&room), RoomChange::Applied);
        assert_eq!(sockets.leave_fields_room(&room), RoomChange::Applied);
        assert_eq!(sockets.leave_room(&room), RoomChange::Applied);

        let fields = transport.latest_connection_to("/fields").unwrap();
        assert_eq!(fields.joined_rooms(), vec!["field:1".to_string()]);
        assert!(sockets.get_fields_socket().unwrap().joined_rooms().is_empty());
    }

    #[test]
    fn disconnect_wrappers_clear_their_channel() {
        let (_, sockets) = sockets();
        sockets.initialize_sockets();

        sockets.disconnect_socket();
        sockets.disconnect_fields_socket();

        assert!(sockets.get_socket().is_none());
        assert!(sockets.get_fields_socket().is_none());
        assert!(sockets.get_notification_socket().is_some());

        sockets.shutdown();
        assert!(sockets.get_notification_socket().is_none());
    }
}
