//! One live socket channel.
//!
//! A channel owns its current transport connection and everything that must
//! survive replacing it:
//!
//! ```text
//! ChannelHandle (fields)
//! ├── connection ──► SocketConnection (swappable)
//! │     ├── forwarder: field:availability-update ──┐
//! │     ├── forwarder: field:availability-changed ─┤
//! │     └── lifecycle: connect (room replay)       │
//! ├── listeners ◄──────────────────────────────────┘ local fan-out
//! └── rooms: RoomRegistry
//! ```
//!
//! Consumers register on the local fan-out table. The channel attaches one
//! forwarder per event name to the connection, and re-attaches all of them
//! when the connection is replaced.

use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use crate::domain::realtime::{
    Channel, ListenerId, ListenerTable, RoomId, SocketEvent, CONNECT_EVENT, DISCONNECT_EVENT,
};
use crate::ports::{PayloadCallback, SocketConnection, TransportError};

use super::room_registry::{RoomChange, RoomRegistry};
use super::subscription::Subscription;

/// Cloneable handle to a live channel.
///
/// Clones share the same connection, listeners and rooms.
#[derive(Clone)]
pub struct ChannelHandle {
    inner: Arc<ChannelInner>,
}

struct ChannelInner {
    channel: Channel,
    connection: RwLock<Arc<dyn SocketConnection>>,
    listeners: ListenerTable<SocketEvent>,
    /// Forwarder registered on the current connection, per event name.
    forwarders: Mutex<HashMap<String, ListenerId>>,
    /// Lifecycle listeners registered on the current connection.
    lifecycle: Mutex<Vec<ListenerId>>,
    rooms: RoomRegistry,
    closed: AtomicBool,
}

impl ChannelHandle {
    /// Wraps a freshly opened connection.
    pub fn new(channel: Channel, connection: Arc<dyn SocketConnection>) -> Self {
        let inner = Arc::new(ChannelInner {
            channel,
            connection: RwLock::new(connection.clone()),
            listeners: ListenerTable::new(),
            forwarders: Mutex::new(HashMap::new()),
            lifecycle: Mutex::new(Vec::new()),
            rooms: RoomRegistry::new(),
            closed: AtomicBool::new(false),
        });
        ChannelInner::attach_lifecycle(&inner, connection.as_ref());
        Self { inner }
    }

    /// Which channel this is.
    pub fn channel(&self) -> Channel {
        self.inner.channel
    }

    /// Address of the current connection.
    pub fn url(&self) -> String {
        self.connection().url().to_string()
    }

    /// Whether the channel is unusable: closed by a disconnect, or its
    /// transport connection shut down for good.
    pub fn is_closed(&self) -> bool {
        self.is_released() || self.connection().is_closed()
    }

    /// Whether the transport connection died while the handle stayed open.
    pub fn needs_reconnect(&self) -> bool {
        !self.is_released() && self.connection().is_closed()
    }

    fn is_released(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }

    /// Whether two handles refer to the same channel instance.
    pub fn same_channel(&self, other: &ChannelHandle) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Registers `callback` for `event`.
    ///
    /// Returns an inactive subscription if the handle is closed.
    pub fn subscribe<F>(&self, event: &str, callback: F) -> Subscription
    where
        F: Fn(&SocketEvent) + Send + Sync + 'static,
    {
        if self.is_closed() {
            tracing::warn!(
                channel = %self.inner.channel,
                event = %event,
                "Subscribe on closed channel"
            );
            return Subscription::inactive(event);
        }

        let released = Arc::new(AtomicBool::new(false));
        let guard = released.clone();
        let id = self.inner.listeners.add(
            event,
            Arc::new(move |socket_event: &SocketEvent| {
                if !guard.load(Ordering::SeqCst) {
                    callback(socket_event);
                }
            }),
        );
        ChannelInner::ensure_forwarder(&self.inner, event);

        tracing::debug!(
            channel = %self.inner.channel,
            event = %event,
            listener = %id,
            "Subscribed"
        );

        let weak = Arc::downgrade(&self.inner);
        Subscription::active(self.inner.channel, event, released, move || {
            if let Some(inner) = weak.upgrade() {
                inner.remove_listener(id);
            }
        })
    }

    /// Joins `room` on this channel.
    pub fn join(&self, room: &RoomId) -> RoomChange {
        if self.is_closed() {
            return RoomChange::ChannelUnavailable;
        }
        let connection = self.connection();
        self.inner.rooms.join(connection.as_ref(), room)
    }

    /// Leaves `room` on this channel.
    ///
    /// On a dead connection the room is still forgotten so it is not
    /// replayed once the channel is revived.
    pub fn leave(&self, room: &RoomId) -> RoomChange {
        if self.is_released() {
            return RoomChange::ChannelUnavailable;
        }
        let connection = self.connection();
        self.inner.rooms.leave(connection.as_ref(), room)
    }

    /// Rooms this channel has joined, in lexical order.
    pub fn joined_rooms(&self) -> Vec<RoomId> {
        self.inner.rooms.rooms()
    }

    /// Whether `room` is joined.
    pub fn is_in_room(&self, room: &RoomId) -> bool {
        self.inner.rooms.contains(room)
    }

    /// Sends a client event.
    pub fn emit(&self, event: &str, payload: Value) -> Result<(), TransportError> {
        if self.is_closed() {
            return Err(TransportError::Closed);
        }
        self.connection().emit(event, payload)
    }

    /// Number of local listeners for `event`.
    pub fn listener_count(&self, event: &str) -> usize {
        self.inner.listeners.count(event)
    }

    /// Waits until the transport reports the connection open.
    pub async fn ready(&self, timeout: Duration) -> Result<(), TransportError> {
        if self.is_closed() {
            return Err(TransportError::Closed);
        }
        let connection = self.connection();
        connection.wait_open(timeout).await
    }

    /// Swaps in a fresh connection.
    ///
    /// Forwarders and the lifecycle listener move to the new connection,
    /// recorded rooms are replayed onto it, then the old one is closed.
    /// Returns `false` and closes `connection` if the handle was already
    /// closed by a disconnect.
    pub fn replace_connection(&self, connection: Arc<dyn SocketConnection>) -> bool {
        self.swap_connection(connection, false)
    }

    /// Swaps in `connection` only if the current one has shut down.
    ///
    /// Returns `false` and closes `connection` when the handle was closed
    /// by a disconnect or another caller already revived it.
    pub fn revive(&self, connection: Arc<dyn SocketConnection>) -> bool {
        self.swap_connection(connection, true)
    }

    fn swap_connection(&self, connection: Arc<dyn SocketConnection>, only_if_dead: bool) -> bool {
        let inner = &self.inner;

        let old = {
            let mut current = inner.connection.write();
            if self.is_released() || (only_if_dead && !current.is_closed()) {
                drop(current);
                connection.close();
                return false;
            }
            std::mem::replace(&mut *current, connection.clone())
        };

        {
            let mut forwarders = inner.forwarders.lock();
            for (_, id) in forwarders.drain() {
                old.off(id);
            }
            for event in inner.listeners.events() {
                let id = connection.on(&event, ChannelInner::forwarder(inner, &event));
                forwarders.insert(event, id);
            }
        }
        {
            let mut lifecycle = inner.lifecycle.lock();
            for id in lifecycle.drain(..) {
                old.off(id);
            }
        }
        ChannelInner::attach_lifecycle(inner, connection.as_ref());

        let replayed = inner.rooms.replay(connection.as_ref());
        old.close();

        // A disconnect that raced the swap may have missed the new wiring
        if self.is_released() {
            connection.close();
            return false;
        }

        tracing::info!(
            channel = %inner.channel,
            url = %connection.url(),
            rooms = replayed,
            "Channel connection replaced"
        );
        true
    }

    /// Closes the connection and drops every listener. Idempotent.
    pub fn close(&self) {
        if self.inner.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        let connection = self.connection();

        let forwarders: Vec<ListenerId> = self
            .inner
            .forwarders
            .lock()
            .drain()
            .map(|(_, id)| id)
            .collect();
        let lifecycle: Vec<ListenerId> = self.inner.lifecycle.lock().drain(..).collect();
        for id in forwarders.into_iter().chain(lifecycle) {
            connection.off(id);
        }
        connection.close();
        self.inner.listeners.clear();

        tracing::info!(channel = %self.inner.channel, url = %connection.url(), "Channel closed");
    }

    fn connection(&self) -> Arc<dyn SocketConnection> {
        self.inner.connection.read().clone()
    }
}

impl std::fmt::Debug for ChannelHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelHandle")
            .field("channel", &self.inner.channel)
            .field("url", &self.url())
            .field("closed", &self.is_closed())
            .field("rooms", &self.inner.rooms.len())
            .finish()
    }
}

impl ChannelInner {
    fn forwarder(inner: &Arc<ChannelInner>, event: &str) -> PayloadCallback {
        let weak: Weak<ChannelInner> = Arc::downgrade(inner);
        let event = event.to_string();
        Arc::new(move |payload: &Value| {
            if let Some(inner) = weak.upgrade() {
                let socket_event = SocketEvent::new(event.as_str(), payload.clone());
                let delivered = inner.listeners.dispatch(&event, &socket_event);
                tracing::trace!(
                    channel = %inner.channel,
                    event = %event,
                    delivered,
                    "Event dispatched"
                );
            }
        })
    }

    /// Attaches a forwarder for `event` unless one exists.
    fn ensure_forwarder(inner: &Arc<ChannelInner>, event: &str) {
        let mut forwarders = inner.forwarders.lock();
        if forwarders.contains_key(event) {
            return;
        }
        let connection = inner.connection.read().clone();
        let id = connection.on(event, Self::forwarder(inner, event));
        forwarders.insert(event.to_string(), id);
    }

    /// Removes a local listener; detaches the forwarder once none remain.
    fn remove_listener(&self, id: ListenerId) {
        let Some(removed) = self.listeners.remove(id) else {
            return;
        };
        if removed.remaining > 0 {
            return;
        }

        let mut forwarders = self.forwarders.lock();
        // A subscribe may have raced in after the removal
        if self.listeners.count(&removed.event) > 0 {
            return;
        }
        if let Some(forwarder) = forwarders.remove(&removed.event) {
            self.connection.read().off(forwarder);
        }
    }

    fn attach_lifecycle(inner: &Arc<ChannelInner>, connection: &dyn SocketConnection) {
        let on_connect = {
            let weak = Arc::downgrade(inner);
            connection.on(
                CONNECT_EVENT,
                Arc::new(move |payload: &Value| {
                    let Some(inner) = weak.upgrade() else {
                        return;
                    };
                    if payload["reconnected"] != true {
                        return;
                    }
                    let connection = inner.connection.read().clone();
                    let replayed = inner.rooms.replay(connection.as_ref());
                    tracing::info!(
                        channel = %inner.channel,
                        rooms = replayed,
                        "Channel reconnected, rooms re-joined"
                    );
                }),
            )
        };
        let on_disconnect = {
            let weak = Arc::downgrade(inner);
            connection.on(
                DISCONNECT_EVENT,
                Arc::new(move |payload: &Value| {
                    if let Some(inner) = weak.upgrade() {
                        tracing::info!(
                            channel = %inner.channel,
                            reason = %payload["reason"].as_str().unwrap_or("unknown"),
                            "Channel disconnected"
                        );
                    }
                }),
            )
        };
        inner.lifecycle.lock().extend([on_connect, on_disconnect]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::transport::{InMemoryConnection, InMemoryTransport};
    use crate::domain::foundation::{ClientId, FieldId};
    use crate::ports::{ConnectOptions, SocketTransport};
    use serde_json::json;
    use std::sync::atomic::AtomicUsize;

    fn open(transport: &InMemoryTransport) -> (ChannelHandle, Arc<InMemoryConnection>) {
        let connection = transport
            .connect("ws://test/fields", &ConnectOptions::new(ClientId::new()))
            .unwrap();
        let recorded = transport.latest_connection_to("/fields").unwrap();
        (ChannelHandle::new(Channel::Fields, connection), recorded)
    }

    fn counter() -> (Arc<AtomicUsize>, impl Fn(&SocketEvent) + Send + Sync + 'static) {
        let hits = Arc::new(AtomicUsize::new(0));
        let clone = hits.clone();
        (hits, move |_: &SocketEvent| {
            clone.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn subscribers_share_one_forwarder() {
        let transport = InMemoryTransport::new();
        let (channel, recorded) = open(&transport);
        let (first_hits, first) = counter();
        let (second_hits, second) = counter();

        let _a = channel.subscribe("field:availability-changed", first);
        let _b = channel.subscribe("field:availability-changed", second);

        assert_eq!(recorded.listener_count("field:availability-changed"), 1);
        recorded.server_emit("field:availability-changed", json!({"fieldId": 1}));

        assert_eq!(first_hits.load(Ordering::SeqCst), 1);
        assert_eq!(second_hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn event_envelope_carries_name_and_payload() {
        let transport = InMemoryTransport::new();
        let (channel, recorded) = open(&transport);
        let seen = Arc::new(Mutex::new(None));

        let slot = seen.clone();
        let _sub = channel.subscribe("field:availability-update", move |event| {
            *slot.lock() = Some(event.clone());
        });
        recorded.server_emit("field:availability-update", json!({"fieldId": 4}));

        let event = seen.lock().clone().unwrap();
        assert_eq!(event.event, "field:availability-update");
        assert_eq!(event.payload["fieldId"], 4);
    }

    #[test]
    fn last_unsubscribe_detaches_forwarder() {
        let transport = InMemoryTransport::new();
        let (channel, recorded) = open(&transport);
        let (hits, callback) = counter();

        let sub = channel.subscribe("booking:updated", callback);
        sub.unsubscribe();

        assert_eq!(recorded.listener_count("booking:updated"), 0);
        assert_eq!(channel.listener_count("booking:updated"), 0);
        assert_eq!(recorded.server_emit("booking:updated", json!({})), 0);
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn callback_may_unsubscribe_itself() {
        let transport = InMemoryTransport::new();
        let (channel, recorded) = open(&transport);
        let hits = Arc::new(AtomicUsize::new(0));
        let slot: Arc<Mutex<Option<Subscription>>> = Arc::new(Mutex::new(None));

        let (hits_clone, slot_clone) = (hits.clone(), slot.clone());
        let sub = channel.subscribe("notification:new", move |_| {
            hits_clone.fetch_add(1, Ordering::SeqCst);
            let own = slot_clone.lock().take();
            if let Some(own) = own {
                own.unsubscribe();
            }
        });
        *slot.lock() = Some(sub);

        recorded.server_emit("notification:new", json!({}));
        recorded.server_emit("notification:new", json!({}));

        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn released_listener_is_skipped_mid_dispatch() {
        let transport = InMemoryTransport::new();
        let (channel, recorded) = open(&transport);
        let (later_hits, later) = counter();
        let slot: Arc<Mutex<Option<Subscription>>> = Arc::new(Mutex::new(None));

        let slot_clone = slot.clone();
        let _first = channel.subscribe("booking:cancelled", move |_| {
            if let Some(other) = slot_clone.lock().take() {
                other.unsubscribe();
            }
        });
        *slot.lock() = Some(channel.subscribe("booking:cancelled", later));

        recorded.server_emit("booking:cancelled", json!({}));
        assert_eq!(later_hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn transport_reconnect_replays_rooms() {
        let transport = InMemoryTransport::new();
        let (channel, recorded) = open(&transport);
        channel.join(&RoomId::field(FieldId::new(3)));
        channel.join(&RoomId::field_availability(None));
        recorded.clear_emitted();

        recorded.simulate_reconnect();

        assert_eq!(
            recorded.joined_rooms(),
            vec!["field-availability".to_string(), "field:3".to_string()]
        );
    }

    #[test]
    fn plain_connect_event_does_not_replay() {
        let transport = InMemoryTransport::new();
        let (channel, recorded) = open(&transport);
        channel.join(&RoomId::field(FieldId::new(3)));
        recorded.clear_emitted();

        recorded.server_emit(CONNECT_EVENT, json!({"reconnected": false, "attempt": 0}));
        assert!(recorded.joined_rooms().is_empty());
    }

    #[test]
    fn replace_connection_moves_listeners_and_rooms() {
        let transport = InMemoryTransport::new();
        let (channel, old) = open(&transport);
        let (hits, callback) = counter();
        let _sub = channel.subscribe("field:availability-changed", callback);
        channel.join(&RoomId::field(FieldId::new(8)));

        let fresh = transport
            .connect("ws://test/fields", &ConnectOptions::new(ClientId::new()))
            .unwrap();
        channel.replace_connection(fresh);
        let new = transport.latest_connection_to("/fields").unwrap();

        assert!(old.is_closed());
        assert_eq!(new.joined_rooms(), vec!["field:8".to_string()]);
        assert_eq!(old.server_emit("field:availability-changed", json!({})), 0);
        new.server_emit("field:availability-changed", json!({}));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn closed_channel_rejects_everything() {
        let transport = InMemoryTransport::new();
        let (channel, recorded) = open(&transport);
        let (hits, callback) = counter();
        let _sub = channel.subscribe("notification:read", callback);

        channel.close();
        channel.close();

        assert!(recorded.is_closed());
        assert_eq!(
            channel.join(&RoomId::field(FieldId::new(1))),
            RoomChange::ChannelUnavailable
        );
        assert!(matches!(
            channel.emit("x", json!({})),
            Err(TransportError::Closed)
        ));
        assert!(!channel.subscribe("notification:read", |_| {}).is_active());
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn dead_connection_marks_channel_closed() {
        let transport = InMemoryTransport::new();
        let (channel, recorded) = open(&transport);
        channel.join(&RoomId::field(FieldId::new(2)));

        recorded.close();

        assert!(channel.is_closed());
        assert!(channel.needs_reconnect());
        assert_eq!(
            channel.join(&RoomId::field(FieldId::new(5))),
            RoomChange::ChannelUnavailable
        );
        assert_eq!(
            channel.leave(&RoomId::field(FieldId::new(2))),
            RoomChange::Applied
        );
        assert!(channel.joined_rooms().is_empty());
    }

    #[test]
    fn revive_swaps_only_a_dead_connection() {
        let transport = InMemoryTransport::new();
        let (channel, recorded) = open(&transport);
        channel.join(&RoomId::field(FieldId::new(4)));
        let options = ConnectOptions::new(ClientId::new());

        let spare = transport.connect("ws://test/fields", &options).unwrap();
        assert!(!channel.revive(spare.clone()));
        assert!(spare.is_closed());

        recorded.close();
        let fresh = transport.connect("ws://test/fields", &options).unwrap();
        assert!(channel.revive(fresh));

        let new = transport.latest_connection_to("/fields").unwrap();
        assert!(!channel.is_closed());
        assert!(!channel.needs_reconnect());
        assert_eq!(new.joined_rooms(), vec!["field:4".to_string()]);
    }

    #[test]
    fn replace_on_disconnected_channel_closes_new_connection() {
        let transport = InMemoryTransport::new();
        let (channel, _) = open(&transport);
        channel.join(&RoomId::field(FieldId::new(6)));
        channel.close();

        let fresh = transport
            .connect("ws://test/fields", &ConnectOptions::new(ClientId::new()))
            .unwrap();
        assert!(!channel.replace_connection(fresh));

        let new = transport.latest_connection_to("/fields").unwrap();
        assert!(new.is_closed());
        assert!(new.joined_rooms().is_empty());
        assert_eq!(new.listener_count(CONNECT_EVENT), 0);
    }

    #[tokio::test]
    async fn ready_resolves_for_open_channel() {
        let transport = InMemoryTransport::new();
        let (channel, _) = open(&transport);

        assert!(channel.ready(Duration::from_millis(50)).await.is_ok());
        channel.close();
        assert!(matches!(
            channel.ready(Duration::from_millis(50)).await,
            Err(TransportError::Closed)
        ));
    }
}
