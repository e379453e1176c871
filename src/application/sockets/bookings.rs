//! Booking subscriptions (root channel).

use std::sync::Arc;

use crate::domain::foundation::{BookingId, UserId};
use crate::domain::realtime::{Channel, RoomId, ServerEvent, SocketEvent};

use super::connection_registry::ConnectionRegistry;
use super::room_registry::RoomChange;
use super::subscription::Subscription;

const CHANNEL: Channel = Channel::Root;

/// Booking lifecycle and payment updates.
#[derive(Clone)]
pub struct BookingSocket {
    registry: Arc<ConnectionRegistry>,
}

impl BookingSocket {
    pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Self { registry }
    }

    /// Joins `booking:{id}`.
    pub fn join_booking_room(&self, booking: BookingId) -> RoomChange {
        self.registry
            .init_and_join(CHANNEL, &RoomId::booking(booking))
    }

    /// Leaves `booking:{id}`.
    pub fn leave_booking_room(&self, booking: BookingId) -> RoomChange {
        self.registry.leave(CHANNEL, &RoomId::booking(booking))
    }

    /// Joins `user:{id}:bookings`.
    pub fn join_user_booking_room(&self, user: UserId) -> RoomChange {
        self.registry
            .init_and_join(CHANNEL, &RoomId::user_bookings(user))
    }

    /// Leaves `user:{id}:bookings`.
    pub fn leave_user_booking_room(&self, user: UserId) -> RoomChange {
        self.registry.leave(CHANNEL, &RoomId::user_bookings(user))
    }

    /// Booking or payment changes (`booking:updated`).
    pub fn subscribe_to_booking_updates<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&SocketEvent) + Send + Sync + 'static,
    {
        self.registry
            .subscribe(CHANNEL, ServerEvent::BookingUpdated.as_str(), callback)
    }

    /// Cancellations (`booking:cancelled`).
    pub fn subscribe_to_booking_cancellations<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&SocketEvent) + Send + Sync + 'static,
    {
        self.registry
            .subscribe(CHANNEL, ServerEvent::BookingCancelled.as_str(), callback)
    }

    /// New bookings (`booking:created`).
    pub fn subscribe_to_new_bookings<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&SocketEvent) + Send + Sync + 'static,
    {
        self.registry
            .subscribe(CHANNEL, ServerEvent::BookingCreated.as_str(), callback)
    }

    /// Updates for one booking.
    ///
    /// Joins `booking:{id}` and invokes `callback` only for `booking:updated`
    /// events whose payload names this booking. Unsubscribing keeps the room
    /// joined; call [`leave_booking_room`](Self::leave_booking_room) for that.
    pub fn watch_booking<F>(&self, booking: BookingId, callback: F) -> Subscription
    where
        F: Fn(&SocketEvent) + Send + Sync + 'static,
    {
        self.join_booking_room(booking);
        self.subscribe_to_booking_updates(move |event| {
            if payload_booking_id(event) == Some(booking.value()) {
                callback(event);
            }
        })
    }
}

fn payload_booking_id(event: &SocketEvent) -> Option<u64> {
    event.payload["bookingId"]
        .as_u64()
        .or_else(|| event.payload["id"].as_u64())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::transport::InMemoryTransport;
    use crate::config::SocketConfig;
    use crate::domain::realtime::{BookingChange, PaymentStatus};
    use parking_lot::Mutex;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn socket() -> (Arc<InMemoryTransport>, BookingSocket) {
        let transport = Arc::new(InMemoryTransport::new());
        let config = SocketConfig {
            url: "ws://test".to_string(),
            ..Default::default()
        };
        let registry = ConnectionRegistry::new(transport.clone(), &config);
        (transport, BookingSocket::new(Arc::new(registry)))
    }

    #[test]
    fn booking_rooms_are_joined_on_root_channel() {
        let (transport, bookings) = socket();

        bookings.join_booking_room(BookingId::new(9));
        bookings.join_user_booking_room(UserId::new(42));
        bookings.leave_booking_room(BookingId::new(9));
        bookings.leave_user_booking_room(UserId::new(42));

        let connection = transport.latest_connection("ws://test").unwrap();
        assert_eq!(
            connection.joined_rooms(),
            vec!["booking:9".to_string(), "user:42:bookings".to_string()]
        );
        assert_eq!(
            connection.left_rooms(),
            vec!["booking:9".to_string(), "user:42:bookings".to_string()]
        );
    }

    #[test]
    fn each_stream_receives_only_its_event() {
        let (transport, bookings) = socket();
        let log = Arc::new(Mutex::new(Vec::new()));

        let sink = log.clone();
        let _created =
            bookings.subscribe_to_new_bookings(move |e| sink.lock().push(e.event.clone()));
        let sink = log.clone();
        let _updated =
            bookings.subscribe_to_booking_updates(move |e| sink.lock().push(e.event.clone()));
        let sink = log.clone();
        let _cancelled =
            bookings.subscribe_to_booking_cancellations(move |e| sink.lock().push(e.event.clone()));

        let connection = transport.latest_connection("ws://test").unwrap();
        for event in ["booking:cancelled", "booking:created", "booking:updated"] {
            connection.server_emit(event, json!({"bookingId": 1}));
        }

        assert_eq!(
            *log.lock(),
            vec!["booking:cancelled", "booking:created", "booking:updated"]
        );
    }

    #[test]
    fn update_payload_exposes_payment_status() {
        let (transport, bookings) = socket();
        let statuses = Arc::new(Mutex::new(Vec::new()));

        let sink = statuses.clone();
        let _sub = bookings.subscribe_to_booking_updates(move |event| {
            let change: BookingChange = event.payload_as().unwrap();
            sink.lock().push(change.effective_payment_status());
        });

        let connection = transport.latest_connection("ws://test").unwrap();
        connection.server_emit(
            "booking:updated",
            json!({"id": 3, "payment": {"id": 1, "status": "paid"}}),
        );

        assert_eq!(*statuses.lock(), vec![Some(PaymentStatus::Paid)]);
    }

    #[test]
    fn watch_booking_filters_by_id_and_keeps_room() {
        let (transport, bookings) = socket();
        let hits = Arc::new(AtomicUsize::new(0));

        let counter = hits.clone();
        let watch = bookings.watch_booking(BookingId::new(9), move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let connection = transport.latest_connection("ws://test").unwrap();
        connection.server_emit("booking:updated", json!({"bookingId": 9}));
        connection.server_emit("booking:updated", json!({"bookingId": 10}));
        connection.server_emit("booking:updated", json!({"id": 9}));
        assert_eq!(hits.load(Ordering::SeqCst), 2);

        watch.unsubscribe();
        connection.server_emit("booking:updated", json!({"bookingId": 9}));

        assert_eq!(hits.load(Ordering::SeqCst), 2);
        assert_eq!(connection.joined_rooms(), vec!["booking:9".to_string()]);
        assert!(connection.left_rooms().is_empty());
    }
}
