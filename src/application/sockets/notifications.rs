//! Notification subscriptions (notifications channel).

use std::sync::Arc;

use crate::domain::foundation::UserId;
use crate::domain::realtime::{Channel, RoomId, ServerEvent, SocketEvent};

use super::connection_registry::ConnectionRegistry;
use super::room_registry::RoomChange;
use super::subscription::Subscription;

const CHANNEL: Channel = Channel::Notifications;

/// Per-user notification feed.
#[derive(Clone)]
pub struct NotificationSocket {
    registry: Arc<ConnectionRegistry>,
}

impl NotificationSocket {
    pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Self { registry }
    }

    /// Joins `user:{id}:notifications`.
    pub fn join_notification_room(&self, user: UserId) -> RoomChange {
        self.registry
            .init_and_join(CHANNEL, &RoomId::user_notifications(user))
    }

    /// Leaves `user:{id}:notifications`.
    pub fn leave_notification_room(&self, user: UserId) -> RoomChange {
        self.registry
            .leave(CHANNEL, &RoomId::user_notifications(user))
    }

    /// New notifications (`notification:new`).
    pub fn subscribe_to_notifications<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&SocketEvent) + Send + Sync + 'static,
    {
        self.registry
            .subscribe(CHANNEL, ServerEvent::NotificationCreated.as_str(), callback)
    }

    /// Read receipts (`notification:read`).
    pub fn subscribe_to_notification_updates<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&SocketEvent) + Send + Sync + 'static,
    {
        self.registry
            .subscribe(CHANNEL, ServerEvent::NotificationRead.as_str(), callback)
    }
}
