//! Field availability subscriptions (fields channel).

use chrono::NaiveDate;
use serde_json::json;
use std::sync::Arc;

use crate::domain::foundation::{BranchId, FieldId};
use crate::domain::realtime::{Channel, ClientEvent, RoomId, ServerEvent, SocketEvent};
use crate::ports::TransportError;

use super::connection_registry::ConnectionRegistry;
use super::room_registry::RoomChange;
use super::subscription::Subscription;

const CHANNEL: Channel = Channel::Fields;

/// Live field availability for booking forms and schedules.
#[derive(Clone)]
pub struct FieldAvailabilitySocket {
    registry: Arc<ConnectionRegistry>,
}

impl FieldAvailabilitySocket {
    pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Self { registry }
    }

    /// Joins the availability feed, for every branch or for one branch.
    pub fn join_field_availability_room(&self, branch: Option<BranchId>) -> RoomChange {
        self.registry
            .init_and_join(CHANNEL, &RoomId::field_availability(branch))
    }

    /// Joins the room of one field.
    pub fn join_field_room(&self, field: FieldId) -> RoomChange {
        self.registry.init_and_join(CHANNEL, &RoomId::field(field))
    }

    /// Leaves the room of one field.
    pub fn leave_field_room(&self, field: FieldId) -> RoomChange {
        self.registry.leave(CHANNEL, &RoomId::field(field))
    }

    /// Asks the server to push fresh availability for `field` on `date`.
    ///
    /// The answer arrives as `field:availability-update`.
    pub fn request_availability_update(
        &self,
        field: FieldId,
        date: NaiveDate,
    ) -> Result<(), TransportError> {
        let Some(handle) = self.registry.init(CHANNEL) else {
            tracing::warn!(field = %field, "Availability request skipped, channel unavailable");
            return Err(TransportError::Closed);
        };
        handle.emit(
            ClientEvent::RequestAvailability.as_str(),
            json!({
                "fieldId": field.value(),
                "date": date.format("%Y-%m-%d").to_string(),
            }),
        )
    }

    /// Availability snapshots answering a request.
    pub fn subscribe_to_field_availability<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&SocketEvent) + Send + Sync + 'static,
    {
        self.registry.subscribe(
            CHANNEL,
            ServerEvent::FieldAvailabilityUpdate.as_str(),
            callback,
        )
    }

    /// Availability changes caused by other clients' bookings.
    pub fn subscribe_to_field_availability_changes<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&SocketEvent) + Send + Sync + 'static,
    {
        self.registry.subscribe(
            CHANNEL,
            ServerEvent::FieldAvailabilityChanged.as_str(),
            callback,
        )
    }
}
