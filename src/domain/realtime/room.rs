//! Room identifiers.
//!
//! A room is a server-side grouping that gates which events a connection
//! receives. The client only ever names rooms; membership itself is tracked
//! by the room registry of each channel.
//!
//! ```text
//! field:12                        fields channel, one field's slots
//! field-availability              fields channel, every field
//! field-availability:branch:3     fields channel, one branch's fields
//! booking:981                     root channel, one booking
//! user:42:bookings                root channel, every booking of a user
//! user:42:notifications           notifications channel, a user's inbox
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::foundation::{BookingId, BranchId, FieldId, UserId, ValidationError};

/// Identifier of a server-side room.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(String);

impl RoomId {
    /// Creates a room id from an arbitrary key.
    ///
    /// Rejects empty keys and keys containing whitespace.
    pub fn new(id: impl Into<String>) -> Result<Self, ValidationError> {
        let id = id.into();
        if id.is_empty() {
            return Err(ValidationError::empty("room id"));
        }
        if id.chars().any(char::is_whitespace) {
            return Err(ValidationError::malformed(
                "room id",
                id,
                "contains whitespace",
            ));
        }
        Ok(Self(id))
    }

    /// Room carrying slot updates for a single field.
    pub fn field(field_id: FieldId) -> Self {
        Self(format!("field:{}", field_id))
    }

    /// Room carrying availability updates for every field, or for the
    /// fields of one branch.
    pub fn field_availability(branch_id: Option<BranchId>) -> Self {
        match branch_id {
            Some(branch) => Self(format!("field-availability:branch:{}", branch)),
            None => Self("field-availability".to_string()),
        }
    }

    /// Room carrying updates for a single booking.
    pub fn booking(booking_id: BookingId) -> Self {
        Self(format!("booking:{}", booking_id))
    }

    /// Room carrying updates for every booking of a user.
    pub fn user_bookings(user_id: UserId) -> Self {
        Self(format!("user:{}:bookings", user_id))
    }

    /// Room carrying a user's notifications.
    pub fn user_notifications(user_id: UserId) -> Self {
        Self(format!("user:{}:notifications", user_id))
    }

    /// Returns the room key.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<&str> for RoomId {
    type Error = ValidationError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}
