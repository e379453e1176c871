//! Typed views over server event payloads.
//!
//! These are conveniences for subscribers; delivery never depends on a
//! payload matching one of them. Unknown fields are ignored and most fields
//! are optional because the server sends partial records on some events.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::foundation::{BookingId, BranchId, FieldId, UserId};

/// Payment state of a booking as reported by the booking API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    DpPaid,
    Paid,
    Failed,
    Refunded,
    #[serde(other)]
    Unknown,
}

/// One payment attached to a booking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentSummary {
    #[serde(default)]
    pub id: Option<u64>,
    pub status: PaymentStatus,
    #[serde(default)]
    pub amount: Option<f64>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Payload of `booking:created`, `booking:updated` and `booking:cancelled`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingChange {
    #[serde(alias = "id")]
    pub booking_id: BookingId,
    #[serde(default)]
    pub user_id: Option<UserId>,
    #[serde(default)]
    pub field_id: Option<FieldId>,
    #[serde(default)]
    pub booking_date: Option<NaiveDate>,
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub end_time: Option<String>,
    #[serde(default)]
    pub payment: Option<PaymentSummary>,
    #[serde(default)]
    pub payments: Vec<PaymentSummary>,
}

impl BookingChange {
    /// Payment status to display for the booking.
    ///
    /// Prefers the most recent entry of `payments` (by `createdAt`), falling
    /// back to the single `payment` record older servers send.
    pub fn effective_payment_status(&self) -> Option<PaymentStatus> {
        self.payments
            .iter()
            .max_by_key(|payment| payment.created_at)
            .or(self.payment.as_ref())
            .map(|payment| payment.status)
    }
}

/// Payload of `field:availability-changed` and `field:availability-update`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldAvailabilityChange {
    pub field_id: FieldId,
    #[serde(default)]
    pub branch_id: Option<BranchId>,
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub available_time_slots: Vec<TimeSlot>,
}

/// A bookable slot on a field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeSlot {
    pub start: String,
    pub end: String,
}

/// Payload of `notification:new`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationMessage {
    pub id: u64,
    #[serde(default)]
    pub user_id: Option<UserId>,
    pub title: String,
    pub message: String,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub link_id: Option<String>,
    #[serde(default)]
    pub is_read: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Payload of `notification:read`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationReadReceipt {
    #[serde(default)]
    pub notification_id: Option<u64>,
    #[serde(default)]
    pub user_id: Option<UserId>,
    #[serde(default)]
    pub all: bool,
}
