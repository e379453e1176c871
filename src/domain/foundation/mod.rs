//! Foundation module - Shared domain primitives.
//!
//! Contains identifiers, timestamps and error types that form the
//! vocabulary of the booking real-time layer.

mod errors;
mod ids;
mod timestamp;

pub use errors::ValidationError;
pub use ids::{BookingId, BranchId, ClientId, FieldId, UserId};
pub use timestamp::Timestamp;
