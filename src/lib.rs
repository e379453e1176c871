//! Booking Realtime - Room-based socket client for the field booking application
//!
//! This crate multiplexes three logical socket channels (root, fields,
//! notifications) over one event-based transport and exposes typed
//! join/leave/subscribe primitives for field availability, notifications
//! and bookings.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
pub mod telemetry;
