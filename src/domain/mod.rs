//! Domain layer containing the real-time vocabulary.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (IDs, timestamps, errors)
//! - `realtime` - Channels, rooms, event names, payload views, listener tables

pub mod foundation;
pub mod realtime;
