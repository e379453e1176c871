//! WebSocket frame format.
//!
//! Every event travels as one JSON text frame in both directions:
//!
//! ```json
//! { "event": "booking:updated", "data": { "bookingId": 9 } }
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ports::TransportError;

/// One event frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireFrame {
    /// Event name.
    pub event: String,
    /// Event payload; `null` when the sender omitted it.
    #[serde(default)]
    pub data: Value,
}

impl WireFrame {
    /// Builds a frame.
    pub fn new(event: impl Into<String>, data: Value) -> Self {
        Self {
            event: event.into(),
            data,
        }
    }

    /// Encodes the frame as JSON text.
    pub fn encode(&self) -> Result<String, TransportError> {
        serde_json::to_string(self).map_err(|e| TransportError::Serialization(e.to_string()))
    }

    /// Decodes a JSON text frame.
    pub fn decode(text: &str) -> Result<Self, TransportError> {
        serde_json::from_str(text).map_err(|e| TransportError::Serialization(e.to_string()))
    }
}
