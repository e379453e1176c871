//! Initialization state of the socket layer as a whole.

use serde::Serialize;
use std::fmt;

/// How many channels came up after an initialization pass.
///
/// There is no terminal failure state: a later pass may move the layer to
/// any other state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InitializationState {
    /// No channel is live.
    Uninitialized,
    /// Some, but not all, channels are live.
    PartiallyInitialized,
    /// Every channel is live.
    FullyInitialized,
}

impl InitializationState {
    /// Derives the state from the number of live channels out of `total`.
    pub fn from_counts(live: usize, total: usize) -> Self {
        match live {
            0 => InitializationState::Uninitialized,
            n if n >= total => InitializationState::FullyInitialized,
            _ => InitializationState::PartiallyInitialized,
        }
    }
}

impl fmt::Display for InitializationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            InitializationState::Uninitialized => "uninitialized",
            InitializationState::PartiallyInitialized => "partially_initialized",
            InitializationState::FullyInitialized => "fully_initialized",
        };
        f.write_str(s)
    }
}
