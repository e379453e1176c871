//! Error types for the domain layer.

use thiserror::Error;

/// Errors raised when a value object rejects its input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{kind} must not be empty")]
    Empty { kind: &'static str },

    #[error("{kind} '{value}' is malformed: {reason}")]
    Malformed {
        kind: &'static str,
        value: String,
        reason: &'static str,
    },
}

impl ValidationError {
    pub fn empty(kind: &'static str) -> Self {
        ValidationError::Empty { kind }
    }

    pub fn malformed(kind: &'static str, value: impl Into<String>, reason: &'static str) -> Self {
        ValidationError::Malformed {
            kind,
            value: value.into(),
            reason,
        }
    }
}
