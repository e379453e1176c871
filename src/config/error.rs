//! Configuration error types

use thiserror::Error;

/// Errors that can occur during configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration loading failed: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),
}

/// Errors that can occur during configuration validation
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Required configuration missing: {0}")]
    MissingRequired(&'static str),

    #[error("Socket URL must use ws:// or wss://: {0}")]
    InvalidSocketUrl(String),

    #[error("Namespace '{0}' must be empty or start with '/'")]
    InvalidNamespace(String),

    #[error("Reconnect initial delay exceeds max delay")]
    InvalidReconnectDelays,

    #[error("Invalid connect timeout")]
    InvalidTimeout,

    #[error("Invalid log filter directive: {0}")]
    InvalidLogLevel(String),
}
