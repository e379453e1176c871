//! Configuration for the real-time client.
//!
//! Everything comes from `BOOKING_REALTIME__*` environment variables (a `.env`
//! file is honoured in development). Every key has a default, so an empty
//! environment yields a client pointed at `ws://localhost:5000`.
//!
//! ```no_run
//! use booking_realtime::config::AppConfig;
//!
//! let config = AppConfig::load()?;
//! config.validate()?;
//! println!("fields channel at {}", config.socket.channel_url(
//!     booking_realtime::domain::realtime::Channel::Fields,
//! ));
//! # Ok::<(), booking_realtime::config::ConfigError>(())
//! ```

mod error;
mod logging;
mod socket;

pub use error::{ConfigError, ValidationError};
pub use logging::LoggingConfig;
pub use socket::SocketConfig;

use serde::Deserialize;

/// Top-level configuration, one section per concern.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Socket server configuration (address, namespaces, reconnection)
    #[serde(default)]
    pub socket: SocketConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Reads `.env` (if any) and the process environment.
    ///
    /// Nesting uses `__`: `BOOKING_REALTIME__SOCKET__URL` maps to
    /// `socket.url`, `BOOKING_REALTIME__LOGGING__JSON` to `logging.json`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a value cannot be parsed into its field type.
    pub fn load() -> Result<Self, ConfigError> {
        // Missing .env is normal outside development
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("BOOKING_REALTIME")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Checks every section, returning the first problem found.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.socket.validate()?;
        self.logging.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::Mutex;

    // Env vars are process-global; serialize the tests that touch them
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    fn clear_env() {
        env::remove_var("BOOKING_REALTIME__SOCKET__URL");
        env::remove_var("BOOKING_REALTIME__SOCKET__USER_ID");
        env::remove_var("BOOKING_REALTIME__SOCKET__FIELDS_NAMESPACE");
        env::remove_var("BOOKING_REALTIME__SOCKET__AUTO_RECONNECT");
        env::remove_var("BOOKING_REALTIME__SOCKET__MAX_RECONNECT_ATTEMPTS");
        env::remove_var("BOOKING_REALTIME__LOGGING__JSON");
    }

    #[test]
    fn test_defaults_without_environment() {
        let _guard = ENV_MUTEX.lock().unwrap();
        clear_env();
        let result = AppConfig::load();

        assert!(result.is_ok(), "Failed to load config: {:?}", result.err());
        let config = result.unwrap();
        assert_eq!(config.socket.url, "ws://localhost:5000");
        assert_eq!(config.socket.fields_namespace, "/fields");
        assert_eq!(config.socket.user_id, None);
        assert!(!config.logging.json);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_from_environment() {
        let _guard = ENV_MUTEX.lock().unwrap();
        env::set_var("BOOKING_REALTIME__SOCKET__URL", "wss://book.example.com");
        env::set_var("BOOKING_REALTIME__SOCKET__USER_ID", "42");
        env::set_var("BOOKING_REALTIME__SOCKET__AUTO_RECONNECT", "false");
        env::set_var("BOOKING_REALTIME__SOCKET__MAX_RECONNECT_ATTEMPTS", "3");
        env::set_var("BOOKING_REALTIME__LOGGING__JSON", "true");
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert_eq!(config.socket.url, "wss://book.example.com");
        assert_eq!(config.socket.user_id.map(|u| u.value()), Some(42));
        assert!(!config.socket.auto_reconnect);
        assert_eq!(config.socket.max_reconnect_attempts, 3);
        assert!(config.logging.json);
    }

    #[test]
    fn test_validate_rejects_non_websocket_url() {
        let _guard = ENV_MUTEX.lock().unwrap();
        env::set_var("BOOKING_REALTIME__SOCKET__URL", "https://book.example.com");
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert!(matches!(
            config.validate(),
            Err(ValidationError::InvalidSocketUrl(_))
        ));
    }

    #[test]
    fn test_custom_namespace() {
        let _guard = ENV_MUTEX.lock().unwrap();
        env::set_var("BOOKING_REALTIME__SOCKET__FIELDS_NAMESPACE", "/v2/fields");
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert_eq!(
            config.socket.channel_url(crate::domain::realtime::Channel::Fields),
            "ws://localhost:5000/v2/fields"
        );
    }
}
