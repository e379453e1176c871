//! Socket server configuration

use secrecy::SecretString;
use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;
use crate::domain::foundation::{ClientId, UserId};
use crate::domain::realtime::Channel;
use crate::ports::{ConnectOptions, ReconnectPolicy};

/// Socket server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SocketConfig {
    /// Base server address (`ws://` or `wss://`)
    #[serde(default = "default_url")]
    pub url: String,

    /// Bearer token sent on the upgrade request
    pub auth_token: Option<SecretString>,

    /// User announced in the handshake
    pub user_id: Option<UserId>,

    /// Path of the root channel
    #[serde(default)]
    pub root_namespace: String,

    /// Path of the fields channel
    #[serde(default = "default_fields_namespace")]
    pub fields_namespace: String,

    /// Path of the notifications channel
    #[serde(default = "default_notifications_namespace")]
    pub notifications_namespace: String,

    /// Transport-level reconnection
    #[serde(default = "default_auto_reconnect")]
    pub auto_reconnect: bool,

    /// Reconnect attempts before giving up (0 = unlimited)
    #[serde(default)]
    pub max_reconnect_attempts: usize,

    /// First backoff delay in milliseconds
    #[serde(default = "default_initial_delay")]
    pub reconnect_initial_delay_ms: u64,

    /// Backoff cap in milliseconds
    #[serde(default = "default_max_delay")]
    pub reconnect_max_delay_ms: u64,

    /// Keepalive ping interval in seconds (0 disables)
    #[serde(default = "default_keepalive")]
    pub keepalive_interval_secs: u64,

    /// How long to wait for a channel to open, in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

impl SocketConfig {
    /// Path appended to the base URL for `channel`
    pub fn namespace(&self, channel: Channel) -> &str {
        match channel {
            Channel::Root => &self.root_namespace,
            Channel::Fields => &self.fields_namespace,
            Channel::Notifications => &self.notifications_namespace,
        }
    }

    /// Full address of `channel`
    pub fn channel_url(&self, channel: Channel) -> String {
        format!("{}{}", self.url.trim_end_matches('/'), self.namespace(channel))
    }

    /// Reconnection policy handed to the transport
    pub fn reconnect_policy(&self) -> ReconnectPolicy {
        ReconnectPolicy {
            enabled: self.auto_reconnect,
            max_attempts: self.max_reconnect_attempts,
            initial_delay: Duration::from_millis(self.reconnect_initial_delay_ms),
            max_delay: Duration::from_millis(self.reconnect_max_delay_ms),
        }
    }

    /// Keepalive interval, `None` when disabled
    pub fn keepalive_interval(&self) -> Option<Duration> {
        (self.keepalive_interval_secs > 0)
            .then(|| Duration::from_secs(self.keepalive_interval_secs))
    }

    /// Connect timeout as Duration
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Options for every connection opened by `client_id`
    pub fn connect_options(&self, client_id: ClientId) -> ConnectOptions {
        ConnectOptions {
            client_id,
            user_id: self.user_id,
            auth_token: self.auth_token.clone(),
            reconnect: self.reconnect_policy(),
            keepalive_interval: self.keepalive_interval(),
        }
    }

    /// Validate socket configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.url.is_empty() {
            return Err(ValidationError::MissingRequired("SOCKET_URL"));
        }
        if !self.url.starts_with("ws://") && !self.url.starts_with("wss://") {
            return Err(ValidationError::InvalidSocketUrl(self.url.clone()));
        }
        for channel in Channel::ALL {
            let namespace = self.namespace(channel);
            if !namespace.is_empty() && !namespace.starts_with('/') {
                return Err(ValidationError::InvalidNamespace(namespace.to_string()));
            }
        }
        if self.reconnect_initial_delay_ms > self.reconnect_max_delay_ms {
            return Err(ValidationError::InvalidReconnectDelays);
        }
        if self.connect_timeout_secs == 0 || self.connect_timeout_secs > 300 {
            return Err(ValidationError::InvalidTimeout);
        }
        Ok(())
    }
}

impl Default for SocketConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            auth_token: None,
            user_id: None,
            root_namespace: String::new(),
            fields_namespace: default_fields_namespace(),
            notifications_namespace: default_notifications_namespace(),
            auto_reconnect: default_auto_reconnect(),
            max_reconnect_attempts: 0,
            reconnect_initial_delay_ms: default_initial_delay(),
            reconnect_max_delay_ms: default_max_delay(),
            keepalive_interval_secs: default_keepalive(),
            connect_timeout_secs: default_connect_timeout(),
        }
    }
}

fn default_url() -> String {
    "ws://localhost:5000".to_string()
}

fn default_fields_namespace() -> String {
    "/fields".to_string()
}

fn default_notifications_namespace() -> String {
    "/notifications".to_string()
}

fn default_auto_reconnect() -> bool {
    true
}

fn default_initial_delay() -> u64 {
    500
}

fn default_max_delay() -> u64 {
    8_000
}

fn default_keepalive() -> u64 {
    25
}

fn default_connect_timeout() -> u64 {
    10
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn test_socket_config_defaults() {
        let config = SocketConfig::default();
        assert_eq!(config.url, "ws://localhost:5000");
        assert_eq!(config.fields_namespace, "/fields");
        assert_eq!(config.notifications_namespace, "/notifications");
        assert!(config.auto_reconnect);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_channel_urls() {
        let config = SocketConfig {
            url: "wss://api.example.com/".to_string(),
            ..Default::default()
        };
        assert_eq!(config.channel_url(Channel::Root), "wss://api.example.com");
        assert_eq!(config.channel_url(Channel::Fields), "wss://api.example.com/fields");
        assert_eq!(
            config.channel_url(Channel::Notifications),
            "wss://api.example.com/notifications"
        );
    }

    #[test]
    fn test_connect_options_carry_identity_and_policy() {
        let config = SocketConfig {
            user_id: Some(UserId::new(5)),
            auth_token: Some(SecretString::new("token".to_string())),
            auto_reconnect: false,
            keepalive_interval_secs: 0,
            ..Default::default()
        };
        let options = config.connect_options(ClientId::new());

        assert_eq!(options.user_id, Some(UserId::new(5)));
        assert_eq!(
            options.auth_token.as_ref().map(|t| t.expose_secret().clone()),
            Some("token".to_string())
        );
        assert!(!options.reconnect.enabled);
        assert_eq!(options.keepalive_interval, None);
    }

    #[test]
    fn test_reconnect_policy_from_config() {
        let config = SocketConfig {
            max_reconnect_attempts: 4,
            reconnect_initial_delay_ms: 100,
            reconnect_max_delay_ms: 400,
            ..Default::default()
        };
        let policy = config.reconnect_policy();
        assert_eq!(policy.max_attempts, 4);
        assert_eq!(policy.delay_for(5), Duration::from_millis(400));
    }

    #[test]
    fn test_validation_rejects_http_url() {
        let config = SocketConfig {
            url: "http://localhost:5000".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ValidationError::InvalidSocketUrl(_))
        ));
    }

    #[test]
    fn test_validation_rejects_relative_namespace() {
        let config = SocketConfig {
            fields_namespace: "fields".to_string(),
            ..Default::default()
        };
        assert_eq!(
            config.validate(),
            Err(ValidationError::InvalidNamespace("fields".to_string()))
        );
    }

    #[test]
    fn test_validation_rejects_inverted_delays() {
        let config = SocketConfig {
            reconnect_initial_delay_ms: 9_000,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ValidationError::InvalidReconnectDelays));
    }

    #[test]
    fn test_validation_rejects_zero_timeout() {
        let config = SocketConfig {
            connect_timeout_secs: 0,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ValidationError::InvalidTimeout));
    }
}
