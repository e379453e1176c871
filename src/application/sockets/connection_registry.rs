//! Connection Manager.
//!
//! Owns at most one live [`ChannelHandle`] per [`Channel`]. Channels are
//! created lazily by [`init`](ConnectionRegistry::init); an absent channel
//! is a normal steady state (failed connect, never initialized, or
//! disconnected), never an error callers must handle.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

use crate::config::SocketConfig;
use crate::domain::foundation::ClientId;
use crate::domain::realtime::{Channel, RoomId, SocketEvent};
use crate::ports::{ConnectOptions, SocketConnection, SocketTransport, TransportError};

use super::channel::ChannelHandle;
use super::room_registry::RoomChange;
use super::subscription::Subscription;

/// Registry of live channels for one client.
pub struct ConnectionRegistry {
    transport: Arc<dyn SocketTransport>,
    config: SocketConfig,
    client_id: ClientId,
    channels: RwLock<HashMap<Channel, ChannelHandle>>,
}

impl ConnectionRegistry {
    /// Creates a registry with a fresh client id and no live channels.
    pub fn new(transport: Arc<dyn SocketTransport>, config: &SocketConfig) -> Self {
        Self::with_client_id(transport, config, ClientId::new())
    }

    /// Creates a registry announcing `client_id` in every handshake.
    pub fn with_client_id(
        transport: Arc<dyn SocketTransport>,
        config: &SocketConfig,
        client_id: ClientId,
    ) -> Self {
        Self {
            transport,
            config: config.clone(),
            client_id,
            channels: RwLock::new(HashMap::new()),
        }
    }

    /// Identity announced to the server.
    pub fn client_id(&self) -> ClientId {
        self.client_id
    }

    /// Socket configuration in use.
    pub fn config(&self) -> &SocketConfig {
        &self.config
    }

    /// Returns the live channel, connecting it first if needed.
    ///
    /// A channel whose transport connection shut down for good gets a fresh
    /// connection; its listeners and recorded rooms carry over. Connect
    /// failures are logged and yield `None`.
    pub fn init(&self, channel: Channel) -> Option<ChannelHandle> {
        if let Some(existing) = self.get(channel) {
            if !existing.needs_reconnect() {
                return Some(existing);
            }
            return self.revive(channel, existing);
        }

        let connection = match self.open(channel) {
            Ok(connection) => connection,
            Err(error) => {
                tracing::warn!(
                    channel = %channel,
                    url = %self.config.channel_url(channel),
                    error = %error,
                    "Failed to initialize channel"
                );
                return None;
            }
        };

        let mut channels = self.channels.write();
        if let Some(existing) = channels.get(&channel) {
            // Lost a race with a concurrent init
            connection.close();
            return Some(existing.clone());
        }

        let handle = ChannelHandle::new(channel, connection);
        channels.insert(channel, handle.clone());
        tracing::info!(channel = %channel, url = %handle.url(), "Channel initialized");
        Some(handle)
    }

    /// Returns the live channel without creating one.
    pub fn get(&self, channel: Channel) -> Option<ChannelHandle> {
        self.channels.read().get(&channel).cloned()
    }

    /// Closes the channel and clears its slot. Idempotent.
    pub fn disconnect(&self, channel: Channel) {
        let removed = self.channels.write().remove(&channel);
        match removed {
            Some(handle) => handle.close(),
            None => tracing::debug!(channel = %channel, "Disconnect of absent channel"),
        }
    }

    /// Closes every live channel.
    pub fn disconnect_all(&self) {
        for channel in Channel::ALL {
            self.disconnect(channel);
        }
    }

    /// Replaces the channel's connection with a fresh one.
    ///
    /// Listeners and recorded rooms carry over. Behaves like
    /// [`init`](Self::init) for a channel that is not live. If the new
    /// connection cannot be opened the old one is kept and `None` returned.
    pub fn reconnect(&self, channel: Channel) -> Option<ChannelHandle> {
        let Some(handle) = self.get(channel) else {
            return self.init(channel);
        };

        match self.open(channel) {
            Ok(connection) if handle.replace_connection(connection.clone()) => Some(handle),
            Ok(_) => {
                tracing::debug!(channel = %channel, "Reconnect raced a disconnect");
                None
            }
            Err(error) => {
                tracing::warn!(channel = %channel, error = %error, "Failed to reconnect channel");
                None
            }
        }
    }

    /// Joins `room` on `channel` if the channel is live.
    pub fn join(&self, channel: Channel, room: &RoomId) -> RoomChange {
        match self.get(channel) {
            Some(handle) => handle.join(room),
            None => {
                tracing::debug!(
                    channel = %channel,
                    room = %room,
                    "Join skipped, channel unavailable"
                );
                RoomChange::ChannelUnavailable
            }
        }
    }

    /// Leaves `room` on `channel` if the channel is live.
    pub fn leave(&self, channel: Channel, room: &RoomId) -> RoomChange {
        match self.get(channel) {
            Some(handle) => handle.leave(room),
            None => {
                tracing::debug!(
                    channel = %channel,
                    room = %room,
                    "Leave skipped, channel unavailable"
                );
                RoomChange::ChannelUnavailable
            }
        }
    }

    /// Joins `room`, initializing the channel first if needed.
    pub fn init_and_join(&self, channel: Channel, room: &RoomId) -> RoomChange {
        match self.init(channel) {
            Some(handle) => handle.join(room),
            None => RoomChange::ChannelUnavailable,
        }
    }

    /// Subscribes to `event`, initializing the channel first if needed.
    ///
    /// Returns an inactive subscription when the channel is unavailable.
    pub fn subscribe<F>(&self, channel: Channel, event: &str, callback: F) -> Subscription
    where
        F: Fn(&SocketEvent) + Send + Sync + 'static,
    {
        match self.init(channel) {
            Some(handle) => handle.subscribe(event, callback),
            None => {
                tracing::warn!(
                    channel = %channel,
                    event = %event,
                    "Subscribe skipped, channel unavailable"
                );
                Subscription::inactive(event)
            }
        }
    }

    /// Channels whose handle has a working connection.
    pub fn live_channels(&self) -> Vec<Channel> {
        let channels = self.channels.read();
        Channel::ALL
            .into_iter()
            .filter(|c| channels.get(c).is_some_and(|h| !h.is_closed()))
            .collect()
    }

    fn revive(&self, channel: Channel, handle: ChannelHandle) -> Option<ChannelHandle> {
        tracing::info!(
            channel = %channel,
            url = %handle.url(),
            "Channel connection lost, reopening"
        );

        let connection = match self.open(channel) {
            Ok(connection) => connection,
            Err(error) => {
                tracing::warn!(channel = %channel, error = %error, "Failed to reopen channel");
                return None;
            }
        };
        if handle.revive(connection) {
            return Some(handle);
        }

        // Another caller revived it first, or it was disconnected meanwhile
        self.get(channel).filter(|current| !current.is_closed())
    }

    fn options(&self) -> ConnectOptions {
        self.config.connect_options(self.client_id)
    }

    fn open(&self, channel: Channel) -> Result<Arc<dyn SocketConnection>, TransportError> {
        self.transport
            .connect(&self.config.channel_url(channel), &self.options())
    }
}
