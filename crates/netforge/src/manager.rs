//! Channel manager: owns every channel and drives them by name.
//!
//! The embedding application typically keeps one manager, adds a channel
//! per remote service, and calls [`update_all`](NetworkManager::update_all)
//! from its frame loop or timer.

use std::collections::HashMap;

use netforge_protocol::PacketCodec;
use netforge_transport::Transport;
use tracing::info;

use crate::channel::NetworkChannel;
use crate::error::ChannelError;

/// Owns a set of named channels sharing one codec and transport type.
pub struct NetworkManager<C: PacketCodec, T: Transport> {
    channels: HashMap<String, NetworkChannel<C, T>>,
}

impl<C: PacketCodec, T: Transport> NetworkManager<C, T> {
    /// Creates an empty manager.
    pub fn new() -> Self {
        Self {
            channels: HashMap::new(),
        }
    }

    /// Adds a channel under its own name.
    ///
    /// # Errors
    /// If the name is taken, the offered channel is handed back untouched
    /// alongside [`ChannelError::DuplicateChannel`] — a live connection is
    /// never dropped on the floor by a naming collision.
    pub fn add_channel(
        &mut self,
        channel: NetworkChannel<C, T>,
    ) -> Result<(), (ChannelError, NetworkChannel<C, T>)> {
        let name = channel.name().to_string();
        if self.channels.contains_key(&name) {
            return Err((ChannelError::DuplicateChannel(name), channel));
        }
        info!(channel = %name, "channel added");
        self.channels.insert(name, channel);
        Ok(())
    }

    /// Looks up a channel by name.
    pub fn channel(&self, name: &str) -> Option<&NetworkChannel<C, T>> {
        self.channels.get(name)
    }

    /// Looks up a channel by name, mutably.
    pub fn channel_mut(&mut self, name: &str) -> Option<&mut NetworkChannel<C, T>> {
        self.channels.get_mut(name)
    }

    /// Whether a channel with this name exists.
    pub fn has_channel(&self, name: &str) -> bool {
        self.channels.contains_key(name)
    }

    /// Number of managed channels.
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Names of all managed channels.
    pub fn channel_names(&self) -> Vec<&str> {
        self.channels.keys().map(String::as_str).collect()
    }

    /// Ticks every channel once. See
    /// [`NetworkChannel::update`](crate::NetworkChannel::update) for the
    /// clock semantics.
    pub fn update_all(&mut self, elapsed_seconds: f32, real_elapsed_seconds: f32) {
        for channel in self.channels.values_mut() {
            channel.update(elapsed_seconds, real_elapsed_seconds);
        }
    }

    /// Shuts down a channel and removes it. Returns `false` if no channel
    /// had that name.
    pub fn destroy_channel(&mut self, name: &str) -> bool {
        let Some(mut channel) = self.channels.remove(name) else {
            return false;
        };
        channel.shutdown();
        info!(channel = %name, "channel destroyed");
        true
    }

    /// Shuts down and removes every channel.
    pub fn shutdown_all(&mut self) {
        for (_, mut channel) in self.channels.drain() {
            channel.shutdown();
        }
    }
}

impl<C: PacketCodec, T: Transport> Default for NetworkManager<C, T> {
    fn default() -> Self {
        Self::new()
    }
}
