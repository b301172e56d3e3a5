//! Host settings.

use std::time::Duration;

use tether_core::DEFAULT_PROTOCOL_VERSION;
use tether_events::DEFAULT_CHANNEL_CAPACITY;

use crate::module::DEFAULT_HOOK_TIMEOUT;
use crate::transport::{DEFAULT_EVENT_RECEIVER, DEFAULT_RESPONSE_RECEIVER};

/// Settings for a [`crate::BridgeHost`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostConfig {
    /// The negotiated protocol version; requests carrying any other version
    /// are rejected.
    pub protocol_version: String,
    /// Global receiver for responses.
    pub response_receiver: String,
    /// Global receiver for events.
    pub event_receiver: String,
    /// Capacity of the event broadcaster's async receivers.
    pub event_capacity: usize,
    /// Upper bound on each lifecycle hook; overrunning hooks are aborted.
    pub hook_timeout: Duration,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            protocol_version: DEFAULT_PROTOCOL_VERSION.to_owned(),
            response_receiver: DEFAULT_RESPONSE_RECEIVER.to_owned(),
            event_receiver: DEFAULT_EVENT_RECEIVER.to_owned(),
            event_capacity: DEFAULT_CHANNEL_CAPACITY,
            hook_timeout: DEFAULT_HOOK_TIMEOUT,
        }
    }
}

impl HostConfig {
    /// Set the protocol version.
    #[must_use]
    pub fn with_protocol_version(mut self, version: impl Into<String>) -> Self {
        self.protocol_version = version.into();
        self
    }

    /// Set both receiver names.
    #[must_use]
    pub fn with_receivers(
        mut self,
        response_receiver: impl Into<String>,
        event_receiver: impl Into<String>,
    ) -> Self {
        self.response_receiver = response_receiver.into();
        self.event_receiver = event_receiver.into();
        self
    }

    /// Set the per-hook time limit.
    #[must_use]
    pub fn with_hook_timeout(mut self, timeout: Duration) -> Self {
        self.hook_timeout = timeout;
        self
    }

    /// Build host settings from the loaded configuration.
    #[cfg(feature = "config")]
    #[must_use]
    pub fn from_config(config: &tether_config::Config) -> Self {
        Self {
            protocol_version: config.protocol.version.clone(),
            response_receiver: config.host.response_receiver.clone(),
            event_receiver: config.host.event_receiver.clone(),
            event_capacity: config.events.channel_capacity,
            hook_timeout: Duration::from_millis(config.host.hook_timeout_ms),
        }
    }
}
