//! Client settings.

use std::time::Duration;

use tether_core::DEFAULT_PROTOCOL_VERSION;
use tether_events::DEFAULT_CHANNEL_CAPACITY;

use crate::correlator::DEFAULT_CALL_ID_PREFIX;

/// Default call deadline.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(30);

/// Settings for a [`crate::BridgeClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Protocol version stamped on every request.
    pub protocol_version: String,
    /// Deadline for calls that don't specify one.
    pub default_timeout: Duration,
    /// Prefix for generated call identifiers.
    pub call_id_prefix: String,
    /// Capacity of the event broadcaster's async receivers.
    pub event_capacity: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            protocol_version: DEFAULT_PROTOCOL_VERSION.to_owned(),
            default_timeout: DEFAULT_CALL_TIMEOUT,
            call_id_prefix: DEFAULT_CALL_ID_PREFIX.to_owned(),
            event_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

impl ClientConfig {
    /// Set the default call deadline.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    /// Set the protocol version.
    #[must_use]
    pub fn with_protocol_version(mut self, version: impl Into<String>) -> Self {
        self.protocol_version = version.into();
        self
    }

    /// Set the call identifier prefix.
    #[must_use]
    pub fn with_call_id_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.call_id_prefix = prefix.into();
        self
    }

    /// Build client settings from the loaded configuration.
    #[cfg(feature = "config")]
    #[must_use]
    pub fn from_config(config: &tether_config::Config) -> Self {
        Self {
            protocol_version: config.protocol.version.clone(),
            default_timeout: Duration::from_millis(config.client.default_timeout_ms),
            call_id_prefix: config.client.call_id_prefix.clone(),
            event_capacity: config.events.channel_capacity,
        }
    }
}
