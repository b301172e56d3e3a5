//! Configuration types for the Tether bridge.
//!
//! Every struct implements [`Default`] with the same values as the embedded
//! `defaults.toml`, so a bare `[section]` header produces a working
//! configuration.

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Wire protocol settings shared by both sides.
    pub protocol: ProtocolSection,
    /// Content-side client settings.
    pub client: ClientSection,
    /// Host-side settings.
    pub host: HostSection,
    /// Event broadcaster settings.
    pub events: EventsSection,
    /// Log output settings.
    pub logging: LoggingSection,
}

/// `[protocol]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtocolSection {
    /// Protocol version both sides must agree on.
    pub version: String,
}

impl Default for ProtocolSection {
    fn default() -> Self {
        Self {
            version: "1.0".to_owned(),
        }
    }
}

/// `[client]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientSection {
    /// Deadline applied to calls that don't specify one, in milliseconds.
    pub default_timeout_ms: u64,
    /// Prefix of generated call ids.
    pub call_id_prefix: String,
}

impl Default for ClientSection {
    fn default() -> Self {
        Self {
            default_timeout_ms: 30_000,
            call_id_prefix: "cb_".to_owned(),
        }
    }
}

/// `[host]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostSection {
    /// Global receiver invoked with each response.
    pub response_receiver: String,
    /// Global receiver invoked with each event.
    pub event_receiver: String,
    /// Upper bound on each module lifecycle hook.
    pub hook_timeout_ms: u64,
}

impl Default for HostSection {
    fn default() -> Self {
        Self {
            response_receiver: "__tetherOnResponse".to_owned(),
            event_receiver: "__tetherOnEvent".to_owned(),
            hook_timeout_ms: 5000,
        }
    }
}

/// `[events]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventsSection {
    /// Buffer size of async event receivers.
    pub channel_capacity: usize,
}

impl Default for EventsSection {
    fn default() -> Self {
        Self {
            channel_capacity: 256,
        }
    }
}

/// `[logging]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Default level (`trace`, `debug`, `info`, `warn`, `error`).
    pub level: String,
    /// Output format: `pretty`, `compact`, `json` or `full`.
    pub format: String,
    /// Extra `EnvFilter` directives, e.g. `tether_host=debug`.
    pub directives: Vec<String>,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            format: "pretty".to_owned(),
            directives: Vec::new(),
        }
    }
}
