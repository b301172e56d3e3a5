//! Post-merge configuration validation.

use crate::error::{ConfigError, ConfigResult};
use crate::types::Config;

/// Upper bound on the default call timeout (ten minutes).
pub const MAX_CALL_TIMEOUT_MS: u64 = 600_000;

/// Upper bound on a lifecycle hook's time limit (one minute).
pub const MAX_HOOK_TIMEOUT_MS: u64 = 60_000;

/// Log formats understood by the telemetry crate.
pub const LOG_FORMATS: &[&str] = &["pretty", "compact", "json", "full"];

/// Validate a fully-merged and deserialized configuration.
///
/// # Errors
///
/// Returns the first validation error found.
pub fn validate(config: &Config) -> ConfigResult<()> {
    validate_protocol(config)?;
    validate_client(config)?;
    validate_host(config)?;
    validate_events(config)?;
    validate_logging(config)?;
    Ok(())
}

fn validate_protocol(config: &Config) -> ConfigResult<()> {
    if config.protocol.version.trim().is_empty() {
        return Err(ConfigError::invalid(
            "protocol.version",
            "protocol version must not be empty",
        ));
    }
    Ok(())
}

fn validate_client(config: &Config) -> ConfigResult<()> {
    let timeout = config.client.default_timeout_ms;
    if timeout == 0 || timeout > MAX_CALL_TIMEOUT_MS {
        return Err(ConfigError::invalid(
            "client.default_timeout_ms",
            format!(
                "timeout {timeout} ms is out of range; must be between 1 and {MAX_CALL_TIMEOUT_MS}"
            ),
        ));
    }
    if config.client.call_id_prefix.is_empty() {
        return Err(ConfigError::invalid(
            "client.call_id_prefix",
            "call id prefix must not be empty",
        ));
    }
    Ok(())
}

fn validate_host(config: &Config) -> ConfigResult<()> {
    for (field, name) in [
        ("host.response_receiver", &config.host.response_receiver),
        ("host.event_receiver", &config.host.event_receiver),
    ] {
        if !is_script_identifier(name) {
            return Err(ConfigError::invalid(
                field,
                format!("'{name}' is not a valid script identifier"),
            ));
        }
    }
    let hook_timeout = config.host.hook_timeout_ms;
    if hook_timeout == 0 || hook_timeout > MAX_HOOK_TIMEOUT_MS {
        return Err(ConfigError::invalid(
            "host.hook_timeout_ms",
            format!(
                "hook timeout {hook_timeout} ms is out of range; \
                 must be between 1 and {MAX_HOOK_TIMEOUT_MS}"
            ),
        ));
    }
    Ok(())
}

fn validate_events(config: &Config) -> ConfigResult<()> {
    if config.events.channel_capacity == 0 {
        return Err(ConfigError::invalid(
            "events.channel_capacity",
            "channel capacity must be greater than zero",
        ));
    }
    Ok(())
}

fn validate_logging(config: &Config) -> ConfigResult<()> {
    let format = config.logging.format.as_str();
    if !LOG_FORMATS.contains(&format) {
        return Err(ConfigError::invalid(
            "logging.format",
            format!(
                "unknown format '{format}'; expected one of: {}",
                LOG_FORMATS.join(", ")
            ),
        ));
    }
    Ok(())
}

/// ASCII identifier: a letter, `_` or `$` followed by letters, digits, `_`
/// or `$`. Must accept exactly what the host accepts as a receiver name.
#[must_use]
pub fn is_script_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_' || c == '$')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}
