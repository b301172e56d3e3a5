//! Layered configuration for the Tether view bridge.
//!
//! # Usage
//!
//! ```rust,no_run
//! use tether_config::Config;
//!
//! let resolved = Config::load(None).unwrap();
//! println!("speaking protocol {}", resolved.config.protocol.version);
//! ```
//!
//! # Configuration Precedence
//!
//! From highest to lowest priority:
//!
//! 1. **Explicit file** passed to [`Config::load`]
//! 2. **User** (`~/.tether/config.toml`, else `$TETHER_HOME/config.toml`)
//! 3. **Environment variables** (`TETHER_*`), fallback only
//! 4. **Embedded defaults** (`defaults.toml` compiled into the binary)
//!
//! This crate has no dependencies on other tether crates. The client and
//! host crates convert from [`Config`] behind their `config` feature.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

/// Environment variable fallback resolution.
pub mod env;
/// Configuration error types.
pub mod error;
/// Configuration file discovery and loading.
pub mod loader;
/// Layered configuration merging.
pub mod merge;
/// Configuration struct definitions.
pub mod types;
/// Configuration validation rules.
pub mod validate;

pub use error::{ConfigError, ConfigResult};
pub use loader::{MAX_CONFIG_FILE_SIZE, ResolvedConfig};
pub use merge::{ConfigLayer, FieldSources};
pub use types::*;

impl Config {
    /// Load configuration with the full precedence chain.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if a config file is unreadable or malformed,
    /// or if the result fails validation.
    pub fn load(explicit: Option<&std::path::Path>) -> ConfigResult<ResolvedConfig> {
        loader::load(explicit, None)
    }

    /// Load configuration using `tether_home` in place of `~/.tether`.
    ///
    /// # Errors
    ///
    /// Same as [`Config::load`].
    pub fn load_with_home(
        explicit: Option<&std::path::Path>,
        tether_home: &std::path::Path,
    ) -> ConfigResult<ResolvedConfig> {
        loader::load(explicit, Some(tether_home))
    }

    /// Load a single file layered over the embedded defaults.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the file cannot be read, parsed or
    /// validated.
    pub fn from_file(path: &std::path::Path) -> ConfigResult<Self> {
        loader::load_file(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_with_home_reads_config_toml() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("config.toml"),
            "[host]\nevent_receiver = \"onHostEvent\"\n",
        )
        .unwrap();

        let resolved = Config::load_with_home(None, dir.path()).unwrap();
        assert_eq!(resolved.config.host.event_receiver, "onHostEvent");
        assert_eq!(
            resolved.field_sources.get("host.event_receiver"),
            Some(&ConfigLayer::User)
        );
    }
}
