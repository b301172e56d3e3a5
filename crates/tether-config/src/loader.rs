//! Config file discovery and layered loading.
//!
//! Implements the `Config::load()` algorithm:
//! 1. Parse `defaults.toml` → base
//! 2. Merge `~/.tether/config.toml` (or `TETHER_HOME/config.toml`)
//! 3. Merge the explicitly requested file, if any
//! 4. Apply env var fallbacks for fields no file set
//! 5. Deserialize the merged tree → `Config`
//! 6. Validate

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::env::{apply_env_fallbacks, collect_env_vars};
use crate::error::{ConfigError, ConfigResult};
use crate::merge::{ConfigLayer, FieldSources, deep_merge_tracking, record_leaves};
use crate::types::Config;
use crate::validate;

/// Embedded default configuration.
const DEFAULTS_TOML: &str = include_str!("defaults.toml");

/// Maximum allowed config file size (1 MiB).
pub const MAX_CONFIG_FILE_SIZE: u64 = 1_048_576;

/// A loaded configuration plus where each value came from.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// The final merged configuration.
    pub config: Config,
    /// Dotted field path → which layer set the value.
    pub field_sources: FieldSources,
    /// Config file paths that were loaded, lowest precedence first.
    pub loaded_files: Vec<String>,
}

/// Load the configuration with layered precedence.
///
/// `explicit` is a file that takes precedence over every other layer; unlike
/// the user file it must exist. `tether_home_override` replaces the
/// `~/.tether` directory used for user config discovery.
///
/// # Errors
///
/// Returns a [`ConfigError`] if any config file is unreadable or malformed,
/// or if the merged configuration fails validation.
pub fn load(
    explicit: Option<&Path>,
    tether_home_override: Option<&Path>,
) -> ConfigResult<ResolvedConfig> {
    let env_vars = collect_env_vars();
    let user_path = match tether_home_override {
        Some(dir) => Some(dir.join("config.toml")),
        None => discover_user_file(&env_vars)?,
    };
    load_layers(explicit, user_path.as_deref(), &env_vars)
}

pub(crate) fn load_layers(
    explicit: Option<&Path>,
    user_path: Option<&Path>,
    env_vars: &HashMap<String, String>,
) -> ConfigResult<ResolvedConfig> {
    let mut merged: toml::Value =
        toml::from_str(DEFAULTS_TOML).map_err(|e| ConfigError::ParseError {
            path: "<embedded defaults>".to_owned(),
            source: e,
        })?;

    let mut field_sources = FieldSources::new();
    let mut loaded_files = Vec::new();
    record_leaves(&merged, "", &ConfigLayer::Defaults, &mut field_sources);

    if let Some(path) = user_path
        && let Some(overlay) = try_load_file(path)?
    {
        deep_merge_tracking(
            &mut merged,
            &overlay,
            "",
            &ConfigLayer::User,
            &mut field_sources,
        );
        loaded_files.push(path.display().to_string());
        info!(path = %path.display(), "loaded user config");
    }

    if let Some(path) = explicit {
        let overlay = read_file(path)?;
        deep_merge_tracking(
            &mut merged,
            &overlay,
            "",
            &ConfigLayer::Explicit,
            &mut field_sources,
        );
        loaded_files.push(path.display().to_string());
        info!(path = %path.display(), "loaded config file");
    }

    let env_count = apply_env_fallbacks(&mut merged, &mut field_sources, env_vars);
    if env_count > 0 {
        debug!(count = env_count, "applied environment variable fallbacks");
    }

    let config: Config =
        merged
            .try_into()
            .map_err(|e: toml::de::Error| ConfigError::ParseError {
                path: "<merged config>".to_owned(),
                source: e,
            })?;

    validate::validate(&config)?;

    Ok(ResolvedConfig {
        config,
        field_sources,
        loaded_files,
    })
}

/// Load a config from a single file layered over the embedded defaults.
///
/// # Errors
///
/// Returns a [`ConfigError`] if the file cannot be read, parsed or
/// validated.
pub fn load_file(path: &Path) -> ConfigResult<Config> {
    load_layers(Some(path), None, &HashMap::new()).map(|resolved| resolved.config)
}

/// `~/.tether/config.toml` if present, else `TETHER_HOME/config.toml`.
fn discover_user_file(env_vars: &HashMap<String, String>) -> ConfigResult<Option<PathBuf>> {
    let home_dir = home_directory()?;
    let default_path = home_dir.join(".tether").join("config.toml");
    if default_path.is_file() {
        return Ok(Some(default_path));
    }

    let Some(tether_home) = env_vars.get("TETHER_HOME") else {
        return Ok(None);
    };
    match PathBuf::from(tether_home).canonicalize() {
        Ok(dir) if dir.is_dir() => Ok(Some(dir.join("config.toml"))),
        _ => {
            warn!(path = %tether_home, "TETHER_HOME is not a directory; ignoring");
            Ok(None)
        },
    }
}

fn read_file(path: &Path) -> ConfigResult<toml::Value> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.display().to_string(),
        source: e,
    })?;
    parse_content(path, &content)
}

/// Try to load a file, returning `None` if it doesn't exist.
fn try_load_file(path: &Path) -> ConfigResult<Option<toml::Value>> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "config file not found, skipping");
            return Ok(None);
        },
        Err(e) => {
            return Err(ConfigError::ReadError {
                path: path.display().to_string(),
                source: e,
            });
        },
    };
    parse_content(path, &content).map(Some)
}

fn parse_content(path: &Path, content: &str) -> ConfigResult<toml::Value> {
    // Checked after reading so the size matches what gets parsed.
    if content.len() as u64 > MAX_CONFIG_FILE_SIZE {
        return Err(ConfigError::ValidationError {
            field: path.display().to_string(),
            message: format!(
                "config file is {} bytes, exceeding the {} byte limit",
                content.len(),
                MAX_CONFIG_FILE_SIZE
            ),
        });
    }

    toml::from_str(content).map_err(|e| ConfigError::ParseError {
        path: path.display().to_string(),
        source: e,
    })
}

/// Determine the user's home directory.
fn home_directory() -> ConfigResult<PathBuf> {
    directories::BaseDirs::new()
        .map(|d| d.home_dir().to_path_buf())
        .ok_or(ConfigError::NoHomeDir)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn defaults_deserialize_to_default_config() {
        let config: Config = toml::from_str(DEFAULTS_TOML).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn defaults_only() {
        let resolved = load_layers(None, None, &HashMap::new()).unwrap();
        assert_eq!(resolved.config, Config::default());
        assert!(resolved.loaded_files.is_empty());
        assert_eq!(
            resolved.field_sources.get("protocol.version"),
            Some(&ConfigLayer::Defaults)
        );
    }

    #[test]
    fn missing_user_file_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let resolved = load(None, Some(dir.path())).unwrap();
        assert!(resolved.loaded_files.is_empty());
    }

    #[test]
    fn explicit_file_overrides_user_file() {
        let dir = tempfile::tempdir().unwrap();
        let user = write(
            dir.path(),
            "config.toml",
            "[client]\ndefault_timeout_ms = 1000\ncall_id_prefix = \"u_\"\n",
        );
        let explicit = write(dir.path(), "app.toml", "[client]\ndefault_timeout_ms = 2000\n");

        let resolved = load_layers(Some(&explicit), Some(&user), &HashMap::new()).unwrap();
        assert_eq!(resolved.config.client.default_timeout_ms, 2000);
        assert_eq!(resolved.config.client.call_id_prefix, "u_");
        assert_eq!(resolved.loaded_files.len(), 2);
        assert_eq!(
            resolved.field_sources.get("client.default_timeout_ms"),
            Some(&ConfigLayer::Explicit)
        );
    }

    #[test]
    fn env_applies_only_where_no_file_set_the_field() {
        let dir = tempfile::tempdir().unwrap();
        let user = write(dir.path(), "config.toml", "[logging]\nlevel = \"warn\"\n");
        let env = HashMap::from([
            ("TETHER_LOG_LEVEL".to_owned(), "trace".to_owned()),
            ("TETHER_CALL_TIMEOUT_MS".to_owned(), "5000".to_owned()),
        ]);

        let resolved = load_layers(None, Some(&user), &env).unwrap();
        assert_eq!(resolved.config.logging.level, "warn");
        assert_eq!(resolved.config.client.default_timeout_ms, 5000);
    }

    #[test]
    fn explicit_file_must_exist() {
        let result = load_file(Path::new("/nonexistent/tether.toml"));
        assert!(matches!(result, Err(ConfigError::ReadError { .. })));
    }

    #[test]
    fn malformed_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "bad.toml", "[client\n");
        let err = load_file(&path).unwrap_err();
        match err {
            ConfigError::ParseError { path: reported, .. } => {
                assert!(reported.ends_with("bad.toml"));
            },
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn invalid_values_fail_validation() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "zero.toml", "[events]\nchannel_capacity = 0\n");
        assert!(matches!(
            load_file(&path),
            Err(ConfigError::ValidationError { .. })
        ));
    }

    #[test]
    fn oversized_config_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let data = "x = \"".to_owned() + &"a".repeat(1_100_000) + "\"";
        let path = write(dir.path(), "huge.toml", &data);

        let result = try_load_file(&path);
        assert!(
            matches!(result, Err(ConfigError::ValidationError { .. })),
            "expected ValidationError for oversized config, got: {result:?}"
        );
    }
}
