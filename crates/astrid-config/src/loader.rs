//! Config file discovery and loading.
//!
//! Implements the `Config::load()` algorithm:
//! 1. Start from embedded defaults.
//! 2. Merge `/etc/astrid/config.toml` (system), then `{home}/.astrid/config.toml`
//!    (user) — the user file wins on any field it sets.
//! 3. Apply `ASTRID_*` environment variable overrides.
//! 4. Validate.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::env::apply_env_overrides;
use crate::error::{ConfigError, ConfigResult};
use crate::show::ResolvedConfig;
use crate::types::Config;
use crate::validate;

/// Maximum allowed config file size (1 MB), guarding against an operator
/// accidentally pointing a config path at an unrelated large file.
const MAX_CONFIG_FILE_SIZE: u64 = 1_048_576;

/// Load the kernel configuration: system file, then user file, then
/// environment overrides, then validation.
///
/// `astrid_home_override` takes precedence over `ASTRID_HOME`/`~` discovery
/// for locating the user-level config file, matching every other binary's
/// home-directory resolution.
///
/// # Errors
///
/// Returns a [`ConfigError`] if a config file is malformed, unreadable, or
/// the final configuration fails validation.
pub fn load(astrid_home_override: Option<&Path>) -> ConfigResult<ResolvedConfig> {
    let mut config = Config::default();
    let mut loaded_files = Vec::new();

    let system_path = PathBuf::from("/etc/astrid/config.toml");
    if let Some(overlay) = try_load_file(&system_path)? {
        merge_into(&mut config, overlay);
        loaded_files.push(system_path.display().to_string());
        info!(path = %system_path.display(), "loaded system config");
    }

    let home_dir = match astrid_home_override {
        Some(h) => h.to_path_buf(),
        None => home_directory()?,
    };
    let user_path = home_dir.join("config.toml");
    if let Some(overlay) = try_load_file(&user_path)? {
        merge_into(&mut config, overlay);
        loaded_files.push(user_path.display().to_string());
        info!(path = %user_path.display(), "loaded user config");
    }

    apply_env_overrides(&mut config);
    validate::validate(&config)?;

    Ok(ResolvedConfig { config, loaded_files })
}

/// Load a config from a single file, with no layering or env overrides.
///
/// # Errors
///
/// Returns a [`ConfigError`] if the file cannot be read, parsed, or fails
/// validation.
pub fn load_file(path: &Path) -> ConfigResult<Config> {
    let metadata = std::fs::metadata(path).map_err(|e| ConfigError::ReadError { path: path.display().to_string(), source: e })?;
    if metadata.len() > MAX_CONFIG_FILE_SIZE {
        return Err(ConfigError::ValidationError {
            field: path.display().to_string(),
            message: format!("config file is {} bytes, exceeding the {MAX_CONFIG_FILE_SIZE} byte limit", metadata.len()),
        });
    }

    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError { path: path.display().to_string(), source: e })?;
    let config: Config =
        toml::from_str(&content).map_err(|e| ConfigError::ParseError { path: path.display().to_string(), source: e })?;

    validate::validate(&config)?;
    Ok(config)
}

/// A merge pass where the overlay wins field-by-field. Deserializing the
/// overlay directly into `Config` (rather than walking a raw `toml::Value`
/// tree) is sound here because `#[serde(default)]` fills any field the
/// overlay omits with `Config::default()`'s value, not with the base layer's
/// — so we only adopt overlay fields the file actually set, by re-parsing
/// the overlay's own source against an otherwise-empty table and overlaying
/// only the keys present in it.
fn merge_into(base: &mut Config, overlay: toml::Value) {
    let parsed: Result<Config, toml::de::Error> = overlay.clone().try_into();
    if let Ok(overlay_config) = parsed {
        if let toml::Value::Table(table) = &overlay {
            if table.contains_key("logging") {
                base.logging = overlay_config.logging;
            }
            if table.contains_key("broker") {
                base.broker = overlay_config.broker;
            }
            if table.contains_key("auth") {
                base.auth = overlay_config.auth;
            }
            if table.contains_key("scheduler") {
                base.scheduler = overlay_config.scheduler;
            }
            if table.contains_key("totp") {
                base.totp = overlay_config.totp;
            }
            if table.contains_key("network_mode") {
                base.network_mode = overlay_config.network_mode;
            }
            if table.contains_key("dangerous_mode") {
                base.dangerous_mode = overlay_config.dangerous_mode;
            }
        }
    }
}

/// Try to load a file, returning `None` if the file doesn't exist.
///
/// Reads the file in one shot rather than checking existence first, to
/// avoid a TOCTOU gap between the check and the read.
fn try_load_file(path: &Path) -> ConfigResult<Option<toml::Value>> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "config file not found, skipping");
            return Ok(None);
        }
        Err(e) => return Err(ConfigError::ReadError { path: path.display().to_string(), source: e }),
    };

    if content.len() as u64 > MAX_CONFIG_FILE_SIZE {
        return Err(ConfigError::ValidationError {
            field: path.display().to_string(),
            message: format!("config file is {} bytes, exceeding the {MAX_CONFIG_FILE_SIZE} byte limit", content.len()),
        });
    }

    let value: toml::Value =
        toml::from_str(&content).map_err(|e| ConfigError::ParseError { path: path.display().to_string(), source: e })?;
    Ok(Some(value))
}

/// Determine the user's home directory, via the same `directories` crate
/// every other binary in this workspace uses for `ASTRID_HOME` discovery.
fn home_directory() -> ConfigResult<PathBuf> {
    if let Ok(home) = std::env::var("ASTRID_HOME") {
        return Ok(PathBuf::from(home));
    }
    directories::BaseDirs::new().map(|d| d.home_dir().join(".astrid")).ok_or(ConfigError::NoHomeDir)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        let config = Config::default();
        assert!(validate::validate(&config).is_ok());
    }

    #[test]
    fn load_file_nonexistent() {
        let result = load_file(Path::new("/nonexistent/config.toml"));
        assert!(matches!(result, Err(ConfigError::ReadError { .. })));
    }

    #[test]
    fn try_load_file_missing() {
        let result = try_load_file(Path::new("/nonexistent/config.toml")).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn user_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("config.toml"), "[broker]\nport = 9999\n").unwrap();

        let resolved = load(Some(dir.path())).unwrap();
        assert_eq!(resolved.config.broker.port, 9999);
        assert_eq!(resolved.loaded_files.len(), 1);
    }

    #[test]
    fn oversized_config_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let file_path = dir.path().join("huge.toml");
        let data = "x = \"".to_owned() + &"a".repeat(1_100_000) + "\"";
        std::fs::write(&file_path, data).unwrap();

        let result = try_load_file(&file_path);
        assert!(matches!(result, Err(ConfigError::ValidationError { .. })));
    }
}
