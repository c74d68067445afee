//! Environment variable overrides, applied after the TOML file layer.
//!
//! Unlike the teacher's raw-`toml::Value`-tree merge (needed there to track
//! which of several file layers a field came from), this crate only has one
//! file layer, so overrides are applied directly to the typed [`Config`]
//! once it's been deserialized.

use std::env::VarError;

use crate::types::{Config, NetworkMode};

const AUTH_KEY_PREFIX: &str = "ASTRID_AUTH_KEY_";

/// Apply `ASTRID_*` environment variable overrides on top of a loaded
/// [`Config`]. A variable wins over whatever the TOML file set.
pub fn apply_env_overrides(config: &mut Config) {
    if let Some(level) = read("ASTRID_LOG_LEVEL") {
        config.logging.level = level;
    }
    if let Some(json) = read_bool("ASTRID_LOG_JSON") {
        config.logging.json = json;
    }

    if let Some(port) = read_parsed::<u16>("ASTRID_BROKER_PORT") {
        config.broker.port = port;
    }
    if let Some(limit) = read_parsed::<u64>("ASTRID_BROKER_BODY_LIMIT_BYTES") {
        config.broker.body_limit_bytes = limit;
    }
    if let Some(concurrency) = read_parsed::<usize>("ASTRID_BROKER_CONCURRENCY") {
        config.broker.concurrency = concurrency;
    }
    if let Some(chars) = read_parsed::<usize>("ASTRID_BROKER_PROMPT_MAX_CHARS") {
        config.broker.prompt_max_chars = chars;
    }
    if let Some(chars) = read_parsed::<usize>("ASTRID_BROKER_TTS_MAX_CHARS") {
        config.broker.tts_max_chars = chars;
    }
    if let Some(root) = read("ASTRID_BROKER_MEDIA_ROOT") {
        config.broker.media_root = root.into();
    }
    if let Some(bytes) = read_parsed::<u64>("ASTRID_BROKER_FETCH_MAX_BYTES") {
        config.broker.fetch_max_bytes = bytes;
    }

    if let Some(secs) = read_parsed::<u64>("ASTRID_SCHEDULER_TICK_SECS") {
        config.scheduler.tick_interval_secs = secs;
    }
    if let Some(n) = read_parsed::<usize>("ASTRID_SCHEDULER_MAX_JOBS_PER_TICK") {
        config.scheduler.max_jobs_per_tick = n;
    }

    if let Some(path) = read("ASTRID_TOTP_SOCKET") {
        config.totp.socket_path = path.into();
    }

    if let Some(mode) = read("ASTRID_NETWORK_MODE") {
        config.network_mode = match mode.as_str() {
            "container" => NetworkMode::Container,
            _ => NetworkMode::Native,
        };
    }
    if let Some(dangerous) = read_bool("ASTRID_DANGEROUS_MODE") {
        config.dangerous_mode = dangerous;
    }

    for (key, value) in std::env::vars() {
        if let Some(scope) = key.strip_prefix(AUTH_KEY_PREFIX) {
            config.auth.scope_keys.insert(scope.to_ascii_lowercase(), value);
        }
    }
}

fn read(name: &str) -> Option<String> {
    match std::env::var(name) {
        Ok(value) => Some(value),
        Err(VarError::NotPresent) => None,
        Err(VarError::NotUnicode(_)) => {
            tracing::warn!(name, "environment variable is not valid UTF-8, ignoring");
            None
        }
    }
}

fn read_bool(name: &str) -> Option<bool> {
    read(name).map(|value| matches!(value.as_str(), "1" | "true" | "yes" | "on"))
}

fn read_parsed<T: std::str::FromStr>(name: &str) -> Option<T> {
    let raw = read(name)?;
    match raw.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(name, value = raw, "environment variable failed to parse, ignoring");
            None
        }
    }
}
