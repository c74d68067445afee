//! Configuration types for the Astrid kernel.
//!
//! Every struct implements [`Default`] with sensible production defaults so
//! that a bare `[section]` header in TOML, or no file at all, produces a
//! working configuration.

use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Root configuration for the Astrid kernel.
///
/// Loaded from a layered TOML + environment-variable chain (see
/// [`crate::loader::load`]) with every field defaulting to a safe value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Logging level and format.
    pub logging: LoggingSection,
    /// Capability Broker limits (spec §4.K).
    pub broker: BrokerSection,
    /// Internal-auth per-scope signing keys (spec §4.B).
    pub auth: AuthSection,
    /// Scheduler tick cadence and claim batch size (spec §4.L).
    pub scheduler: SchedulerSection,
    /// TOTP daemon socket path (spec §4.H).
    pub totp: TotpSection,
    /// Network binding mode for the Capability Broker (spec §4.K).
    pub network_mode: NetworkMode,
    /// Operator opt-in for features disabled by default.
    pub dangerous_mode: bool,
}

/// `tracing`/`tracing-subscriber` setup.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// A `tracing_subscriber::EnvFilter` directive, e.g. `"info"` or
    /// `"astrid_mediator=debug,info"`.
    pub level: String,
    /// Emit newline-delimited JSON instead of the pretty human format.
    pub json: bool,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self { level: "info".to_owned(), json: false }
    }
}

/// Capability Broker HTTP server limits (spec §4.K).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrokerSection {
    /// Loopback (native mode) or all-interfaces (container mode) bind port.
    pub port: u16,
    /// Maximum JSON request body, in bytes.
    pub body_limit_bytes: u64,
    /// Maximum number of in-flight requests before returning 429.
    pub concurrency: usize,
    /// Maximum prompt length, in characters.
    pub prompt_max_chars: usize,
    /// Maximum text-to-speech input length, in characters.
    pub tts_max_chars: usize,
    /// Maximum accepted media path length, in characters.
    pub media_path_max_chars: usize,
    /// Directory outside of which a resolved media path is always rejected.
    pub media_root: PathBuf,
    /// Maximum bytes streamed to disk for a single fetched attachment.
    pub fetch_max_bytes: u64,
}

impl Default for BrokerSection {
    fn default() -> Self {
        Self {
            port: 8787,
            body_limit_bytes: 256 * 1024,
            concurrency: 4,
            prompt_max_chars: 8000,
            tts_max_chars: 4000,
            media_path_max_chars: 4096,
            media_root: PathBuf::from("media"),
            fetch_max_bytes: 20 * 1024 * 1024,
        }
    }
}

/// Internal-auth signing material, one key pair per scope (spec §4.B).
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthSection {
    /// Scope name (e.g. `"broker"`, `"scheduler"`) to base64-encoded HMAC key.
    #[serde(skip_serializing)]
    pub scope_keys: HashMap<String, String>,
}

impl std::fmt::Debug for AuthSection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let scopes: Vec<&str> = self.scope_keys.keys().map(String::as_str).collect();
        f.debug_struct("AuthSection").field("configured_scopes", &scopes).finish()
    }
}

/// Scheduler dispatch-loop cadence (spec §4.L).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerSection {
    /// Ticker interval, in seconds. Enforced minimum of 5 (spec §4.L).
    pub tick_interval_secs: u64,
    /// Maximum jobs claimed per tick.
    pub max_jobs_per_tick: usize,
    /// Grace period added to a job's timeout before the hard deadline fires.
    pub grace_secs: u64,
}

impl Default for SchedulerSection {
    fn default() -> Self {
        Self { tick_interval_secs: 5, max_jobs_per_tick: 10, grace_secs: 10 }
    }
}

/// TOTP daemon connection settings (spec §4.H, §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TotpSection {
    /// Unix-domain socket path.
    pub socket_path: PathBuf,
}

impl Default for TotpSection {
    fn default() -> Self {
        Self { socket_path: PathBuf::from("/run/astrid/totp.sock") }
    }
}

/// Capability Broker bind-address mode (spec §4.K).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NetworkMode {
    /// Bind only to loopback. The default, expected outside a container.
    #[default]
    Native,
    /// Bind to all interfaces. Only correct inside an isolated container.
    Container,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_section_debug_redacts_key_values() {
        let mut auth = AuthSection::default();
        auth.scope_keys.insert("broker".to_owned(), "super-secret-hmac-key".to_owned());

        let debug_str = format!("{auth:?}");
        assert!(!debug_str.contains("super-secret-hmac-key"));
        assert!(debug_str.contains("broker"));
    }

    #[test]
    fn auth_section_serialize_omits_keys() {
        let mut auth = AuthSection::default();
        auth.scope_keys.insert("broker".to_owned(), "super-secret-hmac-key".to_owned());

        let toml = toml::to_string(&auth).unwrap();
        assert!(!toml.contains("super-secret-hmac-key"));
    }

    #[test]
    fn config_defaults_round_trip_through_toml() {
        let config = Config::default();
        let serialized = toml::to_string(&config).unwrap();
        let parsed: Config = toml::from_str(&serialized).unwrap();
        assert_eq!(parsed.broker.port, config.broker.port);
    }
}
