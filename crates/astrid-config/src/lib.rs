#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
//! Unified configuration for the Astrid Security Mediation Kernel.
//!
//! [`Config`] is the single typed configuration struct every binary in this
//! workspace loads at startup, layering an optional TOML file on top of
//! built-in defaults and `ASTRID_*` environment variables.
//!
//! # Usage
//!
//! ```rust,no_run
//! use astrid_config::Config;
//!
//! let resolved = Config::load(None).unwrap();
//! let config = resolved.config;
//! println!("broker port: {}", config.broker.port);
//! ```
//!
//! # Precedence
//!
//! From lowest to highest priority:
//!
//! 1. Built-in defaults.
//! 2. `/etc/astrid/config.toml` (system).
//! 3. `{ASTRID_HOME}/config.toml` (user, `~/.astrid` by default).
//! 4. `ASTRID_*` environment variables.
//!
//! # Design
//!
//! This crate has no dependencies on other internal astrid crates. It only
//! depends on `serde`, `toml`, `thiserror`, `tracing`, and `directories`.

/// Environment variable override resolution.
pub mod env;
/// Configuration error types.
pub mod error;
/// Configuration file discovery and loading.
pub mod loader;
/// Resolved configuration and its file provenance.
pub mod show;
/// Configuration struct definitions.
pub mod types;
/// Configuration validation rules.
pub mod validate;

pub use error::{ConfigError, ConfigResult};
pub use show::ResolvedConfig;
pub use types::*;

impl Config {
    /// Load configuration with the full precedence chain.
    ///
    /// `astrid_home_override` overrides `ASTRID_HOME`/`~` discovery for the
    /// user-level config file, matching every other binary's home-directory
    /// resolution.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if a config file is malformed or the final
    /// configuration fails validation.
    pub fn load(astrid_home_override: Option<&std::path::Path>) -> ConfigResult<ResolvedConfig> {
        loader::load(astrid_home_override)
    }

    /// Load configuration from a single file, with no layering.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the file cannot be read, parsed, or
    /// fails validation.
    pub fn load_file(path: &std::path::Path) -> ConfigResult<Self> {
        loader::load_file(path)
    }
}
