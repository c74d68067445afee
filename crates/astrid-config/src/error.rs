//! Configuration error types.

use thiserror::Error;

/// Errors produced while locating, parsing, or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A config file could not be read.
    #[error("failed to read config file {path}: {source}")]
    ReadError {
        /// Path of the file that failed to read.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// A config file's TOML could not be parsed.
    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        /// Path of the file that failed to parse.
        path: String,
        /// Underlying TOML error.
        #[source]
        source: toml::de::Error,
    },
    /// The merged configuration failed a validation rule.
    #[error("invalid config field {field}: {message}")]
    ValidationError {
        /// Dotted path of the offending field.
        field: String,
        /// Human-readable description of the violated rule.
        message: String,
    },
    /// The user's home directory could not be determined.
    #[error("could not determine the home directory")]
    NoHomeDir,
}

/// Result alias for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;
