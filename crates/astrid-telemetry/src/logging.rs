//! Logging setup built on `tracing-subscriber`.

use std::str::FromStr;

use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;

use crate::error::{TelemetryError, TelemetryResult};

/// Output format for log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable, colored, multi-line.
    #[default]
    Pretty,
    /// Single-line compact format.
    Compact,
    /// Newline-delimited JSON, for ingestion by log collectors.
    Json,
}

/// Where log output is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogTarget {
    /// Standard error (default).
    #[default]
    Stderr,
    /// Standard output.
    Stdout,
}

/// Configuration for process-wide logging.
#[derive(Debug, Clone)]
pub struct LogConfig {
    level: String,
    format: LogFormat,
    target: LogTarget,
    directives: Vec<String>,
    ansi: bool,
}

impl LogConfig {
    /// Create a config with a base level (`"info"`, `"debug"`, ...).
    #[must_use]
    pub fn new(level: impl Into<String>) -> Self {
        Self {
            level: level.into(),
            format: LogFormat::default(),
            target: LogTarget::default(),
            directives: Vec::new(),
            ansi: true,
        }
    }

    /// Set the output format.
    #[must_use]
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// Set the output target.
    #[must_use]
    pub fn with_target(mut self, target: LogTarget) -> Self {
        self.target = target;
        self
    }

    /// Add a per-module filter directive, e.g. `"astrid_policy=trace"`.
    #[must_use]
    pub fn with_directive(mut self, directive: impl Into<String>) -> Self {
        self.directives.push(directive.into());
        self
    }

    /// Disable ANSI color codes (e.g. when writing to a file or non-tty).
    #[must_use]
    pub fn without_ansi(mut self) -> Self {
        self.ansi = false;
        self
    }

    fn env_filter(&self) -> TelemetryResult<EnvFilter> {
        let mut filter = EnvFilter::try_new(&self.level)
            .map_err(|e| TelemetryError::ConfigError(e.to_string()))?;
        for directive in &self.directives {
            let directive = tracing_subscriber::filter::Directive::from_str(directive)
                .map_err(|e| TelemetryError::ConfigError(e.to_string()))?;
            filter = filter.add_directive(directive);
        }
        Ok(filter)
    }
}

/// Initialize the global `tracing` subscriber from `config`.
///
/// # Errors
///
/// Returns [`TelemetryError::ConfigError`] if a filter directive is
/// malformed, or [`TelemetryError::InitError`] if a subscriber is already
/// installed.
pub fn setup_logging(config: &LogConfig) -> TelemetryResult<()> {
    let filter = config.env_filter()?;
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(config.ansi)
        .with_span_events(FmtSpan::CLOSE)
        .with_writer(move || -> Box<dyn std::io::Write> {
            match config.target {
                LogTarget::Stderr => Box::new(std::io::stderr()),
                LogTarget::Stdout => Box::new(std::io::stdout()),
            }
        });

    let result = match config.format {
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };

    result.map_err(|e| TelemetryError::InitError(e.to_string()))
}

/// Initialize logging with sane defaults (`info` level, pretty format,
/// reading `RUST_LOG` if set). Intended for quick binary startup.
///
/// # Errors
///
/// See [`setup_logging`].
pub fn setup_default_logging() -> TelemetryResult<()> {
    let level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    setup_logging(&LogConfig::new(level))
}
