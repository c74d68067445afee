//! Configuration validation rules.

use crate::error::{ConfigError, ConfigResult};
use crate::types::Config;

/// Minimum scheduler ticker interval (spec §4.L: "5-second minimum interval").
const MIN_TICK_INTERVAL_SECS: u64 = 5;

/// Validate a fully merged [`Config`].
///
/// # Errors
///
/// Returns the first [`ConfigError::ValidationError`] encountered.
pub fn validate(config: &Config) -> ConfigResult<()> {
    if config.broker.port == 0 {
        return Err(ConfigError::ValidationError {
            field: "broker.port".to_owned(),
            message: "must be a nonzero port number".to_owned(),
        });
    }
    if config.broker.body_limit_bytes == 0 {
        return Err(ConfigError::ValidationError {
            field: "broker.body_limit_bytes".to_owned(),
            message: "must be greater than zero".to_owned(),
        });
    }
    if config.broker.concurrency == 0 {
        return Err(ConfigError::ValidationError {
            field: "broker.concurrency".to_owned(),
            message: "must allow at least one in-flight request".to_owned(),
        });
    }
    if config.broker.prompt_max_chars == 0 {
        return Err(ConfigError::ValidationError {
            field: "broker.prompt_max_chars".to_owned(),
            message: "must be greater than zero".to_owned(),
        });
    }
    if config.broker.tts_max_chars == 0 {
        return Err(ConfigError::ValidationError {
            field: "broker.tts_max_chars".to_owned(),
            message: "must be greater than zero".to_owned(),
        });
    }

    if config.scheduler.tick_interval_secs < MIN_TICK_INTERVAL_SECS {
        return Err(ConfigError::ValidationError {
            field: "scheduler.tick_interval_secs".to_owned(),
            message: format!("must be at least {MIN_TICK_INTERVAL_SECS} seconds"),
        });
    }
    if config.scheduler.max_jobs_per_tick == 0 {
        return Err(ConfigError::ValidationError {
            field: "scheduler.max_jobs_per_tick".to_owned(),
            message: "must claim at least one job per tick".to_owned(),
        });
    }

    if config.totp.socket_path.as_os_str().is_empty() {
        return Err(ConfigError::ValidationError {
            field: "totp.socket_path".to_owned(),
            message: "must not be empty".to_owned(),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(validate(&Config::default()).is_ok());
    }

    #[test]
    fn zero_port_rejected() {
        let mut config = Config::default();
        config.broker.port = 0;
        assert!(matches!(validate(&config), Err(ConfigError::ValidationError { .. })));
    }

    #[test]
    fn sub_minimum_tick_interval_rejected() {
        let mut config = Config::default();
        config.scheduler.tick_interval_secs = 1;
        assert!(matches!(validate(&config), Err(ConfigError::ValidationError { .. })));
    }

    #[test]
    fn zero_concurrency_rejected() {
        let mut config = Config::default();
        config.broker.concurrency = 0;
        assert!(matches!(validate(&config), Err(ConfigError::ValidationError { .. })));
    }
}
