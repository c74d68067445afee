//! Per-name circuit breaker (spec §4.D), used to bound calls to the LLM
//! observer and other external services behind the Policy Engine.
//!
//! States transition `closed -> open -> half_open -> closed`, with every
//! failure while `half_open` re-arming `open` rather than recording a
//! partial recovery.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

use astrid_storage::{
    Database, StorageResult,
    tables::{GenericTable, Table, names},
};
use serde::{Deserialize, Serialize};

/// Breaker state (spec §4.D).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum State {
    /// Calls pass through normally.
    Closed,
    /// Calls are rejected outright until `next_attempt_at`.
    Open,
    /// A single trial window; success closes, failure re-opens.
    HalfOpen,
}

/// Tunable thresholds for one breaker.
#[derive(Debug, Clone, Copy)]
pub struct BreakerConfig {
    /// Consecutive failures in `closed` before tripping to `open`.
    pub failure_threshold: u32,
    /// Consecutive successes in `half_open` before closing.
    pub success_threshold: u32,
    /// Milliseconds to wait in `open` before trying `half_open`.
    pub reset_timeout_millis: i64,
}

impl BreakerConfig {
    /// Build a config from explicit thresholds.
    #[must_use]
    pub fn new(failure_threshold: u32, success_threshold: u32, reset_timeout_millis: i64) -> Self {
        Self {
            failure_threshold,
            success_threshold,
            reset_timeout_millis,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct BreakerRow {
    state: State,
    failure_count: u32,
    success_count: u32,
    next_attempt_at: i64,
}

impl BreakerRow {
    fn closed() -> Self {
        Self {
            state: State::Closed,
            failure_count: 0,
            success_count: 0,
            next_attempt_at: 0,
        }
    }
}

/// A single named circuit breaker backed by the Store.
pub struct CircuitBreaker {
    table: GenericTable,
    name: String,
    config: BreakerConfig,
}

impl CircuitBreaker {
    /// Bind to `name` within `db`, using `config`'s thresholds.
    #[must_use]
    pub fn new(db: Database, name: impl Into<String>, config: BreakerConfig) -> Self {
        Self {
            table: GenericTable::new(db, names::CIRCUIT_STATE),
            name: name.into(),
            config,
        }
    }

    async fn load(&self) -> StorageResult<BreakerRow> {
        Ok(self.table.get(&self.name).await?.unwrap_or_else(BreakerRow::closed))
    }

    /// Whether a call may currently be attempted. Transitions `open` to
    /// `half_open` as a side effect when the reset timeout has elapsed.
    ///
    /// # Errors
    ///
    /// Propagates Store errors.
    pub async fn can_execute(&self) -> StorageResult<bool> {
        let mut row = self.load().await?;
        let now = astrid_core::Timestamp::now().into_millis();
        match row.state {
            State::Closed => Ok(true),
            State::HalfOpen => Ok(true),
            State::Open if now >= row.next_attempt_at => {
                row.state = State::HalfOpen;
                row.success_count = 0;
                self.table.upsert(&self.name, &row).await?;
                Ok(true)
            }
            State::Open => Ok(false),
        }
    }

    /// Record a successful call.
    ///
    /// # Errors
    ///
    /// Propagates Store errors.
    pub async fn record_success(&self) -> StorageResult<()> {
        let mut row = self.load().await?;
        match row.state {
            State::Closed => {
                row.failure_count = 0;
            }
            State::HalfOpen => {
                row.success_count += 1;
                if row.success_count >= self.config.success_threshold {
                    row.state = State::Closed;
                    row.failure_count = 0;
                    row.success_count = 0;
                }
            }
            State::Open => {}
        }
        self.table.upsert(&self.name, &row).await
    }

    /// Record a failed call. Any failure while `half_open` re-arms `open`.
    ///
    /// # Errors
    ///
    /// Propagates Store errors.
    pub async fn record_failure(&self) -> StorageResult<()> {
        let mut row = self.load().await?;
        let now = astrid_core::Timestamp::now().into_millis();
        match row.state {
            State::Closed => {
                row.failure_count += 1;
                if row.failure_count >= self.config.failure_threshold {
                    row.state = State::Open;
                    row.next_attempt_at = now + self.config.reset_timeout_millis;
                }
            }
            State::HalfOpen => {
                row.state = State::Open;
                row.failure_count = self.config.failure_threshold;
                row.success_count = 0;
                row.next_attempt_at = now + self.config.reset_timeout_millis;
            }
            State::Open => {
                row.next_attempt_at = now + self.config.reset_timeout_millis;
            }
        }
        self.table.upsert(&self.name, &row).await
    }

    /// Force the breaker back to `closed` with cleared counters.
    ///
    /// # Errors
    ///
    /// Propagates Store errors.
    pub async fn reset(&self) -> StorageResult<()> {
        self.table.upsert(&self.name, &BreakerRow::closed()).await
    }

    /// Current state, for diagnostics.
    ///
    /// # Errors
    ///
    /// Propagates Store errors.
    pub async fn state(&self) -> StorageResult<State> {
        Ok(self.load().await?.state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn breaker(name: &str, config: BreakerConfig) -> CircuitBreaker {
        let db = Database::connect_memory().await.unwrap();
        CircuitBreaker::new(db, name, config)
    }

    #[tokio::test]
    async fn trips_open_after_threshold_failures() {
        let cb = breaker("llm", BreakerConfig::new(3, 1, 60_000)).await;
        cb.record_failure().await.unwrap();
        cb.record_failure().await.unwrap();
        assert!(cb.can_execute().await.unwrap());
        cb.record_failure().await.unwrap();
        assert_eq!(cb.state().await.unwrap(), State::Open);
        assert!(!cb.can_execute().await.unwrap());
    }

    #[tokio::test]
    async fn half_open_failure_reopens() {
        let cb = breaker("llm", BreakerConfig::new(1, 2, 0)).await;
        cb.record_failure().await.unwrap();
        assert_eq!(cb.state().await.unwrap(), State::Open);
        assert!(cb.can_execute().await.unwrap());
        assert_eq!(cb.state().await.unwrap(), State::HalfOpen);
        cb.record_failure().await.unwrap();
        assert_eq!(cb.state().await.unwrap(), State::Open);
    }

    #[tokio::test]
    async fn half_open_closes_after_success_threshold() {
        let cb = breaker("llm", BreakerConfig::new(1, 2, 0)).await;
        cb.record_failure().await.unwrap();
        assert!(cb.can_execute().await.unwrap());
        cb.record_success().await.unwrap();
        assert_eq!(cb.state().await.unwrap(), State::HalfOpen);
        cb.record_success().await.unwrap();
        assert_eq!(cb.state().await.unwrap(), State::Closed);
    }

    #[tokio::test]
    async fn reset_clears_open_state() {
        let cb = breaker("llm", BreakerConfig::new(1, 1, 60_000)).await;
        cb.record_failure().await.unwrap();
        assert_eq!(cb.state().await.unwrap(), State::Open);
        cb.reset().await.unwrap();
        assert_eq!(cb.state().await.unwrap(), State::Closed);
        assert!(cb.can_execute().await.unwrap());
    }
}
