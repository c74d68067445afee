//! Job and schedule types (spec §4.L).

use astrid_core::Timestamp;
use serde::{Deserialize, Serialize};

/// When and how often a job should run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Schedule {
    /// Run exactly once, at an absolute instant.
    At { at: Timestamp },
    /// Run repeatedly at a fixed interval.
    Every { every_ms: i64 },
    /// Run according to a standard 5-field UTC cron expression.
    Cron { expression: String },
}

/// A durable cron job row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CronJob {
    pub id: String,
    pub name: String,
    pub schedule: Schedule,
    /// Opaque payload forwarded to whatever runs the job (spec leaves the
    /// action itself outside the scheduler's concern).
    pub action: serde_json::Value,
    pub enabled: bool,
    pub running: bool,
    pub next_run_at: Option<Timestamp>,
    /// Set when `running = true`; a crash that leaves this in the past is
    /// how startup recovery finds a stale lease.
    pub lease_expires_at: Option<Timestamp>,
    /// Soft deadline, milliseconds.
    pub timeout_ms: i64,
    /// Extra time allowed past `timeout_ms` before the hard deadline fires.
    pub grace_ms: i64,
    pub run_count: u32,
    pub max_runs: Option<u32>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Default grace period past the soft deadline (spec §4.L: "~10 s").
pub const DEFAULT_GRACE_MS: i64 = 10_000;

impl CronJob {
    /// Build a new, not-yet-scheduled job with the default grace period.
    /// Call [`crate::schedule::compute_next_run_at_ms`] to populate
    /// `next_run_at` before persisting.
    #[must_use]
    pub fn new(id: String, name: String, schedule: Schedule, action: serde_json::Value, timeout_ms: i64) -> Self {
        let now = Timestamp::now();
        Self {
            id,
            name,
            schedule,
            action,
            enabled: true,
            running: false,
            next_run_at: None,
            lease_expires_at: None,
            timeout_ms,
            grace_ms: DEFAULT_GRACE_MS,
            run_count: 0,
            max_runs: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// A completed execution, appended to job history on every tick.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CronRun {
    pub id: String,
    pub job_id: String,
    pub started_at: Timestamp,
    pub finished_at: Timestamp,
    pub outcome: RunOutcome,
    /// Free-text status detail (spec §3: the Cron Run entity's `message`
    /// field), e.g. the reason an action failed or the deadline it missed.
    pub message: String,
}

/// How a claimed job's action finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    Success,
    Failed,
    SoftTimeout,
    HardTimeout,
}
