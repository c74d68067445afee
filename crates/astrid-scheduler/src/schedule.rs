//! Dispatches [`Schedule`] variants to their next-run computation
//! (spec §4.L: `computeNextRunAtMs(schedule, from) → ms|null`).

use astrid_core::Timestamp;
use chrono::{TimeZone, Utc};
use tracing::warn;

use crate::cron::CronSchedule;
use crate::types::Schedule;

/// Compute the next instant at or after which `schedule` should fire,
/// strictly after `from`. Returns `None` when the schedule is exhausted
/// (`At` whose instant has passed) or the cron expression is malformed.
#[must_use]
pub fn compute_next_run_at_ms(schedule: &Schedule, from: Timestamp) -> Option<i64> {
    match schedule {
        Schedule::At { at } => {
            if at.into_millis() > from.into_millis() {
                Some(at.into_millis())
            } else {
                None
            }
        }
        Schedule::Every { every_ms } => Some(from.plus_millis(*every_ms).into_millis()),
        Schedule::Cron { expression } => {
            let parsed = match CronSchedule::parse(expression) {
                Ok(parsed) => parsed,
                Err(err) => {
                    warn!(%err, %expression, "invalid cron expression");
                    return None;
                }
            };
            let from_dt = Utc.timestamp_millis_opt(from.into_millis()).single()?;
            parsed.next_after(from_dt).map(|dt| dt.timestamp_millis())
        }
    }
}
