//! Scheduler (spec §4.L): durable cron with three schedule kinds —
//! `at`, `every`, and a standard 5-field `cron` expression — a claim+lease
//! dispatch loop, and soft/hard execution deadlines.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

mod cron;
mod engine;
mod schedule;
mod store;
mod types;

pub use cron::{CronError, CronSchedule};
pub use engine::{JobAction, MIN_TICK_INTERVAL, SchedulerEngine};
pub use schedule::compute_next_run_at_ms;
pub use store::CronStore;
pub use types::{CronJob, CronRun, DEFAULT_GRACE_MS, RunOutcome, Schedule};
