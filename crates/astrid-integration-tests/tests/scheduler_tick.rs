//! Exercises the scheduler's claim → run → record-history → reschedule
//! cycle (spec §4.L) against a real in-memory store and a fake
//! [`JobAction`], covering a one-shot `At` job, a repeating `Every` job,
//! and a job whose action fails.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use astrid_core::Timestamp;
use astrid_scheduler::{CronJob, CronStore, JobAction, Schedule, SchedulerEngine, compute_next_run_at_ms};
use astrid_test::memory_db;
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

struct CountingAction {
    runs: AtomicUsize,
    fail: bool,
}

impl CountingAction {
    fn new(fail: bool) -> Self {
        Self { runs: AtomicUsize::new(0), fail }
    }
}

#[async_trait]
impl JobAction for CountingAction {
    async fn run(&self, _job: &CronJob, _cancel: CancellationToken) -> Result<(), String> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        if self.fail { Err("boom".to_string()) } else { Ok(()) }
    }
}

fn due_job(id: &str, schedule: Schedule) -> CronJob {
    let mut job = CronJob::new(id.to_string(), format!("job-{id}"), schedule.clone(), serde_json::json!({}), 5_000);
    let past = Timestamp::now().plus_millis(-60_000);
    job.next_run_at = compute_next_run_at_ms(&schedule, past).map(Timestamp::from_millis);
    job
}

#[tokio::test]
async fn at_job_runs_once_and_is_not_rescheduled() {
    let store = CronStore::new(memory_db().await);
    let job = due_job("at-1", Schedule::At { at: Timestamp::now() });
    store.put_job(&job).await.expect("job persisted");

    let action = Arc::new(CountingAction::new(false));
    let engine = SchedulerEngine::new(store.clone(), action.clone(), 10, Duration::from_secs(5));
    engine.tick().await.expect("tick succeeds");

    assert_eq!(action.runs.load(Ordering::SeqCst), 1);
    let stored = store.get_job("at-1").await.expect("lookup succeeds").expect("job still exists");
    assert_eq!(stored.run_count, 1);
    assert!(!stored.running);
    assert!(stored.next_run_at.is_none(), "an exhausted `At` job must not reschedule");
    assert!(!stored.enabled, "a job with no next_run_at is disabled");
}

#[tokio::test]
async fn every_job_reschedules_after_each_run() {
    let store = CronStore::new(memory_db().await);
    let job = due_job("every-1", Schedule::Every { every_ms: 60_000 });
    store.put_job(&job).await.expect("job persisted");

    let action = Arc::new(CountingAction::new(false));
    let engine = SchedulerEngine::new(store.clone(), action.clone(), 10, Duration::from_secs(5));
    engine.tick().await.expect("tick succeeds");

    let stored = store.get_job("every-1").await.expect("lookup succeeds").expect("job still exists");
    assert_eq!(stored.run_count, 1);
    assert!(stored.enabled);
    assert!(stored.next_run_at.is_some(), "an `Every` job always reschedules");

    // Not due again immediately; a second tick must not re-run it.
    engine.tick().await.expect("tick succeeds");
    assert_eq!(action.runs.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn failed_action_is_recorded_but_still_reschedules() {
    let store = CronStore::new(memory_db().await);
    let job = due_job("fail-1", Schedule::Every { every_ms: 60_000 });
    store.put_job(&job).await.expect("job persisted");

    let action = Arc::new(CountingAction::new(true));
    let engine = SchedulerEngine::new(store.clone(), action.clone(), 10, Duration::from_secs(5));
    engine.tick().await.expect("tick completes even though the action failed");

    let stored = store.get_job("fail-1").await.expect("lookup succeeds").expect("job still exists");
    assert_eq!(stored.run_count, 1);
    assert!(stored.next_run_at.is_some());
}

#[tokio::test]
async fn max_jobs_per_tick_limits_claims() {
    let store = CronStore::new(memory_db().await);
    for i in 0..3 {
        let job = due_job(&format!("bulk-{i}"), Schedule::Every { every_ms: 60_000 });
        store.put_job(&job).await.expect("job persisted");
    }

    let action = Arc::new(CountingAction::new(false));
    let engine = SchedulerEngine::new(store.clone(), action.clone(), 2, Duration::from_secs(5));
    engine.tick().await.expect("tick succeeds");

    assert_eq!(action.runs.load(Ordering::SeqCst), 2, "only max_jobs_per_tick jobs should run per tick");
}
