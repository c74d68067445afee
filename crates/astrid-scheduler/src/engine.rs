//! Dispatch loop (spec §4.L): a single ticker, minimum 5-second interval,
//! claims due jobs, runs each behind a soft deadline (cooperative abort)
//! and a hard deadline (~10 s further out, abandon regardless), then
//! persists history and the next `next_run_at`.

use std::sync::Arc;
use std::time::Duration;

use astrid_core::{KernelError, KernelResult, Timestamp};
use async_trait::async_trait;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::schedule::compute_next_run_at_ms;
use crate::store::CronStore;
use crate::types::{CronJob, CronRun, RunOutcome};

/// Minimum tick interval the dispatch loop will honor (spec §4.L).
pub const MIN_TICK_INTERVAL: Duration = Duration::from_secs(5);

/// Whatever runs a claimed job's payload. Implementations should return
/// promptly once `cancel` is triggered; the hard deadline abandons the
/// task regardless of whether it cooperates.
#[async_trait]
pub trait JobAction: Send + Sync {
    /// Execute `job`, observing `cancel` for the soft-deadline signal.
    async fn run(&self, job: &CronJob, cancel: CancellationToken) -> Result<(), String>;
}

/// Drives the claim → run → record-history → reschedule cycle.
pub struct SchedulerEngine {
    store: CronStore,
    action: Arc<dyn JobAction>,
    max_jobs_per_tick: u32,
    tick_interval: Duration,
}

impl SchedulerEngine {
    /// Build an engine over `store`, dispatching claimed jobs to `action`.
    /// `tick_interval` is clamped up to [`MIN_TICK_INTERVAL`].
    #[must_use]
    pub fn new(store: CronStore, action: Arc<dyn JobAction>, max_jobs_per_tick: u32, tick_interval: Duration) -> Self {
        Self {
            store,
            action,
            max_jobs_per_tick,
            tick_interval: tick_interval.max(MIN_TICK_INTERVAL),
        }
    }

    /// Run the dispatch loop until `shutdown` broadcasts `true`.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!("scheduler engine started");
        if let Err(err) = self.reset_stale_leases().await {
            error!(%err, "failed to reset stale leases on startup");
        }

        let mut interval = tokio::time::interval(self.tick_interval);
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if let Err(err) = self.tick().await {
                        error!(%err, "scheduler tick failed");
                    }
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("scheduler engine shutting down");
                        break;
                    }
                }
            }
        }
    }

    /// Reset any job whose lease expired while the process was down.
    ///
    /// # Errors
    ///
    /// Returns [`KernelError::Internal`] on a storage failure.
    pub async fn reset_stale_leases(&self) -> KernelResult<()> {
        let reset = self.store.reset_stale_leases(Timestamp::now()).await?;
        if !reset.is_empty() {
            warn!(count = reset.len(), "reset stale cron leases from a previous crash");
        }
        Ok(())
    }

    /// Claim due jobs and run each to completion (or a deadline).
    ///
    /// # Errors
    ///
    /// Returns [`KernelError::Internal`] on a storage failure.
    pub async fn tick(&self) -> KernelResult<()> {
        let now = Timestamp::now();
        // A generous provisional lease; refined per-job immediately below.
        // Only this process can touch a `running = true` row, so widening
        // it briefly does not affect the claim's linearizability.
        let provisional_lease = now.plus_millis(3_600_000);
        let claimed = self.store.claim_due(now, provisional_lease, self.max_jobs_per_tick).await?;

        for job in claimed {
            let lease = now.plus_millis(job.timeout_ms.saturating_add(job.grace_ms));
            let mut refined = job.clone();
            refined.lease_expires_at = Some(lease);
            self.store.put_job(&refined).await?;
            self.dispatch(refined).await?;
        }
        Ok(())
    }

    /// Run one claimed job now, regardless of its schedule (spec §4.L
    /// `runJobNow`). Fails if the job is currently running.
    ///
    /// # Errors
    ///
    /// Returns [`KernelError::Internal`] if the job is missing or already
    /// running, or on a storage failure.
    pub async fn run_job_now(&self, job_id: &str) -> KernelResult<()> {
        let Some(job) = self.store.get_job(job_id).await? else {
            return Err(KernelError::Internal(format!("no such cron job: {job_id}")));
        };
        if job.running {
            return Err(KernelError::Internal(format!("cron job already running: {job_id}")));
        }

        let now = Timestamp::now();
        let mut claimed = job.clone();
        claimed.running = true;
        claimed.lease_expires_at = Some(now.plus_millis(claimed.timeout_ms.saturating_add(claimed.grace_ms)));
        self.store.put_job(&claimed).await?;
        self.dispatch(claimed).await
    }

    async fn dispatch(&self, job: CronJob) -> KernelResult<()> {
        let started_at = Timestamp::now();
        let cancel = CancellationToken::new();
        let action = Arc::clone(&self.action);
        let run_job = job.clone();
        let run_cancel = cancel.clone();

        let mut handle = tokio::spawn(async move { action.run(&run_job, run_cancel).await });

        let soft = Duration::from_millis(job.timeout_ms.max(0) as u64);
        let grace = Duration::from_millis(job.grace_ms.max(0) as u64);

        let (outcome, message) = match tokio::time::timeout(soft, &mut handle).await {
            Ok(Ok(Ok(()))) => (RunOutcome::Success, String::new()),
            Ok(Ok(Err(reason))) => {
                warn!(job_id = %job.id, %reason, "cron job action failed");
                (RunOutcome::Failed, reason)
            }
            Ok(Err(join_err)) => {
                warn!(job_id = %job.id, %join_err, "cron job action panicked");
                (RunOutcome::Failed, format!("cron job panicked: {join_err}"))
            }
            Err(_) => {
                warn!(job_id = %job.id, "cron job hit soft deadline, signaling cancel");
                cancel.cancel();
                match tokio::time::timeout(grace, &mut handle).await {
                    Ok(Ok(Ok(()))) => (RunOutcome::Success, String::new()),
                    Ok(Ok(Err(_)) | Ok(Err(_))) => (
                        RunOutcome::SoftTimeout,
                        format!("cron job exceeded its {}ms deadline but finished during the grace period", job.timeout_ms),
                    ),
                    Err(_) => {
                        warn!(job_id = %job.id, "cron job hit hard deadline, abandoning");
                        handle.abort();
                        (
                            RunOutcome::HardTimeout,
                            format!("cron job timed out after {}ms (executor did not honor abort)", job.timeout_ms),
                        )
                    }
                }
            }
        };

        self.finish(job, started_at, outcome, message).await
    }

    async fn finish(&self, mut job: CronJob, started_at: Timestamp, outcome: RunOutcome, message: String) -> KernelResult<()> {
        let finished_at = Timestamp::now();
        self.store
            .record_run(&CronRun {
                id: Uuid::new_v4().to_string(),
                job_id: job.id.clone(),
                started_at,
                finished_at,
                outcome,
                message,
            })
            .await?;

        job.run_count += 1;
        job.running = false;
        job.lease_expires_at = None;

        let exhausted = job.max_runs.is_some_and(|max| job.run_count >= max);
        job.next_run_at = if exhausted {
            None
        } else {
            compute_next_run_at_ms(&job.schedule, finished_at).map(Timestamp::from_millis)
        };
        job.enabled = job.enabled && job.next_run_at.is_some();

        self.store.put_job(&job).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use astrid_storage::Database;

    use crate::types::Schedule;

    struct Succeeds;
    #[async_trait]
    impl JobAction for Succeeds {
        async fn run(&self, _job: &CronJob, _cancel: CancellationToken) -> Result<(), String> {
            Ok(())
        }
    }

    struct HangsForever;
    #[async_trait]
    impl JobAction for HangsForever {
        async fn run(&self, _job: &CronJob, cancel: CancellationToken) -> Result<(), String> {
            cancel.cancelled().await;
            Err("cancelled".to_string())
        }
    }

    struct IgnoresCancel;
    #[async_trait]
    impl JobAction for IgnoresCancel {
        async fn run(&self, _job: &CronJob, _cancel: CancellationToken) -> Result<(), String> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(())
        }
    }

    fn due_job(id: &str, timeout_ms: i64, grace_ms: i64) -> CronJob {
        let now = Timestamp::now();
        CronJob {
            id: id.to_string(),
            name: "test".to_string(),
            schedule: Schedule::Every { every_ms: 60_000 },
            action: serde_json::json!({}),
            enabled: true,
            running: false,
            next_run_at: Some(now),
            lease_expires_at: None,
            timeout_ms,
            grace_ms,
            run_count: 0,
            max_runs: None,
            created_at: now,
            updated_at: now,
        }
    }

    async fn engine_with(action: Arc<dyn JobAction>) -> (SchedulerEngine, CronStore) {
        let db = Database::connect_memory().await.unwrap();
        let store = CronStore::new(db);
        (SchedulerEngine::new(store.clone(), action, 10, MIN_TICK_INTERVAL), store)
    }

    #[tokio::test]
    async fn tick_runs_due_job_to_success_and_reschedules() {
        let (engine, store) = engine_with(Arc::new(Succeeds)).await;
        store.put_job(&due_job("j1", 5_000, 10_000)).await.unwrap();

        engine.tick().await.unwrap();

        let job = store.get_job("j1").await.unwrap().unwrap();
        assert!(!job.running);
        assert_eq!(job.run_count, 1);
        assert!(job.next_run_at.is_some());
    }

    #[tokio::test]
    async fn soft_deadline_cancels_cooperative_action() {
        let (engine, store) = engine_with(Arc::new(HangsForever)).await;
        store.put_job(&due_job("j2", 50, 200)).await.unwrap();

        engine.tick().await.unwrap();

        let job = store.get_job("j2").await.unwrap().unwrap();
        assert!(!job.running);
    }

    #[tokio::test]
    async fn hard_deadline_abandons_uncooperative_action() {
        let (engine, store) = engine_with(Arc::new(IgnoresCancel)).await;
        store.put_job(&due_job("j3", 20, 50)).await.unwrap();

        engine.tick().await.unwrap();

        let job = store.get_job("j3").await.unwrap().unwrap();
        assert!(!job.running);
    }

    #[tokio::test]
    async fn run_job_now_rejects_already_running_job() {
        let (engine, store) = engine_with(Arc::new(Succeeds)).await;
        let mut job = due_job("j4", 5_000, 10_000);
        job.running = true;
        store.put_job(&job).await.unwrap();

        assert!(engine.run_job_now("j4").await.is_err());
    }
}
