//! Durable cron storage (spec §4.L): job CRUD, history, and the two
//! linearizable bulk operations the dispatch loop needs — atomically
//! claiming due jobs and, on startup, resetting leases a crash left
//! stale. Both are single `UPDATE ... WHERE ... RETURN AFTER` statements,
//! which SurrealDB executes as one transaction, giving the same
//! single-winner guarantee `astrid-storage::tables::Table::delete_if_present`
//! gives the Approval Store.

use astrid_core::{KernelError, KernelResult, Timestamp};
use astrid_storage::Database;
use astrid_storage::tables::{GenericTable, Table, names};

use crate::types::{CronJob, CronRun};

/// Typed access to the `cron_job` and `cron_run` tables.
#[derive(Clone)]
pub struct CronStore {
    jobs: GenericTable,
    runs: GenericTable,
    db: Database,
}

impl CronStore {
    /// Bind to `db`'s `cron_job`/`cron_run` tables.
    #[must_use]
    pub fn new(db: Database) -> Self {
        Self {
            jobs: GenericTable::new(db.clone(), names::CRON_JOB),
            runs: GenericTable::new(db.clone(), names::CRON_RUN),
            db,
        }
    }

    /// Insert or replace a job definition.
    ///
    /// # Errors
    ///
    /// Returns [`KernelError::Internal`] on a storage failure.
    pub async fn put_job(&self, job: &CronJob) -> KernelResult<()> {
        Table::upsert(&self.jobs, &job.id, job)
            .await
            .map_err(|e| KernelError::Internal(e.to_string()))
    }

    /// Fetch a job by id.
    ///
    /// # Errors
    ///
    /// Returns [`KernelError::Internal`] on a storage failure.
    pub async fn get_job(&self, id: &str) -> KernelResult<Option<CronJob>> {
        Table::get(&self.jobs, id).await.map_err(|e| KernelError::Internal(e.to_string()))
    }

    /// Remove a job permanently.
    ///
    /// # Errors
    ///
    /// Returns [`KernelError::Internal`] on a storage failure.
    pub async fn remove_job(&self, id: &str) -> KernelResult<()> {
        Table::delete(&self.jobs, id).await.map_err(|e| KernelError::Internal(e.to_string()))
    }

    /// Append a completed execution to job history.
    ///
    /// # Errors
    ///
    /// Returns [`KernelError::Internal`] on a storage failure.
    pub async fn record_run(&self, run: &CronRun) -> KernelResult<()> {
        Table::upsert(&self.runs, &run.id, run).await.map_err(|e| KernelError::Internal(e.to_string()))
    }

    /// List every job, in no particular order.
    ///
    /// # Errors
    ///
    /// Returns [`KernelError::Internal`] on a storage failure.
    pub async fn list_jobs(&self) -> KernelResult<Vec<CronJob>> {
        self.db
            .client()
            .select(names::CRON_JOB)
            .await
            .map_err(|e| KernelError::Internal(e.to_string()))
    }

    /// Atomically claim up to `max_jobs` jobs where `enabled AND
    /// next_run_at <= now AND running = false`, marking them
    /// `running = true` with the given lease expiry. A concurrent claimer
    /// racing the same statement sees the post-claim `running = true` and
    /// does not re-select the row.
    ///
    /// # Errors
    ///
    /// Returns [`KernelError::Internal`] on a storage failure.
    pub async fn claim_due(&self, now: Timestamp, lease_expires_at: Timestamp, max_jobs: u32) -> KernelResult<Vec<CronJob>> {
        let mut response = self
            .db
            .client()
            .query(
                "UPDATE type::table($table) SET running = true, lease_expires_at = $lease \
                 WHERE enabled = true AND running = false AND next_run_at != NONE \
                 AND next_run_at <= $now LIMIT $max RETURN AFTER",
            )
            .bind(("table", names::CRON_JOB))
            .bind(("lease", lease_expires_at.into_millis()))
            .bind(("now", now.into_millis()))
            .bind(("max", max_jobs))
            .await
            .map_err(|e| KernelError::Internal(e.to_string()))?;

        response.take(0).map_err(|e| KernelError::Internal(e.to_string()))
    }

    /// On startup, reset any job whose `running = true` but whose lease
    /// has already expired (a stale lease left by a previous crash).
    ///
    /// # Errors
    ///
    /// Returns [`KernelError::Internal`] on a storage failure.
    pub async fn reset_stale_leases(&self, now: Timestamp) -> KernelResult<Vec<CronJob>> {
        let mut response = self
            .db
            .client()
            .query(
                "UPDATE type::table($table) SET running = false, lease_expires_at = NONE \
                 WHERE running = true AND lease_expires_at != NONE AND lease_expires_at <= $now \
                 RETURN AFTER",
            )
            .bind(("table", names::CRON_JOB))
            .bind(("now", now.into_millis()))
            .await
            .map_err(|e| KernelError::Internal(e.to_string()))?;

        response.take(0).map_err(|e| KernelError::Internal(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{RunOutcome, Schedule};

    async fn store() -> CronStore {
        let db = Database::connect_memory().await.unwrap();
        CronStore::new(db)
    }

    fn job(id: &str, next_run_at: Option<i64>) -> CronJob {
        CronJob {
            id: id.to_string(),
            name: "test job".to_string(),
            schedule: Schedule::Every { every_ms: 60_000 },
            action: serde_json::json!({ "kind": "noop" }),
            enabled: true,
            running: false,
            next_run_at: next_run_at.map(Timestamp::from_millis),
            lease_expires_at: None,
            timeout_ms: 5_000,
            grace_ms: 10_000,
            run_count: 0,
            max_runs: None,
            created_at: Timestamp::now(),
            updated_at: Timestamp::now(),
        }
    }

    #[tokio::test]
    async fn put_then_get_round_trips() {
        let store = store().await;
        store.put_job(&job("j1", Some(1_000))).await.unwrap();
        let fetched = store.get_job("j1").await.unwrap();
        assert_eq!(fetched.unwrap().id, "j1");
    }

    #[tokio::test]
    async fn list_jobs_returns_every_job() {
        let store = store().await;
        store.put_job(&job("j1", Some(1_000))).await.unwrap();
        store.put_job(&job("j2", Some(2_000))).await.unwrap();
        let mut listed = store.list_jobs().await.unwrap();
        listed.sort_by(|a, b| a.id.cmp(&b.id));
        assert_eq!(listed.iter().map(|j| j.id.as_str()).collect::<Vec<_>>(), vec!["j1", "j2"]);
    }

    #[tokio::test]
    async fn claim_due_only_claims_matching_jobs() {
        let store = store().await;
        store.put_job(&job("due", Some(1_000))).await.unwrap();
        store.put_job(&job("future", Some(100_000))).await.unwrap();

        let claimed = store.claim_due(Timestamp::from_millis(5_000), Timestamp::from_millis(15_000), 10).await.unwrap();
        assert_eq!(claimed.len(), 1);
        assert_eq!(claimed[0].id, "due");

        let refetched = store.get_job("due").await.unwrap().unwrap();
        assert!(refetched.running);
    }

    #[tokio::test]
    async fn claimed_job_is_not_claimed_twice() {
        let store = store().await;
        store.put_job(&job("due", Some(1_000))).await.unwrap();

        let first = store.claim_due(Timestamp::from_millis(5_000), Timestamp::from_millis(15_000), 10).await.unwrap();
        assert_eq!(first.len(), 1);

        let second = store.claim_due(Timestamp::from_millis(5_000), Timestamp::from_millis(15_000), 10).await.unwrap();
        assert!(second.is_empty());
    }

    #[tokio::test]
    async fn reset_stale_leases_frees_expired_jobs() {
        let store = store().await;
        let mut stale = job("stuck", Some(1_000));
        stale.running = true;
        stale.lease_expires_at = Some(Timestamp::from_millis(2_000));
        store.put_job(&stale).await.unwrap();

        let reset = store.reset_stale_leases(Timestamp::from_millis(5_000)).await.unwrap();
        assert_eq!(reset.len(), 1);

        let refetched = store.get_job("stuck").await.unwrap().unwrap();
        assert!(!refetched.running);
    }

    #[tokio::test]
    async fn record_run_persists_history() {
        let store = store().await;
        let run = CronRun {
            id: "r1".to_string(),
            job_id: "j1".to_string(),
            started_at: Timestamp::from_millis(1_000),
            finished_at: Timestamp::from_millis(2_000),
            outcome: RunOutcome::Success,
            message: String::new(),
        };
        store.record_run(&run).await.unwrap();
    }
}
