//! Audit log storage: a `SurrealDB`-backed [`AuditStorage`] implementation,
//! grounded on the same [`Database`]/raw-query idiom `astrid-scheduler`'s
//! store uses for queries `astrid_storage::tables::GenericTable` can't
//! express (session-scoped listing, time-range scans).

use astrid_core::SessionId;
use astrid_storage::Database;
use astrid_storage::tables::{GenericTable, Table, names};
use async_trait::async_trait;

use crate::entry::{AuditEntry, AuditEntryId};
use crate::error::{AuditError, AuditResult};

/// Storage backend for audit logs.
#[async_trait]
pub trait AuditStorage: Send + Sync {
    /// Store an audit entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the entry cannot be persisted.
    async fn store(&self, entry: &AuditEntry) -> AuditResult<()>;

    /// Get an entry by id.
    ///
    /// # Errors
    ///
    /// Returns an error if retrieval fails.
    async fn get(&self, id: AuditEntryId) -> AuditResult<Option<AuditEntry>>;

    /// Get the chain head (latest entry) for a session, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if retrieval fails.
    async fn get_chain_head(&self, session_id: SessionId) -> AuditResult<Option<AuditEntry>>;

    /// Get all entries for a session, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if retrieval fails.
    async fn get_session_entries(&self, session_id: SessionId) -> AuditResult<Vec<AuditEntry>>;

    /// Get entries with `timestamp` in `[start_ms, end_ms]`, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if retrieval fails.
    async fn get_entries_in_range(&self, start_ms: i64, end_ms: i64) -> AuditResult<Vec<AuditEntry>>;

    /// Count every entry ever stored.
    ///
    /// # Errors
    ///
    /// Returns an error if retrieval fails.
    async fn count(&self) -> AuditResult<usize>;

    /// Count entries for one session.
    ///
    /// # Errors
    ///
    /// Returns an error if retrieval fails.
    async fn count_session(&self, session_id: SessionId) -> AuditResult<usize>;

    /// List every distinct session id that has at least one entry.
    ///
    /// # Errors
    ///
    /// Returns an error if retrieval fails.
    async fn list_sessions(&self) -> AuditResult<Vec<SessionId>>;
}

/// `SurrealDB`-backed storage, production and test alike (the underlying
/// [`Database`] picks `SurrealKV` or `mem://`).
pub struct SurrealAuditStorage {
    table: GenericTable,
    db: Database,
}

impl SurrealAuditStorage {
    /// Bind to `db`'s audit-entry table.
    #[must_use]
    pub fn new(db: Database) -> Self {
        Self { table: GenericTable::new(db.clone(), names::AUDIT_ENTRY), db }
    }
}

#[async_trait]
impl AuditStorage for SurrealAuditStorage {
    async fn store(&self, entry: &AuditEntry) -> AuditResult<()> {
        Table::upsert(&self.table, &entry.id.0.to_string(), entry)
            .await
            .map_err(|e| AuditError::StorageError(e.to_string()))
    }

    async fn get(&self, id: AuditEntryId) -> AuditResult<Option<AuditEntry>> {
        Table::get(&self.table, &id.0.to_string()).await.map_err(|e| AuditError::StorageError(e.to_string()))
    }

    async fn get_chain_head(&self, session_id: SessionId) -> AuditResult<Option<AuditEntry>> {
        let mut entries = self.get_session_entries(session_id).await?;
        Ok(entries.pop())
    }

    async fn get_session_entries(&self, session_id: SessionId) -> AuditResult<Vec<AuditEntry>> {
        let mut response = self
            .db
            .client()
            .query("SELECT * FROM type::table($table) WHERE session_id = $sid ORDER BY timestamp ASC")
            .bind(("table", names::AUDIT_ENTRY))
            .bind(("sid", session_id.0.to_string()))
            .await
            .map_err(|e| AuditError::StorageError(e.to_string()))?;
        response.take(0).map_err(|e| AuditError::StorageError(e.to_string()))
    }

    async fn get_entries_in_range(&self, start_ms: i64, end_ms: i64) -> AuditResult<Vec<AuditEntry>> {
        let mut response = self
            .db
            .client()
            .query(
                "SELECT * FROM type::table($table) \
                 WHERE timestamp >= $start AND timestamp <= $end ORDER BY timestamp ASC",
            )
            .bind(("table", names::AUDIT_ENTRY))
            .bind(("start", start_ms))
            .bind(("end", end_ms))
            .await
            .map_err(|e| AuditError::StorageError(e.to_string()))?;
        response.take(0).map_err(|e| AuditError::StorageError(e.to_string()))
    }

    async fn count(&self) -> AuditResult<usize> {
        let mut response = self
            .db
            .client()
            .query("SELECT count() AS c FROM type::table($table) GROUP ALL")
            .bind(("table", names::AUDIT_ENTRY))
            .await
            .map_err(|e| AuditError::StorageError(e.to_string()))?;
        let rows: Vec<CountRow> = response.take(0).map_err(|e| AuditError::StorageError(e.to_string()))?;
        Ok(rows.first().map_or(0, |r| r.c))
    }

    async fn count_session(&self, session_id: SessionId) -> AuditResult<usize> {
        Ok(self.get_session_entries(session_id).await?.len())
    }

    async fn list_sessions(&self) -> AuditResult<Vec<SessionId>> {
        let mut response = self
            .db
            .client()
            .query("SELECT DISTINCT session_id FROM type::table($table)")
            .bind(("table", names::AUDIT_ENTRY))
            .await
            .map_err(|e| AuditError::StorageError(e.to_string()))?;
        let rows: Vec<SessionRow> = response.take(0).map_err(|e| AuditError::StorageError(e.to_string()))?;
        Ok(rows.into_iter().map(|r| r.session_id).collect())
    }
}

#[derive(serde::Deserialize)]
struct CountRow {
    c: usize,
}

#[derive(serde::Deserialize)]
struct SessionRow {
    session_id: SessionId,
}
