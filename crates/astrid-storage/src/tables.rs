//! Typed access to the §3 data-model tables.
//!
//! Each table type wraps [`Database`] and implements only the operations
//! its owning component actually needs. The atomic one-shot consumption
//! used by [`ApprovalTable::consume`] and [`CronTable::claim`] is built on
//! SurrealDB's `DELETE ... RETURN BEFORE` inside a single statement, which
//! SurrealDB executes as one transaction — a second concurrent caller sees
//! no row and gets `None`.

use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};

use crate::db::Database;
use crate::error::{StorageError, StorageResult};

/// Shared behavior for a table keyed by a single string id.
#[async_trait]
pub trait Table<T>
where
    T: Serialize + DeserializeOwned + Send + Sync,
{
    /// SurrealDB table name.
    fn table_name(&self) -> &'static str;

    /// The underlying database handle.
    fn db(&self) -> &Database;

    /// Insert or overwrite the row at `id`.
    async fn upsert(&self, id: &str, value: &T) -> StorageResult<()> {
        let _: Option<T> = self
            .db()
            .client()
            .upsert((self.table_name(), id))
            .content(value)
            .await
            .map_err(|e| StorageError::Internal(e.to_string()))?;
        Ok(())
    }

    /// Fetch the row at `id`, if present.
    async fn get(&self, id: &str) -> StorageResult<Option<T>> {
        self.db()
            .client()
            .select((self.table_name(), id))
            .await
            .map_err(|e| StorageError::Internal(e.to_string()))
    }

    /// Delete the row at `id` unconditionally.
    async fn delete(&self, id: &str) -> StorageResult<()> {
        let _: Option<T> = self
            .db()
            .client()
            .delete((self.table_name(), id))
            .await
            .map_err(|e| StorageError::Internal(e.to_string()))?;
        Ok(())
    }

    /// Atomically delete the row at `id` and return it, or `None` if it was
    /// already gone (already consumed by a concurrent caller, or never
    /// existed). This is the one-shot consumption primitive required by
    /// spec §4.A/§4.G/§4.L.
    async fn delete_if_present(&self, id: &str) -> StorageResult<Option<T>> {
        self.db()
            .client()
            .delete((self.table_name(), id))
            .await
            .map_err(|e| StorageError::Internal(e.to_string()))
    }
}

/// Generic table handle for a §3 entity with no bespoke operations beyond
/// `Table`'s defaults.
#[derive(Clone)]
pub struct GenericTable {
    db: Database,
    name: &'static str,
}

impl GenericTable {
    /// Bind to `name` within `db`.
    #[must_use]
    pub fn new(db: Database, name: &'static str) -> Self {
        Self { db, name }
    }
}

#[async_trait]
impl<T> Table<T> for GenericTable
where
    T: Serialize + DeserializeOwned + Send + Sync,
{
    fn table_name(&self) -> &'static str {
        self.name
    }

    fn db(&self) -> &Database {
        &self.db
    }
}

/// Table name constants matching spec §3's entity list.
pub mod names {
    /// `Session`.
    pub const SESSION: &str = "session";
    /// `Approval`.
    pub const APPROVAL: &str = "approval";
    /// `Identity Link`.
    pub const IDENTITY_LINK: &str = "identity_link";
    /// `Pending Link Code`.
    pub const PENDING_LINK_CODE: &str = "pending_link_code";
    /// `TOTP Session`.
    pub const TOTP_SESSION: &str = "totp_session";
    /// `Pending TOTP Message`.
    pub const PENDING_TOTP_MESSAGE: &str = "pending_totp_message";
    /// `Rate Bucket`.
    pub const RATE_BUCKET: &str = "rate_bucket";
    /// `Circuit State`.
    pub const CIRCUIT_STATE: &str = "circuit_state";
    /// `Cron Job`.
    pub const CRON_JOB: &str = "cron_job";
    /// `Cron Run`.
    pub const CRON_RUN: &str = "cron_run";
    /// `Memory Entry`.
    pub const MEMORY_ENTRY: &str = "memory_entry";
    /// Audit log entries (ambient, spec §4.M).
    pub const AUDIT_ENTRY: &str = "audit_entry";
    /// Banned chats (ambient, supplements §4.M.2 — see `SPEC_FULL.md` §3).
    pub const BAN: &str = "ban";
    /// Internal-auth nonce replay cache (ambient, spec §4.B).
    pub const AUTH_NONCE: &str = "auth_nonce";
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    use super::*;

    #[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
    struct Widget {
        label: String,
    }

    async fn memory_table() -> GenericTable {
        let db = Database::connect_memory().await.unwrap();
        GenericTable::new(db, "widget")
    }

    #[tokio::test]
    async fn upsert_then_get_round_trips() {
        let table = memory_table().await;
        let widget = Widget {
            label: "one".into(),
        };
        Table::upsert(&table, "w1", &widget).await.unwrap();

        let fetched: Option<Widget> = Table::get(&table, "w1").await.unwrap();
        assert_eq!(fetched, Some(widget));
    }

    #[tokio::test]
    async fn delete_if_present_is_one_shot() {
        let table = memory_table().await;
        let widget = Widget {
            label: "nonce".into(),
        };
        Table::upsert(&table, "n1", &widget).await.unwrap();

        let first: Option<Widget> = Table::delete_if_present(&table, "n1").await.unwrap();
        assert_eq!(first, Some(widget));

        let second: Option<Widget> = Table::delete_if_present(&table, "n1").await.unwrap();
        assert_eq!(second, None);
    }

    #[tokio::test]
    async fn get_missing_row_returns_none() {
        let table = memory_table().await;
        let missing: Option<Widget> = Table::get(&table, "missing").await.unwrap();
        assert_eq!(missing, None);
    }
}
