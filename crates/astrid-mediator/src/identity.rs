//! Ban list and Identity Link lookup (spec §4.M step 2, spec §3).
//!
//! Neither table has an owning component of its own in the kernel — the
//! Mediator is the only thing that ever reads them — so they are built
//! directly here, following the same `GenericTable`-backed shape
//! `astrid-circuit::CircuitBreaker` and `astrid-totp::TotpGate` use for
//! their own Store-backed state.

use astrid_core::Timestamp;
use astrid_storage::Database;
use astrid_storage::tables::{GenericTable, Table, names};
use serde::{Deserialize, Serialize};

/// A banned chat (spec §3, added to supplement §4.M.2).
#[derive(Debug, Clone, PartialEq)]
pub struct Ban {
    /// The banned chat.
    pub chat_id: String,
    /// Free-text reason recorded by the operator.
    pub reason: String,
    /// Operator identity that issued the ban.
    pub banned_by: String,
    /// When the ban was recorded.
    pub banned_at: Timestamp,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct BanRow {
    reason: String,
    banned_by: String,
    banned_at: i64,
}

impl From<(String, BanRow)> for Ban {
    fn from((chat_id, row): (String, BanRow)) -> Self {
        Self {
            chat_id,
            reason: row.reason,
            banned_by: row.banned_by,
            banned_at: Timestamp::from_millis(row.banned_at),
        }
    }
}

/// Store-backed ban list, keyed by `chat_id`.
pub struct BanList {
    table: GenericTable,
    db: Database,
}

impl BanList {
    /// Bind to `db`'s ban table.
    #[must_use]
    pub fn new(db: Database) -> Self {
        Self { table: GenericTable::new(db.clone(), names::BAN), db }
    }

    /// Record a ban, overwriting any existing one for `chat_id`.
    ///
    /// # Errors
    ///
    /// Propagates Store errors.
    pub async fn ban(
        &self,
        chat_id: &str,
        reason: impl Into<String>,
        banned_by: impl Into<String>,
    ) -> astrid_storage::StorageResult<()> {
        let row = BanRow { reason: reason.into(), banned_by: banned_by.into(), banned_at: Timestamp::now().into_millis() };
        Table::upsert(&self.table, chat_id, &row).await
    }

    /// Lift a ban. No-op if the chat was not banned.
    ///
    /// # Errors
    ///
    /// Propagates Store errors.
    pub async fn unban(&self, chat_id: &str) -> astrid_storage::StorageResult<()> {
        Table::delete(&self.table, chat_id).await
    }

    /// `true` if `chat_id` is currently banned.
    ///
    /// # Errors
    ///
    /// Propagates Store errors.
    pub async fn is_banned(&self, chat_id: &str) -> astrid_storage::StorageResult<bool> {
        let row: Option<BanRow> = Table::get(&self.table, chat_id).await?;
        Ok(row.is_some())
    }

    /// Fetch the ban record for `chat_id`, if any.
    ///
    /// # Errors
    ///
    /// Propagates Store errors.
    pub async fn get(&self, chat_id: &str) -> astrid_storage::StorageResult<Option<Ban>> {
        let row: Option<BanRow> = Table::get(&self.table, chat_id).await?;
        Ok(row.map(|row| Ban::from((chat_id.to_string(), row))))
    }

    /// List every current ban, in no particular order.
    ///
    /// # Errors
    ///
    /// Propagates Store errors.
    pub async fn list(&self) -> astrid_storage::StorageResult<Vec<Ban>> {
        #[derive(serde::Deserialize)]
        struct Row {
            chat_id: String,
            reason: String,
            banned_by: String,
            banned_at: i64,
        }

        let mut response = self
            .db
            .client()
            .query("SELECT meta::id(id) AS chat_id, reason, banned_by, banned_at FROM type::table($table)")
            .bind(("table", names::BAN))
            .await
            .map_err(|e| astrid_storage::StorageError::Internal(e.to_string()))?;
        let rows: Vec<Row> = response.take(0).map_err(|e| astrid_storage::StorageError::Internal(e.to_string()))?;
        Ok(rows
            .into_iter()
            .map(|r| Ban { chat_id: r.chat_id, reason: r.reason, banned_by: r.banned_by, banned_at: Timestamp::from_millis(r.banned_at) })
            .collect())
    }
}

/// A resolved chat-to-local-user identity link (spec §3).
#[derive(Debug, Clone, PartialEq)]
pub struct IdentityLink {
    /// The linked chat.
    pub chat_id: String,
    /// The local user the chat resolves to. `"admin"` grants the maximum
    /// tier (spec §3, `get_user_permission_tier`'s `admin_chat_ids` path
    /// covers the same rule from the raw-chat-id side).
    pub local_user_id: String,
    /// When the link was created or last replaced.
    pub linked_at: Timestamp,
    /// Operator identity that created the link.
    pub linked_by: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct IdentityLinkRow {
    local_user_id: String,
    linked_at: i64,
    linked_by: String,
}

impl From<(String, IdentityLinkRow)> for IdentityLink {
    fn from((chat_id, row): (String, IdentityLinkRow)) -> Self {
        Self {
            chat_id,
            local_user_id: row.local_user_id,
            linked_at: Timestamp::from_millis(row.linked_at),
            linked_by: row.linked_by,
        }
    }
}

/// Store-backed identity links, keyed by `chat_id`. A `chat_id` has at
/// most one link; re-linking replaces it (spec §3).
pub struct IdentityLinks {
    table: GenericTable,
}

impl IdentityLinks {
    /// Bind to `db`'s identity-link table.
    #[must_use]
    pub fn new(db: Database) -> Self {
        Self { table: GenericTable::new(db, names::IDENTITY_LINK) }
    }

    /// Link `chat_id` to `local_user_id`, replacing any existing link.
    ///
    /// # Errors
    ///
    /// Propagates Store errors.
    pub async fn link(
        &self,
        chat_id: &str,
        local_user_id: impl Into<String>,
        linked_by: impl Into<String>,
    ) -> astrid_storage::StorageResult<()> {
        let row = IdentityLinkRow {
            local_user_id: local_user_id.into(),
            linked_at: Timestamp::now().into_millis(),
            linked_by: linked_by.into(),
        };
        Table::upsert(&self.table, chat_id, &row).await
    }

    /// Remove `chat_id`'s link, if any.
    ///
    /// # Errors
    ///
    /// Propagates Store errors.
    pub async fn unlink(&self, chat_id: &str) -> astrid_storage::StorageResult<()> {
        Table::delete(&self.table, chat_id).await
    }

    /// Resolve `chat_id`'s link, if any.
    ///
    /// # Errors
    ///
    /// Propagates Store errors.
    pub async fn resolve(&self, chat_id: &str) -> astrid_storage::StorageResult<Option<IdentityLink>> {
        let row: Option<IdentityLinkRow> = Table::get(&self.table, chat_id).await?;
        Ok(row.map(|row| IdentityLink::from((chat_id.to_string(), row))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn db() -> Database {
        Database::connect_memory().await.unwrap()
    }

    #[tokio::test]
    async fn ban_then_is_banned() {
        let bans = BanList::new(db().await);
        assert!(!bans.is_banned("111").await.unwrap());
        bans.ban("111", "spam", "operator").await.unwrap();
        assert!(bans.is_banned("111").await.unwrap());
        let record = bans.get("111").await.unwrap().unwrap();
        assert_eq!(record.reason, "spam");
        assert_eq!(record.banned_by, "operator");
    }

    #[tokio::test]
    async fn list_returns_every_ban() {
        let bans = BanList::new(db().await);
        bans.ban("111", "spam", "operator").await.unwrap();
        bans.ban("222", "abuse", "operator").await.unwrap();
        let mut listed = bans.list().await.unwrap();
        listed.sort_by(|a, b| a.chat_id.cmp(&b.chat_id));
        assert_eq!(listed.iter().map(|b| b.chat_id.as_str()).collect::<Vec<_>>(), vec!["111", "222"]);
    }

    #[tokio::test]
    async fn unban_clears_the_record() {
        let bans = BanList::new(db().await);
        bans.ban("111", "spam", "operator").await.unwrap();
        bans.unban("111").await.unwrap();
        assert!(!bans.is_banned("111").await.unwrap());
    }

    #[tokio::test]
    async fn relinking_replaces_the_previous_link() {
        let links = IdentityLinks::new(db().await);
        links.link("111", "alice", "operator").await.unwrap();
        links.link("111", "bob", "operator").await.unwrap();
        let resolved = links.resolve("111").await.unwrap().unwrap();
        assert_eq!(resolved.local_user_id, "bob");
    }

    #[tokio::test]
    async fn unlinked_chat_resolves_to_none() {
        let links = IdentityLinks::new(db().await);
        assert_eq!(links.resolve("999").await.unwrap(), None);
    }
}
