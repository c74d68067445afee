//! Approval Store (spec §4.G): atomic one-shot consumption of approval
//! nonces with TTL, chat scoping, and a body bound to a serialized message.
//!
//! `consume` never deletes a row for a wrong-chat or expired attempt — only
//! a matching, unexpired nonce is atomically removed, so the nonce remains
//! valid for its rightful chat afterward (spec §8 scenario 2). The atomic
//! removal itself (`Table::delete_if_present`) is what makes "the number of
//! successful `consume(N, *)` calls across the lifetime of the system is
//! exactly 0 or 1" (spec §8) hold even when two callers race past the
//! read-only pre-checks at the same instant.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

use astrid_core::{Classification, KernelError, KernelResult, Tier, Timestamp};
use astrid_storage::Database;
use astrid_storage::tables::{GenericTable, Table, names};
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

/// A request awaiting approval, as handed to [`ApprovalStore::create`].
#[derive(Debug, Clone)]
pub struct ApprovalRequest {
    /// Correlates this approval back to the mediator dispatch that raised it.
    pub request_id: String,
    /// Chat the approval is scoped to; only this chat may consume it.
    pub chat_id: String,
    /// Tier the message would have dispatched at, had it not been escalated.
    pub tier: Tier,
    /// The serialized message body to replay on consume.
    pub body: String,
    /// Opaque reference to attached media, if any.
    pub media_ref: Option<String>,
    /// Sender identity as reported by the inbound channel.
    pub sender: String,
    /// Recipient identity (persona/bot) the message was addressed to.
    pub recipient: String,
    /// Channel-native message id, for threading a reply.
    pub message_id: String,
    /// Classification that triggered the escalation.
    pub classification: Classification,
    /// Observer confidence at the time of escalation.
    pub confidence: f64,
    /// Free-text reason surfaced to the operator.
    pub reason: Option<String>,
}

/// The §3 `Approval` row.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ApprovalRow {
    nonce: String,
    request_id: String,
    chat_id: String,
    created_at: i64,
    expires_at: i64,
    tier: Tier,
    body: String,
    media_ref: Option<String>,
    sender: String,
    recipient: String,
    message_id: String,
    classification: Classification,
    confidence: f64,
    reason: Option<String>,
}

/// A consumed approval, returned to the caller that redeemed it.
#[derive(Debug, Clone, PartialEq)]
pub struct Approval {
    /// The nonce that was consumed.
    pub nonce: String,
    /// Correlates back to the mediator dispatch that raised it.
    pub request_id: String,
    /// Chat it was scoped to (equals the consuming `chat_id`).
    pub chat_id: String,
    /// Tier to dispatch the replayed body at.
    pub tier: Tier,
    /// The serialized message body to replay.
    pub body: String,
    /// Opaque reference to attached media, if any.
    pub media_ref: Option<String>,
    /// Sender identity as reported by the inbound channel.
    pub sender: String,
    /// Recipient identity (persona/bot) the message was addressed to.
    pub recipient: String,
    /// Channel-native message id.
    pub message_id: String,
    /// Classification that triggered the escalation.
    pub classification: Classification,
    /// Observer confidence at the time of escalation.
    pub confidence: f64,
    /// Free-text reason surfaced to the operator.
    pub reason: Option<String>,
}

impl From<ApprovalRow> for Approval {
    fn from(row: ApprovalRow) -> Self {
        Self {
            nonce: row.nonce,
            request_id: row.request_id,
            chat_id: row.chat_id,
            tier: row.tier,
            body: row.body,
            media_ref: row.media_ref,
            sender: row.sender,
            recipient: row.recipient,
            message_id: row.message_id,
            classification: row.classification,
            confidence: row.confidence,
            reason: row.reason,
        }
    }
}

/// A retired approval kept around for audit purposes after `consume`
/// succeeds (spec §4.G: "MAY be retained as audit rows with a separate
/// status column"). Stored in the kernel's ambient audit table, not the
/// approval table the nonce lived in — the nonce itself must stay gone.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ConsumedApprovalRecord {
    nonce: String,
    request_id: String,
    chat_id: String,
    status: &'static str,
    consumed_at: i64,
}

/// Store-backed one-shot approval nonces.
pub struct ApprovalStore {
    approvals: GenericTable,
    consumed: GenericTable,
}

impl ApprovalStore {
    /// Bind to `db`'s `approval` and audit-log tables.
    #[must_use]
    pub fn new(db: Database) -> Self {
        Self {
            approvals: GenericTable::new(db.clone(), names::APPROVAL),
            consumed: GenericTable::new(db, names::AUDIT_ENTRY),
        }
    }

    /// Write a new approval row with a fresh nonce, expiring `ttl_millis`
    /// from now. Returns the nonce to hand back to the user as a challenge.
    pub async fn create(&self, request: ApprovalRequest, ttl_millis: i64) -> KernelResult<String> {
        let nonce = Uuid::new_v4().to_string();
        let now = Timestamp::now();
        let row = ApprovalRow {
            nonce: nonce.clone(),
            request_id: request.request_id,
            chat_id: request.chat_id,
            created_at: now.into_millis(),
            expires_at: now.plus_millis(ttl_millis).into_millis(),
            tier: request.tier,
            body: request.body,
            media_ref: request.media_ref,
            sender: request.sender,
            recipient: request.recipient,
            message_id: request.message_id,
            classification: request.classification,
            confidence: request.confidence,
            reason: request.reason,
        };
        Table::upsert(&self.approvals, &nonce, &row)
            .await
            .map_err(|e| KernelError::Internal(e.to_string()))?;
        Ok(nonce)
    }

    /// Atomically consume `nonce` on behalf of `chat_id`.
    ///
    /// A wrong-chat or expired attempt leaves the row untouched — only a
    /// matching, unexpired nonce is ever deleted, and it is deleted exactly
    /// once no matter how many callers race to consume it concurrently.
    pub async fn consume(&self, nonce: &str, chat_id: &str) -> KernelResult<Approval> {
        let found: Option<ApprovalRow> = Table::get(&self.approvals, nonce)
            .await
            .map_err(|e| KernelError::Internal(e.to_string()))?;
        let Some(row) = found else {
            // The row is gone either because the nonce never existed or
            // because a previous `consume` already retired it; the audit
            // table distinguishes the two (spec §8 scenario 1).
            let retired: Option<ConsumedApprovalRecord> = Table::get(&self.consumed, &format!("{nonce}:consumed"))
                .await
                .map_err(|e| KernelError::Internal(e.to_string()))?;
            return Err(if retired.is_some() { KernelError::ApprovalAlreadyConsumed } else { KernelError::ApprovalRequired });
        };

        if row.chat_id != chat_id {
            return Err(KernelError::ApprovalWrongChat);
        }
        if row.expires_at < Timestamp::now().into_millis() {
            return Err(KernelError::ApprovalExpired);
        }

        let removed: Option<ApprovalRow> = Table::delete_if_present(&self.approvals, nonce)
            .await
            .map_err(|e| KernelError::Internal(e.to_string()))?;
        let Some(row) = removed else {
            // Raced: another caller's delete won between our read and ours.
            return Err(KernelError::ApprovalAlreadyConsumed);
        };

        let record = ConsumedApprovalRecord {
            nonce: nonce.to_string(),
            request_id: row.request_id.clone(),
            chat_id: row.chat_id.clone(),
            status: "consumed",
            consumed_at: Timestamp::now().into_millis(),
        };
        if let Err(err) = Table::upsert(&self.consumed, &format!("{nonce}:consumed"), &record).await
        {
            warn!(%err, %nonce, "failed to retain consumed-approval audit row");
        }

        Ok(row.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(chat_id: &str) -> ApprovalRequest {
        ApprovalRequest {
            request_id: "req-1".to_string(),
            chat_id: chat_id.to_string(),
            tier: Tier::WriteLocal,
            body: "edit foo.txt".to_string(),
            media_ref: None,
            sender: "111".to_string(),
            recipient: "bot".to_string(),
            message_id: "m1".to_string(),
            classification: Classification::Warn,
            confidence: 0.4,
            reason: Some("fast-path escalation".to_string()),
        }
    }

    async fn store() -> ApprovalStore {
        let db = Database::connect_memory().await.unwrap();
        ApprovalStore::new(db)
    }

    #[tokio::test]
    async fn consume_is_one_shot() {
        let store = store().await;
        let nonce = store.create(request("111"), 60_000).await.unwrap();

        let approval = store.consume(&nonce, "111").await.unwrap();
        assert_eq!(approval.body, "edit foo.txt");

        let err = store.consume(&nonce, "111").await.unwrap_err();
        assert_eq!(err, KernelError::ApprovalAlreadyConsumed);
    }

    #[tokio::test]
    async fn wrong_chat_is_rejected_but_nonce_survives() {
        let store = store().await;
        let nonce = store.create(request("111"), 60_000).await.unwrap();

        let err = store.consume(&nonce, "222").await.unwrap_err();
        assert_eq!(err, KernelError::ApprovalWrongChat);

        let approval = store.consume(&nonce, "111").await.unwrap();
        assert_eq!(approval.chat_id, "111");
    }

    #[tokio::test]
    async fn unknown_nonce_is_rejected() {
        let store = store().await;
        let err = store.consume("not-a-real-nonce", "111").await.unwrap_err();
        assert_eq!(err, KernelError::ApprovalRequired);
    }

    #[tokio::test]
    async fn expired_nonce_is_rejected_without_deleting() {
        let store = store().await;
        let nonce = store.create(request("111"), -1).await.unwrap();

        let err = store.consume(&nonce, "111").await.unwrap_err();
        assert_eq!(err, KernelError::ApprovalExpired);
    }
}
