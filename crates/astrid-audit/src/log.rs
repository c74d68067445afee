//! Audit log — the high-level API the rest of the kernel appends through.
//!
//! Grounded on the sibling `astralis-audit::log` crate's `AuditLog`/
//! `AuditBuilder`/chain-verification shape, ported to the async
//! `SurrealAuditStorage` backend and an in-process chain-head cache so
//! `append` does not re-read the whole session history on every call.

use std::collections::HashMap;
use std::sync::RwLock;

use astrid_core::SessionId;
use astrid_crypto::{ContentHash, KeyPair, PublicKey};
use tracing::{debug, error, warn};

use crate::entry::{AuditAction, AuditEntry, AuditEntryId, AuditOutcome, AuthorizationProof};
use crate::error::{AuditError, AuditResult};
use crate::storage::{AuditStorage, SurrealAuditStorage};
use astrid_storage::Database;

/// Audit log for recording and verifying security events.
pub struct AuditLog {
    storage: Box<dyn AuditStorage>,
    runtime_key: KeyPair,
    chain_heads: RwLock<HashMap<SessionId, ContentHash>>,
}

impl AuditLog {
    /// Build an audit log over `db`'s audit-entry table, signing with
    /// `runtime_key`.
    #[must_use]
    pub fn new(db: Database, runtime_key: KeyPair) -> Self {
        Self { storage: Box::new(SurrealAuditStorage::new(db)), runtime_key, chain_heads: RwLock::new(HashMap::new()) }
    }

    /// Append a new audit entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the entry cannot be stored.
    pub async fn append(
        &self,
        session_id: SessionId,
        action: AuditAction,
        authorization: AuthorizationProof,
        outcome: AuditOutcome,
        duration_ms: Option<u64>,
    ) -> AuditResult<AuditEntryId> {
        let previous_hash = self.previous_hash(session_id).await?;

        let entry = AuditEntry::create(session_id, action, authorization, outcome, duration_ms, previous_hash, &self.runtime_key);
        let entry_id = entry.id;
        let entry_hash = entry.content_hash();

        debug!(entry_id = %entry_id, action = %entry.action.description(), outcome = %entry.outcome, "appending audit entry");
        self.storage.store(&entry).await?;

        #[allow(clippy::unwrap_used)]
        self.chain_heads.write().unwrap().insert(session_id, entry_hash);

        Ok(entry_id)
    }

    async fn previous_hash(&self, session_id: SessionId) -> AuditResult<ContentHash> {
        {
            #[allow(clippy::unwrap_used)]
            let heads = self.chain_heads.read().unwrap();
            if let Some(hash) = heads.get(&session_id) {
                return Ok(*hash);
            }
        }

        if let Some(head) = self.storage.get_chain_head(session_id).await? {
            return Ok(head.content_hash());
        }
        Ok(ContentHash::zero())
    }

    /// Fetch an entry by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage backend fails.
    pub async fn get(&self, id: AuditEntryId) -> AuditResult<Option<AuditEntry>> {
        self.storage.get(id).await
    }

    /// Fetch every entry for a session, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage backend fails.
    pub async fn get_session_entries(&self, session_id: SessionId) -> AuditResult<Vec<AuditEntry>> {
        self.storage.get_session_entries(session_id).await
    }

    /// List every distinct session id that has at least one entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage backend fails.
    pub async fn list_sessions(&self) -> AuditResult<Vec<SessionId>> {
        self.storage.list_sessions().await
    }

    /// Verify the chain integrity for one session.
    ///
    /// # Errors
    ///
    /// Returns an error if entries cannot be retrieved.
    pub async fn verify_chain(&self, session_id: SessionId) -> AuditResult<ChainVerificationResult> {
        let entries = self.storage.get_session_entries(session_id).await?;
        if entries.is_empty() {
            return Ok(ChainVerificationResult { valid: true, entries_verified: 0, issues: Vec::new() });
        }

        let mut issues = Vec::new();

        if !entries[0].previous_hash.is_zero() {
            issues.push(ChainIssue::InvalidGenesis { entry_id: entries[0].id });
        }

        for entry in &entries {
            if let Err(err) = entry.verify_signature() {
                error!(entry_id = %entry.id, %err, "invalid audit entry signature");
                issues.push(ChainIssue::InvalidSignature { entry_id: entry.id });
            }
        }

        for pair in entries.windows(2) {
            let (prev, curr) = (&pair[0], &pair[1]);
            if !curr.follows(prev) {
                warn!(current = %curr.id, previous = %prev.id, "audit chain link broken");
                issues.push(ChainIssue::BrokenLink {
                    entry_id: curr.id,
                    expected_previous: prev.content_hash(),
                    actual_previous: curr.previous_hash,
                });
            }
        }

        Ok(ChainVerificationResult { valid: issues.is_empty(), entries_verified: entries.len(), issues })
    }

    /// Verify every session's chain.
    ///
    /// # Errors
    ///
    /// Returns an error if sessions cannot be listed.
    pub async fn verify_all(&self) -> AuditResult<Vec<(SessionId, ChainVerificationResult)>> {
        let mut results = Vec::new();
        for session_id in self.storage.list_sessions().await? {
            let result = self.verify_chain(session_id).await?;
            results.push((session_id, result));
        }
        Ok(results)
    }

    /// Count every entry ever stored.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage backend fails.
    pub async fn count(&self) -> AuditResult<usize> {
        self.storage.count().await
    }

    /// The runtime's public key, for operators verifying exported entries.
    #[must_use]
    pub fn runtime_public_key(&self) -> PublicKey {
        self.runtime_key.export_public_key()
    }
}

impl std::fmt::Debug for AuditLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditLog").field("runtime_key_id", &self.runtime_key.key_id_hex()).finish_non_exhaustive()
    }
}

/// Result of verifying one session's chain.
#[derive(Debug, Clone)]
pub struct ChainVerificationResult {
    /// Whether every entry verified cleanly.
    pub valid: bool,
    /// Number of entries checked.
    pub entries_verified: usize,
    /// Issues found, empty when `valid`.
    pub issues: Vec<ChainIssue>,
}

/// A problem found while verifying a chain.
#[derive(Debug, Clone)]
pub enum ChainIssue {
    /// The first entry's `previous_hash` was not zero.
    InvalidGenesis {
        /// Entry with the bad genesis hash.
        entry_id: AuditEntryId,
    },
    /// An entry's signature does not verify.
    InvalidSignature {
        /// Entry with the invalid signature.
        entry_id: AuditEntryId,
    },
    /// An entry's `previous_hash` does not match its predecessor's content hash.
    BrokenLink {
        /// Entry with the broken link.
        entry_id: AuditEntryId,
        /// What the previous hash should have been.
        expected_previous: ContentHash,
        /// What it actually was.
        actual_previous: ContentHash,
    },
}

impl std::fmt::Display for ChainIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidGenesis { entry_id } => write!(f, "invalid genesis at {entry_id}"),
            Self::InvalidSignature { entry_id } => write!(f, "invalid signature at {entry_id}"),
            Self::BrokenLink { entry_id, .. } => write!(f, "broken chain link at {entry_id}"),
        }
    }
}

/// Fluent builder for appending an audit entry.
pub struct AuditBuilder<'a> {
    log: &'a AuditLog,
    session_id: SessionId,
    action: Option<AuditAction>,
    authorization: Option<AuthorizationProof>,
    duration_ms: Option<u64>,
}

impl<'a> AuditBuilder<'a> {
    /// Start building an entry for `session_id`.
    #[must_use]
    pub fn new(log: &'a AuditLog, session_id: SessionId) -> Self {
        Self { log, session_id, action: None, authorization: None, duration_ms: None }
    }

    /// Set the action.
    #[must_use]
    pub fn action(mut self, action: AuditAction) -> Self {
        self.action = Some(action);
        self
    }

    /// Set the authorization proof.
    #[must_use]
    pub fn authorization(mut self, auth: AuthorizationProof) -> Self {
        self.authorization = Some(auth);
        self
    }

    /// Set the dispatch duration.
    #[must_use]
    pub fn duration_ms(mut self, duration_ms: u64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }

    /// Append with [`AuditOutcome::Success`].
    ///
    /// # Errors
    ///
    /// Returns [`AuditError::StorageError`] if `action` was never set, or if
    /// the entry cannot be stored.
    pub async fn success(self) -> AuditResult<AuditEntryId> {
        self.finish(AuditOutcome::Success).await
    }

    /// Append with an explicit non-success outcome.
    ///
    /// # Errors
    ///
    /// Returns [`AuditError::StorageError`] if `action` was never set, or if
    /// the entry cannot be stored.
    pub async fn outcome(self, outcome: AuditOutcome) -> AuditResult<AuditEntryId> {
        self.finish(outcome).await
    }

    async fn finish(self, outcome: AuditOutcome) -> AuditResult<AuditEntryId> {
        let action = self.action.ok_or_else(|| AuditError::StorageError("audit builder missing action".to_string()))?;
        let authorization = self.authorization.unwrap_or(AuthorizationProof::System { reason: "unspecified".to_string() });
        self.log.append(self.session_id, action, authorization, outcome, self.duration_ms).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use astrid_core::{Classification, RequestId};

    async fn log() -> AuditLog {
        let db = Database::connect_memory().await.unwrap();
        AuditLog::new(db, KeyPair::generate())
    }

    #[tokio::test]
    async fn append_and_retrieve() {
        let log = log().await;
        let session_id = SessionId::new();

        let entry_id = log
            .append(
                session_id,
                AuditAction::ConfigReloaded,
                AuthorizationProof::System { reason: "startup".to_string() },
                AuditOutcome::Success,
                None,
            )
            .await
            .unwrap();

        let entry = log.get(entry_id).await.unwrap().unwrap();
        assert_eq!(entry.id, entry_id);
    }

    #[tokio::test]
    async fn chain_verification_passes_for_a_clean_chain() {
        let log = log().await;
        let session_id = SessionId::new();

        for i in 0..5 {
            log.append(
                session_id,
                AuditAction::Dispatch {
                    request_id: RequestId::new(),
                    chat_id: format!("chat{i}"),
                    classification: Classification::Allow,
                    confidence: None,
                    tier: None,
                },
                AuthorizationProof::System { reason: "test".to_string() },
                AuditOutcome::Success,
                Some(10),
            )
            .await
            .unwrap();
        }

        let result = log.verify_chain(session_id).await.unwrap();
        assert!(result.valid);
        assert_eq!(result.entries_verified, 5);
    }

    #[tokio::test]
    async fn builder_appends_through_the_log() {
        let log = log().await;
        let session_id = SessionId::new();

        let entry_id = AuditBuilder::new(&log, session_id)
            .action(AuditAction::ConfigReloaded)
            .authorization(AuthorizationProof::System { reason: "test".to_string() })
            .success()
            .await
            .unwrap();

        assert!(log.get(entry_id).await.unwrap().is_some());
    }
}
