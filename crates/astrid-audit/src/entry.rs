//! Audit entry types and actions (spec §4.M: "audit log records
//! `{request_id, chat_id, classification, confidence, tier, outcome,
//! duration_ms}`" on every Mediator dispatch, plus the operator actions
//! named in spec §6's CLI surface).
//!
//! Every security-relevant operation is recorded as an audit entry.
//! Entries are chain-linked (each contains the hash of the previous)
//! and signed by the runtime.

use std::fmt;

use astrid_core::{Classification, RequestId, SessionId, Tier, Timestamp};
use astrid_crypto::{ContentHash, KeyPair, PublicKey, Signature};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AuditError, AuditResult};

/// Unique identifier for an audit entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AuditEntryId(pub Uuid);

impl AuditEntryId {
    /// Generate a new random entry id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for AuditEntryId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AuditEntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "audit:{}", self.0)
    }
}

/// A single audit log entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Unique entry identifier.
    pub id: AuditEntryId,
    /// When this entry was created.
    pub timestamp: Timestamp,
    /// Session this entry belongs to (chain-linking key).
    pub session_id: SessionId,
    /// The action being audited.
    pub action: AuditAction,
    /// Authorization proof for this action.
    pub authorization: AuthorizationProof,
    /// Outcome of the action (spec §4.M's fixed outcome vocabulary).
    pub outcome: AuditOutcome,
    /// Wall-clock duration of the dispatch, when known.
    pub duration_ms: Option<u64>,
    /// Hash of the previous entry in this session's chain.
    pub previous_hash: ContentHash,
    /// Runtime public key that signed this entry.
    pub runtime_key: PublicKey,
    /// Signature over entry contents.
    pub signature: Signature,
}

impl AuditEntry {
    /// Create and sign a new audit entry.
    #[must_use]
    pub fn create(
        session_id: SessionId,
        action: AuditAction,
        authorization: AuthorizationProof,
        outcome: AuditOutcome,
        duration_ms: Option<u64>,
        previous_hash: ContentHash,
        runtime_key: &KeyPair,
    ) -> Self {
        let mut entry = Self {
            id: AuditEntryId::new(),
            timestamp: Timestamp::now(),
            session_id,
            action,
            authorization,
            outcome,
            duration_ms,
            previous_hash,
            runtime_key: runtime_key.export_public_key(),
            signature: Signature::from_bytes([0u8; 64]),
        };
        let signing_data = entry.signing_data();
        entry.signature = runtime_key.sign(&signing_data);
        entry
    }

    /// Get the data used for signing.
    #[must_use]
    pub fn signing_data(&self) -> Vec<u8> {
        let mut data = Vec::new();
        data.extend_from_slice(self.id.0.as_bytes());
        data.extend_from_slice(&self.timestamp.0.to_le_bytes());
        data.extend_from_slice(self.session_id.0.as_bytes());
        if let Ok(action_json) = serde_json::to_vec(&self.action) {
            data.extend_from_slice(&action_json);
        }
        if let Ok(auth_json) = serde_json::to_vec(&self.authorization) {
            data.extend_from_slice(&auth_json);
        }
        if let Ok(outcome_json) = serde_json::to_vec(&self.outcome) {
            data.extend_from_slice(&outcome_json);
        }
        data.extend_from_slice(self.previous_hash.as_bytes());
        data.extend_from_slice(self.runtime_key.as_bytes());
        data
    }

    /// Compute the content hash of this entry.
    #[must_use]
    pub fn content_hash(&self) -> ContentHash {
        ContentHash::hash(&self.signing_data())
    }

    /// Verify the entry's signature.
    ///
    /// # Errors
    ///
    /// Returns [`AuditError::InvalidSignature`] if the signature does not
    /// match the entry contents.
    pub fn verify_signature(&self) -> AuditResult<()> {
        let signing_data = self.signing_data();
        self.runtime_key
            .verify(&signing_data, &self.signature)
            .map_err(|_| AuditError::InvalidSignature { entry_id: self.id.to_string() })
    }

    /// Check if this entry follows another (chain linking).
    #[must_use]
    pub fn follows(&self, previous: &AuditEntry) -> bool {
        self.previous_hash == previous.content_hash()
    }
}

/// Actions recorded against the audit log. `Dispatch` is the per-message
/// record spec §4.M requires; the rest cover the operator CLI surface of
/// spec §6 and the admin-path side effects it triggers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuditAction {
    /// A Mediator dispatch completed (spec §4.M's closing audit record).
    Dispatch {
        /// Correlates back to the inbound message that started this dispatch.
        request_id: RequestId,
        /// Chat the message arrived on.
        chat_id: String,
        /// Final classification reached by the Policy Engine.
        classification: Classification,
        /// Observer confidence, when the LLM observer ran.
        confidence: Option<f64>,
        /// Tier the dispatch ran at, if it ran.
        tier: Option<Tier>,
    },
    /// Operator banned a chat (`astrid-cli ban`).
    Banned {
        /// Chat id banned.
        chat_id: String,
        /// Operator-supplied reason, if any.
        reason: Option<String>,
        /// Local user id of the operator who issued the ban.
        banned_by: String,
    },
    /// Operator lifted a ban (`astrid-cli unban`).
    Unbanned {
        /// Chat id unbanned.
        chat_id: String,
    },
    /// Operator invalidated a chat's TOTP session (`astrid-cli force-reauth`).
    ForceReauth {
        /// Chat id affected.
        chat_id: String,
    },
    /// An approval was granted by a subsequent inbound message consuming
    /// its nonce.
    ApprovalGranted {
        /// The approval's correlating request id.
        request_id: RequestId,
        /// Chat the approval was scoped to.
        chat_id: String,
    },
    /// An approval expired or was never consumed.
    ApprovalLapsed {
        /// The approval's correlating request id.
        request_id: RequestId,
        /// Chat the approval was scoped to.
        chat_id: String,
    },
    /// A memory entry was moved to quarantined trust (§4.K memory-quarantine).
    MemoryQuarantined {
        /// Memory entry id affected.
        entry_id: String,
    },
    /// Configuration was reloaded.
    ConfigReloaded,
}

impl AuditAction {
    /// Human-readable description, used for log lines.
    #[must_use]
    pub fn description(&self) -> String {
        match self {
            Self::Dispatch { chat_id, classification, .. } => {
                format!("dispatch on chat {chat_id}: {classification}")
            },
            Self::Banned { chat_id, .. } => format!("banned chat {chat_id}"),
            Self::Unbanned { chat_id } => format!("unbanned chat {chat_id}"),
            Self::ForceReauth { chat_id } => format!("force-reauth on chat {chat_id}"),
            Self::ApprovalGranted { chat_id, .. } => format!("approval granted on chat {chat_id}"),
            Self::ApprovalLapsed { chat_id, .. } => format!("approval lapsed on chat {chat_id}"),
            Self::MemoryQuarantined { entry_id } => format!("quarantined memory entry {entry_id}"),
            Self::ConfigReloaded => "configuration reloaded".to_string(),
        }
    }
}

/// How an action was authorized.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuthorizationProof {
    /// Authorized by the sender of an inbound message.
    User {
        /// Chat the message arrived on.
        chat_id: String,
        /// Channel-native message id.
        message_id: String,
    },
    /// Authorized by consuming a pre-approved nonce.
    Approval {
        /// The consumed approval's request id.
        request_id: RequestId,
    },
    /// System-initiated action (scheduler, startup recovery).
    System {
        /// Reason for the system action.
        reason: String,
    },
    /// Authorization was denied.
    Denied {
        /// Reason for denial.
        reason: String,
    },
}

/// Outcome of an audited action — spec §4.M's exact vocabulary for
/// `Dispatch` entries, reused for every other action kind as well.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditOutcome {
    /// Completed normally.
    Success,
    /// Refused by policy (infra-secret, sensitive-path, BLOCK classification).
    Blocked,
    /// A downstream call (LLM observer, capability call) timed out.
    Timeout,
    /// An unexpected internal error occurred.
    Error,
    /// Denied by the rate limiter.
    RateLimited,
}

impl fmt::Display for AuditOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Success => "success",
            Self::Blocked => "blocked",
            Self::Timeout => "timeout",
            Self::Error => "error",
            Self::RateLimited => "rate_limited",
        };
        write!(f, "{s}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keypair() -> KeyPair {
        KeyPair::generate()
    }

    #[test]
    fn entry_signature_round_trips() {
        let kp = keypair();
        let entry = AuditEntry::create(
            SessionId::new(),
            AuditAction::ConfigReloaded,
            AuthorizationProof::System { reason: "startup".to_string() },
            AuditOutcome::Success,
            None,
            ContentHash::zero(),
            &kp,
        );
        assert!(entry.verify_signature().is_ok());
    }

    #[test]
    fn chain_linking_detects_follow() {
        let kp = keypair();
        let session_id = SessionId::new();
        let e1 = AuditEntry::create(
            session_id,
            AuditAction::ConfigReloaded,
            AuthorizationProof::System { reason: "startup".to_string() },
            AuditOutcome::Success,
            None,
            ContentHash::zero(),
            &kp,
        );
        let e2 = AuditEntry::create(
            session_id,
            AuditAction::Dispatch {
                request_id: RequestId::new(),
                chat_id: "111".to_string(),
                classification: Classification::Allow,
                confidence: None,
                tier: Some(Tier::ReadOnly),
            },
            AuthorizationProof::User { chat_id: "111".to_string(), message_id: "m1".to_string() },
            AuditOutcome::Success,
            Some(120),
            e1.content_hash(),
            &kp,
        );
        assert!(e2.follows(&e1));
        assert!(!e1.follows(&e2));
    }

    #[test]
    fn tampering_invalidates_signature() {
        let kp = keypair();
        let mut entry = AuditEntry::create(
            SessionId::new(),
            AuditAction::ConfigReloaded,
            AuthorizationProof::System { reason: "startup".to_string() },
            AuditOutcome::Success,
            None,
            ContentHash::zero(),
            &kp,
        );
        entry.outcome = AuditOutcome::Blocked;
        assert!(entry.verify_signature().is_err());
    }
}
