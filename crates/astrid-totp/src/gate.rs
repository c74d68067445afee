//! The TOTP gate state machine (spec §4.H).
//!
//! `user_id` here is the already-resolved `local_user_id` from an Identity
//! Link, the same parameter shape `astrid_policy::tier` takes — this crate
//! does not resolve `chat_id → local_user_id` itself. A chat with no
//! identity link (`user_id: None`) can never have TOTP configured, so the
//! gate passes it through without ever calling the daemon.

use astrid_core::{KernelError, Timestamp};
use astrid_storage::Database;
use astrid_storage::tables::{GenericTable, Table, names};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::client::TotpDaemonClient;

/// A message parked behind a TOTP challenge, returned once the chat
/// verifies.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ParkedMessage {
    /// Channel-native message id.
    pub message_id: String,
    /// The message body that was parked.
    pub body: String,
    /// Opaque reference to attached media, if any.
    pub media_ref: Option<String>,
    /// Sender identity as reported by the inbound channel.
    pub sender_ref: String,
}

/// Outcome of [`TotpGate::check`].
#[derive(Debug, Clone, PartialEq)]
pub enum GateResult {
    /// No TOTP gate applies, or the chat already verified within its
    /// session TTL.
    Pass,
    /// TOTP is configured and unverified; the user should be shown `text`
    /// and prompted for a code.
    Challenge {
        /// User-visible guidance.
        text: String,
    },
    /// A 6-digit code verified successfully.
    Verified {
        /// A message that was parked behind the challenge, if any.
        parked: Option<ParkedMessage>,
    },
    /// A 6-digit code was supplied but did not verify.
    InvalidCode {
        /// User-visible guidance.
        text: String,
    },
    /// The daemon could not be reached and the chat has an active
    /// identity link — fail closed.
    Error(KernelError),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct TotpSessionRow {
    user_id: String,
    created_at: i64,
    expires_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct PendingTotpMessageRow {
    chat_id: String,
    message_id: String,
    body: String,
    media_ref: Option<String>,
    sender_ref: String,
    created_at: i64,
    expires_at: i64,
}

/// Tunables for the gate.
#[derive(Debug, Clone, Copy)]
pub struct GateConfig {
    /// How long a verified TOTP session stays valid.
    pub session_ttl_millis: i64,
    /// How long a parked message waits for its challenge to be answered.
    pub pending_ttl_millis: i64,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            session_ttl_millis: 30 * 60 * 1000,
            pending_ttl_millis: 5 * 60 * 1000,
        }
    }
}

const CHALLENGE_TEXT: &str = "This account requires a one-time code. Reply with your 6-digit TOTP code to continue.";
const INVALID_CODE_TEXT: &str = "That code didn't verify. Try again.";

fn is_six_digit_code(body: &str) -> bool {
    let trimmed = body.trim();
    trimmed.len() == 6 && trimmed.chars().all(|c| c.is_ascii_digit())
}

/// Store-backed TOTP gate.
pub struct TotpGate<D> {
    sessions: GenericTable,
    pending: GenericTable,
    daemon: D,
    config: GateConfig,
}

impl<D: TotpDaemonClient> TotpGate<D> {
    /// Bind to `db`'s TOTP tables, using `daemon` for configuration/verify
    /// checks.
    #[must_use]
    pub fn new(db: Database, daemon: D, config: GateConfig) -> Self {
        Self {
            sessions: GenericTable::new(db.clone(), names::TOTP_SESSION),
            pending: GenericTable::new(db, names::PENDING_TOTP_MESSAGE),
            daemon,
            config,
        }
    }

    /// Run the gate for an inbound message. `message_id`, `media_ref`, and
    /// `sender_ref` are carried through to the Pending TOTP Message row
    /// untouched, so a later `Verified` result can hand back the exact
    /// message that was parked (spec §3).
    pub async fn check(
        &self,
        chat_id: &str,
        body: &str,
        user_id: Option<&str>,
        message_id: &str,
        media_ref: Option<&str>,
        sender_ref: &str,
    ) -> GateResult {
        if let Some(uid) = user_id {
            match self.active_session(uid).await {
                Ok(true) => return GateResult::Pass,
                Ok(false) => {}
                Err(err) => return GateResult::Error(err),
            }
        }

        let Some(uid) = user_id else {
            return GateResult::Pass;
        };

        let configured = match self.daemon.is_configured(uid).await {
            Ok(configured) => configured,
            Err(err) => {
                warn!(%err, chat_id, "totp daemon unreachable with an active identity link");
                return GateResult::Error(KernelError::TotpDaemonUnavailable);
            }
        };
        if !configured {
            return GateResult::Pass;
        }

        if is_six_digit_code(body) {
            let code = body.trim();
            return match self.daemon.verify(uid, code).await {
                Ok(true) => match self.verify_success(chat_id, uid).await {
                    Ok(parked) => GateResult::Verified { parked },
                    Err(err) => GateResult::Error(err),
                },
                Ok(false) => GateResult::InvalidCode {
                    text: INVALID_CODE_TEXT.to_string(),
                },
                Err(err) => {
                    warn!(%err, chat_id, "totp daemon unreachable during verify");
                    GateResult::Error(KernelError::TotpDaemonUnavailable)
                }
            };
        }

        if let Err(err) = self.park(chat_id, body, message_id, media_ref, sender_ref).await {
            return GateResult::Error(err);
        }
        GateResult::Challenge {
            text: CHALLENGE_TEXT.to_string(),
        }
    }

    /// Invalidate `user_id`'s TOTP session (force-reauth admin path).
    ///
    /// # Errors
    ///
    /// Propagates Store errors.
    pub async fn force_reauth(&self, user_id: &str) -> Result<(), KernelError> {
        <GenericTable as Table<TotpSessionRow>>::delete(&self.sessions, user_id)
            .await
            .map_err(|e| KernelError::Internal(e.to_string()))
    }

    async fn active_session(&self, user_id: &str) -> Result<bool, KernelError> {
        let row: Option<TotpSessionRow> = Table::get(&self.sessions, user_id)
            .await
            .map_err(|e| KernelError::Internal(e.to_string()))?;
        Ok(row.is_some_and(|row| row.expires_at >= Timestamp::now().into_millis()))
    }

    async fn verify_success(
        &self,
        chat_id: &str,
        user_id: &str,
    ) -> Result<Option<ParkedMessage>, KernelError> {
        let now = Timestamp::now();
        let row = TotpSessionRow {
            user_id: user_id.to_string(),
            created_at: now.into_millis(),
            expires_at: now.plus_millis(self.config.session_ttl_millis).into_millis(),
        };
        Table::upsert(&self.sessions, user_id, &row)
            .await
            .map_err(|e| KernelError::Internal(e.to_string()))?;

        let parked: Option<PendingTotpMessageRow> = Table::delete_if_present(&self.pending, chat_id)
            .await
            .map_err(|e| KernelError::Internal(e.to_string()))?;
        Ok(parked.and_then(|row| {
            if row.expires_at < now.into_millis() {
                None
            } else {
                Some(ParkedMessage {
                    message_id: row.message_id,
                    body: row.body,
                    media_ref: row.media_ref,
                    sender_ref: row.sender_ref,
                })
            }
        }))
    }

    async fn park(
        &self,
        chat_id: &str,
        body: &str,
        message_id: &str,
        media_ref: Option<&str>,
        sender_ref: &str,
    ) -> Result<(), KernelError> {
        let now = Timestamp::now();
        let row = PendingTotpMessageRow {
            chat_id: chat_id.to_string(),
            message_id: message_id.to_string(),
            body: body.to_string(),
            media_ref: media_ref.map(str::to_string),
            sender_ref: sender_ref.to_string(),
            created_at: now.into_millis(),
            expires_at: now.plus_millis(self.config.pending_ttl_millis).into_millis(),
        };
        Table::upsert(&self.pending, chat_id, &row)
            .await
            .map_err(|e| KernelError::Internal(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::fake::FakeTotpDaemon;

    async fn gate(daemon: FakeTotpDaemon) -> TotpGate<FakeTotpDaemon> {
        let db = Database::connect_memory().await.expect("connect");
        TotpGate::new(db, daemon, GateConfig::default())
    }

    #[tokio::test]
    async fn unlinked_chat_passes_without_consulting_daemon() {
        let daemon = FakeTotpDaemon::default();
        daemon.set_unreachable(true);
        let gate = gate(daemon).await;
        assert_eq!(gate.check("111", "hello", None, "m1", None, "sender-1").await, GateResult::Pass);
    }

    #[tokio::test]
    async fn unconfigured_user_passes() {
        let daemon = FakeTotpDaemon::default();
        let gate = gate(daemon).await;
        assert_eq!(gate.check("111", "hello", Some("u1"), "m1", None, "sender-1").await, GateResult::Pass);
    }

    #[tokio::test]
    async fn configured_user_is_challenged_and_message_parked() {
        let daemon = FakeTotpDaemon::default();
        daemon.configure("u1", "123456");
        let gate = gate(daemon).await;

        let result = gate.check("111", "please do the thing", Some("u1"), "m1", Some("photo-1"), "sender-1").await;
        assert!(matches!(result, GateResult::Challenge { .. }));
    }

    #[tokio::test]
    async fn valid_code_verifies_and_returns_parked_message() {
        let daemon = FakeTotpDaemon::default();
        daemon.configure("u1", "123456");
        let gate = gate(daemon).await;

        gate.check("111", "please do the thing", Some("u1"), "m1", Some("photo-1"), "sender-1").await;
        let result = gate.check("111", "123456", Some("u1"), "m2", None, "sender-1").await;
        match result {
            GateResult::Verified { parked } => {
                let parked = parked.unwrap();
                assert_eq!(parked.body, "please do the thing");
                assert_eq!(parked.message_id, "m1");
                assert_eq!(parked.media_ref.as_deref(), Some("photo-1"));
                assert_eq!(parked.sender_ref, "sender-1");
            }
            other => panic!("expected Verified, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn invalid_code_is_rejected() {
        let daemon = FakeTotpDaemon::default();
        daemon.configure("u1", "123456");
        let gate = gate(daemon).await;

        let result = gate.check("111", "000000", Some("u1"), "m1", None, "sender-1").await;
        assert!(matches!(result, GateResult::InvalidCode { .. }));
    }

    #[tokio::test]
    async fn session_within_ttl_short_circuits_to_pass() {
        let daemon = FakeTotpDaemon::default();
        daemon.configure("u1", "123456");
        let gate = gate(daemon).await;

        gate.check("111", "123456", Some("u1"), "m1", None, "sender-1").await;
        assert_eq!(gate.check("111", "anything", Some("u1"), "m2", None, "sender-1").await, GateResult::Pass);
    }

    #[tokio::test]
    async fn unreachable_daemon_with_identity_link_fails_closed() {
        let daemon = FakeTotpDaemon::default();
        daemon.set_unreachable(true);
        let gate = gate(daemon).await;

        let result = gate.check("111", "hello", Some("u1"), "m1", None, "sender-1").await;
        assert_eq!(result, GateResult::Error(KernelError::TotpDaemonUnavailable));
    }

    #[tokio::test]
    async fn force_reauth_invalidates_the_session() {
        let daemon = FakeTotpDaemon::default();
        daemon.configure("u1", "123456");
        let gate = gate(daemon).await;

        gate.check("111", "123456", Some("u1"), "m1", None, "sender-1").await;
        gate.force_reauth("u1").await.expect("force reauth");
        assert!(matches!(
            gate.check("111", "anything", Some("u1"), "m2", None, "sender-1").await,
            GateResult::Challenge { .. }
        ));
    }
}
