//! Error types for the Telegram adapter.

use thiserror::Error;

/// Errors produced by the Telegram adapter itself, distinct from
/// [`astrid_core::KernelError`] which the Mediator pipeline returns.
#[derive(Debug, Error)]
pub enum TelegramBotError {
    /// The Telegram Bot API rejected a call (send message, set commands, ...).
    #[error("telegram API error: {0}")]
    Telegram(String),

    /// Configuration was missing or malformed at startup.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Convenience alias.
pub type TelegramResult<T> = Result<T, TelegramBotError>;

/// Render a [`astrid_core::KernelError`] for display in a chat reply.
///
/// Every variant's `Display` text is already short and safe to show a user
/// (spec §7) except [`astrid_core::KernelError::Internal`], whose `Display`
/// impl itself already collapses to the generic `"internal error"` string
/// rather than the wrapped detail — so this is a direct pass-through, kept
/// as its own function so call sites never format a `KernelError` any
/// other way.
#[must_use]
pub fn user_facing_message(err: &astrid_core::KernelError) -> String {
    err.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use astrid_core::KernelError;

    #[test]
    fn error_display_telegram() {
        let err = TelegramBotError::Telegram("rate limited".to_string());
        assert_eq!(err.to_string(), "telegram API error: rate limited");
    }

    #[test]
    fn error_display_config() {
        let err = TelegramBotError::Config("missing token".to_string());
        assert_eq!(err.to_string(), "configuration error: missing token");
    }

    #[test]
    fn error_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<TelegramBotError>();
    }

    #[test]
    fn internal_error_never_leaks_detail() {
        let err = KernelError::Internal("db connection string leaked".to_string());
        assert_eq!(user_facing_message(&err), "internal error");
    }

    #[test]
    fn policy_blocked_message_passes_through() {
        let err = KernelError::PolicyBlocked("infra secret".to_string());
        assert_eq!(user_facing_message(&err), "policy blocked: infra secret");
    }
}
