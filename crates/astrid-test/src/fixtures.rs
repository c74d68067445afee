//! Fixtures for common kernel types.

use astrid_core::Scope;
use astrid_mediator::{InboundMessage, KernelToolAuthorizer};
use astrid_storage::Database;
use astrid_tools::{GuardConfig, ToolGuard};

/// Build an [`InboundMessage`] with sane defaults, overriding only the
/// fields a test actually cares about.
#[must_use]
pub fn test_inbound_message(chat_id: &str, body: &str) -> InboundMessage {
    InboundMessage {
        chat_id: chat_id.to_owned(),
        sender: format!("user-{chat_id}"),
        recipient: "astrid".to_owned(),
        message_id: "1".to_owned(),
        pool_key: "telegram:social".to_owned(),
        scope: Scope::Telegram,
        body: body.to_owned(),
        media_ref: None,
    }
}

/// [`test_inbound_message`], with an explicit [`Scope`].
#[must_use]
pub fn test_inbound_message_with_scope(chat_id: &str, body: &str, scope: Scope) -> InboundMessage {
    InboundMessage { scope, ..test_inbound_message(chat_id, body) }
}

/// An in-memory database for tests, isolated per call (spec modules never
/// share state across `connect_memory` instances).
///
/// # Panics
///
/// Panics if the embedded engine fails to initialize, which should never
/// happen for an in-memory connection.
pub async fn memory_db() -> Database {
    Database::connect_memory().await.expect("in-memory database connects")
}

/// A [`KernelToolAuthorizer`] over the default [`GuardConfig`], for tests
/// that need an `AgentDispatchRequest` but don't exercise the Tool Guard.
#[must_use]
pub fn allow_all_authorizer() -> KernelToolAuthorizer {
    KernelToolAuthorizer::new(ToolGuard::new(GuardConfig::default()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inbound_message_defaults() {
        let msg = test_inbound_message("123", "hello");
        assert_eq!(msg.chat_id, "123");
        assert_eq!(msg.body, "hello");
        assert_eq!(msg.scope, Scope::Telegram);
        assert!(msg.media_ref.is_none());
    }

    #[test]
    fn inbound_message_scope_override() {
        let msg = test_inbound_message_with_scope("123", "hi", Scope::Moltbook);
        assert_eq!(msg.scope, Scope::Moltbook);
    }

    #[tokio::test]
    async fn memory_db_connects() {
        let _db = memory_db().await;
    }
}
