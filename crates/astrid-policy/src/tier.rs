//! `getUserPermissionTier` (spec §4.F).

use std::collections::HashMap;

use astrid_core::Tier;
use tracing::error;

/// Configured tier assignments, resolved in order: identity-linked local
/// user permission, then raw chat id, then `default_tier`.
#[derive(Debug, Clone)]
pub struct PermissionConfig {
    /// Chat ids linked to an `admin` local user; always resolve to
    /// `FullAccess`.
    pub admin_chat_ids: Vec<String>,
    /// Explicit per-linked-user tier assignments.
    pub linked_user_tiers: HashMap<String, Tier>,
    /// Explicit per-raw-chat-id tier assignments (unlinked chats).
    pub raw_chat_tiers: HashMap<String, Tier>,
    /// Tier assigned when nothing else matches.
    pub default_tier: Tier,
}

impl Default for PermissionConfig {
    fn default() -> Self {
        Self {
            admin_chat_ids: Vec::new(),
            linked_user_tiers: HashMap::new(),
            raw_chat_tiers: HashMap::new(),
            default_tier: Tier::ReadOnly,
        }
    }
}

/// Resolve the tier for `chat_id`, optionally linked to `linked_user_id`.
///
/// If the resolved tier is `FullAccess` but `sandbox_initialized` is
/// `false`, the engine degrades to `WriteLocal` and logs an error — the
/// OS sandbox is a hard precondition for unrestricted local access.
#[must_use]
pub fn get_user_permission_tier(
    chat_id: &str,
    linked_user_id: Option<&str>,
    config: &PermissionConfig,
    sandbox_initialized: bool,
) -> Tier {
    let resolved = if config.admin_chat_ids.iter().any(|id| id == chat_id) {
        Tier::FullAccess
    } else if let Some(uid) = linked_user_id {
        config
            .linked_user_tiers
            .get(uid)
            .copied()
            .unwrap_or(config.default_tier)
    } else if let Some(tier) = config.raw_chat_tiers.get(chat_id) {
        *tier
    } else {
        config.default_tier
    };

    if resolved == Tier::FullAccess && !sandbox_initialized {
        error!(chat_id, "full_access tier requested but OS sandbox is not initialized; degrading to write_local");
        return Tier::WriteLocal;
    }
    resolved
}
