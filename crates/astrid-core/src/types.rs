//! Common value types shared across the kernel.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a conversation session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    /// Generate a new random session id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session:{}", self.0)
    }
}

/// Unique identifier correlating log lines produced while handling one
/// inbound message or tool call across every component it touches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(pub Uuid);

impl RequestId {
    /// Generate a new random request id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Milliseconds since the Unix epoch. Every row in the Store carries
/// timestamps in this form (spec §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(pub i64);

impl Timestamp {
    /// The current wall-clock time.
    #[must_use]
    pub fn now() -> Self {
        #[allow(clippy::unwrap_used)]
        let millis = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis();
        Self(i64::try_from(millis).unwrap_or(i64::MAX))
    }

    /// Construct from a raw millisecond value.
    #[must_use]
    pub fn from_millis(millis: i64) -> Self {
        Self(millis)
    }

    /// Add a duration, in milliseconds, returning a new timestamp.
    #[must_use]
    pub fn plus_millis(self, millis: i64) -> Self {
        Self(self.0.saturating_add(millis))
    }

    /// `true` if this timestamp is strictly before `now`.
    #[must_use]
    pub fn is_past(self) -> bool {
        self.0 < Self::now().0
    }

    /// Raw millisecond value.
    #[must_use]
    pub fn into_millis(self) -> i64 {
        self.0
    }
}

/// Permission tier assigned to a resolved user (spec §4.F).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    /// May read but never mutate local state or run commands.
    ReadOnly,
    /// May mutate local files and run a restricted command set.
    WriteLocal,
    /// Unrestricted local access; requires the OS sandbox to be initialized.
    FullAccess,
    /// Public-facing social-agent tier; sandboxed to the quarantine scope.
    Social,
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::ReadOnly => "read_only",
            Self::WriteLocal => "write_local",
            Self::FullAccess => "full_access",
            Self::Social => "social",
        };
        write!(f, "{s}")
    }
}

/// Trust zone of the caller (glossary: Scope). Determines sandbox roots,
/// tool allow-lists, and memory-source assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    /// Private chat surface.
    Telegram,
    /// Public-facing social agent.
    Social,
    /// Quarantine zone for untrusted/public social content.
    Moltbook,
    /// The sandboxed agent process itself.
    Agent,
    /// A relay peer signing with an asymmetric key the agent only verifies.
    Relay,
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Telegram => "telegram",
            Self::Social => "social",
            Self::Moltbook => "moltbook",
            Self::Agent => "agent",
            Self::Relay => "relay",
        };
        write!(f, "{s}")
    }
}

/// Outcome of a policy classification (spec §4.F).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    /// Safe to dispatch without human review.
    Allow,
    /// Suspicious; escalate to the LLM observer or require approval.
    Warn,
    /// Refuse unconditionally.
    Block,
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Allow => "allow",
            Self::Warn => "warn",
            Self::Block => "block",
        };
        write!(f, "{s}")
    }
}

/// Memory entry category (spec §3 Memory Entry).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryCategory {
    /// Durable facts about the operator/persona.
    Profile,
    /// Topics of interest surfaced for proactive engagement.
    Interests,
    /// Operational metadata not meant for the persona's voice.
    Meta,
    /// Saved conversation threads.
    Threads,
    /// Drafted or published social posts.
    Posts,
}

/// Origin channel of a memory entry, used to scope trust assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemorySource {
    /// Written via the private Telegram surface.
    Telegram,
    /// Written via the public social-agent surface.
    Social,
    /// Written via the quarantine/moltbook surface.
    Moltbook,
}

/// Trust level of a memory entry. Assigned by the writer's auth scope, never
/// accepted from client input (spec §3 invariant).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrustLevel {
    /// Verified, safe to surface to the public persona.
    Trusted,
    /// Unverified but not flagged.
    Untrusted,
    /// Flagged as unsafe; never surfaced to the public persona.
    Quarantined,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_id_new_is_unique() {
        assert_ne!(SessionId::new(), SessionId::new());
    }

    #[test]
    fn timestamp_plus_millis_saturates() {
        let t = Timestamp::from_millis(i64::MAX - 1);
        assert_eq!(t.plus_millis(10).0, i64::MAX);
    }

    #[test]
    fn timestamp_now_is_not_in_the_future() {
        let t = Timestamp::now();
        assert!(!Timestamp::from_millis(t.0 + 1_000).is_past());
    }

    #[test]
    fn tier_ordering_matches_privilege_escalation() {
        assert!(Tier::ReadOnly < Tier::WriteLocal);
        assert!(Tier::WriteLocal < Tier::FullAccess);
    }

    #[test]
    fn classification_display() {
        assert_eq!(Classification::Allow.to_string(), "allow");
        assert_eq!(Classification::Block.to_string(), "block");
    }

    #[test]
    fn scope_display() {
        assert_eq!(Scope::Moltbook.to_string(), "moltbook");
    }
}
