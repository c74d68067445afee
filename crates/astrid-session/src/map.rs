//! `(thread_key, pool_key) → session_id` map with atomic turn serialization
//! (spec §4.J).
//!
//! Pool key segregates conversations by purpose (e.g. `<service>:social`,
//! `<service>:proactive`) so untrusted content in one pool can never be
//! mistaken for a trusted turn in another, even for the same thread.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use astrid_core::{SessionId, Timestamp};
use tokio::sync::RwLock;

/// Identifies one conversation: a channel-native thread plus the pool it
/// was dispatched through.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionKey {
    /// Channel-native thread/chat identifier.
    pub thread_key: String,
    /// Pool key, e.g. `telegram:social`, `telegram:proactive`.
    pub pool_key: String,
}

impl SessionKey {
    /// Build a key from its two components.
    #[must_use]
    pub fn new(thread_key: impl Into<String>, pool_key: impl Into<String>) -> Self {
        Self {
            thread_key: thread_key.into(),
            pool_key: pool_key.into(),
        }
    }
}

struct SessionRow {
    session_id: SessionId,
    turn_in_progress: bool,
    last_active: Timestamp,
}

/// Result of attempting to start a turn for a session.
#[derive(Debug)]
pub enum TurnStartResult {
    /// Turn started successfully; contains the session ID.
    Started(SessionId),
    /// A turn is already in progress (or a session is being created).
    TurnBusy,
    /// No session exists for this key.
    NoSession,
}

struct Inner {
    sessions: HashMap<SessionKey, SessionRow>,
    creating: HashSet<SessionKey>,
}

/// Session map keyed by `(thread_key, pool_key)`.
#[derive(Clone)]
pub struct SessionMap {
    inner: Arc<RwLock<Inner>>,
}

impl Default for SessionMap {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionMap {
    /// Create an empty session map.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(Inner {
                sessions: HashMap::new(),
                creating: HashSet::new(),
            })),
        }
    }

    /// `get` (spec §4.J): the session id for `key`, if one exists.
    pub async fn get(&self, key: &SessionKey) -> Option<SessionId> {
        self.inner.read().await.sessions.get(key).map(|s| s.session_id.clone())
    }

    /// `upsert` (spec §4.J): insert or overwrite `key`'s session, clearing
    /// its turn lock and any pending creation claim.
    pub async fn upsert(&self, key: SessionKey, session_id: SessionId) {
        let mut guard = self.inner.write().await;
        guard.creating.remove(&key);
        guard.sessions.insert(
            key,
            SessionRow {
                session_id,
                turn_in_progress: false,
                last_active: Timestamp::now(),
            },
        );
    }

    /// `reset` (spec §4.J): remove `key`'s session, returning it if present.
    pub async fn reset(&self, key: &SessionKey) -> Option<SessionId> {
        let mut guard = self.inner.write().await;
        guard.creating.remove(key);
        guard.sessions.remove(key).map(|s| s.session_id)
    }

    /// `listActive(within: duration)` (spec §4.J): keys whose session was
    /// last active within the last `within_millis` milliseconds.
    pub async fn list_active(&self, within_millis: i64) -> Vec<SessionKey> {
        let cutoff = Timestamp::now().into_millis() - within_millis;
        self.inner
            .read()
            .await
            .sessions
            .iter()
            .filter(|(_, row)| row.last_active.into_millis() >= cutoff)
            .map(|(key, _)| key.clone())
            .collect()
    }

    /// Atomically check if a session exists and start a turn, touching
    /// `last_active`.
    pub async fn try_start_existing_turn(&self, key: &SessionKey) -> TurnStartResult {
        let mut guard = self.inner.write().await;
        if guard.creating.contains(key) {
            return TurnStartResult::TurnBusy;
        }
        match guard.sessions.get_mut(key) {
            Some(row) if row.turn_in_progress => TurnStartResult::TurnBusy,
            Some(row) => {
                row.turn_in_progress = true;
                row.last_active = Timestamp::now();
                TurnStartResult::Started(row.session_id.clone())
            }
            None => TurnStartResult::NoSession,
        }
    }

    /// Atomically claim the right to create a session for `key`.
    pub async fn try_claim_creation(&self, key: SessionKey) -> bool {
        let mut guard = self.inner.write().await;
        if guard.sessions.contains_key(&key) || guard.creating.contains(&key) {
            false
        } else {
            guard.creating.insert(key);
            true
        }
    }

    /// Complete session creation: insert the session and clear the
    /// creation lock.
    pub async fn finish_creation(&self, key: SessionKey, session_id: SessionId) {
        self.upsert(key, session_id).await;
    }

    /// Cancel session creation (on failure) and clear the creation lock.
    pub async fn cancel_creation(&self, key: &SessionKey) {
        self.inner.write().await.creating.remove(key);
    }

    /// Mark a turn as finished (or in-progress) for `key`.
    pub async fn set_turn_in_progress(&self, key: &SessionKey, in_progress: bool) {
        if let Some(row) = self.inner.write().await.sessions.get_mut(key) {
            row.turn_in_progress = in_progress;
        }
    }

    /// Check if a turn is currently in progress for `key`.
    pub async fn is_turn_in_progress(&self, key: &SessionKey) -> bool {
        self.inner.read().await.sessions.get(key).is_some_and(|s| s.turn_in_progress)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(thread: &str) -> SessionKey {
        SessionKey::new(thread, "telegram:operator-query")
    }

    #[tokio::test]
    async fn empty_map_returns_none() {
        let map = SessionMap::new();
        assert!(map.get(&key("1")).await.is_none());
    }

    #[tokio::test]
    async fn upsert_and_get() {
        let map = SessionMap::new();
        let sid = SessionId::new();
        map.upsert(key("1"), sid.clone()).await;
        assert_eq!(map.get(&key("1")).await, Some(sid));
    }

    #[tokio::test]
    async fn reset_returns_session_and_clears() {
        let map = SessionMap::new();
        let sid = SessionId::new();
        map.upsert(key("1"), sid.clone()).await;
        assert_eq!(map.reset(&key("1")).await, Some(sid));
        assert!(map.get(&key("1")).await.is_none());
    }

    #[tokio::test]
    async fn same_thread_different_pool_is_a_different_session() {
        let map = SessionMap::new();
        let social_key = SessionKey::new("1", "telegram:social");
        let trusted_key = SessionKey::new("1", "telegram:proactive");
        let sid1 = SessionId::new();
        let sid2 = SessionId::new();
        map.upsert(social_key.clone(), sid1.clone()).await;
        map.upsert(trusted_key.clone(), sid2.clone()).await;

        assert_eq!(map.get(&social_key).await, Some(sid1));
        assert_eq!(map.get(&trusted_key).await, Some(sid2));
    }

    #[tokio::test]
    async fn list_active_excludes_stale_sessions() {
        let map = SessionMap::new();
        map.upsert(key("1"), SessionId::new()).await;
        let active = map.list_active(60_000).await;
        assert_eq!(active, vec![key("1")]);

        let none = map.list_active(-1).await;
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn try_start_turn_atomic_one_winner() {
        let map = SessionMap::new();
        map.upsert(key("1"), SessionId::new()).await;

        let mut handles = Vec::new();
        for _ in 0..10 {
            let m = map.clone();
            let k = key("1");
            handles.push(tokio::spawn(async move {
                matches!(m.try_start_existing_turn(&k).await, TurnStartResult::Started(_))
            }));
        }
        let results: Vec<bool> = futures::future::join_all(handles)
            .await
            .into_iter()
            .filter_map(Result::ok)
            .collect();
        assert_eq!(results.iter().filter(|&&v| v).count(), 1);
    }

    #[tokio::test]
    async fn creating_blocks_existing_turn_start() {
        let map = SessionMap::new();
        assert!(map.try_claim_creation(key("1")).await);
        assert!(matches!(
            map.try_start_existing_turn(&key("1")).await,
            TurnStartResult::TurnBusy
        ));
    }

    #[tokio::test]
    async fn cancel_creation_allows_reclaim() {
        let map = SessionMap::new();
        assert!(map.try_claim_creation(key("1")).await);
        map.cancel_creation(&key("1")).await;
        assert!(map.try_claim_creation(key("1")).await);
    }
}
