//! Nonce replay cache.
//!
//! A nonce is accepted at most once within the skew window; after that its
//! age alone makes a replay impossible to mistake for a fresh request, so
//! old entries are pruned opportunistically rather than kept forever.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use astrid_core::Scope;
use astrid_storage::Database;
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize)]
struct NonceRow {
    seen_at: i64,
}

enum Backend {
    InMemory(Arc<Mutex<HashMap<(Scope, String), i64>>>),
    Store(Database),
}

/// Tracks nonces seen per scope within the auth skew window.
pub struct NonceCache {
    backend: Backend,
    ttl_millis: i64,
}

impl NonceCache {
    /// An in-memory cache, suitable for a single-process broker or tests.
    #[must_use]
    pub fn in_memory(ttl_millis: i64) -> Self {
        Self {
            backend: Backend::InMemory(Arc::new(Mutex::new(HashMap::new()))),
            ttl_millis,
        }
    }

    /// A Store-backed cache shared across processes.
    #[must_use]
    pub fn backed_by(db: Database, ttl_millis: i64) -> Self {
        Self {
            backend: Backend::Store(db),
            ttl_millis,
        }
    }

    /// Returns `true` and records `nonce` if it has not been seen for
    /// `scope` within the TTL window; returns `false` (replay) otherwise.
    pub async fn check_and_record(&self, scope: Scope, nonce: &str, timestamp: i64) -> bool {
        match &self.backend {
            Backend::InMemory(map) => {
                let now = astrid_core::Timestamp::now().into_millis();
                #[allow(clippy::unwrap_used)]
                let mut guard = map.lock().unwrap();
                guard.retain(|_, seen_at| now - *seen_at < self.ttl_millis);
                let key = (scope, nonce.to_string());
                if guard.contains_key(&key) {
                    false
                } else {
                    guard.insert(key, timestamp);
                    true
                }
            }
            Backend::Store(db) => {
                let id = format!("{scope}:{nonce}");
                let created: surrealdb::Result<Option<NonceRow>> = db
                    .client()
                    .create(("auth_nonce", id.as_str()))
                    .content(NonceRow { seen_at: timestamp })
                    .await;
                created.is_ok()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn first_sighting_is_accepted() {
        let cache = NonceCache::in_memory(5_000);
        assert!(cache.check_and_record(Scope::Relay, "n1", 1).await);
    }

    #[tokio::test]
    async fn second_sighting_is_rejected() {
        let cache = NonceCache::in_memory(5_000);
        assert!(cache.check_and_record(Scope::Relay, "n1", 1).await);
        assert!(!cache.check_and_record(Scope::Relay, "n1", 1).await);
    }

    #[tokio::test]
    async fn same_nonce_different_scope_is_independent() {
        let cache = NonceCache::in_memory(5_000);
        assert!(cache.check_and_record(Scope::Relay, "n1", 1).await);
        assert!(cache.check_and_record(Scope::Agent, "n1", 1).await);
    }
}
