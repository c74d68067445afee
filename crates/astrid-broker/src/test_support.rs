//! Shared scaffolding for route unit tests.
#![cfg(test)]

use astrid_auth::{InternalAuth, NonceCache, registry_from_map};
use astrid_ratelimit::RateLimiter;
use astrid_storage::Database;

use crate::config::BrokerConfig;
use crate::state::AppState;

pub async fn app_state() -> AppState {
    let db = Database::connect_memory().await.expect("connect");
    let auth = InternalAuth::new(registry_from_map(std::collections::HashMap::new()), NonceCache::in_memory(300_000));
    let limiter = RateLimiter::new(db.clone());
    AppState::new(BrokerConfig::default(), auth, limiter, db)
}
