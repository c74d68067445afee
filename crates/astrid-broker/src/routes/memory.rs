//! `POST /v1/memory-snapshot|propose|quarantine` (spec §4.K): scope-
//! restricted access to the `memory_entry` table — `quarantine` is
//! forbidden from `moltbook` scope.

use astrid_core::Scope;
use astrid_storage::tables::{GenericTable, Table, names};
use axum::Json;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use crate::auth_ext;
use crate::state::AppState;

/// A single memory record, keyed by `id` in the `memory_entry` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryEntry {
    pub id: String,
    pub content: String,
    pub status: MemoryStatus,
}

/// Lifecycle state of a [`MemoryEntry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryStatus {
    Proposed,
    Confirmed,
    Quarantined,
}

fn table(state: &AppState) -> GenericTable {
    GenericTable::new(state.db.clone(), names::MEMORY_ENTRY)
}

#[derive(Debug, Deserialize)]
pub struct SnapshotRequest {
    pub id: String,
}

pub async fn snapshot(State(state): State<AppState>, Json(req): Json<SnapshotRequest>) -> Response {
    match Table::<MemoryEntry>::get(&table(&state), &req.id).await {
        Ok(Some(entry)) => Json(entry).into_response(),
        Ok(None) => (StatusCode::NOT_FOUND, "no memory entry at that id").into_response(),
        Err(err) => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response(),
    }
}

#[derive(Debug, Deserialize)]
pub struct ProposeRequest {
    pub id: String,
    pub content: String,
}

pub async fn propose(State(state): State<AppState>, Json(req): Json<ProposeRequest>) -> Response {
    let entry = MemoryEntry {
        id: req.id.clone(),
        content: req.content,
        status: MemoryStatus::Proposed,
    };
    match Table::upsert(&table(&state), &req.id, &entry).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response(),
    }
}

#[derive(Debug, Deserialize)]
pub struct QuarantineRequest {
    pub id: String,
}

pub async fn quarantine(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<QuarantineRequest>,
) -> Response {
    let Some(auth_headers) = auth_ext::extract(&headers) else {
        return (StatusCode::UNAUTHORIZED, "missing internal-auth headers").into_response();
    };
    if auth_headers.scope == Scope::Moltbook {
        return (StatusCode::FORBIDDEN, "quarantine is not permitted from moltbook scope").into_response();
    }

    let table = table(&state);
    let existing: Option<MemoryEntry> = match Table::get(&table, &req.id).await {
        Ok(existing) => existing,
        Err(err) => return (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response(),
    };
    let Some(mut entry) = existing else {
        return (StatusCode::NOT_FOUND, "no memory entry at that id").into_response();
    };
    entry.status = MemoryStatus::Quarantined;
    match Table::upsert(&table, &req.id, &entry).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::app_state;

    #[tokio::test]
    async fn propose_then_snapshot_round_trips() {
        let state = app_state().await;
        let response = propose(
            State(state.clone()),
            Json(ProposeRequest { id: "m1".to_string(), content: "likes tea".to_string() }),
        )
        .await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let response = snapshot(State(state), Json(SnapshotRequest { id: "m1".to_string() })).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn snapshot_missing_entry_is_not_found() {
        let state = app_state().await;
        let response = snapshot(State(state), Json(SnapshotRequest { id: "nope".to_string() })).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn quarantine_from_moltbook_scope_is_forbidden() {
        let state = app_state().await;
        propose(
            State(state.clone()),
            Json(ProposeRequest { id: "m2".to_string(), content: "secret".to_string() }),
        )
        .await;

        let mut headers = HeaderMap::new();
        headers.insert("x-telclaude-timestamp", "1000".parse().unwrap());
        headers.insert("x-telclaude-nonce", "n1".parse().unwrap());
        headers.insert("x-telclaude-scope", "moltbook".parse().unwrap());
        headers.insert("x-telclaude-signature", "abcd".parse().unwrap());

        let response = quarantine(State(state), headers, Json(QuarantineRequest { id: "m2".to_string() })).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn quarantine_from_other_scope_succeeds() {
        let state = app_state().await;
        propose(
            State(state.clone()),
            Json(ProposeRequest { id: "m3".to_string(), content: "secret".to_string() }),
        )
        .await;

        let mut headers = HeaderMap::new();
        headers.insert("x-telclaude-timestamp", "1000".parse().unwrap());
        headers.insert("x-telclaude-nonce", "n1".parse().unwrap());
        headers.insert("x-telclaude-scope", "relay".parse().unwrap());
        headers.insert("x-telclaude-signature", "abcd".parse().unwrap());

        let response = quarantine(State(state), headers, Json(QuarantineRequest { id: "m3".to_string() })).await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }
}
