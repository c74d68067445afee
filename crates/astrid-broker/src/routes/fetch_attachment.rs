//! `POST /v1/fetch-attachment` (spec §4.K): media path ≤ 4096 chars,
//! resolved under the configured media roots.

use std::path::PathBuf;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;

use crate::media;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct FetchAttachmentRequest {
    pub path: String,
}

pub async fn handler(State(state): State<AppState>, Json(req): Json<FetchAttachmentRequest>) -> Response {
    if req.path.chars().count() > state.config.max_media_path_chars {
        return (StatusCode::BAD_REQUEST, "path exceeds maximum length").into_response();
    }

    let requested = PathBuf::from(&req.path);
    match media::resolve_media_path(&requested, &state.config.media_roots) {
        Ok(resolved) => match tokio::fs::read(&resolved).await {
            Ok(bytes) => bytes.into_response(),
            Err(err) => (StatusCode::NOT_FOUND, err.to_string()).into_response(),
        },
        Err(err) => (StatusCode::FORBIDDEN, err.to_string()).into_response(),
    }
}
