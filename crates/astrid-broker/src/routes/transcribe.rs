//! `POST /v1/transcribe` (spec §4.K): audio bytes plus content-type.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use base64::Engine;
use serde::Deserialize;

use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct TranscribeRequest {
    /// Base64-encoded audio bytes (the broker never accepts raw binary
    /// POST bodies — every endpoint requires `application/json`).
    pub audio_base64: String,
    pub content_type: String,
}

pub async fn handler(State(state): State<AppState>, Json(req): Json<TranscribeRequest>) -> Response {
    let Ok(audio) = base64::engine::general_purpose::STANDARD.decode(&req.audio_base64) else {
        return (StatusCode::BAD_REQUEST, "audio_base64 is not valid base64").into_response();
    };

    let Some(provider) = &state.transcription else {
        return (StatusCode::NOT_IMPLEMENTED, "no transcription provider configured").into_response();
    };

    match provider.transcribe(&audio, &req.content_type).await {
        Ok(text) => Json(serde_json::json!({ "text": text })).into_response(),
        Err(err) => (StatusCode::BAD_GATEWAY, err.to_string()).into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::app_state;

    #[tokio::test]
    async fn invalid_base64_is_rejected() {
        let state = app_state().await;
        let response = handler(
            State(state),
            Json(TranscribeRequest {
                audio_base64: "not base64!!".to_string(),
                content_type: "audio/wav".to_string(),
            }),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn no_provider_configured_returns_not_implemented() {
        let state = app_state().await;
        let encoded = base64::engine::general_purpose::STANDARD.encode(b"fake-audio");
        let response = handler(
            State(state),
            Json(TranscribeRequest {
                audio_base64: encoded,
                content_type: "audio/wav".to_string(),
            }),
        )
        .await;
        assert_eq!(response.status(), StatusCode::NOT_IMPLEMENTED);
    }
}
