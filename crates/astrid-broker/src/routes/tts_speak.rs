//! `POST /v1/tts-speak` (spec §4.K): tts text ≤ 4000 chars.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;

use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct TtsSpeakRequest {
    pub text: String,
}

pub async fn handler(State(state): State<AppState>, Json(req): Json<TtsSpeakRequest>) -> Response {
    if req.text.chars().count() > state.config.max_tts_chars {
        return (StatusCode::BAD_REQUEST, "text exceeds maximum length").into_response();
    }

    let Some(provider) = &state.tts else {
        return (StatusCode::NOT_IMPLEMENTED, "no tts provider configured").into_response();
    };

    match provider.speak(&req.text).await {
        Ok((bytes, content_type)) => ([(axum::http::header::CONTENT_TYPE, content_type)], bytes).into_response(),
        Err(err) => (StatusCode::BAD_GATEWAY, err.to_string()).into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::app_state;

    #[tokio::test]
    async fn text_over_limit_is_rejected() {
        let state = app_state().await;
        let text = "x".repeat(state.config.max_tts_chars + 1);
        let response = handler(State(state), Json(TtsSpeakRequest { text })).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn no_provider_configured_returns_not_implemented() {
        let state = app_state().await;
        let response = handler(State(state), Json(TtsSpeakRequest { text: "hi".to_string() })).await;
        assert_eq!(response.status(), StatusCode::NOT_IMPLEMENTED);
    }
}
