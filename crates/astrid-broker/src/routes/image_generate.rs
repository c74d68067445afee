//! `POST /v1/image-generate` (spec §4.K): prompt ≤ 8000 chars.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;

use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ImageGenerateRequest {
    pub prompt: String,
}

pub async fn handler(State(state): State<AppState>, Json(req): Json<ImageGenerateRequest>) -> Response {
    if req.prompt.chars().count() > state.config.max_prompt_chars {
        return (StatusCode::BAD_REQUEST, "prompt exceeds maximum length").into_response();
    }

    let Some(provider) = &state.image else {
        return (StatusCode::NOT_IMPLEMENTED, "no image provider configured").into_response();
    };

    match provider.generate(&req.prompt).await {
        Ok((bytes, content_type)) => ([(axum::http::header::CONTENT_TYPE, content_type)], bytes).into_response(),
        Err(err) => (StatusCode::BAD_GATEWAY, err.to_string()).into_response(),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;

    use super::*;
    use crate::providers::{ImageProvider, ProviderError};
    use crate::test_support::app_state;

    struct FakeImageProvider;

    #[async_trait]
    impl ImageProvider for FakeImageProvider {
        async fn generate(&self, _prompt: &str) -> Result<(Vec<u8>, String), ProviderError> {
            Ok((vec![1, 2, 3], "image/png".to_string()))
        }
    }

    #[tokio::test]
    async fn prompt_over_limit_is_rejected() {
        let state = app_state().await;
        let prompt = "x".repeat(state.config.max_prompt_chars + 1);
        let response = handler(State(state), Json(ImageGenerateRequest { prompt })).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn no_provider_configured_returns_not_implemented() {
        let state = app_state().await;
        let response = handler(
            State(state),
            Json(ImageGenerateRequest { prompt: "a cat".to_string() }),
        )
        .await;
        assert_eq!(response.status(), StatusCode::NOT_IMPLEMENTED);
    }

    #[tokio::test]
    async fn configured_provider_returns_image_bytes() {
        let state = app_state().await.with_image(Arc::new(FakeImageProvider));
        let response = handler(
            State(state),
            Json(ImageGenerateRequest { prompt: "a cat".to_string() }),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
    }
}
