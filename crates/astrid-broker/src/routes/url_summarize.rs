//! `POST /v1/url-summarize` (spec §4.K): fetch-guard-validated URL,
//! dispatched to the configured summarizer backend.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;

use crate::fetch_guard;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct UrlSummarizeRequest {
    pub url: String,
}

pub async fn handler(State(state): State<AppState>, Json(req): Json<UrlSummarizeRequest>) -> Response {
    if let Err(err) = fetch_guard::validate_url(&req.url).await {
        return (StatusCode::FORBIDDEN, err.to_string()).into_response();
    }

    let Some(summarizer) = &state.summarizer else {
        return (StatusCode::NOT_IMPLEMENTED, "no summarizer configured").into_response();
    };

    match summarizer.summarize(&req.url).await {
        Ok(summary) => Json(serde_json::json!({ "summary": summary })).into_response(),
        Err(err) => (StatusCode::BAD_GATEWAY, err.to_string()).into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::app_state;

    #[tokio::test]
    async fn private_address_is_rejected_before_dispatch() {
        let state = app_state().await;
        let response = handler(
            State(state),
            Json(UrlSummarizeRequest { url: "http://169.254.169.254/latest/meta-data".to_string() }),
        )
        .await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn no_summarizer_configured_returns_not_implemented() {
        let state = app_state().await;
        let response = handler(State(state), Json(UrlSummarizeRequest { url: "http://93.184.216.34/".to_string() })).await;
        assert_eq!(response.status(), StatusCode::NOT_IMPLEMENTED);
    }
}
