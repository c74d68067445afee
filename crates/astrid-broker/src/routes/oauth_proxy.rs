//! `POST /v1/oauth-proxy` (spec §4.K): proxy a call to a known OAuth
//! provider's base URL, fetch-guarded and streamed to disk with a
//! running size check capped at `max_oauth_download_bytes`.

use std::path::PathBuf;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use tokio::io::AsyncWriteExt;

use crate::fetch_guard;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct OauthProxyRequest {
    pub provider_id: String,
    pub url: String,
    pub dest_path: String,
}

pub async fn handler(State(state): State<AppState>, Json(req): Json<OauthProxyRequest>) -> Response {
    if !state.config.known_oauth_providers.iter().any(|id| id == &req.provider_id) {
        return (StatusCode::FORBIDDEN, "unknown oauth provider id").into_response();
    }

    if let Err(err) = fetch_guard::validate_url(&req.url).await {
        return (StatusCode::FORBIDDEN, err.to_string()).into_response();
    }

    let client = reqwest::Client::builder().redirect(reqwest::redirect::Policy::none()).build();
    let client = match client {
        Ok(client) => client,
        Err(err) => return (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response(),
    };

    let mut url = req.url.clone();
    let mut response = loop {
        let resp = match client.get(&url).send().await {
            Ok(resp) => resp,
            Err(err) => return (StatusCode::BAD_GATEWAY, err.to_string()).into_response(),
        };
        if resp.status().is_redirection() {
            let Some(location) = resp.headers().get(reqwest::header::LOCATION).and_then(|v| v.to_str().ok()) else {
                return (StatusCode::BAD_GATEWAY, "redirect with no location header").into_response();
            };
            if let Err(err) = fetch_guard::validate_redirect(location).await {
                return (StatusCode::FORBIDDEN, err.to_string()).into_response();
            }
            url = location.to_string();
            continue;
        }
        break resp;
    };

    if !response.status().is_success() {
        return (StatusCode::BAD_GATEWAY, format!("upstream returned {}", response.status())).into_response();
    }

    let dest = PathBuf::from(&req.dest_path);
    let mut file = match tokio::fs::File::create(&dest).await {
        Ok(file) => file,
        Err(err) => return (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response(),
    };

    let cap = state.config.max_oauth_download_bytes;
    let mut written: u64 = 0;
    while let Some(chunk) = response.chunk().await.transpose() {
        let chunk = match chunk {
            Ok(chunk) => chunk,
            Err(err) => return (StatusCode::BAD_GATEWAY, err.to_string()).into_response(),
        };
        written += chunk.len() as u64;
        if written > cap {
            let _ = tokio::fs::remove_file(&dest).await;
            return (StatusCode::PAYLOAD_TOO_LARGE, "oauth download exceeded size cap").into_response();
        }
        if let Err(err) = file.write_all(&chunk).await {
            return (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response();
        }
    }

    Json(serde_json::json!({ "bytes_written": written })).into_response()
}
