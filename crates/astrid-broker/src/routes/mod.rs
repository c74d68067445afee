//! Capability endpoints (spec §4.K).

mod fetch_attachment;
mod image_generate;
mod memory;
mod oauth_proxy;
mod transcribe;
mod tts_speak;
mod url_summarize;

use axum::Router;
use axum::routing::post;

use crate::state::AppState;

/// Build the full endpoint set, with the middleware stack applied by the
/// caller (see [`crate::build_router`]).
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/image-generate", post(image_generate::handler))
        .route("/v1/tts-speak", post(tts_speak::handler))
        .route("/v1/transcribe", post(transcribe::handler))
        .route("/v1/fetch-attachment", post(fetch_attachment::handler))
        .route("/v1/memory-snapshot", post(memory::snapshot))
        .route("/v1/memory-propose", post(memory::propose))
        .route("/v1/memory-quarantine", post(memory::quarantine))
        .route("/v1/oauth-proxy", post(oauth_proxy::handler))
        .route("/v1/url-summarize", post(url_summarize::handler))
}
