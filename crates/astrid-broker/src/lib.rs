//! Capability Broker (spec §4.K): the only component that talks to paid
//! external APIs or touches the filesystem on the agent's behalf. The
//! agent process talks only to this broker's HTTP surface, bound to
//! loopback in native mode and to all interfaces only inside a container
//! (the container boundary is the isolation, not the bind address).

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

mod auth_ext;
mod config;
mod fetch_guard;
mod media;
mod middleware;
mod providers;
mod routes;
mod state;
mod test_support;

use axum::Router;
use axum::middleware as axum_middleware;

pub use config::BrokerConfig;
pub use fetch_guard::{FetchGuardError, is_blocked_address, validate_redirect, validate_url};
pub use media::{MediaPathError, resolve_media_path};
pub use providers::{ImageProvider, ProviderError, TranscriptionProvider, TtsProvider, UrlSummarizer};
pub use state::AppState;

/// Wire the full middleware stack onto the capability endpoints. Order
/// matters: JSON content-type, then concurrency, then auth (which
/// buffers the body), then rate limiting (which reads the now-verified
/// auth headers).
#[must_use]
pub fn build_router(state: AppState) -> Router {
    routes::router()
        .route_layer(axum_middleware::from_fn_with_state(state.clone(), middleware::rate_limit))
        .route_layer(axum_middleware::from_fn_with_state(state.clone(), middleware::verify_auth))
        .route_layer(axum_middleware::from_fn_with_state(state.clone(), middleware::limit_concurrency))
        .route_layer(axum_middleware::from_fn(middleware::require_json))
        .with_state(state)
}

/// Bind and serve the broker until the process is terminated.
///
/// # Errors
///
/// Returns an I/O error if the configured address cannot be bound.
pub async fn serve(config: &BrokerConfig, state: AppState) -> std::io::Result<()> {
    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "capability broker listening");
    axum::serve(listener, build_router(state)).await
}
