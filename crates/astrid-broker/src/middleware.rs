//! Broker middleware stack (spec §4.K): every POST endpoint requires
//! `application/json`, rejects oversized bodies, caps global concurrency,
//! and verifies the internal-auth header set before the handler runs.

use axum::body::{Body, Bytes};
use axum::extract::{Request, State};
use axum::http::{StatusCode, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::auth_ext;
use crate::state::AppState;

/// Rejects requests whose `Content-Type` is not `application/json`.
pub async fn require_json(request: Request, next: Next) -> Response {
    let is_json = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("application/json"));

    if is_json {
        next.run(request).await
    } else {
        (StatusCode::UNSUPPORTED_MEDIA_TYPE, "expected application/json").into_response()
    }
}

/// Caps global in-flight requests at `state.config.max_concurrency`,
/// responding `429` beyond it rather than queuing.
pub async fn limit_concurrency(State(state): State<AppState>, request: Request, next: Next) -> Response {
    match state.concurrency.clone().try_acquire_owned() {
        Ok(_permit) => next.run(request).await,
        Err(_) => (StatusCode::TOO_MANY_REQUESTS, "broker at capacity").into_response(),
    }
}

/// Buffers the body (rejecting it past `max_body_bytes`), verifies the
/// internal-auth header set against it, and puts the body back on the
/// request for the handler.
pub async fn verify_auth(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let (parts, body) = request.into_parts();

    let Some(auth_headers) = auth_ext::extract(&parts.headers) else {
        return (StatusCode::UNAUTHORIZED, "missing internal-auth headers").into_response();
    };

    let limit = state.config.max_body_bytes;
    let bytes = match axum::body::to_bytes(body, limit).await {
        Ok(bytes) => bytes,
        Err(_) => return (StatusCode::PAYLOAD_TOO_LARGE, "request body too large").into_response(),
    };

    if let Err(err) = state
        .auth
        .verify(parts.method.as_str(), parts.uri.path(), &bytes, &auth_headers)
        .await
    {
        return (StatusCode::UNAUTHORIZED, err.to_string()).into_response();
    }

    let request = Request::from_parts(parts, Body::from(bytes));
    next.run(request).await
}

/// Rate-limits on the caller's internal-auth scope (spec §4.K: "on
/// `userId`, or a stable synthetic id per scope" — the broker's callers
/// are always internal peers identified by scope, never end users
/// directly).
pub async fn rate_limit(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let Some(auth_headers) = auth_ext::extract(request.headers()) else {
        return (StatusCode::UNAUTHORIZED, "missing internal-auth headers").into_response();
    };
    let key = auth_headers.scope.to_string();

    let quota = astrid_ratelimit::Quota::new(120, 2_000);
    match state.limiter.consume("broker", &key, quota).await {
        Ok(astrid_ratelimit::LimitDecision::Allowed) => next.run(request).await,
        Ok(astrid_ratelimit::LimitDecision::Denied { reason }) => {
            (StatusCode::TOO_MANY_REQUESTS, reason).into_response()
        }
        Err(err) => {
            tracing::warn!(%err, "rate limiter storage error, failing closed");
            (StatusCode::SERVICE_UNAVAILABLE, "rate limiter unavailable").into_response()
        }
    }
}

/// Helper for handlers needing the raw body bytes again after
/// [`verify_auth`] reinserted them (used by handlers that parse JSON
/// manually rather than through an extractor).
pub async fn read_body(body: Body, limit: usize) -> Result<Bytes, Response> {
    axum::body::to_bytes(body, limit)
        .await
        .map_err(|_| (StatusCode::PAYLOAD_TOO_LARGE, "request body too large").into_response())
}
