//! Kernel-wide error kinds (spec §7).
//!
//! Every component-boundary function returns a [`KernelResult`] rather than
//! panicking. Infra-secret block, policy block, and sensitive-path denial
//! are non-recoverable refusals; `TotpDaemonUnavailable` with an active
//! identity link is fail-closed; `ContextOverflow` triggers exactly one
//! session reset and retry. None of these variants carry request bodies or
//! matched secret bytes — only a short, user-safe reason.

use thiserror::Error;

/// Kernel-wide error kind.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum KernelError {
    /// Internal-auth header verification failed.
    #[error("auth failure: {0}")]
    AuthFailure(String),

    /// A rate limiter denied the request.
    #[error("rate limited: {0}")]
    RateLimited(String),

    /// The policy engine classified the input as `Block`.
    #[error("policy blocked: {0}")]
    PolicyBlocked(String),

    /// The request requires a one-shot approval before it can proceed.
    #[error("approval required")]
    ApprovalRequired,

    /// The approval nonce's TTL elapsed before it was consumed.
    #[error("approval expired")]
    ApprovalExpired,

    /// The approval nonce was already consumed once.
    #[error("approval already consumed")]
    ApprovalAlreadyConsumed,

    /// The approval nonce was consumed from a different chat than it was
    /// issued for.
    #[error("approval issued for a different chat")]
    ApprovalWrongChat,

    /// The TOTP daemon could not be reached.
    #[error("TOTP daemon unavailable")]
    TotpDaemonUnavailable,

    /// The supplied TOTP code did not verify.
    #[error("invalid TOTP code")]
    InvalidTotpCode,

    /// The named circuit breaker is open.
    #[error("circuit open: {0}")]
    CircuitOpen(String),

    /// A downstream call (LLM observer, capability provider) timed out.
    #[error("downstream timeout: {0}")]
    DownstreamTimeout(String),

    /// The agent runtime reported a context-window overflow.
    #[error("context overflow")]
    ContextOverflow,

    /// A path resolved outside its configured sandbox root.
    #[error("path outside sandbox: {0}")]
    PathOutsideSandbox(String),

    /// A path or command token matched a sensitive-path predicate.
    #[error("sensitive path: {0}")]
    SensitivePath(String),

    /// A prerequisite (e.g. TOTP, OS sandbox) is not configured.
    #[error("not configured: {0}")]
    NotConfigured(String),

    /// The request body did not match the expected shape.
    #[error("malformed request: {0}")]
    MalformedRequest(String),

    /// The request body exceeded a configured size limit.
    #[error("body too large: {0}")]
    BodyTooLarge(String),

    /// An unexpected internal error. Logged with a correlation id and
    /// surfaced to callers only as this generic message.
    #[error("internal error")]
    Internal(String),
}

impl KernelError {
    /// HTTP status code this error kind maps to on the Capability Broker
    /// (spec §6: responses use a status from
    /// `{200,400,401,403,404,405,413,415,429,500,502}`).
    #[must_use]
    pub fn http_status(&self) -> u16 {
        match self {
            Self::AuthFailure(_) => 401,
            Self::RateLimited(_) => 429,
            Self::PolicyBlocked(_)
            | Self::PathOutsideSandbox(_)
            | Self::SensitivePath(_)
            | Self::ApprovalWrongChat => 403,
            Self::ApprovalRequired | Self::ApprovalExpired | Self::ApprovalAlreadyConsumed => 400,
            Self::TotpDaemonUnavailable | Self::CircuitOpen(_) | Self::DownstreamTimeout(_) => 502,
            Self::InvalidTotpCode | Self::MalformedRequest(_) | Self::ContextOverflow => 400,
            Self::NotConfigured(_) => 404,
            Self::BodyTooLarge(_) => 413,
            Self::Internal(_) => 500,
        }
    }

    /// `true` for refusals that must never be overridden by tier or retry
    /// logic (spec §7: "non-recoverable at this layer").
    #[must_use]
    pub fn is_non_recoverable(&self) -> bool {
        matches!(
            self,
            Self::PolicyBlocked(_) | Self::SensitivePath(_) | Self::PathOutsideSandbox(_)
        )
    }
}

/// Result type used at every kernel component boundary.
pub type KernelResult<T> = Result<T, KernelError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn policy_blocked_is_non_recoverable() {
        assert!(KernelError::PolicyBlocked("infra secret".into()).is_non_recoverable());
        assert!(!KernelError::RateLimited("chat-global".into()).is_non_recoverable());
    }

    #[test]
    fn http_status_mapping() {
        assert_eq!(KernelError::RateLimited(String::new()).http_status(), 429);
        assert_eq!(KernelError::BodyTooLarge(String::new()).http_status(), 413);
        assert_eq!(KernelError::Internal(String::new()).http_status(), 500);
        assert_eq!(KernelError::AuthFailure(String::new()).http_status(), 401);
    }

    #[test]
    fn display_never_echoes_internal_detail() {
        let err = KernelError::Internal("db connection string leaked".into());
        assert_eq!(err.to_string(), "internal error");
    }
}
