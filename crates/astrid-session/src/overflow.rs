//! Context-overflow recovery (spec §4.J, scenario 5): on an agent error
//! matching a context-length pattern, drop the session and retry once with
//! a fresh one.

use tracing::warn;

use astrid_core::SessionId;

use crate::map::{SessionKey, SessionMap};

const OVERFLOW_PATTERNS: &[&str] = &[
    "context_length_exceeded",
    "context length exceeded",
    "prompt too long",
    "maximum context length",
    "too many tokens",
];

/// `true` if `error_text` looks like a context-window overflow, by
/// substring match against known provider error phrasings.
#[must_use]
pub fn is_context_overflow(error_text: &str) -> bool {
    let lower = error_text.to_lowercase();
    OVERFLOW_PATTERNS.iter().any(|pat| lower.contains(pat))
}

/// Run `turn`, and if it fails with a context-overflow error, reset the
/// session and retry exactly once with a freshly created one.
///
/// `create_session` builds a brand new [`SessionId`] (the caller is
/// responsible for writing a summary note into the new session before
/// `turn` runs it). A second context-overflow failure propagates as-is.
///
/// # Errors
///
/// Propagates whatever error `turn` produces, after at most one retry.
pub async fn run_with_overflow_recovery<F, Fut, T, E, C, CFut>(
    sessions: &SessionMap,
    key: &SessionKey,
    create_session: C,
    turn: F,
) -> Result<T, E>
where
    F: Fn(SessionId) -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
    C: Fn() -> CFut,
    CFut: std::future::Future<Output = SessionId>,
    E: std::fmt::Display,
{
    let Some(session_id) = sessions.get(key).await else {
        let fresh = create_session().await;
        sessions.upsert(key.clone(), fresh.clone()).await;
        return turn(fresh).await;
    };

    match turn(session_id).await {
        Ok(value) => Ok(value),
        Err(err) if is_context_overflow(&err.to_string()) => {
            warn!(thread = %key.thread_key, pool = %key.pool_key, "context overflow, resetting session and retrying once");
            sessions.reset(key).await;
            let fresh = create_session().await;
            sessions.upsert(key.clone(), fresh.clone()).await;
            turn(fresh).await
        }
        Err(err) => Err(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn recognizes_known_overflow_phrasings() {
        assert!(is_context_overflow("Error: context_length_exceeded"));
        assert!(is_context_overflow("400 prompt too long for this model"));
        assert!(is_context_overflow("Maximum context length is 128000 tokens"));
    }

    #[test]
    fn does_not_flag_unrelated_errors() {
        assert!(!is_context_overflow("connection refused"));
        assert!(!is_context_overflow("rate limited"));
    }

    #[tokio::test]
    async fn retries_once_on_overflow_then_succeeds() {
        let sessions = SessionMap::new();
        let key = SessionKey::new("1", "telegram:operator-query");
        let original = SessionId::new();
        sessions.upsert(key.clone(), original.clone()).await;

        let attempt = AtomicUsize::new(0);
        let result: Result<&str, String> = run_with_overflow_recovery(
            &sessions,
            &key,
            || async { SessionId::new() },
            |_sid| {
                let n = attempt.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n == 0 {
                        Err("context_length_exceeded".to_string())
                    } else {
                        Ok("ok")
                    }
                }
            },
        )
        .await;

        assert_eq!(result, Ok("ok"));
        let new_session = sessions.get(&key).await;
        assert!(new_session.is_some());
        assert_ne!(new_session, Some(original));
    }

    #[tokio::test]
    async fn second_overflow_propagates() {
        let sessions = SessionMap::new();
        let key = SessionKey::new("1", "telegram:operator-query");
        sessions.upsert(key.clone(), SessionId::new()).await;

        let result: Result<&str, String> = run_with_overflow_recovery(
            &sessions,
            &key,
            || async { SessionId::new() },
            |_sid| async { Err("context_length_exceeded".to_string()) },
        )
        .await;

        assert_eq!(result, Err("context_length_exceeded".to_string()));
    }

    #[tokio::test]
    async fn non_overflow_error_is_not_retried() {
        let sessions = SessionMap::new();
        let key = SessionKey::new("1", "telegram:operator-query");
        let original = SessionId::new();
        sessions.upsert(key.clone(), original.clone()).await;

        let attempt = AtomicUsize::new(0);
        let result: Result<&str, String> = run_with_overflow_recovery(
            &sessions,
            &key,
            || async { SessionId::new() },
            |_sid| {
                attempt.fetch_add(1, Ordering::SeqCst);
                async { Err("rate limited".to_string()) }
            },
        )
        .await;

        assert_eq!(result, Err("rate limited".to_string()));
        assert_eq!(attempt.load(Ordering::SeqCst), 1);
        assert_eq!(sessions.get(&key).await, Some(original));
    }
}
