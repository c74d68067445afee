//! Parses the internal-auth header set (spec §4.B, §6) out of an HTTP
//! request into [`AuthHeaders`].

use astrid_auth::AuthHeaders;
use astrid_core::Scope;
use axum::http::HeaderMap;

const HEADER_TIMESTAMP: &str = "x-telclaude-timestamp";
const HEADER_NONCE: &str = "x-telclaude-nonce";
const HEADER_SCOPE: &str = "x-telclaude-scope";
const HEADER_SIGNATURE: &str = "x-telclaude-signature";

fn parse_scope(s: &str) -> Option<Scope> {
    Some(match s {
        "telegram" => Scope::Telegram,
        "social" => Scope::Social,
        "moltbook" => Scope::Moltbook,
        "agent" => Scope::Agent,
        "relay" => Scope::Relay,
        _ => return None,
    })
}

/// Extract the four internal-auth headers, or `None` if any is missing
/// or malformed.
#[must_use]
pub fn extract(headers: &HeaderMap) -> Option<AuthHeaders> {
    let timestamp = headers.get(HEADER_TIMESTAMP)?.to_str().ok()?.parse().ok()?;
    let nonce = headers.get(HEADER_NONCE)?.to_str().ok()?.to_string();
    let scope = parse_scope(headers.get(HEADER_SCOPE)?.to_str().ok()?)?;
    let signature = headers.get(HEADER_SIGNATURE)?.to_str().ok()?.to_string();
    Some(AuthHeaders {
        timestamp,
        nonce,
        scope,
        signature,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn extracts_complete_header_set() {
        let mut headers = HeaderMap::new();
        headers.insert(HEADER_TIMESTAMP, HeaderValue::from_static("1000"));
        headers.insert(HEADER_NONCE, HeaderValue::from_static("n1"));
        headers.insert(HEADER_SCOPE, HeaderValue::from_static("relay"));
        headers.insert(HEADER_SIGNATURE, HeaderValue::from_static("abcd"));

        let parsed = extract(&headers).unwrap();
        assert_eq!(parsed.timestamp, 1000);
        assert_eq!(parsed.nonce, "n1");
        assert_eq!(parsed.scope, Scope::Relay);
        assert_eq!(parsed.signature, "abcd");
    }

    #[test]
    fn missing_header_returns_none() {
        let headers = HeaderMap::new();
        assert!(extract(&headers).is_none());
    }

    #[test]
    fn unknown_scope_returns_none() {
        let mut headers = HeaderMap::new();
        headers.insert(HEADER_TIMESTAMP, HeaderValue::from_static("1000"));
        headers.insert(HEADER_NONCE, HeaderValue::from_static("n1"));
        headers.insert(HEADER_SCOPE, HeaderValue::from_static("bogus"));
        headers.insert(HEADER_SIGNATURE, HeaderValue::from_static("abcd"));
        assert!(extract(&headers).is_none());
    }
}
