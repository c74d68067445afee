//! Internal-auth header shape and the covered-bytes construction (spec
//! §4.B).

use astrid_core::Scope;

/// The four headers carried by every internal RPC:
/// `X-Telclaude-Timestamp`, `X-Telclaude-Nonce`, `X-Telclaude-Scope`,
/// `X-Telclaude-Signature` (spec §6).
#[derive(Debug, Clone)]
pub struct AuthHeaders {
    /// Milliseconds since epoch when the request was signed.
    pub timestamp: i64,
    /// A value unique per (scope, signer) used to detect replay.
    pub nonce: String,
    /// The trust zone claiming to have signed this request.
    pub scope: Scope,
    /// Hex-encoded signature (HMAC tag or Ed25519 signature) over
    /// [`covered_bytes`].
    pub signature: String,
}

/// Build the exact byte sequence a signature covers:
/// `METHOD\nPATH\nbody-sha256\ntimestamp\nnonce\nscope`.
#[must_use]
pub fn covered_bytes(
    method: &str,
    path: &str,
    body_sha256_hex: &str,
    timestamp: i64,
    nonce: &str,
    scope: Scope,
) -> Vec<u8> {
    format!("{method}\n{path}\n{body_sha256_hex}\n{timestamp}\n{nonce}\n{scope}").into_bytes()
}
