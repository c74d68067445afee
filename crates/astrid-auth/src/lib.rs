//! Internal RPC authentication (spec §4.B).
//!
//! Every internal HTTP RPC carries `timestamp`/`nonce`/`scope`/`signature`
//! headers covering `METHOD\nPATH\nbody-sha256\ntimestamp\nnonce\nscope`.
//! Two signing modes exist per peer pair: symmetric HMAC-SHA256 (via
//! [`astrid_crypto::HmacKey`]) for peers that share a secret, and Ed25519
//! (via [`astrid_crypto::SignatureVerifier`]) for one-way trust where the
//! verifier holds only the signer's public key.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

mod headers;
mod nonce;
mod peer;

pub use headers::{AuthHeaders, covered_bytes};
pub use nonce::NonceCache;
pub use peer::{PeerKey, PeerRegistry};

use std::collections::HashMap;

use astrid_core::{KernelError, KernelResult, Scope};
use sha2::{Digest, Sha256};

/// Maximum allowed clock skew between the signer's `timestamp` and the
/// verifier's clock (spec §4.B: "bad-timestamp-skew (> 5 minutes drift)").
pub const MAX_SKEW_MILLIS: i64 = 5 * 60 * 1000;

/// Verifies internal-auth headers on inbound RPCs.
pub struct InternalAuth {
    peers: PeerRegistry,
    nonces: NonceCache,
}

impl InternalAuth {
    /// Construct a verifier over the given peer key registry, using
    /// `nonces` to detect replay within the skew window.
    #[must_use]
    pub fn new(peers: PeerRegistry, nonces: NonceCache) -> Self {
        Self { peers, nonces }
    }

    /// Verify `headers` were produced for `method`/`path`/`body` by a
    /// trusted peer of `headers.scope`, and that the nonce has not been
    /// seen before within the skew window.
    ///
    /// # Errors
    ///
    /// Returns [`KernelError::AuthFailure`] with one of the spec's short
    /// opaque reasons: `bad-timestamp-skew`, `replay`, `bad-signature`,
    /// `unknown-scope`.
    pub async fn verify(
        &self,
        method: &str,
        path: &str,
        body: &[u8],
        headers: &AuthHeaders,
    ) -> KernelResult<()> {
        let now = astrid_core::Timestamp::now().into_millis();
        if (now - headers.timestamp).abs() > MAX_SKEW_MILLIS {
            return Err(KernelError::AuthFailure("bad-timestamp-skew".into()));
        }

        let Some(key) = self.peers.key_for(headers.scope) else {
            return Err(KernelError::AuthFailure("unknown-scope".into()));
        };

        let body_sha256 = hex::encode(Sha256::digest(body));
        let covered = covered_bytes(method, path, &body_sha256, headers.timestamp, &headers.nonce, headers.scope);

        key.verify(&covered, &headers.signature)
            .map_err(|_| KernelError::AuthFailure("bad-signature".into()))?;

        if !self
            .nonces
            .check_and_record(headers.scope, &headers.nonce, headers.timestamp)
            .await
        {
            return Err(KernelError::AuthFailure("replay".into()));
        }

        Ok(())
    }
}

/// Build the registry's keys from a plain map, for callers constructing
/// config-driven peer sets (e.g. at broker startup).
#[must_use]
pub fn registry_from_map(keys: HashMap<Scope, PeerKey>) -> PeerRegistry {
    PeerRegistry::from_map(keys)
}
