//! Per-scope signing key registry.

use std::collections::HashMap;

use astrid_core::Scope;
use astrid_crypto::{CryptoError, HmacKey, KeyId, SignatureVerifier};

/// The key material trusted for one peer scope: either a shared HMAC
/// secret (symmetric peers) or an Ed25519 verifier holding only the
/// signer's public key (one-way trust, spec §4.B).
#[derive(Clone)]
pub enum PeerKey {
    /// Symmetric HMAC-SHA256 secret shared with this peer.
    Hmac(HmacKey),
    /// Ed25519 public key this peer signs with; we verify only.
    Ed25519 {
        /// The trusted key's identifier within `verifier`.
        key_id: KeyId,
        /// Verifier holding the trusted public key.
        verifier: SignatureVerifier,
    },
}

impl PeerKey {
    /// Verify `signature_hex` (hex-encoded) was produced over `message` by
    /// this peer's key.
    pub(crate) fn verify(&self, message: &[u8], signature_hex: &str) -> Result<(), CryptoError> {
        match self {
            Self::Hmac(key) => {
                let tag = hex::decode(signature_hex).map_err(|_| CryptoError::InvalidHexEncoding)?;
                key.verify(message, &tag)
            }
            Self::Ed25519 { key_id, verifier } => {
                let sig_bytes =
                    hex::decode(signature_hex).map_err(|_| CryptoError::InvalidHexEncoding)?;
                let signature = astrid_crypto::Signature::try_from_slice(&sig_bytes)?;
                verifier.verify(key_id, message, &signature)
            }
        }
    }
}

/// Maps a trust zone to the key used to verify its signatures.
#[derive(Clone, Default)]
pub struct PeerRegistry {
    keys: HashMap<Scope, PeerKey>,
}

impl PeerRegistry {
    /// Build a registry from an explicit map.
    #[must_use]
    pub fn from_map(keys: HashMap<Scope, PeerKey>) -> Self {
        Self { keys }
    }

    /// Register (or replace) the key trusted for `scope`.
    pub fn insert(&mut self, scope: Scope, key: PeerKey) {
        self.keys.insert(scope, key);
    }

    /// The key trusted for `scope`, if any.
    #[must_use]
    pub fn key_for(&self, scope: Scope) -> Option<&PeerKey> {
        self.keys.get(&scope)
    }
}
