//! HMAC-SHA256 symmetric signing for peer-of-equal internal auth (spec
//! §4.B). Used where both sides of an RPC share a secret, as opposed to
//! [`crate::verifier::SignatureVerifier`]'s Ed25519 one-way trust.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::error::{CryptoError, CryptoResult};

type HmacSha256 = Hmac<Sha256>;

/// A shared HMAC-SHA256 secret for one peer relationship.
#[derive(Clone)]
pub struct HmacKey(Vec<u8>);

impl HmacKey {
    /// Wrap raw secret bytes.
    #[must_use]
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self(secret.into())
    }

    /// Compute the MAC over `message`, returning raw tag bytes.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::InvalidKeyLength`] if the key cannot key an
    /// HMAC instance (HMAC accepts any key length, so this only occurs for
    /// a zero-length key by policy).
    pub fn sign(&self, message: &[u8]) -> CryptoResult<Vec<u8>> {
        if self.0.is_empty() {
            return Err(CryptoError::InvalidKeyLength {
                expected: 1,
                actual: 0,
            });
        }
        #[allow(clippy::unwrap_used)]
        let mut mac = HmacSha256::new_from_slice(&self.0).unwrap();
        mac.update(message);
        Ok(mac.finalize().into_bytes().to_vec())
    }

    /// Verify `tag` was produced by [`sign`](Self::sign) over `message`,
    /// in constant time.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::SignatureVerificationFailed`] on mismatch.
    pub fn verify(&self, message: &[u8], tag: &[u8]) -> CryptoResult<()> {
        let expected = self.sign(message)?;
        if expected.len() == tag.len() && bool::from(expected.ct_eq(tag)) {
            Ok(())
        } else {
            Err(CryptoError::SignatureVerificationFailed)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_then_verify_round_trips() {
        let key = HmacKey::new(*b"shared-secret-key");
        let tag = key.sign(b"METHOD\nPATH\n...").unwrap();
        assert!(key.verify(b"METHOD\nPATH\n...", &tag).is_ok());
    }

    #[test]
    fn verify_rejects_tampered_message() {
        let key = HmacKey::new(*b"shared-secret-key");
        let tag = key.sign(b"original").unwrap();
        assert!(key.verify(b"tampered", &tag).is_err());
    }

    #[test]
    fn verify_rejects_wrong_key() {
        let a = HmacKey::new(*b"key-a");
        let b = HmacKey::new(*b"key-b");
        let tag = a.sign(b"message").unwrap();
        assert!(b.verify(b"message", &tag).is_err());
    }

    #[test]
    fn empty_key_is_rejected() {
        let key = HmacKey::new(Vec::new());
        assert!(key.sign(b"x").is_err());
    }
}
