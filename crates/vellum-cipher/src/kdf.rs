//! Signature-derived key derivation.
//!
//! A wallet signature over a known message is high-entropy secret material
//! that only the key holder can reproduce. The derived key is
//! `PBKDF2-HMAC-SHA256(signature || "|" || message, salt = SHA256(same), n)`.

use sha2::Sha256;
use vellum_core::{Ed25519Signature, Sha256Hash};

/// Separator between signature bytes and message bytes in the key material.
const MATERIAL_SEPARATOR: &[u8] = b"|";

/// A 256-bit symmetric key derived from a wallet signature.
///
/// Used both as the AES-256 key and the HMAC-SHA256 key.
#[derive(Clone, PartialEq, Eq)]
pub struct DerivedKey([u8; 32]);

impl DerivedKey {
    /// Derive a key from a signature over `message`.
    pub fn derive(signature: &Ed25519Signature, message: &str, iterations: u32) -> Self {
        let material = [
            signature.as_bytes().as_slice(),
            MATERIAL_SEPARATOR,
            message.as_bytes(),
        ]
        .concat();
        let salt = Sha256Hash::hash(&material);

        let mut key = [0u8; 32];
        pbkdf2::pbkdf2_hmac::<Sha256>(&material, salt.as_bytes(), iterations, &mut key);
        Self(key)
    }

    /// Get the raw key bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl std::fmt::Debug for DerivedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("DerivedKey([REDACTED])")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vellum_core::Keypair;

    #[test]
    fn test_same_signature_same_key() {
        let sig = Keypair::from_seed(&[1u8; 32]).sign(b"Encrypt document: a - 1");
        let a = DerivedKey::derive(&sig, "Encrypt document: a - 1", 1000);
        let b = DerivedKey::derive(&sig, "Encrypt document: a - 1", 1000);
        assert_eq!(a, b);
    }

    #[test]
    fn test_message_and_iterations_change_key() {
        let sig = Keypair::from_seed(&[1u8; 32]).sign(b"m");
        let base = DerivedKey::derive(&sig, "m", 1000);

        assert_ne!(base, DerivedKey::derive(&sig, "m2", 1000));
        assert_ne!(base, DerivedKey::derive(&sig, "m", 1001));
    }

    #[test]
    fn test_different_signers_different_keys() {
        let a = Keypair::from_seed(&[1u8; 32]).sign(b"m");
        let b = Keypair::from_seed(&[2u8; 32]).sign(b"m");
        assert_ne!(DerivedKey::derive(&a, "m", 10), DerivedKey::derive(&b, "m", 10));
    }

    #[test]
    fn test_debug_redacts_key() {
        let sig = Keypair::from_seed(&[3u8; 32]).sign(b"m");
        let key = DerivedKey::derive(&sig, "m", 1);
        assert_eq!(format!("{:?}", key), "DerivedKey([REDACTED])");
    }
}
