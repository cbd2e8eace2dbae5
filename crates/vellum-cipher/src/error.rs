//! Error types for content encryption.

use thiserror::Error;
use vellum_core::{CoreError, Ed25519PublicKey};

/// Errors that can occur while encrypting or decrypting content.
#[derive(Debug, Error)]
pub enum EncryptionError {
    /// HMAC over `message || iv || ciphertext` did not match.
    #[error("integrity check failed: package was tampered with or signed by a different key")]
    IntegrityMismatch,

    /// The package was encrypted under a different wallet key.
    #[error("public key mismatch: package expects {expected}, signer is {actual}")]
    PublicKeyMismatch {
        expected: Ed25519PublicKey,
        actual: Ed25519PublicKey,
    },

    /// The wallet signing provider failed.
    #[error("signing failed: {0}")]
    SignFailed(String),

    /// Two signatures over the same message differed.
    #[error("signer is not deterministic; derived keys would not be reproducible")]
    NonDeterministicSigner,

    /// Ciphertext authenticated but failed to decrypt.
    #[error("decryption error: {0}")]
    Decryption(String),

    /// Wire encoding or decoding failed.
    #[error("encoding error: {0}")]
    Encoding(String),

    #[error("unsupported package version: {0}")]
    UnsupportedVersion(String),

    #[error("invalid cipher configuration: {0}")]
    InvalidConfig(String),
}

impl EncryptionError {
    /// Whether this error indicates tampering or a broken precondition.
    ///
    /// These are never retried.
    pub fn is_tamper(&self) -> bool {
        matches!(
            self,
            EncryptionError::IntegrityMismatch
                | EncryptionError::PublicKeyMismatch { .. }
                | EncryptionError::NonDeterministicSigner
        )
    }
}

impl From<CoreError> for EncryptionError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::SignFailed(msg) => EncryptionError::SignFailed(msg),
            other => EncryptionError::SignFailed(other.to_string()),
        }
    }
}

/// Result type for encryption operations.
pub type Result<T> = std::result::Result<T, EncryptionError>;
