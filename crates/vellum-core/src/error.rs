//! Error types for Vellum Core.

use thiserror::Error;

/// Errors raised by core primitives and the signing port.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid signature")]
    InvalidSignature,

    #[error("invalid public key")]
    InvalidPublicKey,

    /// The wallet signing provider refused or failed to sign.
    #[error("signing failed: {0}")]
    SignFailed(String),

    #[error("decoding error: {0}")]
    DecodingError(String),
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
