//! Error types for the auth module.

use thiserror::Error;
use vellum_core::CoreError;

use crate::permission::Capability;

/// Errors that can occur during authentication and authorization.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("challenge not found")]
    ChallengeNotFound,

    #[error("challenge expired")]
    ChallengeExpired,

    /// The challenge was already used by an earlier verification attempt.
    #[error("challenge already used")]
    ChallengeReused,

    /// The signature does not verify over `challenge:timestamp:origin`.
    #[error("signature invalid")]
    SignatureInvalid,

    /// The submitted timestamp differs from the one issued with the challenge.
    #[error("challenge timestamp mismatch")]
    TimestampMismatch,

    #[error("session not found")]
    SessionNotFound,

    #[error("session expired")]
    SessionExpired,

    /// Presented by an origin other than the one it was issued to.
    #[error("origin mismatch")]
    OriginMismatch,

    /// A required capability was refused.
    #[error("permission denied: {0:?}")]
    PermissionDenied(Vec<Capability>),

    #[error("identity not found: {0}")]
    IdentityNotFound(String),

    /// The wallet asked to sign a certificate does not control its subject.
    #[error("signer does not control the certificate subject")]
    SignerMismatch,

    #[error("certificate not valid at this time")]
    CertificateExpired,

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error(transparent)]
    Core(#[from] CoreError),
}

impl AuthError {
    /// Whether this indicates replay or forgery. These are never retried.
    pub fn is_protocol_violation(&self) -> bool {
        matches!(
            self,
            AuthError::ChallengeReused
                | AuthError::SignatureInvalid
                | AuthError::TimestampMismatch
                | AuthError::OriginMismatch
        )
    }

    /// Stable machine-readable code for the endpoint.
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::ChallengeNotFound => "challenge_not_found",
            AuthError::ChallengeExpired => "challenge_expired",
            AuthError::ChallengeReused => "challenge_reused",
            AuthError::SignatureInvalid => "signature_invalid",
            AuthError::TimestampMismatch => "timestamp_mismatch",
            AuthError::SessionNotFound => "session_not_found",
            AuthError::SessionExpired => "session_expired",
            AuthError::OriginMismatch => "origin_mismatch",
            AuthError::PermissionDenied(_) => "permission_denied",
            AuthError::IdentityNotFound(_) => "identity_not_found",
            AuthError::SignerMismatch => "signer_mismatch",
            AuthError::CertificateExpired => "certificate_expired",
            AuthError::InvalidRequest(_) => "invalid_request",
            AuthError::Serialization(_) => "serialization",
            AuthError::Core(_) => "internal",
        }
    }
}

impl From<serde_json::Error> for AuthError {
    fn from(err: serde_json::Error) -> Self {
        AuthError::Serialization(err.to_string())
    }
}

/// Result type for auth operations.
pub type Result<T> = std::result::Result<T, AuthError>;
