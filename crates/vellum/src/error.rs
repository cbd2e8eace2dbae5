//! Error types for the vault.

use thiserror::Error;
use vellum_auth::AuthError;
use vellum_cipher::EncryptionError;
use vellum_core::CoreError;
use vellum_store::StorageError;

/// Errors that can occur during vault operations.
#[derive(Debug, Error)]
pub enum VaultError {
    #[error("core error: {0}")]
    Core(#[from] CoreError),

    #[error("encryption error: {0}")]
    Encryption(#[from] EncryptionError),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("auth error: {0}")]
    Auth(#[from] AuthError),

    /// Configuration could not be read or is inconsistent.
    #[error("config error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl VaultError {
    /// Whether retrying the same call may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            VaultError::Storage(e) => e.is_retryable(),
            VaultError::Io(_) => true,
            _ => false,
        }
    }
}

/// Result type for vault operations.
pub type Result<T> = std::result::Result<T, VaultError>;
