//! Error types for the store module.

use std::fmt;

use bytes::Bytes;
use thiserror::Error;
use vellum_cipher::EncryptionError;
use vellum_core::{BlobHash, Sha256Hash};

use crate::manifest::RecordMetadata;

/// Progress of a chunked upload that did not finish.
///
/// Carries the exact payload that was being chunked, so a retry re-uploads
/// the same bytes and only the missing indices.
#[derive(Clone, PartialEq, Eq)]
pub struct PartialUpload {
    /// Chunks that reached the blob store, as `(index, hash)`.
    pub uploaded: Vec<(usize, BlobHash)>,

    /// Indices of chunks that failed.
    pub missing: Vec<usize>,

    pub total_chunks: usize,

    /// The payload being chunked.
    pub payload: Bytes,

    pub metadata: RecordMetadata,
}

impl fmt::Debug for PartialUpload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PartialUpload")
            .field("uploaded", &self.uploaded)
            .field("missing", &self.missing)
            .field("total_chunks", &self.total_chunks)
            .field("payload_len", &self.payload.len())
            .finish()
    }
}

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The blob store rejected or failed a `put`/`get`.
    #[error("blob store failed: {0}")]
    BlobStoreFailed(String),

    /// The transaction submitter failed.
    #[error("transaction submission failed: {0}")]
    SubmissionFailed(String),

    /// One or more chunks failed to upload; no manifest was submitted.
    #[error("chunk upload failed: {} of {} chunks missing", .partial.missing.len(), .partial.total_chunks)]
    ChunkUploadFailed { partial: Box<PartialUpload> },

    /// Every chunk was uploaded but the manifest submission failed.
    #[error("manifest submission failed after {} chunks uploaded: {reason}", .partial.total_chunks)]
    ManifestSubmitFailed {
        partial: Box<PartialUpload>,
        reason: String,
    },

    #[error(transparent)]
    Encryption(#[from] EncryptionError),

    /// Encryption was requested without a wallet signer.
    #[error("encryption requested but no signer was provided")]
    SignerRequired,

    #[error("not found: {0}")]
    NotFound(String),

    /// Retrieved content does not hash to the recorded content hash.
    #[error("content hash mismatch: expected {expected}, got {actual}")]
    IntegrityMismatch {
        expected: Sha256Hash,
        actual: Sha256Hash,
    },

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("compression error: {0}")]
    Compression(String),

    #[error("invalid tier configuration: {0}")]
    InvalidConfig(String),

    /// Database error from SQLite.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("migration error: {0}")]
    Migration(String),
}

impl StorageError {
    /// Whether the caller may retry with backoff.
    ///
    /// Only transient I/O failures qualify.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            StorageError::BlobStoreFailed(_)
                | StorageError::SubmissionFailed(_)
                | StorageError::ChunkUploadFailed { .. }
                | StorageError::ManifestSubmitFailed { .. }
                | StorageError::Database(_)
        )
    }

    /// The partial progress of a failed chunked upload, if any.
    pub fn partial_upload(&self) -> Option<&PartialUpload> {
        match self {
            StorageError::ChunkUploadFailed { partial }
            | StorageError::ManifestSubmitFailed { partial, .. } => Some(partial),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Serialization(err.to_string())
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StorageError>;
