//! On-chain records for hybrid and chunked documents, and the storage
//! record returned to callers.

use serde::{Deserialize, Serialize};
use vellum_core::{BlobHash, Sha256Hash, TransactionId};

use crate::compression::Compression;
use crate::tier::StorageMethod;

/// Value of the `type` field on every on-chain record.
pub const RECORD_TYPE: &str = "vellum-document";

/// Metadata recorded for every stored document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,

    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,

    pub encrypted: bool,

    /// Length of the logical payload (the envelope, when encrypted).
    pub payload_size: u64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compression: Option<Compression>,
}

/// On-chain reference to a blob-stored document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HybridRecord {
    #[serde(rename = "type")]
    pub record_type: String,
    pub method: StorageMethod,
    pub blob_hash: BlobHash,
    pub metadata: RecordMetadata,
    /// SHA-256 of the logical payload.
    pub content_hash: Sha256Hash,
}

impl HybridRecord {
    pub fn new(blob_hash: BlobHash, metadata: RecordMetadata, content_hash: Sha256Hash) -> Self {
        Self {
            record_type: RECORD_TYPE.to_string(),
            method: StorageMethod::Hybrid,
            blob_hash,
            metadata,
            content_hash,
        }
    }
}

/// On-chain manifest of a chunked document.
///
/// Chunks concatenate, in order, to the logical payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkManifest {
    #[serde(rename = "type")]
    pub record_type: String,
    pub method: StorageMethod,
    pub chunk_hashes: Vec<BlobHash>,
    pub total_chunks: usize,
    pub metadata: RecordMetadata,
    pub content_hash: Sha256Hash,
}

impl ChunkManifest {
    pub fn new(chunk_hashes: Vec<BlobHash>, metadata: RecordMetadata, content_hash: Sha256Hash) -> Self {
        Self {
            record_type: RECORD_TYPE.to_string(),
            method: StorageMethod::Chunked,
            total_chunks: chunk_hashes.len(),
            chunk_hashes,
            metadata,
            content_hash,
        }
    }
}

/// The result of a successful store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageRecord {
    #[serde(rename = "storageMethod")]
    pub method: StorageMethod,

    pub transaction_id: TransactionId,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blob_hash: Option<BlobHash>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunk_hashes: Option<Vec<BlobHash>>,

    pub metadata: RecordMetadata,

    /// SHA-256 of the logical payload, checked on retrieval.
    pub content_hash: Sha256Hash,

    /// Cost in sats.
    pub cost: u64,
}
