//! Ports for the external collaborators the tier selector writes to.
//!
//! Implementations include SQLite (production) and in-memory doubles (tests).

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use vellum_core::{BlobHash, TransactionId};

use crate::error::Result;

/// A content-addressed blob store.
///
/// `put` is idempotent: storing identical bytes twice yields the same hash.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store bytes and return their content address.
    async fn put(&self, data: Bytes) -> Result<BlobHash>;

    /// Fetch bytes by content address.
    async fn get(&self, hash: &BlobHash) -> Result<Option<Bytes>>;
}

/// Confirmation state of a submitted transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionStatus {
    pub confirmed: bool,
    pub confirmations: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_height: Option<u64>,
}

impl TransactionStatus {
    /// Status of a transaction not yet included in a block.
    pub const fn pending() -> Self {
        Self {
            confirmed: false,
            confirmations: 0,
            block_height: None,
        }
    }
}

/// A ledger transaction submitter.
#[async_trait]
pub trait TransactionSubmitter: Send + Sync {
    /// Submit a payload; returns the new transaction's id.
    async fn submit(&self, payload: Bytes) -> Result<TransactionId>;

    /// Confirmation status of a transaction.
    ///
    /// Unknown ids are `StorageError::NotFound`.
    async fn status(&self, txid: &TransactionId) -> Result<TransactionStatus>;

    /// Read back a submitted payload.
    async fn fetch(&self, txid: &TransactionId) -> Result<Option<Bytes>>;
}

#[async_trait]
impl<T: BlobStore + ?Sized> BlobStore for Arc<T> {
    async fn put(&self, data: Bytes) -> Result<BlobHash> {
        (**self).put(data).await
    }

    async fn get(&self, hash: &BlobHash) -> Result<Option<Bytes>> {
        (**self).get(hash).await
    }
}

#[async_trait]
impl<T: TransactionSubmitter + ?Sized> TransactionSubmitter for Arc<T> {
    async fn submit(&self, payload: Bytes) -> Result<TransactionId> {
        (**self).submit(payload).await
    }

    async fn status(&self, txid: &TransactionId) -> Result<TransactionStatus> {
        (**self).status(txid).await
    }

    async fn fetch(&self, txid: &TransactionId) -> Result<Option<Bytes>> {
        (**self).fetch(txid).await
    }
}
