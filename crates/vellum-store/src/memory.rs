//! In-memory blob store and ledger.
//!
//! These are test doubles with the same semantics as the SQLite adapters,
//! plus failure injection so callers can exercise partial-failure paths.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use uuid::Uuid;
use vellum_core::{now_millis, BlobHash, Sha256Hash, TransactionId};

use crate::error::{Result, StorageError};
use crate::traits::{BlobStore, TransactionStatus, TransactionSubmitter};

/// In-memory content-addressed blob store.
#[derive(Default)]
pub struct MemoryBlobStore {
    blobs: DashMap<BlobHash, Bytes>,
    rejected: Mutex<HashSet<BlobHash>>,
    offline: AtomicBool,
    puts: AtomicUsize,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every `put` of bytes hashing to `hash` fail.
    pub fn reject(&self, hash: BlobHash) {
        if let Ok(mut rejected) = self.rejected.lock() {
            rejected.insert(hash);
        }
    }

    /// Undo [`reject`](Self::reject).
    pub fn accept(&self, hash: &BlobHash) {
        if let Ok(mut rejected) = self.rejected.lock() {
            rejected.remove(hash);
        }
    }

    /// Fail every operation while offline.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Number of successful `put` calls.
    pub fn put_count(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }

    /// Number of distinct blobs held.
    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }

    /// Overwrite a stored blob in place, bypassing content addressing.
    pub fn corrupt(&self, hash: &BlobHash, data: Bytes) {
        if let Some(mut entry) = self.blobs.get_mut(hash) {
            *entry = data;
        }
    }

    fn check_online(&self) -> Result<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(StorageError::BlobStoreFailed("blob store offline".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(&self, data: Bytes) -> Result<BlobHash> {
        self.check_online()?;
        let hash = BlobHash::of(&data);

        let rejected = self
            .rejected
            .lock()
            .map(|r| r.contains(&hash))
            .unwrap_or(false);
        if rejected {
            return Err(StorageError::BlobStoreFailed(format!("put rejected for {}", hash)));
        }

        self.blobs.entry(hash).or_insert(data);
        self.puts.fetch_add(1, Ordering::SeqCst);
        Ok(hash)
    }

    async fn get(&self, hash: &BlobHash) -> Result<Option<Bytes>> {
        self.check_online()?;
        Ok(self.blobs.get(hash).map(|b| b.value().clone()))
    }
}

struct LedgerEntry {
    payload: Bytes,
    block_height: Option<u64>,
}

/// In-memory ledger that mines blocks on demand.
#[derive(Default)]
pub struct MemoryLedger {
    entries: DashMap<TransactionId, LedgerEntry>,
    height: AtomicU64,
    offline: AtomicBool,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every submission while offline.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Include every pending transaction in a new block.
    ///
    /// Returns the new height.
    pub fn mine_block(&self) -> u64 {
        let height = self.height.fetch_add(1, Ordering::SeqCst) + 1;
        for mut entry in self.entries.iter_mut() {
            if entry.block_height.is_none() {
                entry.block_height = Some(height);
            }
        }
        height
    }

    /// Number of submitted transactions.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl TransactionSubmitter for MemoryLedger {
    async fn submit(&self, payload: Bytes) -> Result<TransactionId> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(StorageError::SubmissionFailed("ledger offline".into()));
        }

        let nonce = Uuid::new_v4();
        let txid = TransactionId::from_bytes(
            Sha256Hash::hash_parts(&[
                &payload[..],
                &nonce.as_bytes()[..],
                &now_millis().to_be_bytes()[..],
            ])
            .0,
        );
        self.entries.insert(
            txid,
            LedgerEntry {
                payload,
                block_height: None,
            },
        );
        Ok(txid)
    }

    async fn status(&self, txid: &TransactionId) -> Result<TransactionStatus> {
        let entry = self
            .entries
            .get(txid)
            .ok_or_else(|| StorageError::NotFound(format!("transaction {}", txid)))?;

        Ok(match entry.block_height {
            Some(included) => {
                let tip = self.height.load(Ordering::SeqCst);
                TransactionStatus {
                    confirmed: true,
                    confirmations: (tip - included + 1) as u32,
                    block_height: Some(included),
                }
            }
            None => TransactionStatus::pending(),
        })
    }

    async fn fetch(&self, txid: &TransactionId) -> Result<Option<Bytes>> {
        Ok(self.entries.get(txid).map(|e| e.payload.clone()))
    }
}
