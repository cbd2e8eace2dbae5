//! SQLite adapters for the blob store and ledger ports.
//!
//! Uses rusqlite with bundled SQLite, wrapped in async via
//! `tokio::task::spawn_blocking`. One [`SqliteBackend`] owns the connection;
//! the adapters it hands out share it.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;
use vellum_core::{now_millis, BlobHash, Sha256Hash, TransactionId};

use crate::error::{Result, StorageError};
use crate::migration;
use crate::traits::{BlobStore, TransactionStatus, TransactionSubmitter};

type SharedConnection = Arc<Mutex<Connection>>;

/// An open SQLite database holding blobs and the transaction journal.
#[derive(Clone)]
pub struct SqliteBackend {
    conn: SharedConnection,
}

impl SqliteBackend {
    /// Open a SQLite database at the given path.
    ///
    /// Creates the file and runs migrations if it doesn't exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut conn = Connection::open(path)?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory SQLite database.
    pub fn open_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn blob_store(&self) -> SqliteBlobStore {
        SqliteBlobStore {
            conn: self.conn.clone(),
        }
    }

    pub fn ledger(&self) -> SqliteLedger {
        SqliteLedger {
            conn: self.conn.clone(),
        }
    }
}

/// Run `f` against the connection on the blocking pool.
async fn run_blocking<F, T>(conn: &SharedConnection, f: F) -> Result<T>
where
    F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    let conn = conn.clone();
    tokio::task::spawn_blocking(move || {
        let mut conn = conn.lock().map_err(|e| {
            StorageError::Database(rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_LOCKED),
                Some(format!("mutex poisoned: {}", e)),
            ))
        })?;
        f(&mut conn)
    })
    .await
    .map_err(|e| {
        StorageError::Database(rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_ERROR),
            Some(format!("spawn_blocking failed: {}", e)),
        ))
    })?
}

fn txid_from_row(bytes: Vec<u8>) -> rusqlite::Result<TransactionId> {
    let arr: [u8; 32] = bytes.try_into().map_err(|_| {
        rusqlite::Error::InvalidColumnType(0, "txid".into(), rusqlite::types::Type::Blob)
    })?;
    Ok(TransactionId::from_bytes(arr))
}

/// SQLite-backed content-addressed blob store.
#[derive(Clone)]
pub struct SqliteBlobStore {
    conn: SharedConnection,
}

#[async_trait]
impl BlobStore for SqliteBlobStore {
    async fn put(&self, data: Bytes) -> Result<BlobHash> {
        let hash = BlobHash::of(&data);
        run_blocking(&self.conn, move |conn| {
            conn.execute(
                "INSERT OR IGNORE INTO blobs (hash, data, size, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    hash.as_bytes().as_slice(),
                    &data[..],
                    data.len() as i64,
                    now_millis()
                ],
            )?;
            Ok(hash)
        })
        .await
    }

    async fn get(&self, hash: &BlobHash) -> Result<Option<Bytes>> {
        let hash = *hash;
        run_blocking(&self.conn, move |conn| {
            let data: Option<Vec<u8>> = conn
                .query_row(
                    "SELECT data FROM blobs WHERE hash = ?1",
                    params![hash.as_bytes().as_slice()],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(data.map(Bytes::from))
        })
        .await
    }
}

/// SQLite-backed local transaction journal.
///
/// Transactions are pending until [`mine_block`](Self::mine_block) includes
/// them; confirmations count blocks from inclusion to the tip.
#[derive(Clone)]
pub struct SqliteLedger {
    conn: SharedConnection,
}

impl SqliteLedger {
    /// Include every pending transaction in a new block. Returns the new height.
    pub async fn mine_block(&self) -> Result<u64> {
        run_blocking(&self.conn, |conn| {
            let tx = conn.transaction()?;
            tx.execute("UPDATE chain_state SET height = height + 1 WHERE id = 1", [])?;
            let height: i64 =
                tx.query_row("SELECT height FROM chain_state WHERE id = 1", [], |row| {
                    row.get(0)
                })?;
            tx.execute(
                "UPDATE transactions SET block_height = ?1 WHERE block_height IS NULL",
                params![height],
            )?;
            tx.commit()?;
            Ok(height as u64)
        })
        .await
    }

    /// Ids of transactions not yet in a block, oldest first.
    pub async fn pending(&self) -> Result<Vec<TransactionId>> {
        run_blocking(&self.conn, |conn| {
            let mut stmt = conn.prepare(
                "SELECT txid FROM transactions WHERE block_height IS NULL
                 ORDER BY submitted_at, rowid",
            )?;
            let ids = stmt
                .query_map([], |row| txid_from_row(row.get(0)?))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(ids)
        })
        .await
    }
}

#[async_trait]
impl TransactionSubmitter for SqliteLedger {
    async fn submit(&self, payload: Bytes) -> Result<TransactionId> {
        run_blocking(&self.conn, move |conn| {
            let now = now_millis();
            let nonce = Uuid::new_v4();
            let txid = TransactionId::from_bytes(
                Sha256Hash::hash_parts(&[
                    &payload[..],
                    &nonce.as_bytes()[..],
                    &now.to_be_bytes()[..],
                ])
                .0,
            );

            conn.execute(
                "INSERT INTO transactions (txid, payload, submitted_at, block_height)
                 VALUES (?1, ?2, ?3, NULL)",
                params![txid.as_bytes().as_slice(), &payload[..], now],
            )?;
            Ok(txid)
        })
        .await
    }

    async fn status(&self, txid: &TransactionId) -> Result<TransactionStatus> {
        let txid = *txid;
        run_blocking(&self.conn, move |conn| {
            let row: Option<Option<i64>> = conn
                .query_row(
                    "SELECT block_height FROM transactions WHERE txid = ?1",
                    params![txid.as_bytes().as_slice()],
                    |row| row.get(0),
                )
                .optional()?;

            let included = match row {
                None => return Err(StorageError::NotFound(format!("transaction {}", txid))),
                Some(None) => return Ok(TransactionStatus::pending()),
                Some(Some(h)) => h,
            };

            let tip: i64 =
                conn.query_row("SELECT height FROM chain_state WHERE id = 1", [], |row| {
                    row.get(0)
                })?;

            Ok(TransactionStatus {
                confirmed: true,
                confirmations: (tip - included + 1) as u32,
                block_height: Some(included as u64),
            })
        })
        .await
    }

    async fn fetch(&self, txid: &TransactionId) -> Result<Option<Bytes>> {
        let txid = *txid;
        run_blocking(&self.conn, move |conn| {
            let payload: Option<Vec<u8>> = conn
                .query_row(
                    "SELECT payload FROM transactions WHERE txid = ?1",
                    params![txid.as_bytes().as_slice()],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(payload.map(Bytes::from))
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_blob_roundtrip() {
        let backend = SqliteBackend::open_memory().unwrap();
        let blobs = backend.blob_store();

        let hash = blobs.put(Bytes::from_static(b"chunk-0")).await.unwrap();
        assert_eq!(hash, BlobHash::of(b"chunk-0"));
        assert_eq!(blobs.get(&hash).await.unwrap().unwrap(), &b"chunk-0"[..]);
        assert!(blobs.get(&BlobHash::of(b"missing")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_blob_put_idempotent() {
        let backend = SqliteBackend::open_memory().unwrap();
        let blobs = backend.blob_store();
        let a = blobs.put(Bytes::from_static(b"same")).await.unwrap();
        let b = blobs.put(Bytes::from_static(b"same")).await.unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn test_ledger_lifecycle() {
        let backend = SqliteBackend::open_memory().unwrap();
        let ledger = backend.ledger();

        let txid = ledger.submit(Bytes::from_static(b"doc")).await.unwrap();
        assert_eq!(ledger.status(&txid).await.unwrap(), TransactionStatus::pending());
        assert_eq!(ledger.pending().await.unwrap(), vec![txid]);

        assert_eq!(ledger.mine_block().await.unwrap(), 1);
        assert_eq!(ledger.mine_block().await.unwrap(), 2);

        let status = ledger.status(&txid).await.unwrap();
        assert!(status.confirmed);
        assert_eq!(status.confirmations, 2);
        assert_eq!(status.block_height, Some(1));
        assert!(ledger.pending().await.unwrap().is_empty());

        assert_eq!(ledger.fetch(&txid).await.unwrap().unwrap(), &b"doc"[..]);
    }

    #[tokio::test]
    async fn test_unknown_transaction() {
        let ledger = SqliteBackend::open_memory().unwrap().ledger();
        let unknown = TransactionId::from_bytes([1u8; 32]);
        assert!(matches!(
            ledger.status(&unknown).await,
            Err(StorageError::NotFound(_))
        ));
        assert!(ledger.fetch(&unknown).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vellum.db");

        let (hash, txid) = {
            let backend = SqliteBackend::open(&path).unwrap();
            let hash = backend.blob_store().put(Bytes::from_static(b"kept")).await.unwrap();
            let txid = backend.ledger().submit(Bytes::from_static(b"tx")).await.unwrap();
            (hash, txid)
        };

        let backend = SqliteBackend::open(&path).unwrap();
        assert!(backend.blob_store().get(&hash).await.unwrap().is_some());
        assert!(backend.ledger().fetch(&txid).await.unwrap().is_some());
    }
}
