//! # Vellum Store
//!
//! Size-tiered document persistence.
//!
//! ## Overview
//!
//! [`StorageTierSelector`] measures the final payload (the sealed envelope
//! when encrypting) and picks a strategy:
//!
//! | Payload size            | Method    | Written                              |
//! |-------------------------|-----------|--------------------------------------|
//! | `n <= 50 KB`            | on-chain  | payload as a transaction             |
//! | `50 KB < n <= 1 MB`     | hybrid    | blob + on-chain [`HybridRecord`]     |
//! | `n > 1 MB`, compresses  | hybrid    | zstd blob + on-chain record          |
//! | `n > 1 MB`, otherwise   | chunked   | 500 KB blobs + on-chain [`ChunkManifest`] |
//!
//! Thresholds and fees live in [`TierConfig`].
//!
//! ## Ports
//!
//! - [`BlobStore`] - content-addressed `put`/`get`
//! - [`TransactionSubmitter`] - `submit`/`status`/`fetch`
//!
//! [`SqliteBackend`] provides production adapters for both; [`MemoryBlobStore`]
//! and [`MemoryLedger`] are test doubles with failure injection.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use vellum_cipher::ContentCipher;
//! use vellum_store::{SqliteBackend, StorageTierSelector, StoreOptions, TierConfig};
//!
//! # async fn example() -> vellum_store::Result<()> {
//! let backend = SqliteBackend::open("vellum.db")?;
//! let selector = StorageTierSelector::new(
//!     Arc::new(backend.blob_store()),
//!     Arc::new(backend.ledger()),
//!     ContentCipher::default(),
//!     TierConfig::default(),
//! )?;
//!
//! let estimate = selector.estimate_cost(b"hello", false)?;
//! let record = selector.store(b"hello", &StoreOptions::default(), None).await?;
//! assert_eq!(estimate.method, record.method);
//! # Ok(())
//! # }
//! ```

pub mod compression;
pub mod error;
pub mod manifest;
pub mod memory;
pub mod migration;
pub mod selector;
pub mod sqlite;
pub mod tier;
pub mod traits;

pub use compression::Compression;
pub use error::{PartialUpload, Result, StorageError};
pub use manifest::{ChunkManifest, HybridRecord, RecordMetadata, StorageRecord, RECORD_TYPE};
pub use memory::{MemoryBlobStore, MemoryLedger};
pub use selector::{StorageTierSelector, StoreOptions};
pub use sqlite::{SqliteBackend, SqliteBlobStore, SqliteLedger};
pub use tier::{CostEstimate, StorageMethod, TierConfig, TierPlan};
pub use traits::{BlobStore, TransactionStatus, TransactionSubmitter};
