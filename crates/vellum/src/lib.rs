//! # Vellum
//!
//! A document vault keyed by wallets: content is encrypted under keys derived
//! from the owner's signature, persisted on-chain, hybrid or chunked by size,
//! and accessed through challenge-response wallet authentication.
//!
//! ## Key Concepts
//!
//! - **Signature-derived key**: the wallet signs a per-document message; the
//!   signature is stretched into an AES-256 key. No key material is stored.
//! - **Tier**: on-chain up to 50 KB, hybrid (blob + on-chain reference) up to
//!   1 MB, chunked (blobs + on-chain manifest) beyond.
//! - **Session**: an origin-bound token issued after a wallet answers a
//!   single-use challenge.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use vellum::{StoreOptions, Vault, VaultConfig};
//! use vellum::auth::DenyAll;
//! use vellum::core::{Keypair, KeypairSigner};
//!
//! # async fn example() -> vellum::Result<()> {
//! let vault = Vault::open(VaultConfig::load("vellum.toml")?, "vault.db", Arc::new(DenyAll))?;
//! let owner = KeypairSigner::new(Keypair::generate());
//!
//! let options = StoreOptions::encrypted().title("Lease");
//! let estimate = vault.estimate(b"lease terms", &options)?;
//! let record = vault.store_document(b"lease terms", &options, Some(&owner)).await?;
//! assert_eq!(estimate.method, record.method);
//!
//! let content = vault.retrieve_document(&record, Some(&owner)).await?;
//! assert_eq!(content, b"lease terms");
//! # Ok(())
//! # }
//! ```
//!
//! ## Re-exports
//!
//! - `vellum::core` - keys, hashes, the `WalletSigner` port
//! - `vellum::cipher` - signature-derived encryption and envelopes
//! - `vellum::store` - tier selection, ports and adapters
//! - `vellum::auth` - wallet authentication, sessions, permissions

pub mod config;
pub mod error;
pub mod vault;

pub use vellum_auth as auth;
pub use vellum_cipher as cipher;
pub use vellum_core as core;
pub use vellum_store as store;

pub use config::VaultConfig;
pub use error::{Result, VaultError};
pub use vault::Vault;

pub use vellum_core::{Ed25519PublicKey, Keypair, KeypairSigner, WalletSigner};
pub use vellum_store::{CostEstimate, StorageMethod, StorageRecord, StoreOptions};
