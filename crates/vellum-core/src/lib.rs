//! # Vellum Core
//!
//! Pure primitives shared by the Vellum document-storage and authentication
//! crates: strongly typed identifiers, Ed25519 keys and signatures, hashes,
//! and the wallet signing port.
//!
//! This crate performs no storage or network I/O. The only async surface is
//! the [`WalletSigner`] trait, which models an external wallet.
//!
//! ## Key Types
//!
//! - [`Ed25519PublicKey`] / [`Ed25519Signature`] / [`Keypair`] - wallet keys
//! - [`Sha256Hash`] - content hashes and key-derivation salts
//! - [`BlobHash`] - content address in a blob store (Blake3)
//! - [`TransactionId`] - identifier returned by a transaction submitter
//! - [`WalletSigner`] - `sign(message) -> {signature, publicKey}`
//!
//! ## Signing
//!
//! ```rust
//! use vellum_core::{Keypair, KeypairSigner, WalletSigner};
//!
//! # async fn example() {
//! let signer = KeypairSigner::new(Keypair::generate());
//! let signed = signer.sign("hello").await.unwrap();
//! signed.public_key.verify(b"hello", &signed.signature).unwrap();
//! # }
//! ```

pub mod crypto;
pub mod error;
pub mod signer;
pub mod types;

pub use crypto::{Blake3Hash, Ed25519PublicKey, Ed25519Signature, Keypair, Sha256Hash};
pub use error::{CoreError, Result};
pub use signer::{KeypairSigner, SignedMessage, WalletSigner};
pub use types::{now_millis, BlobHash, TransactionId};
