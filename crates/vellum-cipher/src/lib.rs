//! # Vellum Cipher
//!
//! Password-free document encryption keyed by wallet signatures.
//!
//! ## Overview
//!
//! The wallet signs a per-document message. The signature never leaves this
//! crate; it is stretched with PBKDF2 into a 256-bit key which drives both
//! AES-256-CBC and an HMAC-SHA256 integrity tag. Decrypting means asking the
//! same wallet to sign the same message again, which is why the signer must
//! be deterministic.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use vellum_cipher::{ContentCipher, DocumentEnvelope, DocumentMetadata};
//! use vellum_core::{Keypair, KeypairSigner};
//!
//! # async fn example() -> vellum_cipher::Result<()> {
//! let cipher = ContentCipher::default();
//! let signer = KeypairSigner::new(Keypair::generate());
//!
//! let meta = DocumentMetadata::new(Some("Notes".into()), None, 1_700_000_000_000, 5);
//! let sealed = DocumentEnvelope::seal(&cipher, b"hello", meta, &signer).await?;
//! let plain = sealed.open(&cipher, &signer).await?;
//! assert_eq!(plain, b"hello");
//! # Ok(())
//! # }
//! ```

pub mod cipher;
pub mod envelope;
pub mod error;
pub mod kdf;
pub mod package;

pub use cipher::{CipherConfig, ContentCipher, SignerDeterminism};
pub use envelope::{key_derivation_message, DocumentEnvelope, DocumentMetadata};
pub use error::{EncryptionError, Result};
pub use kdf::DerivedKey;
pub use package::{EncryptedPackage, EncryptionMethod, PACKAGE_VERSION};
