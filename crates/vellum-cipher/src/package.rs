//! Encrypted package wire format.
//!
//! Wire shape (the `e` object of a document envelope):
//!
//! ```json
//! {
//!   "encryptedContent": "<base64>",
//!   "encryptionMethod": "Signature-AES256-CBC-HMAC-SHA256",
//!   "keyDerivationData": "Encrypt document: Title - 1700000000000",
//!   "iv": "<32 hex chars>",
//!   "hmac": "<64 hex chars>",
//!   "publicKey": "<64 hex chars, optional>"
//! }
//! ```

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use vellum_core::Ed25519PublicKey;

use crate::error::{EncryptionError, Result};

/// Current package version, carried as `v` on the wire.
pub const PACKAGE_VERSION: &str = "1.0";

/// AES block size; also the IV length.
pub const IV_LEN: usize = 16;

/// Encryption scheme identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EncryptionMethod {
    /// PBKDF2-derived key, AES-256-CBC with PKCS#7, HMAC-SHA256 over
    /// `message || iv || ciphertext`.
    #[serde(rename = "Signature-AES256-CBC-HMAC-SHA256")]
    SignatureAes256Cbc,
}

/// An encrypted payload plus everything needed to re-derive its key.
///
/// Immutable once produced by [`ContentCipher::encrypt`](crate::ContentCipher::encrypt).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncryptedPackage {
    /// Format version; travels as the envelope's `v`.
    #[serde(skip, default = "default_version")]
    pub version: String,

    #[serde(with = "base64_bytes")]
    pub encrypted_content: Vec<u8>,

    pub encryption_method: EncryptionMethod,

    /// The exact message the wallet signed to derive the key.
    #[serde(rename = "keyDerivationData")]
    pub key_derivation_message: String,

    #[serde(with = "hex_array")]
    pub iv: [u8; IV_LEN],

    #[serde(with = "hex_array")]
    pub hmac: [u8; 32],

    /// Public key of the signer that produced the package.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_key: Option<Ed25519PublicKey>,
}

fn default_version() -> String {
    PACKAGE_VERSION.to_string()
}

#[derive(Serialize)]
struct PackageDocumentRef<'a> {
    v: &'a str,
    e: &'a EncryptedPackage,
}

#[derive(Deserialize)]
struct PackageDocument {
    v: String,
    e: EncryptedPackage,
}

impl EncryptedPackage {
    /// A package with the exact serialized shape `encrypt` would produce for
    /// a plaintext of `plaintext_len` bytes, with zeroed cryptographic fields.
    ///
    /// Used to size envelopes without signing anything.
    pub fn projected(plaintext_len: usize, message: String, with_public_key: bool) -> Self {
        Self {
            version: default_version(),
            encrypted_content: vec![0u8; padded_len(plaintext_len)],
            encryption_method: EncryptionMethod::SignatureAes256Cbc,
            key_derivation_message: message,
            iv: [0u8; IV_LEN],
            hmac: [0u8; 32],
            public_key: with_public_key.then(|| Ed25519PublicKey::from_bytes([0u8; 32])),
        }
    }

    /// Whether a wallet with `public_key` may be able to decrypt this package.
    ///
    /// Packages without a recorded key can only be checked by attempting
    /// decryption.
    pub fn can_decrypt(&self, public_key: &Ed25519PublicKey) -> bool {
        self.public_key.map_or(true, |pk| pk == *public_key)
    }

    /// Serialize as `{"v": ..., "e": {...}}`.
    pub fn to_json(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(&PackageDocumentRef {
            v: &self.version,
            e: self,
        })
        .map_err(|e| EncryptionError::Encoding(e.to_string()))
    }

    /// Parse `{"v": ..., "e": {...}}`. Extra top-level fields are ignored.
    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        let doc: PackageDocument =
            serde_json::from_slice(bytes).map_err(|e| EncryptionError::Encoding(e.to_string()))?;
        check_version(&doc.v)?;
        let mut package = doc.e;
        package.version = doc.v;
        Ok(package)
    }
}

/// Reject versions this crate cannot decrypt.
pub(crate) fn check_version(version: &str) -> Result<()> {
    if version != PACKAGE_VERSION {
        return Err(EncryptionError::UnsupportedVersion(version.to_string()));
    }
    Ok(())
}

/// AES-CBC ciphertext length for a plaintext under PKCS#7 padding.
pub const fn padded_len(plaintext_len: usize) -> usize {
    (plaintext_len / IV_LEN + 1) * IV_LEN
}

mod base64_bytes {
    use super::*;
    use serde::{Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        STANDARD.decode(s).map_err(serde::de::Error::custom)
    }
}

mod hex_array {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer, const N: usize>(
        bytes: &[u8; N],
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>, const N: usize>(
        deserializer: D,
    ) -> Result<[u8; N], D::Error> {
        let s = String::deserialize(deserializer)?;
        let bytes = hex::decode(s).map_err(serde::de::Error::custom)?;
        bytes.try_into().map_err(|b: Vec<u8>| {
            serde::de::Error::custom(format!("expected {} bytes, got {}", N, b.len()))
        })
    }
}
