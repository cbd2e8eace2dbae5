//! Document envelope: an encrypted package plus plaintext metadata.
//!
//! This is the payload that gets persisted when a document is stored
//! encrypted: `{"v": "1.0", "e": {...package...}, "m": {...metadata...}}`.

use serde::{Deserialize, Serialize};
use vellum_core::WalletSigner;

use crate::cipher::ContentCipher;
use crate::error::{EncryptionError, Result};
use crate::package::{check_version, EncryptedPackage, EncryptionMethod, PACKAGE_VERSION};

/// Build the message a wallet signs to derive a document key.
pub fn key_derivation_message(title: Option<&str>, timestamp: i64) -> String {
    format!(
        "Encrypt document: {} - {}",
        title.unwrap_or("Untitled"),
        timestamp
    )
}

/// Plaintext metadata stored alongside an encrypted document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,

    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,

    pub encrypted: bool,

    pub method: EncryptionMethod,

    /// Plaintext length in bytes.
    pub original_size: u64,
}

impl DocumentMetadata {
    pub fn new(
        title: Option<String>,
        author: Option<String>,
        timestamp: i64,
        original_size: u64,
    ) -> Self {
        Self {
            title,
            author,
            timestamp,
            encrypted: true,
            method: EncryptionMethod::SignatureAes256Cbc,
            original_size,
        }
    }

    /// The key-derivation message for this document.
    pub fn key_derivation_message(&self) -> String {
        key_derivation_message(self.title.as_deref(), self.timestamp)
    }
}

/// A sealed document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentEnvelope {
    #[serde(rename = "v")]
    pub version: String,

    #[serde(rename = "e")]
    pub package: EncryptedPackage,

    #[serde(rename = "m")]
    pub metadata: DocumentMetadata,
}

impl DocumentEnvelope {
    /// Encrypt `content` and wrap it with `metadata`.
    pub async fn seal<S>(
        cipher: &ContentCipher,
        content: &[u8],
        metadata: DocumentMetadata,
        signer: &S,
    ) -> Result<Self>
    where
        S: WalletSigner + ?Sized,
    {
        let message = metadata.key_derivation_message();
        let package = cipher.encrypt(content, &message, signer).await?;
        Ok(Self {
            version: PACKAGE_VERSION.to_string(),
            package,
            metadata,
        })
    }

    /// An envelope with the same serialized length `seal` would produce.
    ///
    /// Sealing always records the signer's public key.
    pub fn projected(metadata: DocumentMetadata) -> Self {
        let package = EncryptedPackage::projected(
            metadata.original_size as usize,
            metadata.key_derivation_message(),
            true,
        );
        Self {
            version: PACKAGE_VERSION.to_string(),
            package,
            metadata,
        }
    }

    /// Decrypt the enclosed content.
    pub async fn open<S>(&self, cipher: &ContentCipher, signer: &S) -> Result<Vec<u8>>
    where
        S: WalletSigner + ?Sized,
    {
        check_version(&self.version)?;
        cipher.decrypt(&self.package, signer).await
    }

    pub fn to_json(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| EncryptionError::Encoding(e.to_string()))
    }

    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        let mut envelope: Self =
            serde_json::from_slice(bytes).map_err(|e| EncryptionError::Encoding(e.to_string()))?;
        check_version(&envelope.version)?;
        envelope.package.version = envelope.version.clone();
        Ok(envelope)
    }

    /// Cheap sniff for whether stored bytes look like a sealed document.
    pub fn is_envelope(bytes: &[u8]) -> bool {
        #[derive(Deserialize)]
        struct Shape {
            #[allow(dead_code)]
            v: String,
            m: ShapeMeta,
        }
        #[derive(Deserialize)]
        struct ShapeMeta {
            encrypted: bool,
        }

        serde_json::from_slice::<Shape>(bytes)
            .map(|p| p.m.encrypted)
            .unwrap_or(false)
    }
}
