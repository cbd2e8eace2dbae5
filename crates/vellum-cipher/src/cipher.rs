//! Authenticated content encryption keyed by wallet signatures.
//!
//! Encrypt-then-MAC: AES-256-CBC (PKCS#7) under a [`DerivedKey`], with an
//! HMAC-SHA256 over `message || iv || ciphertext` using the same key.
//! Decryption verifies the MAC before touching the ciphertext.

use cbc::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use hmac::{Hmac, Mac};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use tracing::{debug, warn};
use vellum_core::WalletSigner;

use crate::error::{EncryptionError, Result};
use crate::kdf::DerivedKey;
use crate::package::{check_version, EncryptedPackage, EncryptionMethod, IV_LEN};

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;
type HmacSha256 = Hmac<Sha256>;

/// How much to trust the signer's determinism.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignerDeterminism {
    /// Sign once. The signer is documented as deterministic.
    #[default]
    Assume,
    /// Sign twice before encrypting and refuse if the signatures differ.
    Verify,
}

/// Cipher configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CipherConfig {
    /// PBKDF2 iteration count. Signatures are already high-entropy, so this
    /// stays low.
    pub kdf_iterations: u32,

    pub determinism: SignerDeterminism,
}

impl Default for CipherConfig {
    fn default() -> Self {
        Self {
            kdf_iterations: 1000,
            determinism: SignerDeterminism::Assume,
        }
    }
}

impl CipherConfig {
    pub fn validate(&self) -> Result<()> {
        if self.kdf_iterations == 0 {
            return Err(EncryptionError::InvalidConfig(
                "kdf_iterations must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Encrypts and decrypts content with keys re-derived from wallet signatures.
#[derive(Debug, Clone, Default)]
pub struct ContentCipher {
    config: CipherConfig,
}

impl ContentCipher {
    pub fn new(config: CipherConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CipherConfig {
        &self.config
    }

    /// Encrypt `content` under a key derived from the signer's signature
    /// over `message`.
    pub async fn encrypt<S>(&self, content: &[u8], message: &str, signer: &S) -> Result<EncryptedPackage>
    where
        S: WalletSigner + ?Sized,
    {
        let signed = signer.sign(message).await?;

        if self.config.determinism == SignerDeterminism::Verify {
            let again = signer.sign(message).await?;
            if again.signature != signed.signature || again.public_key != signed.public_key {
                warn!(public_key = %signed.public_key, "signer produced differing signatures");
                return Err(EncryptionError::NonDeterministicSigner);
            }
        }

        let key = DerivedKey::derive(&signed.signature, message, self.config.kdf_iterations);

        let mut iv = [0u8; IV_LEN];
        rand::thread_rng().fill_bytes(&mut iv);

        let ciphertext = Aes256CbcEnc::new_from_slices(key.as_bytes(), &iv)
            .map_err(|e| EncryptionError::Encoding(e.to_string()))?
            .encrypt_padded_vec_mut::<Pkcs7>(content);

        let hmac = compute_mac(&key, message, &iv, &ciphertext)?.finalize().into_bytes();

        debug!(
            plaintext_len = content.len(),
            ciphertext_len = ciphertext.len(),
            "encrypted content"
        );

        Ok(EncryptedPackage {
            version: crate::package::PACKAGE_VERSION.to_string(),
            encrypted_content: ciphertext,
            encryption_method: EncryptionMethod::SignatureAes256Cbc,
            key_derivation_message: message.to_string(),
            iv,
            hmac: hmac.into(),
            public_key: Some(signed.public_key),
        })
    }

    /// Decrypt a package by re-signing its key-derivation message.
    ///
    /// Fails with `PublicKeyMismatch` if the package names a different
    /// signer, and with `IntegrityMismatch` if the MAC does not verify.
    /// Ciphertext is only decrypted after both checks pass.
    pub async fn decrypt<S>(&self, package: &EncryptedPackage, signer: &S) -> Result<Vec<u8>>
    where
        S: WalletSigner + ?Sized,
    {
        check_version(&package.version)?;

        let message = &package.key_derivation_message;
        let signed = signer.sign(message).await?;

        if let Some(expected) = package.public_key {
            if expected != signed.public_key {
                return Err(EncryptionError::PublicKeyMismatch {
                    expected,
                    actual: signed.public_key,
                });
            }
        }

        let key = DerivedKey::derive(&signed.signature, message, self.config.kdf_iterations);

        compute_mac(&key, message, &package.iv, &package.encrypted_content)?
            .verify_slice(&package.hmac)
            .map_err(|_| {
                warn!("package failed integrity check");
                EncryptionError::IntegrityMismatch
            })?;

        Aes256CbcDec::new_from_slices(key.as_bytes(), &package.iv)
            .map_err(|e| EncryptionError::Decryption(e.to_string()))?
            .decrypt_padded_vec_mut::<Pkcs7>(&package.encrypted_content)
            .map_err(|e| EncryptionError::Decryption(e.to_string()))
    }
}

fn compute_mac(key: &DerivedKey, message: &str, iv: &[u8], ciphertext: &[u8]) -> Result<HmacSha256> {
    let mut mac = HmacSha256::new_from_slice(key.as_bytes())
        .map_err(|e| EncryptionError::Encoding(e.to_string()))?;
    mac.update(message.as_bytes());
    mac.update(iv);
    mac.update(ciphertext);
    Ok(mac)
}
