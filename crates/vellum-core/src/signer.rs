//! The wallet signing port.
//!
//! A wallet signing provider exposes `sign(message) -> {signature, publicKey}`.
//! Content encryption derives keys from the returned signature, so a provider
//! used for encryption must return identical bytes for an identical message.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::crypto::{Ed25519PublicKey, Ed25519Signature, Keypair};
use crate::error::Result;

/// Output of a wallet signing request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedMessage {
    pub signature: Ed25519Signature,
    pub public_key: Ed25519PublicKey,
}

/// A wallet signing provider.
///
/// Implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait WalletSigner: Send + Sync {
    /// Sign a UTF-8 message with the wallet's identity key.
    async fn sign(&self, message: &str) -> Result<SignedMessage>;
}

/// Signs with a local Ed25519 keypair.
///
/// Deterministic, so it satisfies the precondition for signature-derived
/// encryption keys.
#[derive(Debug, Clone)]
pub struct KeypairSigner {
    keypair: Keypair,
}

impl KeypairSigner {
    pub fn new(keypair: Keypair) -> Self {
        Self { keypair }
    }

    /// The public key this signer reports.
    pub fn public_key(&self) -> Ed25519PublicKey {
        self.keypair.public_key()
    }
}

#[async_trait]
impl WalletSigner for KeypairSigner {
    async fn sign(&self, message: &str) -> Result<SignedMessage> {
        Ok(SignedMessage {
            signature: self.keypair.sign(message.as_bytes()),
            public_key: self.keypair.public_key(),
        })
    }
}

#[async_trait]
impl<T: WalletSigner + ?Sized> WalletSigner for std::sync::Arc<T> {
    async fn sign(&self, message: &str) -> Result<SignedMessage> {
        (**self).sign(message).await
    }
}
