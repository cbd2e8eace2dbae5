//! Signer doubles for failure injection.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use rand::RngCore;
use vellum_core::{
    CoreError, Ed25519PublicKey, Keypair, KeypairSigner, Result, SignedMessage, WalletSigner,
};

/// Signs a random nonce along with each message, so repeated requests for
/// the same message return different signatures under the same key.
#[derive(Debug, Clone)]
pub struct NonDeterministicSigner {
    keypair: Keypair,
}

impl NonDeterministicSigner {
    pub fn new(keypair: Keypair) -> Self {
        Self { keypair }
    }

    pub fn public_key(&self) -> Ed25519PublicKey {
        self.keypair.public_key()
    }
}

#[async_trait]
impl WalletSigner for NonDeterministicSigner {
    async fn sign(&self, message: &str) -> Result<SignedMessage> {
        let mut nonce = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut nonce);
        let mut input = message.as_bytes().to_vec();
        input.extend_from_slice(&nonce);
        Ok(SignedMessage {
            signature: self.keypair.sign(&input),
            public_key: self.keypair.public_key(),
        })
    }
}

/// A wallet that refuses every request.
#[derive(Debug, Clone, Default)]
pub struct FailingSigner {
    reason: String,
}

impl FailingSigner {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl WalletSigner for FailingSigner {
    async fn sign(&self, _message: &str) -> Result<SignedMessage> {
        Err(CoreError::SignFailed(self.reason.clone()))
    }
}

/// Wraps a [`KeypairSigner`] and counts sign requests.
#[derive(Debug)]
pub struct CountingSigner {
    inner: KeypairSigner,
    calls: AtomicUsize,
}

impl CountingSigner {
    pub fn new(keypair: Keypair) -> Self {
        Self {
            inner: KeypairSigner::new(keypair),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn public_key(&self) -> Ed25519PublicKey {
        self.inner.public_key()
    }
}

#[async_trait]
impl WalletSigner for CountingSigner {
    async fn sign(&self, message: &str) -> Result<SignedMessage> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.sign(message).await
    }
}
