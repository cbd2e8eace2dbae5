//! Test fixtures and helpers.

use std::sync::Arc;

use vellum::{Vault, VaultConfig};
use vellum_auth::{AllowList, Authenticated, Capability, ChallengeResponse, ConsentProvider, DenyAll};
use vellum_core::{Ed25519PublicKey, Keypair, KeypairSigner};
use vellum_store::{MemoryBlobStore, MemoryLedger};

/// A vault over memory stores, plus a wallet that owns its documents.
///
/// The stores are shared with the vault, so failures can be injected after
/// construction.
pub struct TestFixture {
    pub signer: KeypairSigner,
    pub blobs: Arc<MemoryBlobStore>,
    pub ledger: Arc<MemoryLedger>,
    pub vault: Vault,
}

impl TestFixture {
    /// A fixture with a random wallet and default configuration.
    pub fn new() -> Self {
        Self::build(Keypair::generate(), VaultConfig::default(), Arc::new(DenyAll))
    }

    /// A fixture with a deterministic wallet.
    pub fn with_seed(seed: [u8; 32]) -> Self {
        Self::build(
            Keypair::from_seed(&seed),
            VaultConfig::default(),
            Arc::new(DenyAll),
        )
    }

    pub fn with_config(config: VaultConfig) -> Self {
        Self::build(Keypair::generate(), config, Arc::new(DenyAll))
    }

    /// A fixture whose consent provider approves `capabilities` for `origin`.
    pub fn with_consent(origin: &str, capabilities: &[Capability]) -> Self {
        let consent = AllowList::new().allow(origin, capabilities.iter().copied());
        Self::build(Keypair::generate(), VaultConfig::default(), Arc::new(consent))
    }

    fn build(keypair: Keypair, config: VaultConfig, consent: Arc<dyn ConsentProvider>) -> Self {
        let blobs = Arc::new(MemoryBlobStore::new());
        let ledger = Arc::new(MemoryLedger::new());
        let vault = Vault::new(config, blobs.clone(), ledger.clone(), consent)
            .unwrap_or_else(|e| panic!("invalid fixture config: {}", e));
        Self {
            signer: KeypairSigner::new(keypair),
            blobs,
            ledger,
            vault,
        }
    }

    pub fn public_key(&self) -> Ed25519PublicKey {
        self.signer.public_key()
    }

    /// Run the challenge-response handshake for `origin` with this wallet.
    pub async fn login(&self, origin: &str) -> Authenticated {
        let auth = self.vault.auth();
        let challenge = auth.request_challenge(origin);
        let response = ChallengeResponse::sign(&self.signer, &challenge, origin)
            .await
            .unwrap_or_else(|e| panic!("signing failed: {}", e));
        auth.verify(origin, &response)
            .unwrap_or_else(|e| panic!("handshake failed: {}", e))
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vellum::StoreOptions;

    #[tokio::test]
    async fn test_fixture_shares_stores() {
        let fixture = TestFixture::with_seed([9u8; 32]);
        fixture
            .vault
            .store_document(&vec![1u8; 60_000], &StoreOptions::default(), None)
            .await
            .unwrap();
        assert_eq!(fixture.blobs.len(), 1);
        assert_eq!(fixture.ledger.len(), 1);
    }

    #[tokio::test]
    async fn test_login() {
        let fixture = TestFixture::new();
        let ok = fixture.login("https://app.example").await;
        assert_eq!(ok.identity.public_key, fixture.public_key());
        assert!(fixture
            .vault
            .auth()
            .verify_session(&ok.session.token, "https://app.example"));
    }
}
