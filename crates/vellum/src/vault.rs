//! The Vault: one handle over storage and wallet auth.

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info};
use vellum_auth::{ConsentProvider, WalletAuthProtocol};
use vellum_cipher::{ContentCipher, DocumentEnvelope};
use vellum_core::WalletSigner;
use vellum_store::{
    BlobStore, CostEstimate, PartialUpload, SqliteBackend, StorageError, StorageRecord,
    StorageTierSelector, StoreOptions, TransactionStatus, TransactionSubmitter,
};

use crate::config::VaultConfig;
use crate::error::Result;

/// Document storage and wallet authentication behind one configuration.
pub struct Vault {
    config: VaultConfig,
    selector: StorageTierSelector,
    auth: WalletAuthProtocol,
}

impl Vault {
    pub fn new(
        config: VaultConfig,
        blob_store: Arc<dyn BlobStore>,
        ledger: Arc<dyn TransactionSubmitter>,
        consent: Arc<dyn ConsentProvider>,
    ) -> Result<Self> {
        config.validate()?;
        let selector = StorageTierSelector::new(
            blob_store,
            ledger,
            ContentCipher::new(config.cipher.clone()),
            config.tiers.clone(),
        )?;
        let auth = WalletAuthProtocol::new(config.auth.clone(), consent);
        Ok(Self {
            config,
            selector,
            auth,
        })
    }

    /// A vault whose blobs and ledger journal live in one SQLite file.
    pub fn open(
        config: VaultConfig,
        path: impl AsRef<Path>,
        consent: Arc<dyn ConsentProvider>,
    ) -> Result<Self> {
        let backend = SqliteBackend::open(path.as_ref())?;
        info!(path = %path.as_ref().display(), "opened vault");
        Self::new(
            config,
            Arc::new(backend.blob_store()),
            Arc::new(backend.ledger()),
            consent,
        )
    }

    pub fn config(&self) -> &VaultConfig {
        &self.config
    }

    pub fn auth(&self) -> &WalletAuthProtocol {
        &self.auth
    }

    pub fn selector(&self) -> &StorageTierSelector {
        &self.selector
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Documents
    // ─────────────────────────────────────────────────────────────────────────

    /// Store a document. Encryption needs the owner's signer.
    pub async fn store_document(
        &self,
        content: &[u8],
        options: &StoreOptions,
        signer: Option<&dyn WalletSigner>,
    ) -> Result<StorageRecord> {
        Ok(self.selector.store(content, options, signer).await?)
    }

    /// Price a store without touching the backends.
    pub fn estimate(&self, content: &[u8], options: &StoreOptions) -> Result<CostEstimate> {
        Ok(self.selector.estimate_cost_with(content, options)?)
    }

    /// Finish a chunked store that failed part-way.
    pub async fn resume_upload(&self, partial: &PartialUpload) -> Result<StorageRecord> {
        Ok(self.selector.resume_chunked(partial).await?)
    }

    /// Read a document back, opening its envelope when it was encrypted.
    pub async fn retrieve_document(
        &self,
        record: &StorageRecord,
        signer: Option<&dyn WalletSigner>,
    ) -> Result<Vec<u8>> {
        let payload = self.selector.retrieve(record).await?;
        if !record.metadata.encrypted {
            return Ok(payload.to_vec());
        }

        let signer = signer.ok_or(StorageError::SignerRequired)?;
        let envelope = DocumentEnvelope::from_json(&payload)?;
        debug!(txid = %record.transaction_id, "opening envelope");
        Ok(envelope.open(self.selector.cipher(), signer).await?)
    }

    pub async fn confirmation(&self, record: &StorageRecord) -> Result<TransactionStatus> {
        Ok(self.selector.confirmation(record).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::VaultError;
    use vellum_auth::{AllowList, Capability, ChallengeResponse, DenyAll, PermissionRequest};
    use vellum_cipher::EncryptionError;
    use vellum_core::{Keypair, KeypairSigner};
    use vellum_store::{MemoryBlobStore, MemoryLedger, StorageMethod};

    fn vault() -> Vault {
        Vault::new(
            VaultConfig::default(),
            Arc::new(MemoryBlobStore::new()),
            Arc::new(MemoryLedger::new()),
            Arc::new(DenyAll),
        )
        .unwrap()
    }

    fn signer(seed: u8) -> KeypairSigner {
        KeypairSigner::new(Keypair::from_seed(&[seed; 32]))
    }

    #[tokio::test]
    async fn test_plain_document_roundtrip() {
        let vault = vault();
        let record = vault
            .store_document(b"meeting notes", &StoreOptions::default(), None)
            .await
            .unwrap();
        assert_eq!(record.method, StorageMethod::OnChain);
        assert_eq!(
            vault.retrieve_document(&record, None).await.unwrap(),
            b"meeting notes"
        );
    }

    #[tokio::test]
    async fn test_encrypted_document_needs_owner() {
        let vault = vault();
        let owner = signer(1);
        let options = StoreOptions::encrypted().title("Contract");

        let record = vault
            .store_document(b"terms and conditions", &options, Some(&owner))
            .await
            .unwrap();
        assert!(record.metadata.encrypted);

        assert_eq!(
            vault.retrieve_document(&record, Some(&owner)).await.unwrap(),
            b"terms and conditions"
        );

        assert!(matches!(
            vault.retrieve_document(&record, None).await,
            Err(VaultError::Storage(StorageError::SignerRequired))
        ));

        let stranger = signer(2);
        assert!(matches!(
            vault.retrieve_document(&record, Some(&stranger)).await,
            Err(VaultError::Encryption(EncryptionError::PublicKeyMismatch { .. }))
        ));
    }

    #[tokio::test]
    async fn test_estimate_agrees_with_store() {
        let vault = vault();
        let owner = signer(3);
        let content = vec![b'a'; 60_000];

        for options in [StoreOptions::default(), StoreOptions::encrypted().title("x")] {
            let estimate = vault.estimate(&content, &options).unwrap();
            let record = vault
                .store_document(&content, &options, Some(&owner))
                .await
                .unwrap();
            assert_eq!(estimate.method, record.method);
            assert_eq!(estimate.cost, record.cost);
        }
    }

    #[tokio::test]
    async fn test_sqlite_vault_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vault.db");

        let record = {
            let vault = Vault::open(VaultConfig::default(), &path, Arc::new(DenyAll)).unwrap();
            vault
                .store_document(&vec![7u8; 80_000], &StoreOptions::default(), None)
                .await
                .unwrap()
        };

        let vault = Vault::open(VaultConfig::default(), &path, Arc::new(DenyAll)).unwrap();
        assert_eq!(
            vault.retrieve_document(&record, None).await.unwrap(),
            vec![7u8; 80_000]
        );
        assert!(!vault.confirmation(&record).await.unwrap().confirmed);
    }

    #[tokio::test]
    async fn test_auth_uses_vault_config() {
        let mut config = VaultConfig::default();
        config.auth.session_ttl_ms = 1_000;
        let consent = AllowList::new().allow("https://app.example", [Capability::Sign]);
        let vault = Vault::new(
            config,
            Arc::new(MemoryBlobStore::new()),
            Arc::new(MemoryLedger::new()),
            Arc::new(consent),
        )
        .unwrap();

        let wallet = signer(4);
        let origin = "https://app.example";
        let challenge = vault.auth().request_challenge_at(origin, 0);
        let response = ChallengeResponse::sign(&wallet, &challenge, origin)
            .await
            .unwrap();
        let ok = vault.auth().verify_at(origin, &response, 10).unwrap();
        assert_eq!(ok.session.expires_at, 1_010);

        let grants = vault
            .auth()
            .request_permissions(origin, &[PermissionRequest::required(Capability::Sign, "sign")])
            .await
            .unwrap();
        assert_eq!(grants.len(), 1);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = VaultConfig::default();
        config.tiers.chunk_size_bytes = 0;
        assert!(Vault::new(
            config,
            Arc::new(MemoryBlobStore::new()),
            Arc::new(MemoryLedger::new()),
            Arc::new(DenyAll),
        )
        .is_err());
    }
}
