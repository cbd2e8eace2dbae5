//! The storage tier selector.
//!
//! Picks on-chain, hybrid or chunked persistence from the size of the final
//! payload, optionally sealing the document first.

use std::sync::Arc;

use bytes::Bytes;
use futures::future::join_all;
use tracing::{debug, info, warn};
use vellum_cipher::{ContentCipher, DocumentEnvelope, DocumentMetadata};
use vellum_core::{now_millis, BlobHash, Sha256Hash, TransactionId, WalletSigner};

use crate::compression::{self, Compression};
use crate::error::{PartialUpload, Result, StorageError};
use crate::manifest::{ChunkManifest, HybridRecord, RecordMetadata, StorageRecord};
use crate::tier::{self, CostEstimate, StorageMethod, TierConfig, TierPlan};
use crate::traits::{BlobStore, TransactionStatus, TransactionSubmitter};

/// Caller options for a store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreOptions {
    /// Seal the content in an encrypted envelope first.
    pub encrypt: bool,
    pub title: Option<String>,
    pub author: Option<String>,
}

impl StoreOptions {
    pub fn encrypted() -> Self {
        Self {
            encrypt: true,
            ..Default::default()
        }
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }
}

/// Chooses a persistence strategy per document and drives the ports.
pub struct StorageTierSelector {
    blobs: Arc<dyn BlobStore>,
    ledger: Arc<dyn TransactionSubmitter>,
    cipher: ContentCipher,
    config: TierConfig,
}

impl StorageTierSelector {
    pub fn new(
        blobs: Arc<dyn BlobStore>,
        ledger: Arc<dyn TransactionSubmitter>,
        cipher: ContentCipher,
        config: TierConfig,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            blobs,
            ledger,
            cipher,
            config,
        })
    }

    pub fn config(&self) -> &TierConfig {
        &self.config
    }

    pub fn cipher(&self) -> &ContentCipher {
        &self.cipher
    }

    /// Persist `content`.
    ///
    /// `signer` is required when `options.encrypt` is set.
    pub async fn store(
        &self,
        content: &[u8],
        options: &StoreOptions,
        signer: Option<&dyn WalletSigner>,
    ) -> Result<StorageRecord> {
        let timestamp = now_millis();

        let payload: Bytes = if options.encrypt {
            let signer = signer.ok_or(StorageError::SignerRequired)?;
            let envelope = DocumentEnvelope::seal(
                &self.cipher,
                content,
                document_metadata(content, options, timestamp),
                signer,
            )
            .await?;
            envelope.to_json()?.into()
        } else {
            Bytes::copy_from_slice(content)
        };

        let planned = tier::plan(&payload, !options.encrypt, &self.config)?;
        let plan = planned.plan;
        info!(
            method = %plan.method,
            payload_size = plan.payload_size,
            stored_size = plan.stored_size,
            encrypted = options.encrypt,
            "selected storage tier"
        );

        let metadata = RecordMetadata {
            title: options.title.clone(),
            author: options.author.clone(),
            timestamp,
            encrypted: options.encrypt,
            payload_size: payload.len() as u64,
            compression: plan.compression,
        };
        let content_hash = Sha256Hash::hash(&payload);

        match plan.method {
            StorageMethod::OnChain => {
                let txid = self.submit(payload).await?;
                Ok(StorageRecord {
                    method: StorageMethod::OnChain,
                    transaction_id: txid,
                    blob_hash: None,
                    chunk_hashes: None,
                    metadata,
                    content_hash,
                    cost: plan.cost,
                })
            }
            StorageMethod::Hybrid => {
                let blob = planned.compressed.map(Bytes::from).unwrap_or(payload);
                let blob_hash = self
                    .blobs
                    .put(blob)
                    .await
                    .map_err(blob_failure)?;

                let record = HybridRecord::new(blob_hash, metadata.clone(), content_hash);
                let txid = self.submit(serde_json::to_vec(&record)?.into()).await?;

                Ok(StorageRecord {
                    method: StorageMethod::Hybrid,
                    transaction_id: txid,
                    blob_hash: Some(blob_hash),
                    chunk_hashes: None,
                    metadata,
                    content_hash,
                    cost: plan.cost,
                })
            }
            StorageMethod::Chunked => {
                let partial = PartialUpload {
                    uploaded: Vec::new(),
                    missing: (0..plan.chunk_count).collect(),
                    total_chunks: plan.chunk_count,
                    payload,
                    metadata,
                };
                self.upload_chunks(partial, &plan).await
            }
        }
    }

    /// Finish a chunked upload that failed part-way.
    ///
    /// Only the chunks listed in `partial.missing` are uploaded again. When
    /// nothing is missing only the manifest is resubmitted.
    pub async fn resume_chunked(&self, partial: &PartialUpload) -> Result<StorageRecord> {
        let plan = tier::plan(&partial.payload, false, &self.config)?.plan;
        if plan.method != StorageMethod::Chunked || plan.chunk_count != partial.total_chunks {
            return Err(StorageError::InvalidConfig(format!(
                "partial upload of {} chunks does not match current tier plan ({} {})",
                partial.total_chunks, plan.method, plan.chunk_count
            )));
        }
        info!(
            missing = partial.missing.len(),
            total = partial.total_chunks,
            "resuming chunked upload"
        );
        self.upload_chunks(partial.clone(), &plan).await
    }

    /// Upload the missing chunks concurrently, then submit the manifest once
    /// every chunk hash is known.
    async fn upload_chunks(&self, mut partial: PartialUpload, plan: &TierPlan) -> Result<StorageRecord> {
        let chunk_size = self.config.chunk_size_bytes;
        let payload = partial.payload.clone();

        let puts = partial.missing.iter().map(|&index| {
            let start = index * chunk_size;
            let end = (start + chunk_size).min(payload.len());
            let chunk = payload.slice(start..end);
            let blobs = self.blobs.clone();
            async move { (index, blobs.put(chunk).await) }
        });

        let mut missing = Vec::new();
        let mut last_error = None;
        for (index, result) in join_all(puts).await {
            match result {
                Ok(hash) => partial.uploaded.push((index, hash)),
                Err(e) => {
                    warn!(index, error = %e, "chunk upload failed");
                    missing.push(index);
                    last_error = Some(e);
                }
            }
        }
        partial.uploaded.sort_by_key(|(index, _)| *index);
        partial.missing = missing;

        if let Some(err) = last_error {
            warn!(
                uploaded = partial.uploaded.len(),
                missing = partial.missing.len(),
                error = %err,
                "aborting chunked upload before manifest"
            );
            return Err(StorageError::ChunkUploadFailed {
                partial: Box::new(partial),
            });
        }

        let chunk_hashes: Vec<BlobHash> = partial.uploaded.iter().map(|(_, h)| *h).collect();
        let content_hash = Sha256Hash::hash(&partial.payload);
        let manifest = ChunkManifest::new(chunk_hashes.clone(), partial.metadata.clone(), content_hash);
        let txid = match self.submit(serde_json::to_vec(&manifest)?.into()).await {
            Ok(txid) => txid,
            Err(err) => {
                warn!(chunks = chunk_hashes.len(), error = %err, "manifest submission failed");
                return Err(StorageError::ManifestSubmitFailed {
                    reason: err.to_string(),
                    partial: Box::new(partial),
                });
            }
        };

        debug!(chunks = chunk_hashes.len(), %txid, "submitted chunk manifest");

        Ok(StorageRecord {
            method: StorageMethod::Chunked,
            transaction_id: txid,
            blob_hash: None,
            chunk_hashes: Some(chunk_hashes),
            metadata: partial.metadata,
            content_hash,
            cost: plan.cost,
        })
    }

    async fn submit(&self, payload: Bytes) -> Result<TransactionId> {
        self.ledger
            .submit(payload)
            .await
            .map_err(|e| match e {
                StorageError::SubmissionFailed(_) => e,
                other => StorageError::SubmissionFailed(other.to_string()),
            })
    }

    /// Estimate the cost of storing `content` with default options.
    pub fn estimate_cost(&self, content: &[u8], encrypted: bool) -> Result<CostEstimate> {
        let options = StoreOptions {
            encrypt: encrypted,
            ..Default::default()
        };
        self.estimate_cost_with(content, &options)
    }

    /// Estimate the cost of storing `content` with `options`.
    ///
    /// Plans exactly as [`store`](Self::store) would; encrypted payloads are
    /// sized from a projected envelope of identical length.
    pub fn estimate_cost_with(&self, content: &[u8], options: &StoreOptions) -> Result<CostEstimate> {
        let plan = if options.encrypt {
            let envelope =
                DocumentEnvelope::projected(document_metadata(content, options, now_millis()));
            tier::plan(&envelope.to_json()?, false, &self.config)?.plan
        } else {
            tier::plan(content, true, &self.config)?.plan
        };
        Ok(CostEstimate::from_plan(&plan))
    }

    /// Read back the logical payload of a stored document.
    ///
    /// For encrypted documents this is the sealed envelope.
    pub async fn retrieve(&self, record: &StorageRecord) -> Result<Bytes> {
        let payload = match record.method {
            StorageMethod::OnChain => self
                .ledger
                .fetch(&record.transaction_id)
                .await?
                .ok_or_else(|| {
                    StorageError::NotFound(format!("transaction {}", record.transaction_id))
                })?,
            StorageMethod::Hybrid => {
                let hash = record
                    .blob_hash
                    .ok_or_else(|| StorageError::NotFound("hybrid record without blob hash".into()))?;
                let blob = self.get_blob(&hash).await?;
                match record.metadata.compression {
                    Some(Compression::Zstd) => compression::decompress(&blob)?.into(),
                    None => blob,
                }
            }
            StorageMethod::Chunked => {
                let hashes = record.chunk_hashes.as_deref().ok_or_else(|| {
                    StorageError::NotFound("chunked record without chunk hashes".into())
                })?;
                let chunks = join_all(hashes.iter().map(|h| self.get_blob(h))).await;

                let mut payload = Vec::with_capacity(record.metadata.payload_size as usize);
                for chunk in chunks {
                    payload.extend_from_slice(&chunk?);
                }
                payload.into()
            }
        };

        let actual = Sha256Hash::hash(&payload);
        if actual != record.content_hash {
            warn!(method = %record.method, "retrieved content failed hash check");
            return Err(StorageError::IntegrityMismatch {
                expected: record.content_hash,
                actual,
            });
        }
        Ok(payload)
    }

    async fn get_blob(&self, hash: &BlobHash) -> Result<Bytes> {
        self.blobs
            .get(hash)
            .await
            .map_err(blob_failure)?
            .ok_or_else(|| StorageError::NotFound(format!("blob {}", hash)))
    }

    /// Confirmation status of the record's transaction.
    pub async fn confirmation(&self, record: &StorageRecord) -> Result<TransactionStatus> {
        self.ledger.status(&record.transaction_id).await
    }
}

/// Report any blob store error as `BlobStoreFailed`.
fn blob_failure(err: StorageError) -> StorageError {
    match err {
        StorageError::BlobStoreFailed(_) => err,
        other => StorageError::BlobStoreFailed(other.to_string()),
    }
}

fn document_metadata(content: &[u8], options: &StoreOptions, timestamp: i64) -> DocumentMetadata {
    DocumentMetadata::new(
        options.title.clone(),
        options.author.clone(),
        timestamp,
        content.len() as u64,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{MemoryBlobStore, MemoryLedger};
    use rand::RngCore;
    use vellum_core::{Keypair, KeypairSigner};

    struct Harness {
        blobs: Arc<MemoryBlobStore>,
        ledger: Arc<MemoryLedger>,
        selector: StorageTierSelector,
        signer: KeypairSigner,
    }

    fn harness() -> Harness {
        let blobs = Arc::new(MemoryBlobStore::new());
        let ledger = Arc::new(MemoryLedger::new());
        let selector = StorageTierSelector::new(
            blobs.clone(),
            ledger.clone(),
            ContentCipher::default(),
            TierConfig::default(),
        )
        .unwrap();
        Harness {
            blobs,
            ledger,
            selector,
            signer: KeypairSigner::new(Keypair::from_seed(&[11u8; 32])),
        }
    }

    fn random_bytes(len: usize) -> Vec<u8> {
        let mut data = vec![0u8; len];
        rand::thread_rng().fill_bytes(&mut data);
        data
    }

    #[tokio::test]
    async fn test_threshold_boundary() {
        let h = harness();

        let at = h
            .selector
            .store(&vec![b'a'; 50_000], &StoreOptions::default(), None)
            .await
            .unwrap();
        assert_eq!(at.method, StorageMethod::OnChain);
        assert_eq!(at.cost, 2_500);

        let over = h
            .selector
            .store(&vec![b'a'; 50_001], &StoreOptions::default(), None)
            .await
            .unwrap();
        assert_eq!(over.method, StorageMethod::Hybrid);
        assert_eq!(over.cost, 500);
        assert!(over.blob_hash.is_some());
    }

    #[tokio::test]
    async fn test_onchain_roundtrip() {
        let h = harness();
        let record = h
            .selector
            .store(b"short note", &StoreOptions::default().title("n"), None)
            .await
            .unwrap();
        assert_eq!(record.metadata.title.as_deref(), Some("n"));
        assert!(h.blobs.is_empty());
        assert_eq!(h.selector.retrieve(&record).await.unwrap(), &b"short note"[..]);
    }

    #[tokio::test]
    async fn test_hybrid_submits_reference_record() {
        let h = harness();
        let content = random_bytes(80_000);
        let record = h
            .selector
            .store(&content, &StoreOptions::default(), None)
            .await
            .unwrap();

        let onchain = h.ledger.fetch(&record.transaction_id).await.unwrap().unwrap();
        let reference: HybridRecord = serde_json::from_slice(&onchain).unwrap();
        assert_eq!(Some(reference.blob_hash), record.blob_hash);
        assert_eq!(reference.content_hash, Sha256Hash::hash(&content));

        assert_eq!(h.selector.retrieve(&record).await.unwrap(), content);
    }

    #[tokio::test]
    async fn test_incompressible_payload_chunks_into_five() {
        let h = harness();
        let content = random_bytes(2_500_000);
        let record = h
            .selector
            .store(&content, &StoreOptions::default(), None)
            .await
            .unwrap();

        assert_eq!(record.method, StorageMethod::Chunked);
        assert_eq!(record.chunk_hashes.as_ref().unwrap().len(), 5);
        assert_eq!(record.cost, 1_000 + 5 * 250);
        assert_eq!(h.blobs.len(), 5);

        let onchain = h.ledger.fetch(&record.transaction_id).await.unwrap().unwrap();
        let manifest: ChunkManifest = serde_json::from_slice(&onchain).unwrap();
        assert_eq!(manifest.total_chunks, 5);
        assert_eq!(Some(manifest.chunk_hashes), record.chunk_hashes);

        assert_eq!(h.selector.retrieve(&record).await.unwrap(), content);
    }

    #[tokio::test]
    async fn test_compressible_oversized_payload_goes_hybrid() {
        let h = harness();
        let content = b"repeated paragraph of text. ".repeat(50_000);
        let record = h
            .selector
            .store(&content, &StoreOptions::default(), None)
            .await
            .unwrap();

        assert_eq!(record.method, StorageMethod::Hybrid);
        assert_eq!(record.metadata.compression, Some(Compression::Zstd));
        assert_eq!(record.metadata.payload_size, content.len() as u64);
        assert_eq!(h.selector.retrieve(&record).await.unwrap(), content);
    }

    #[tokio::test]
    async fn test_chunk_failure_reports_partial_and_resumes() {
        let h = harness();
        let content = random_bytes(2_500_000);
        let bad = BlobHash::of(&content[1_000_000..1_500_000]);
        h.blobs.reject(bad);

        let err = h
            .selector
            .store(&content, &StoreOptions::default(), None)
            .await
            .unwrap_err();
        assert!(err.is_retryable());

        let partial = err.partial_upload().unwrap().clone();
        assert_eq!(partial.total_chunks, 5);
        assert_eq!(partial.missing, vec![2]);
        assert_eq!(
            partial.uploaded.iter().map(|(i, _)| *i).collect::<Vec<_>>(),
            vec![0, 1, 3, 4]
        );
        assert!(h.ledger.is_empty(), "manifest must not be submitted");

        let puts_before = h.blobs.put_count();
        h.blobs.accept(&bad);
        let record = h.selector.resume_chunked(&partial).await.unwrap();

        assert_eq!(h.blobs.put_count(), puts_before + 1);
        assert_eq!(record.chunk_hashes.as_ref().unwrap()[2], bad);
        assert_eq!(h.selector.retrieve(&record).await.unwrap(), content);
    }

    #[tokio::test]
    async fn test_manifest_failure_resumes_without_reupload() {
        let h = harness();
        let content = random_bytes(2_500_000);
        h.ledger.set_offline(true);

        let err = h
            .selector
            .store(&content, &StoreOptions::default(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::ManifestSubmitFailed { .. }));
        assert!(err.is_retryable());

        let partial = err.partial_upload().unwrap().clone();
        assert_eq!(partial.total_chunks, 5);
        assert!(partial.missing.is_empty());
        assert_eq!(partial.uploaded.len(), 5);

        let puts_before = h.blobs.put_count();
        h.ledger.set_offline(false);
        let record = h.selector.resume_chunked(&partial).await.unwrap();

        assert_eq!(h.blobs.put_count(), puts_before);
        assert_eq!(h.ledger.len(), 1);
        assert_eq!(record.method, StorageMethod::Chunked);
        assert_eq!(h.selector.retrieve(&record).await.unwrap(), content);
    }

    #[tokio::test]
    async fn test_encrypted_store_and_retrieve() {
        let h = harness();
        let options = StoreOptions::encrypted().title("Secret").author("alice");
        let record = h
            .selector
            .store(b"classified", &options, Some(&h.signer))
            .await
            .unwrap();

        assert!(record.metadata.encrypted);
        assert_eq!(record.method, StorageMethod::OnChain);

        let payload = h.selector.retrieve(&record).await.unwrap();
        let envelope = DocumentEnvelope::from_json(&payload).unwrap();
        assert_eq!(envelope.metadata.title.as_deref(), Some("Secret"));
        assert_eq!(
            envelope.open(h.selector.cipher(), &h.signer).await.unwrap(),
            b"classified"
        );
    }

    #[tokio::test]
    async fn test_encrypt_without_signer_fails() {
        let h = harness();
        let err = h
            .selector
            .store(b"x", &StoreOptions::encrypted(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::SignerRequired));
    }

    #[tokio::test]
    async fn test_estimate_matches_store() {
        let h = harness();
        let cases: Vec<(Vec<u8>, bool)> = vec![
            (vec![b'x'; 10], false),
            (vec![b'x'; 50_000], false),
            (vec![b'x'; 50_001], false),
            (random_bytes(1_200_000), false),
            (b"compress me please ".repeat(60_000), false),
            (vec![b'x'; 10], true),
            // Fits on-chain in plaintext but the envelope does not.
            (random_bytes(40_000), true),
            (random_bytes(900_000), true),
        ];

        for (content, encrypted) in cases {
            let options = StoreOptions {
                encrypt: encrypted,
                ..Default::default()
            };
            let estimate = h.selector.estimate_cost(&content, encrypted).unwrap();
            let record = h
                .selector
                .store(&content, &options, Some(&h.signer))
                .await
                .unwrap();
            assert_eq!(
                estimate.method,
                record.method,
                "len={} encrypted={}",
                content.len(),
                encrypted
            );
            assert_eq!(estimate.cost, record.cost);
        }
    }

    #[tokio::test]
    async fn test_tampered_blob_detected_on_retrieve() {
        let h = harness();
        let content = random_bytes(60_000);
        let record = h
            .selector
            .store(&content, &StoreOptions::default(), None)
            .await
            .unwrap();

        h.blobs
            .corrupt(&record.blob_hash.unwrap(), Bytes::from_static(b"swapped"));
        assert!(matches!(
            h.selector.retrieve(&record).await,
            Err(StorageError::IntegrityMismatch { .. })
        ));
    }

    #[tokio::test]
    async fn test_submission_failure_is_typed() {
        let h = harness();
        h.ledger.set_offline(true);
        let err = h
            .selector
            .store(b"x", &StoreOptions::default(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::SubmissionFailed(_)));
    }

    #[tokio::test]
    async fn test_blob_failure_is_typed() {
        let h = harness();
        h.blobs.set_offline(true);
        let err = h
            .selector
            .store(&vec![1u8; 60_000], &StoreOptions::default(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::BlobStoreFailed(_)));
    }

    #[tokio::test]
    async fn test_confirmation_tracks_ledger() {
        let h = harness();
        let record = h
            .selector
            .store(b"doc", &StoreOptions::default(), None)
            .await
            .unwrap();
        assert!(!h.selector.confirmation(&record).await.unwrap().confirmed);
        h.ledger.mine_block();
        assert!(h.selector.confirmation(&record).await.unwrap().confirmed);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let result = StorageTierSelector::new(
            Arc::new(MemoryBlobStore::new()),
            Arc::new(MemoryLedger::new()),
            ContentCipher::default(),
            TierConfig {
                chunk_size_bytes: 0,
                ..Default::default()
            },
        );
        assert!(matches!(result, Err(StorageError::InvalidConfig(_))));
    }
}
