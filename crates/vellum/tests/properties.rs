//! Property tests over the vault: encryption round-trips, tamper detection
//! and estimate/store agreement.

use proptest::prelude::*;
use rand::RngCore;
use tokio::runtime::Runtime;

use vellum::cipher::{ContentCipher, EncryptionError};
use vellum::store::{Compression, MemoryBlobStore, MemoryLedger};
use vellum::{StorageMethod, StoreOptions, VaultConfig};
use vellum_testkit::generators::{compressible_document, document, signer, store_options, title};
use vellum_testkit::{init_tracing, CountingSigner, NonDeterministicSigner, TestFixture};

fn runtime() -> Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn encrypt_decrypt_roundtrip(
        content in document(4096),
        message in "[ -~]{0,64}",
        signer in signer(),
    ) {
        let rt = runtime();
        let cipher = ContentCipher::default();
        let package = rt.block_on(cipher.encrypt(&content, &message, &signer)).unwrap();
        prop_assert_eq!(package.encrypted_content.len() % 16, 0);
        prop_assert!(package.encrypted_content.len() > content.len());

        let plaintext = rt.block_on(cipher.decrypt(&package, &signer)).unwrap();
        prop_assert_eq!(plaintext, content);
    }

    #[test]
    fn any_ciphertext_bit_flip_is_detected(
        content in document(512),
        signer in signer(),
        position in any::<prop::sample::Index>(),
        bit in 0u8..8,
    ) {
        let rt = runtime();
        let cipher = ContentCipher::default();
        let mut package = rt.block_on(cipher.encrypt(&content, "m", &signer)).unwrap();

        let i = position.index(package.encrypted_content.len());
        package.encrypted_content[i] ^= 1 << bit;

        let err = rt.block_on(cipher.decrypt(&package, &signer)).unwrap_err();
        prop_assert!(matches!(err, EncryptionError::IntegrityMismatch));
    }

    #[test]
    fn iv_and_hmac_tampering_is_detected(
        content in document(256),
        signer in signer(),
        byte in 0usize..16,
        flip_iv in any::<bool>(),
    ) {
        let rt = runtime();
        let cipher = ContentCipher::default();
        let mut package = rt.block_on(cipher.encrypt(&content, "m", &signer)).unwrap();
        if flip_iv {
            package.iv[byte] ^= 0x01;
        } else {
            package.hmac[byte] ^= 0x01;
        }
        prop_assert!(rt.block_on(cipher.decrypt(&package, &signer)).unwrap_err().is_tamper());
    }

    #[test]
    fn estimate_agrees_with_store(
        content in document(70_000),
        options in store_options(),
    ) {
        let rt = runtime();
        let fixture = TestFixture::with_seed([5u8; 32]);

        let estimate = fixture.vault.estimate(&content, &options).unwrap();
        let record = rt
            .block_on(fixture.vault.store_document(&content, &options, Some(&fixture.signer)))
            .unwrap();

        prop_assert_eq!(estimate.method, record.method);
        prop_assert_eq!(estimate.cost, record.cost);

        let back = rt
            .block_on(fixture.vault.retrieve_document(&record, Some(&fixture.signer)))
            .unwrap();
        prop_assert_eq!(back, content);
    }

    #[test]
    fn encrypted_titles_roundtrip(title in title(), content in document(1024)) {
        let rt = runtime();
        let fixture = TestFixture::new();
        let options = StoreOptions::encrypted().title(title.clone());

        let record = rt
            .block_on(fixture.vault.store_document(&content, &options, Some(&fixture.signer)))
            .unwrap();
        prop_assert_eq!(record.metadata.title.as_deref(), Some(title.as_str()));

        let back = rt
            .block_on(fixture.vault.retrieve_document(&record, Some(&fixture.signer)))
            .unwrap();
        prop_assert_eq!(back, content);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(4))]

    #[test]
    fn oversized_compressible_documents_go_hybrid(
        content in compressible_document(1_000_001, 1_200_000),
    ) {
        let rt = runtime();
        let fixture = TestFixture::new();
        let record = rt
            .block_on(fixture.vault.store_document(&content, &StoreOptions::default(), None))
            .unwrap();
        prop_assert_eq!(record.method, StorageMethod::Hybrid);
        prop_assert_eq!(record.metadata.compression, Some(Compression::Zstd));

        let back = rt.block_on(fixture.vault.retrieve_document(&record, None)).unwrap();
        prop_assert_eq!(back, content);
    }
}

#[tokio::test]
async fn encryption_signs_once_by_default() {
    init_tracing();
    let signer = CountingSigner::new(vellum::Keypair::from_seed(&[8u8; 32]));
    let cipher = ContentCipher::default();

    cipher.encrypt(b"x", "m", &signer).await.unwrap();
    assert_eq!(signer.calls(), 1);
}

#[tokio::test]
async fn determinism_check_refuses_non_deterministic_wallet() {
    init_tracing();
    let config = VaultConfig::from_toml_str("[cipher]\ndeterminism = \"verify\"").unwrap();
    let fixture = TestFixture::with_config(config);
    let wallet = NonDeterministicSigner::new(vellum::Keypair::from_seed(&[3u8; 32]));

    let err = fixture
        .vault
        .store_document(b"secret", &StoreOptions::encrypted(), Some(&wallet))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        vellum::VaultError::Storage(vellum::store::StorageError::Encryption(
            EncryptionError::NonDeterministicSigner
        ))
    ));
    assert!(fixture.ledger.is_empty());
}

#[tokio::test]
async fn chunked_upload_resumes_after_blob_outage() {
    init_tracing();
    let blobs = std::sync::Arc::new(MemoryBlobStore::new());
    let ledger = std::sync::Arc::new(MemoryLedger::new());
    let vault = vellum::Vault::new(
        VaultConfig::default(),
        blobs.clone(),
        ledger.clone(),
        std::sync::Arc::new(vellum::auth::DenyAll),
    )
    .unwrap();

    let mut content = vec![0u8; 1_300_000];
    rand::thread_rng().fill_bytes(&mut content);
    blobs.set_offline(true);
    let err = vault
        .store_document(&content, &StoreOptions::default(), None)
        .await
        .unwrap_err();
    assert!(err.is_retryable());
    assert!(ledger.is_empty());

    let partial = match &err {
        vellum::VaultError::Storage(e) => e.partial_upload().cloned().unwrap(),
        other => panic!("unexpected {:?}", other),
    };
    assert_eq!(partial.missing.len(), partial.total_chunks);

    blobs.set_offline(false);
    let record = vault.resume_upload(&partial).await.unwrap();
    assert_eq!(record.method, StorageMethod::Chunked);
    assert_eq!(vault.retrieve_document(&record, None).await.unwrap(), content);
}
