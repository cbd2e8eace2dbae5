//! # Vellum Testkit
//!
//! Testing utilities for vellum.
//!
//! ## Overview
//!
//! - **Fixtures**: a vault over memory stores with a deterministic owner
//! - **Doubles**: signers that misbehave on purpose
//! - **Generators**: proptest strategies for documents and options
//!
//! ## Test Fixtures
//!
//! ```rust
//! use vellum_testkit::TestFixture;
//! use vellum::StoreOptions;
//!
//! # async fn example() -> vellum::Result<()> {
//! let fixture = TestFixture::with_seed([1u8; 32]);
//! let record = fixture
//!     .vault
//!     .store_document(b"note", &StoreOptions::encrypted(), Some(&fixture.signer))
//!     .await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use vellum_testkit::generators::document;
//!
//! proptest! {
//!     #[test]
//!     fn estimate_is_total(content in document(4096)) {
//!         let fixture = vellum_testkit::TestFixture::new();
//!         prop_assert!(fixture.vault.estimate(&content, &Default::default()).is_ok());
//!     }
//! }
//! ```

use std::sync::OnceLock;

pub mod doubles;
pub mod fixtures;
pub mod generators;

pub use doubles::{CountingSigner, FailingSigner, NonDeterministicSigner};
pub use fixtures::TestFixture;

/// Install a test-writer `tracing` subscriber once per process.
///
/// Honors `RUST_LOG`; defaults to `warn`.
pub fn init_tracing() {
    static ONCE: OnceLock<()> = OnceLock::new();
    ONCE.get_or_init(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .with_test_writer()
            .try_init();
    });
}
