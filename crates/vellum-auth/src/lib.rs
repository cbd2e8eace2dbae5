//! # Vellum Auth
//!
//! Wallet-based challenge-response authentication with origin-bound sessions,
//! per-origin permissions and self-attested certificates.
//!
//! ## Overview
//!
//! 1. The client asks for a challenge; the server issues 32 random bytes
//!    bound to the requesting origin, valid for five minutes.
//! 2. The wallet signs `challenge:timestamp:origin`.
//! 3. The server consumes the challenge (single-use), checks the signature,
//!    resolves the identity by public key and opens a session for that
//!    origin.
//!
//! State lives in explicit stores ([`ChallengeStore`], [`SessionStore`],
//! [`PermissionStore`], [`IdentityRegistry`]) owned by a
//! [`WalletAuthProtocol`] instance, all backed by sharded concurrent maps.
//!
//! Permissions go through a [`ConsentProvider`]; the default [`DenyAll`]
//! refuses everything.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use vellum_auth::{AuthConfig, ChallengeResponse, DenyAll, WalletAuthProtocol};
//! use vellum_core::{Keypair, KeypairSigner};
//!
//! # async fn example() -> vellum_auth::Result<()> {
//! let auth = WalletAuthProtocol::new(AuthConfig::default(), Arc::new(DenyAll));
//! let wallet = KeypairSigner::new(Keypair::generate());
//!
//! let challenge = auth.request_challenge("https://app.example");
//! let response = ChallengeResponse::sign(&wallet, &challenge, "https://app.example").await?;
//! let ok = auth.verify("https://app.example", &response)?;
//! assert!(auth.verify_session(&ok.session.token, "https://app.example"));
//! # Ok(())
//! # }
//! ```

pub mod certificate;
pub mod challenge;
pub mod config;
pub mod endpoint;
pub mod error;
pub mod identity;
pub mod permission;
pub mod protocol;
pub mod session;

pub use certificate::Certificate;
pub use challenge::{signing_message, Challenge, ChallengeStore};
pub use config::AuthConfig;
pub use endpoint::{AuthRequest, AuthResponse, ErrorResponse};
pub use error::{AuthError, Result};
pub use identity::{address_for, Identity, IdentityRegistry};
pub use permission::{
    AllowList, Capability, ConsentProvider, DenyAll, Grant, PermissionRequest, PermissionStore,
};
pub use protocol::{Authenticated, ChallengeResponse, WalletAuthProtocol};
pub use session::{Session, SessionStore};
