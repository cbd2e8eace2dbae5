//! The wallet challenge-response protocol.
//!
//! ```text
//! Unauthenticated --request_challenge--> ChallengeIssued
//! ChallengeIssued --verify(sig over "challenge:timestamp:origin")--> Authenticated
//! Authenticated   --logout / expiry--> Unauthenticated
//! ```
//!
//! Every `*_at` method takes the current time explicitly; the plain forms use
//! the wall clock.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use vellum_core::{now_millis, Ed25519PublicKey, Ed25519Signature, WalletSigner};

use crate::certificate::Certificate;
use crate::challenge::{signing_message, Challenge, ChallengeStore};
use crate::config::AuthConfig;
use crate::error::{AuthError, Result};
use crate::identity::{Identity, IdentityRegistry};
use crate::permission::{Capability, ConsentProvider, Grant, PermissionRequest, PermissionStore};
use crate::session::{Session, SessionStore};

/// A client's answer to a challenge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeResponse {
    pub signature: Ed25519Signature,
    pub public_key: Ed25519PublicKey,
    pub challenge: String,
    pub timestamp: i64,
}

impl ChallengeResponse {
    /// Answer `challenge` by signing with `signer` as `origin`.
    pub async fn sign<S>(signer: &S, challenge: &Challenge, origin: &str) -> Result<Self>
    where
        S: WalletSigner + ?Sized,
    {
        let message = signing_message(&challenge.value, challenge.timestamp, origin);
        let signed = signer.sign(&message).await?;
        Ok(Self {
            signature: signed.signature,
            public_key: signed.public_key,
            challenge: challenge.value.clone(),
            timestamp: challenge.timestamp,
        })
    }
}

/// A successful handshake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Authenticated {
    pub session: Session,
    pub identity: Identity,
}

/// Drives authentication and holds the auth state for one process.
pub struct WalletAuthProtocol {
    config: AuthConfig,
    challenges: ChallengeStore,
    sessions: SessionStore,
    permissions: PermissionStore,
    identities: IdentityRegistry,
    consent: Arc<dyn ConsentProvider>,
}

impl WalletAuthProtocol {
    pub fn new(config: AuthConfig, consent: Arc<dyn ConsentProvider>) -> Self {
        Self {
            challenges: ChallengeStore::new(config.challenge_ttl_ms),
            sessions: SessionStore::new(config.session_ttl_ms),
            permissions: PermissionStore::new(),
            identities: IdentityRegistry::new(),
            consent,
            config,
        }
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    pub fn challenges(&self) -> &ChallengeStore {
        &self.challenges
    }

    pub fn identities(&self) -> &IdentityRegistry {
        &self.identities
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Handshake
    // ─────────────────────────────────────────────────────────────────────────

    pub fn request_challenge(&self, origin: &str) -> Challenge {
        self.request_challenge_at(origin, now_millis())
    }

    pub fn request_challenge_at(&self, origin: &str, now: i64) -> Challenge {
        self.challenges.issue(origin, now)
    }

    pub fn verify(&self, origin: &str, response: &ChallengeResponse) -> Result<Authenticated> {
        self.verify_at(origin, response, now_millis())
    }

    /// Verify a challenge response and open a session.
    ///
    /// The challenge is consumed by this call whatever the outcome.
    pub fn verify_at(
        &self,
        origin: &str,
        response: &ChallengeResponse,
        now: i64,
    ) -> Result<Authenticated> {
        let challenge =
            self.challenges
                .consume(&response.challenge, origin, response.timestamp, now)?;

        response
            .public_key
            .verify(challenge.signing_message().as_bytes(), &response.signature)
            .map_err(|_| {
                warn!(origin, public_key = %response.public_key, "challenge signature invalid");
                AuthError::SignatureInvalid
            })?;

        let identity = self.identities.resolve_or_create(response.public_key, now);
        let session = self
            .sessions
            .issue(&identity.id, identity.public_key, origin, now);

        info!(origin, identity_id = %identity.id, "authenticated");
        Ok(Authenticated { session, identity })
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Sessions
    // ─────────────────────────────────────────────────────────────────────────

    pub fn validate_session(&self, token: &str, origin: &str) -> Result<Session> {
        self.sessions.validate(token, origin, now_millis())
    }

    pub fn validate_session_at(&self, token: &str, origin: &str, now: i64) -> Result<Session> {
        self.sessions.validate(token, origin, now)
    }

    /// `now < expiry && origin matches`.
    pub fn verify_session(&self, token: &str, origin: &str) -> bool {
        self.sessions.verify(token, origin, now_millis())
    }

    pub fn verify_session_at(&self, token: &str, origin: &str, now: i64) -> bool {
        self.sessions.verify(token, origin, now)
    }

    pub fn logout(&self, token: &str) -> bool {
        self.sessions.logout(token)
    }

    pub fn revoke_identity_sessions(&self, identity_id: &str) -> usize {
        self.sessions.revoke_identity(identity_id)
    }

    /// Drop expired challenges and sessions. Returns `(challenges, sessions)`.
    pub fn purge_expired(&self, now: i64) -> (usize, usize) {
        (
            self.challenges.purge_expired(now),
            self.sessions.purge_expired(now),
        )
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Identities and certificates
    // ─────────────────────────────────────────────────────────────────────────

    pub fn create_identity(&self, public_key: Ed25519PublicKey) -> Identity {
        self.identities.resolve_or_create(public_key, now_millis())
    }

    pub fn identity(&self, id: &str) -> Option<Identity> {
        self.identities.get(id)
    }

    /// Issue a certificate for an identity, signed by that identity's wallet.
    pub async fn create_certificate<S>(
        &self,
        identity_id: &str,
        cert_type: &str,
        payload: serde_json::Value,
        signer: &S,
    ) -> Result<Certificate>
    where
        S: WalletSigner + ?Sized,
    {
        let identity = self
            .identities
            .get(identity_id)
            .ok_or_else(|| AuthError::IdentityNotFound(identity_id.to_string()))?;

        let certificate = Certificate::issue(
            signer,
            identity.public_key,
            cert_type,
            payload,
            now_millis(),
            self.config.certificate_validity_ms,
        )
        .await?;

        self.identities
            .append_certificate(identity_id, certificate.clone())?;
        info!(identity_id, certificate_id = %certificate.id, "issued certificate");
        Ok(certificate)
    }

    pub fn verify_certificate(&self, certificate: &Certificate, now: i64) -> Result<()> {
        certificate.verify(now)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Permissions
    // ─────────────────────────────────────────────────────────────────────────

    /// Ask for capabilities on behalf of `origin`.
    ///
    /// Each request goes to the consent provider. If any required capability
    /// is refused nothing is granted and `PermissionDenied` lists the refused
    /// ones. Returns the origin's grants afterwards.
    pub async fn request_permissions(
        &self,
        origin: &str,
        requests: &[PermissionRequest],
    ) -> Result<Vec<Grant>> {
        let mut approved = Vec::new();
        let mut refused = Vec::new();

        for request in requests {
            if self.consent.approve(origin, request).await {
                approved.push(request);
            } else if request.required {
                refused.push(request.capability);
            }
        }

        if !refused.is_empty() {
            warn!(origin, ?refused, "required capabilities refused");
            return Err(AuthError::PermissionDenied(refused));
        }

        let now = now_millis();
        for request in approved {
            self.permissions.grant(origin, request, now);
        }
        Ok(self.permissions.permissions(origin))
    }

    pub fn permissions(&self, origin: &str) -> Vec<Grant> {
        self.permissions.permissions(origin)
    }

    pub fn has_capability(&self, origin: &str, capability: Capability) -> bool {
        self.permissions.has_capability(origin, capability)
    }

    pub fn revoke_permissions(&self, origin: &str) -> usize {
        self.permissions.revoke(origin)
    }
}
