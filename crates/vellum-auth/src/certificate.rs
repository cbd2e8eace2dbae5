//! Self-attested identity certificates.
//!
//! A certificate is signed by its subject's wallet over a canonical JSON
//! body. Verification checks the signature and the validity window only;
//! there is no CA chain.

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use vellum_core::{Ed25519PublicKey, Ed25519Signature, WalletSigner};

use crate::error::{AuthError, Result};

/// A signed certificate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Certificate {
    pub id: String,

    #[serde(rename = "type")]
    pub cert_type: String,

    pub issuer: Ed25519PublicKey,
    pub subject: Ed25519PublicKey,

    /// Start of validity (inclusive), milliseconds.
    pub valid_from: i64,

    /// End of validity (exclusive), milliseconds.
    pub valid_to: i64,

    pub payload: serde_json::Value,

    pub signature: Ed25519Signature,
}

/// Everything but the signature, in signing order.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CertificateBody<'a> {
    id: &'a str,
    #[serde(rename = "type")]
    cert_type: &'a str,
    issuer: &'a Ed25519PublicKey,
    subject: &'a Ed25519PublicKey,
    valid_from: i64,
    valid_to: i64,
    payload: &'a serde_json::Value,
}

fn signing_body(
    id: &str,
    cert_type: &str,
    key: &Ed25519PublicKey,
    valid_from: i64,
    valid_to: i64,
    payload: &serde_json::Value,
) -> Result<String> {
    Ok(serde_json::to_string(&CertificateBody {
        id,
        cert_type,
        issuer: key,
        subject: key,
        valid_from,
        valid_to,
        payload,
    })?)
}

impl Certificate {
    /// Have `signer` attest to `payload` about `subject`.
    ///
    /// The signer must control `subject`.
    pub async fn issue<S>(
        signer: &S,
        subject: Ed25519PublicKey,
        cert_type: &str,
        payload: serde_json::Value,
        now: i64,
        validity_ms: i64,
    ) -> Result<Self>
    where
        S: WalletSigner + ?Sized,
    {
        let id = Uuid::new_v4().to_string();
        let valid_to = now + validity_ms;
        let body = signing_body(&id, cert_type, &subject, now, valid_to, &payload)?;

        let signed = signer.sign(&body).await?;
        if signed.public_key != subject {
            return Err(AuthError::SignerMismatch);
        }

        Ok(Self {
            id,
            cert_type: cert_type.to_string(),
            issuer: subject,
            subject,
            valid_from: now,
            valid_to,
            payload,
            signature: signed.signature,
        })
    }

    /// The exact bytes the issuer signed.
    pub fn signing_bytes(&self) -> Result<Vec<u8>> {
        let body = serde_json::to_string(&CertificateBody {
            id: &self.id,
            cert_type: &self.cert_type,
            issuer: &self.issuer,
            subject: &self.subject,
            valid_from: self.valid_from,
            valid_to: self.valid_to,
            payload: &self.payload,
        })?;
        Ok(body.into_bytes())
    }

    pub fn is_valid_at(&self, now: i64) -> bool {
        self.valid_from <= now && now < self.valid_to
    }

    /// Check the signature and that `now` falls in the validity window.
    pub fn verify(&self, now: i64) -> Result<()> {
        self.issuer
            .verify(&self.signing_bytes()?, &self.signature)
            .map_err(|_| AuthError::SignatureInvalid)?;
        if !self.is_valid_at(now) {
            return Err(AuthError::CertificateExpired);
        }
        Ok(())
    }
}
