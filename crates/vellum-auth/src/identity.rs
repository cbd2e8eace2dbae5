//! Wallet identities, resolved by public key.

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;
use vellum_core::{Ed25519PublicKey, Sha256Hash};

use crate::certificate::Certificate;
use crate::error::{AuthError, Result};

/// An authenticated wallet identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub id: String,
    pub address: String,
    pub public_key: Ed25519PublicKey,
    pub certificates: Vec<Certificate>,
    pub created_at: i64,
}

/// Address of a public key: hex of the first 20 bytes of its SHA-256.
pub fn address_for(public_key: &Ed25519PublicKey) -> String {
    let digest = Sha256Hash::hash(public_key.as_bytes());
    hex::encode(&digest.as_bytes()[..20])
}

/// Identities keyed by public key, with an id index.
#[derive(Debug, Default)]
pub struct IdentityRegistry {
    by_key: DashMap<Ed25519PublicKey, Identity>,
    by_id: DashMap<String, Ed25519PublicKey>,
}

impl IdentityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the identity for `public_key`, creating it on first sight.
    pub fn resolve_or_create(&self, public_key: Ed25519PublicKey, now: i64) -> Identity {
        let identity = self
            .by_key
            .entry(public_key)
            .or_insert_with(|| {
                let identity = Identity {
                    id: Uuid::new_v4().to_string(),
                    address: address_for(&public_key),
                    public_key,
                    certificates: Vec::new(),
                    created_at: now,
                };
                info!(identity_id = %identity.id, address = %identity.address, "created identity");
                identity
            })
            .clone();
        self.by_id.insert(identity.id.clone(), public_key);
        identity
    }

    pub fn get(&self, id: &str) -> Option<Identity> {
        let key = *self.by_id.get(id)?;
        self.get_by_key(&key)
    }

    pub fn get_by_key(&self, public_key: &Ed25519PublicKey) -> Option<Identity> {
        self.by_key.get(public_key).map(|i| i.clone())
    }

    /// Append a certificate to an identity's list.
    ///
    /// Certificates are only ever appended.
    pub fn append_certificate(&self, id: &str, certificate: Certificate) -> Result<Identity> {
        let key = self
            .by_id
            .get(id)
            .map(|k| *k)
            .ok_or_else(|| AuthError::IdentityNotFound(id.to_string()))?;
        let mut identity = self
            .by_key
            .get_mut(&key)
            .ok_or_else(|| AuthError::IdentityNotFound(id.to_string()))?;
        identity.certificates.push(certificate);
        Ok(identity.clone())
    }

    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }
}
