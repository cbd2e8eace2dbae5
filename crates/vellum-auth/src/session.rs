//! Session tokens bound to an identity and an origin.

use std::sync::atomic::{AtomicI64, Ordering};

use dashmap::DashMap;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use vellum_core::Ed25519PublicKey;

use crate::error::{AuthError, Result};

/// An issued session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    /// 32 random bytes, hex-encoded.
    pub token: String,
    pub identity_id: String,
    pub public_key: Ed25519PublicKey,
    pub origin: String,
    pub created_at: i64,
    pub expires_at: i64,
}

impl Session {
    /// Valid only while unexpired and presented by the issuing origin.
    pub fn is_valid(&self, origin: &str, now: i64) -> bool {
        now < self.expires_at && self.origin == origin
    }
}

/// Short token prefix for logs.
fn token_prefix(token: &str) -> &str {
    token.get(..8).unwrap_or(token)
}

/// Issued sessions keyed by token.
///
/// Sharded map: lookups for one token never block another's. Expired
/// sessions are swept on issue, at most once per TTL window.
#[derive(Debug)]
pub struct SessionStore {
    sessions: DashMap<String, Session>,
    ttl_ms: i64,
    next_sweep_at: AtomicI64,
}

impl SessionStore {
    pub fn new(ttl_ms: i64) -> Self {
        Self {
            sessions: DashMap::new(),
            ttl_ms,
            next_sweep_at: AtomicI64::new(i64::MIN),
        }
    }

    /// Issue a new session.
    pub fn issue(
        &self,
        identity_id: &str,
        public_key: Ed25519PublicKey,
        origin: &str,
        now: i64,
    ) -> Session {
        self.sweep_if_due(now);

        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);

        let session = Session {
            token: hex::encode(bytes),
            identity_id: identity_id.to_string(),
            public_key,
            origin: origin.to_string(),
            created_at: now,
            expires_at: now + self.ttl_ms,
        };
        self.sessions.insert(session.token.clone(), session.clone());

        info!(
            token = token_prefix(&session.token),
            identity_id, origin, "issued session"
        );
        session
    }

    /// Look up a session presented by `origin`.
    pub fn validate(&self, token: &str, origin: &str, now: i64) -> Result<Session> {
        let session = self
            .sessions
            .get(token)
            .ok_or(AuthError::SessionNotFound)?;

        if now >= session.expires_at {
            return Err(AuthError::SessionExpired);
        }
        if session.origin != origin {
            return Err(AuthError::OriginMismatch);
        }
        Ok(session.clone())
    }

    /// Boolean form of [`validate`](Self::validate).
    pub fn verify(&self, token: &str, origin: &str, now: i64) -> bool {
        self.sessions
            .get(token)
            .map(|s| s.is_valid(origin, now))
            .unwrap_or(false)
    }

    /// Destroy a session. Returns whether it existed.
    pub fn logout(&self, token: &str) -> bool {
        let removed = self.sessions.remove(token).is_some();
        if removed {
            info!(token = token_prefix(token), "session logged out");
        }
        removed
    }

    /// Destroy every session of an identity. Returns how many were removed.
    pub fn revoke_identity(&self, identity_id: &str) -> usize {
        let before = self.sessions.len();
        self.sessions.retain(|_, s| s.identity_id != identity_id);
        let removed = before.saturating_sub(self.sessions.len());
        info!(identity_id, removed, "revoked identity sessions");
        removed
    }

    fn sweep_if_due(&self, now: i64) {
        let due = self.next_sweep_at.load(Ordering::Acquire);
        if now < due {
            return;
        }
        let next = now.saturating_add(self.ttl_ms);
        if self
            .next_sweep_at
            .compare_exchange(due, next, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            self.purge_expired(now);
        }
    }

    /// Drop expired sessions. Returns how many were removed.
    pub fn purge_expired(&self, now: i64) -> usize {
        let before = self.sessions.len();
        self.sessions.retain(|_, s| now < s.expires_at);
        let removed = before.saturating_sub(self.sessions.len());
        debug!(removed, "purged expired sessions");
        removed
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ORIGIN: &str = "https://docs.example";

    fn key() -> Ed25519PublicKey {
        Ed25519PublicKey::from_bytes([1u8; 32])
    }

    #[test]
    fn test_expiry_boundary() {
        let store = SessionStore::new(1_000);
        let session = store.issue("id-1", key(), ORIGIN, 5_000);

        assert!(store.verify(&session.token, ORIGIN, 5_999));
        assert!(!store.verify(&session.token, ORIGIN, 6_000));
        assert!(matches!(
            store.validate(&session.token, ORIGIN, 6_000),
            Err(AuthError::SessionExpired)
        ));
    }

    #[test]
    fn test_origin_bound() {
        let store = SessionStore::new(1_000);
        let session = store.issue("id-1", key(), ORIGIN, 0);

        assert!(!store.verify(&session.token, "https://other.example", 10));
        assert!(matches!(
            store.validate(&session.token, "https://other.example", 10),
            Err(AuthError::OriginMismatch)
        ));
        assert_eq!(store.validate(&session.token, ORIGIN, 10).unwrap(), session);
    }

    #[test]
    fn test_logout() {
        let store = SessionStore::new(1_000);
        let session = store.issue("id-1", key(), ORIGIN, 0);

        assert!(store.logout(&session.token));
        assert!(!store.logout(&session.token));
        assert!(matches!(
            store.validate(&session.token, ORIGIN, 1),
            Err(AuthError::SessionNotFound)
        ));
    }

    #[test]
    fn test_revoke_identity_leaves_others() {
        let store = SessionStore::new(1_000);
        let a1 = store.issue("a", key(), ORIGIN, 0);
        let a2 = store.issue("a", key(), "https://two.example", 0);
        let b = store.issue("b", key(), ORIGIN, 0);

        assert_eq!(store.revoke_identity("a"), 2);
        assert!(!store.verify(&a1.token, ORIGIN, 1));
        assert!(!store.verify(&a2.token, "https://two.example", 1));
        assert!(store.verify(&b.token, ORIGIN, 1));
    }

    #[test]
    fn test_purge_expired() {
        let store = SessionStore::new(100);
        store.issue("a", key(), ORIGIN, 0);
        let live = store.issue("b", key(), ORIGIN, 50);

        assert_eq!(store.purge_expired(100), 1);
        assert_eq!(store.len(), 1);
        assert!(store.verify(&live.token, ORIGIN, 100));
    }

    #[test]
    fn test_issue_sweeps_expired() {
        let store = SessionStore::new(1_000);
        for t in 0..100 {
            store.issue("a", key(), ORIGIN, t);
        }
        assert_eq!(store.len(), 100);

        let live = store.issue("b", key(), ORIGIN, 5_000);
        assert_eq!(store.len(), 1);
        assert!(store.verify(&live.token, ORIGIN, 5_001));
    }

    #[test]
    fn test_tokens_unique() {
        let store = SessionStore::new(100);
        let a = store.issue("a", key(), ORIGIN, 0);
        let b = store.issue("a", key(), ORIGIN, 0);
        assert_ne!(a.token, b.token);
        assert_eq!(a.token.len(), 64);
    }
}
