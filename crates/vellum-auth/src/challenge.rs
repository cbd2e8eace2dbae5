//! Single-use, origin-bound challenges.

use std::sync::atomic::{AtomicI64, Ordering};

use dashmap::DashMap;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{AuthError, Result};

/// The exact string a wallet signs to answer a challenge.
pub fn signing_message(challenge: &str, timestamp: i64, origin: &str) -> String {
    format!("{}:{}:{}", challenge, timestamp, origin)
}

/// An issued challenge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Challenge {
    /// 32 random bytes, hex-encoded.
    pub value: String,

    /// Issue time in milliseconds; part of the signed message.
    pub timestamp: i64,

    /// The origin that requested it.
    pub origin: String,

    pub expires_at: i64,

    /// Set on the first verification attempt, successful or not.
    pub consumed: bool,
}

impl Challenge {
    pub fn signing_message(&self) -> String {
        signing_message(&self.value, self.timestamp, &self.origin)
    }
}

/// Outstanding challenges keyed by value.
///
/// Expired entries are swept at most once per TTL window, on issue, so the
/// map holds at most two windows' worth of challenges.
#[derive(Debug)]
pub struct ChallengeStore {
    challenges: DashMap<String, Challenge>,
    ttl_ms: i64,
    next_sweep_at: AtomicI64,
}

impl ChallengeStore {
    pub fn new(ttl_ms: i64) -> Self {
        Self {
            challenges: DashMap::new(),
            ttl_ms,
            next_sweep_at: AtomicI64::new(i64::MIN),
        }
    }

    /// Issue a fresh challenge to `origin`.
    pub fn issue(&self, origin: &str, now: i64) -> Challenge {
        self.sweep_if_due(now);

        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);

        let challenge = Challenge {
            value: hex::encode(bytes),
            timestamp: now,
            origin: origin.to_string(),
            expires_at: now + self.ttl_ms,
            consumed: false,
        };
        self.challenges
            .insert(challenge.value.clone(), challenge.clone());

        debug!(origin, expires_at = challenge.expires_at, "issued challenge");
        challenge
    }

    /// Consume a challenge for a verification attempt.
    ///
    /// The challenge is marked consumed before any other check, so a second
    /// attempt always fails with `ChallengeReused` whatever the first
    /// attempt's outcome. The entry lock makes this atomic across callers.
    pub fn consume(&self, value: &str, origin: &str, timestamp: i64, now: i64) -> Result<Challenge> {
        let mut entry = self
            .challenges
            .get_mut(value)
            .ok_or(AuthError::ChallengeNotFound)?;

        if entry.consumed {
            return Err(AuthError::ChallengeReused);
        }
        entry.consumed = true;

        if now >= entry.expires_at {
            return Err(AuthError::ChallengeExpired);
        }
        if entry.origin != origin {
            return Err(AuthError::OriginMismatch);
        }
        if entry.timestamp != timestamp {
            return Err(AuthError::TimestampMismatch);
        }

        debug!(origin, "consumed challenge");
        Ok(entry.clone())
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
            let removed = self.purge_expired(now);
            if removed > 0 {
                debug!(removed, "swept expired challenges");
            }
        }
    }

    /// Drop challenges past their expiry. Returns how many were removed.
    pub fn purge_expired(&self, now: i64) -> usize {
        let before = self.challenges.len();
        self.challenges.retain(|_, c| now < c.expires_at);
        before.saturating_sub(self.challenges.len())
    }

    pub fn len(&self) -> usize {
        self.challenges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.challenges.is_empty()
    }
}
