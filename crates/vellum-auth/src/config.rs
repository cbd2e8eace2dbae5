//! Auth lifetimes.

use serde::{Deserialize, Serialize};

/// Lifetimes for challenges, sessions and certificates, in milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// How long an issued challenge may be answered (default: 5 minutes).
    pub challenge_ttl_ms: i64,

    /// Session lifetime (default: 24 hours).
    pub session_ttl_ms: i64,

    /// Certificate validity window (default: 365 days).
    pub certificate_validity_ms: i64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            challenge_ttl_ms: 5 * 60 * 1000,
            session_ttl_ms: 24 * 60 * 60 * 1000,
            certificate_validity_ms: 365 * 24 * 60 * 60 * 1000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AuthConfig::default();
        assert_eq!(config.challenge_ttl_ms, 300_000);
        assert_eq!(config.session_ttl_ms, 86_400_000);
        assert_eq!(config.certificate_validity_ms, 31_536_000_000);
    }
}
