//! Vault configuration.
//!
//! Every field is optional; a missing table or key takes its default.
//!
//! ```toml
//! [cipher]
//! kdf_iterations = 1000
//! determinism = "verify"
//!
//! [tiers]
//! onchain_max_bytes = 50000
//! hybrid_max_bytes = 1000000
//!
//! [auth]
//! session_ttl_ms = 3600000
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use vellum_auth::AuthConfig;
use vellum_cipher::CipherConfig;
use vellum_store::TierConfig;

use crate::error::{Result, VaultError};

/// Configuration for a [`Vault`](crate::Vault).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VaultConfig {
    pub cipher: CipherConfig,
    pub tiers: TierConfig,
    pub auth: AuthConfig,
}

impl VaultConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(s).map_err(|e| VaultError::Config(format!("invalid TOML: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Read and validate a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }

    pub fn validate(&self) -> Result<()> {
        self.cipher.validate()?;
        self.tiers.validate()?;
        let auth = &self.auth;
        if auth.challenge_ttl_ms <= 0 || auth.session_ttl_ms <= 0 || auth.certificate_validity_ms <= 0
        {
            return Err(VaultError::Config("auth lifetimes must be positive".into()));
        }
        Ok(())
    }
}
