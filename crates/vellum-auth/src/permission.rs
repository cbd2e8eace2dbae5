//! Per-origin capability grants.
//!
//! An origin asks for capabilities; a [`ConsentProvider`] decides. Grants are
//! held per origin and never visible to another origin's lookups.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// What an origin may ask the wallet to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Capability {
    Sign,
    Identity,
    Transaction,
    Certificate,
}

/// One requested capability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionRequest {
    #[serde(rename = "type")]
    pub capability: Capability,

    /// Shown to the user when asking for consent.
    pub description: String,

    /// Refusing a required capability fails the whole request.
    pub required: bool,
}

impl PermissionRequest {
    pub fn required(capability: Capability, description: impl Into<String>) -> Self {
        Self {
            capability,
            description: description.into(),
            required: true,
        }
    }

    pub fn optional(capability: Capability, description: impl Into<String>) -> Self {
        Self {
            capability,
            description: description.into(),
            required: false,
        }
    }
}

/// A capability granted to an origin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Grant {
    pub capability: Capability,
    pub description: String,
    pub granted_at: i64,
}

/// Decides whether an origin gets a capability.
///
/// Real implementations ask the user.
#[async_trait]
pub trait ConsentProvider: Send + Sync {
    async fn approve(&self, origin: &str, request: &PermissionRequest) -> bool;
}

/// Refuses everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct DenyAll;

#[async_trait]
impl ConsentProvider for DenyAll {
    async fn approve(&self, _origin: &str, _request: &PermissionRequest) -> bool {
        false
    }
}

/// Approves a fixed set of capabilities per origin.
#[derive(Debug, Clone, Default)]
pub struct AllowList {
    allowed: HashMap<String, HashSet<Capability>>,
}

impl AllowList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allow(
        mut self,
        origin: impl Into<String>,
        capabilities: impl IntoIterator<Item = Capability>,
    ) -> Self {
        self.allowed
            .entry(origin.into())
            .or_default()
            .extend(capabilities);
        self
    }
}

#[async_trait]
impl ConsentProvider for AllowList {
    async fn approve(&self, origin: &str, request: &PermissionRequest) -> bool {
        self.allowed
            .get(origin)
            .map(|caps| caps.contains(&request.capability))
            .unwrap_or(false)
    }
}

/// Granted capabilities keyed by origin.
#[derive(Debug, Default)]
pub struct PermissionStore {
    grants: DashMap<String, Vec<Grant>>,
}

impl PermissionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a grant. Re-granting a held capability refreshes it.
    pub fn grant(&self, origin: &str, request: &PermissionRequest, now: i64) {
        let mut grants = self.grants.entry(origin.to_string()).or_default();
        grants.retain(|g| g.capability != request.capability);
        grants.push(Grant {
            capability: request.capability,
            description: request.description.clone(),
            granted_at: now,
        });
        info!(origin, capability = ?request.capability, "granted capability");
    }

    /// Capabilities currently granted to `origin`.
    pub fn permissions(&self, origin: &str) -> Vec<Grant> {
        self.grants
            .get(origin)
            .map(|g| g.value().clone())
            .unwrap_or_default()
    }

    pub fn has_capability(&self, origin: &str, capability: Capability) -> bool {
        self.grants
            .get(origin)
            .map(|g| g.iter().any(|grant| grant.capability == capability))
            .unwrap_or(false)
    }

    /// Drop every grant for `origin`. Returns how many were held.
    pub fn revoke(&self, origin: &str) -> usize {
        let removed = self
            .grants
            .remove(origin)
            .map(|(_, g)| g.len())
            .unwrap_or(0);
        if removed > 0 {
            warn!(origin, removed, "revoked permissions");
        }
        removed
    }
}
