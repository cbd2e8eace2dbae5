//! Tier planning and cost model.
//!
//! The storage method is a pure function of the final payload and whether it
//! may be compressed. Both `store` and `estimate_cost` go through [`plan`], so
//! an estimate always names the method a store would choose.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

use crate::compression::{self, Compression};
use crate::error::{Result, StorageError};

/// Persistence strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageMethod {
    /// Payload submitted directly as a transaction.
    OnChain,
    /// Payload in the blob store, reference on-chain.
    Hybrid,
    /// Payload split across blobs, manifest on-chain.
    Chunked,
}

impl fmt::Display for StorageMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StorageMethod::OnChain => "onchain",
            StorageMethod::Hybrid => "hybrid",
            StorageMethod::Chunked => "chunked",
        })
    }
}

/// Size thresholds and fee schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TierConfig {
    /// Largest payload stored on-chain (inclusive).
    pub onchain_max_bytes: usize,

    /// Largest payload stored hybrid (inclusive).
    pub hybrid_max_bytes: usize,

    pub chunk_size_bytes: usize,

    /// On-chain cost per byte, in thousandths of a sat.
    pub unit_cost_millisats_per_byte: u64,

    pub hybrid_fee_sats: u64,

    pub chunked_base_fee_sats: u64,

    pub per_chunk_fee_sats: u64,

    /// zstd level used for oversized payloads.
    pub compression_level: i32,
}

impl Default for TierConfig {
    fn default() -> Self {
        Self {
            onchain_max_bytes: 50_000,
            hybrid_max_bytes: 1_000_000,
            chunk_size_bytes: 500_000,
            unit_cost_millisats_per_byte: 50,
            hybrid_fee_sats: 500,
            chunked_base_fee_sats: 1_000,
            per_chunk_fee_sats: 250,
            compression_level: 3,
        }
    }
}

impl TierConfig {
    pub fn validate(&self) -> Result<()> {
        if self.onchain_max_bytes >= self.hybrid_max_bytes {
            return Err(StorageError::InvalidConfig(format!(
                "onchain_max_bytes ({}) must be below hybrid_max_bytes ({})",
                self.onchain_max_bytes, self.hybrid_max_bytes
            )));
        }
        if self.chunk_size_bytes == 0 {
            return Err(StorageError::InvalidConfig(
                "chunk_size_bytes must be positive".into(),
            ));
        }
        Ok(())
    }

    /// Method for a payload of `len` bytes, before any compression.
    pub fn method_for_len(&self, len: usize) -> StorageMethod {
        if len <= self.onchain_max_bytes {
            StorageMethod::OnChain
        } else if len <= self.hybrid_max_bytes {
            StorageMethod::Hybrid
        } else {
            StorageMethod::Chunked
        }
    }

    /// Number of chunks for a payload of `len` bytes.
    pub fn chunk_count(&self, len: usize) -> usize {
        len.div_ceil(self.chunk_size_bytes)
    }

    /// Cost in sats of storing `len` bytes by `method` in `chunks` chunks.
    pub fn cost(&self, method: StorageMethod, len: usize, chunks: usize) -> u64 {
        match method {
            StorageMethod::OnChain => {
                (len as u64 * self.unit_cost_millisats_per_byte).div_ceil(1000)
            }
            StorageMethod::Hybrid => self.hybrid_fee_sats,
            StorageMethod::Chunked => {
                self.chunked_base_fee_sats + self.per_chunk_fee_sats * chunks as u64
            }
        }
    }
}

/// The outcome of tier planning for one payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TierPlan {
    pub method: StorageMethod,

    /// Length of the logical payload.
    pub payload_size: usize,

    /// Length of what is actually written (compressed size when compressed).
    pub stored_size: usize,

    pub compression: Option<Compression>,

    /// Zero unless chunked.
    pub chunk_count: usize,

    pub cost: u64,
}

/// A plan plus the compressed bytes, when compression was chosen.
#[derive(Debug, Clone)]
pub struct PlannedPayload {
    pub plan: TierPlan,
    pub compressed: Option<Vec<u8>>,
}

/// Choose the storage tier for `payload`.
///
/// Payloads above the hybrid threshold are compressed when `compressible`;
/// if the compressed form fits the hybrid tier it is stored hybrid, otherwise
/// the uncompressed payload is chunked.
pub fn plan(payload: &[u8], compressible: bool, config: &TierConfig) -> Result<PlannedPayload> {
    let len = payload.len();
    let method = config.method_for_len(len);

    if method != StorageMethod::Chunked {
        return Ok(PlannedPayload {
            plan: TierPlan {
                method,
                payload_size: len,
                stored_size: len,
                compression: None,
                chunk_count: 0,
                cost: config.cost(method, len, 0),
            },
            compressed: None,
        });
    }

    if compressible {
        let compressed = compression::compress(payload, config.compression_level)?;
        debug!(
            original = len,
            compressed = compressed.len(),
            "compressed oversized payload"
        );
        if compressed.len() <= config.hybrid_max_bytes {
            return Ok(PlannedPayload {
                plan: TierPlan {
                    method: StorageMethod::Hybrid,
                    payload_size: len,
                    stored_size: compressed.len(),
                    compression: Some(Compression::Zstd),
                    chunk_count: 0,
                    cost: config.cost(StorageMethod::Hybrid, compressed.len(), 0),
                },
                compressed: Some(compressed),
            });
        }
    }

    let chunks = config.chunk_count(len);
    Ok(PlannedPayload {
        plan: TierPlan {
            method: StorageMethod::Chunked,
            payload_size: len,
            stored_size: len,
            compression: None,
            chunk_count: chunks,
            cost: config.cost(StorageMethod::Chunked, len, chunks),
        },
        compressed: None,
    })
}

/// A cost estimate, as shown to users before storing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostEstimate {
    pub cost: u64,
    pub method: StorageMethod,
    pub description: String,
}

impl CostEstimate {
    pub fn from_plan(plan: &TierPlan) -> Self {
        let description = match (plan.method, plan.compression) {
            (StorageMethod::OnChain, _) => {
                format!("On-chain storage of {} bytes", plan.payload_size)
            }
            (StorageMethod::Hybrid, Some(_)) => format!(
                "Hybrid storage: {} bytes compressed to {} in the blob store, reference on-chain",
                plan.payload_size, plan.stored_size
            ),
            (StorageMethod::Hybrid, None) => format!(
                "Hybrid storage: {} bytes in the blob store, reference on-chain",
                plan.payload_size
            ),
            (StorageMethod::Chunked, _) => format!(
                "Chunked storage: {} bytes in {} chunks, manifest on-chain",
                plan.payload_size, plan.chunk_count
            ),
        };
        Self {
            cost: plan.cost,
            method: plan.method,
            description,
        }
    }
}
