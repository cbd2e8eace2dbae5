//! Payload compression for oversized documents.

use serde::{Deserialize, Serialize};

use crate::error::{Result, StorageError};

/// Compression applied to a stored blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Compression {
    Zstd,
}

/// Compress with zstd at `level`.
pub fn compress(data: &[u8], level: i32) -> Result<Vec<u8>> {
    zstd::encode_all(data, level).map_err(|e| StorageError::Compression(e.to_string()))
}

/// Reverse [`compress`].
pub fn decompress(data: &[u8]) -> Result<Vec<u8>> {
    zstd::decode_all(data).map_err(|e| StorageError::Compression(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repetitive_data_shrinks() {
        let data = b"ledger ".repeat(10_000);
        let compressed = compress(&data, 3).unwrap();
        assert!(compressed.len() < data.len() / 10);
        assert_eq!(decompress(&compressed).unwrap(), data);
    }

    #[test]
    fn test_compression_is_deterministic() {
        let data = b"abcabcabc".repeat(1000);
        assert_eq!(compress(&data, 3).unwrap(), compress(&data, 3).unwrap());
    }

    #[test]
    fn test_garbage_fails_to_decompress() {
        assert!(matches!(
            decompress(b"definitely not zstd"),
            Err(StorageError::Compression(_))
        ));
    }
}
