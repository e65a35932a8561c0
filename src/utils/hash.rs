//! Content hashing for cache bookkeeping.

use anyhow::{Context, Result};
use serde::Serialize;
use sha2::{Digest, Sha256};

/// Hex-encoded SHA-256 of `data`.
#[must_use]
pub fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Hash of a configuration value's YAML serialization.
///
/// Map-typed fields serialize in sorted order, so equal values hash equally.
pub fn config_hash<T: Serialize>(value: &T) -> Result<String> {
    let yaml = serde_yaml::to_string(value).context("Failed to serialize value for hashing")?;
    Ok(sha256_hex(yaml.as_bytes()))
}
