//! Backing-store seam for the result cache.
//!
//! A `CacheStore` only moves opaque bytes. Encoding, connectivity state and the
//! "never fail the caller" policy live one level up in `ResultCache`.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

/// Longest expiry a store will honor; larger TTLs are capped to it.
pub const MAX_TTL: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Cache operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("Cache store is not connected")]
    NotConnected,

    #[error("Invalid key pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },
}

impl StoreError {
    /// True when the error means the store itself is unreachable, as opposed
    /// to a single bad request.
    pub fn is_connection_failure(&self) -> bool {
        match self {
            StoreError::Redis(e) => {
                e.is_io_error()
                    || e.is_connection_dropped()
                    || e.is_connection_refusal()
                    || e.is_timeout()
            }
            StoreError::Timeout(_) | StoreError::NotConnected => true,
            StoreError::InvalidPattern { .. } => false,
        }
    }
}

/// Point-in-time statistics reported by a backing store.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CacheStats {
    pub backend: String,
    pub keys: u64,
    pub hits: u64,
    pub misses: u64,
    pub hit_rate: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub used_memory_human: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connected_clients: Option<u64>,
}

impl CacheStats {
    pub fn hit_rate(hits: u64, misses: u64) -> f64 {
        hits as f64 / (hits + misses).max(1) as f64
    }
}

/// Key/value store with per-entry expiry and glob-pattern deletion.
///
/// Every method is a single round-trip; implementations must bound it in time.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Short name used in logs and status responses.
    fn backend(&self) -> &'static str;

    /// Establishes (or re-establishes) the connection and checks it responds.
    async fn ping(&self) -> Result<(), StoreError>;

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;

    async fn set(&self, key: &str, payload: Vec<u8>, ttl: Duration) -> Result<(), StoreError>;

    /// Returns whether a key was actually removed.
    async fn delete(&self, key: &str) -> Result<bool, StoreError>;

    async fn exists(&self, key: &str) -> Result<bool, StoreError>;

    /// Removes every key matching a glob pattern, returning how many were removed.
    async fn clear_pattern(&self, pattern: &str) -> Result<u64, StoreError>;

    async fn stats(&self) -> Result<CacheStats, StoreError>;
}
