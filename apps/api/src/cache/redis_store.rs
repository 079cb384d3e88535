//! Redis-backed `CacheStore`.
//!
//! Holds one multiplexed tokio connection, created by `ping()`. Every
//! round-trip is wrapped in `tokio::time::timeout` so a stalled server turns
//! into `StoreError::Timeout` instead of a stalled request.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::cache::store::{CacheStats, CacheStore, StoreError, MAX_TTL};

const SCAN_BATCH: u32 = 500;

pub struct RedisStore {
    client: redis::Client,
    conn: RwLock<Option<MultiplexedConnection>>,
    timeout: Duration,
}

impl RedisStore {
    /// Parses the URL only; no connection is made until `ping()`.
    pub fn new(redis_url: &str, timeout: Duration) -> Result<Self, StoreError> {
        let client = redis::Client::open(redis_url)?;
        Ok(Self {
            client,
            conn: RwLock::new(None),
            timeout,
        })
    }

    async fn connection(&self) -> Result<MultiplexedConnection, StoreError> {
        self.conn
            .read()
            .await
            .clone()
            .ok_or(StoreError::NotConnected)
    }

    async fn bounded<T, F>(&self, fut: F) -> Result<T, StoreError>
    where
        F: Future<Output = redis::RedisResult<T>>,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result.map_err(StoreError::from),
            Err(_) => Err(StoreError::Timeout(self.timeout)),
        }
    }
}

/// Expiry argument for `SET .. PX`. Sub-second TTLs stay meaningful, Redis
/// rejects 0, and oversized TTLs are capped.
fn px_millis(ttl: Duration) -> u64 {
    u64::try_from(ttl.min(MAX_TTL).as_millis())
        .unwrap_or(u64::MAX)
        .max(1)
}

#[async_trait]
impl CacheStore for RedisStore {
    fn backend(&self) -> &'static str {
        "redis"
    }

    async fn ping(&self) -> Result<(), StoreError> {
        if let Ok(mut conn) = self.connection().await {
            let pong: Result<String, _> = self
                .bounded(redis::cmd("PING").query_async(&mut conn))
                .await;
            match pong {
                Ok(_) => return Ok(()),
                Err(e) => debug!(error = %e, "Existing Redis connection is stale, reconnecting"),
            }
        }

        *self.conn.write().await = None;

        let mut conn = self
            .bounded(self.client.get_multiplexed_tokio_connection())
            .await?;
        let _: String = self
            .bounded(redis::cmd("PING").query_async(&mut conn))
            .await?;

        info!("Redis connection established");
        *self.conn.write().await = Some(conn);
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let mut conn = self.connection().await?;
        self.bounded(conn.get(key)).await
    }

    async fn set(&self, key: &str, payload: Vec<u8>, ttl: Duration) -> Result<(), StoreError> {
        let mut conn = self.connection().await?;
        let ttl_ms = px_millis(ttl);
        self.bounded(
            redis::cmd("SET")
                .arg(key)
                .arg(payload)
                .arg("PX")
                .arg(ttl_ms)
                .query_async::<_, ()>(&mut conn),
        )
        .await
    }

    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        let mut conn = self.connection().await?;
        let removed: u64 = self.bounded(conn.del(key)).await?;
        Ok(removed > 0)
    }

    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        let mut conn = self.connection().await?;
        self.bounded(conn.exists(key)).await
    }

    async fn clear_pattern(&self, pattern: &str) -> Result<u64, StoreError> {
        let mut conn = self.connection().await?;

        let mut cursor: u64 = 0;
        let mut removed: u64 = 0;
        loop {
            let (next, keys): (u64, Vec<String>) = self
                .bounded(
                    redis::cmd("SCAN")
                        .arg(cursor)
                        .arg("MATCH")
                        .arg(pattern)
                        .arg("COUNT")
                        .arg(SCAN_BATCH)
                        .query_async(&mut conn),
                )
                .await?;

            if !keys.is_empty() {
                let n: u64 = self.bounded(conn.del(keys)).await?;
                removed += n;
            }

            if next == 0 {
                break;
            }
            cursor = next;
        }

        debug!(pattern, removed, "Redis pattern clear finished");
        Ok(removed)
    }

    async fn stats(&self) -> Result<CacheStats, StoreError> {
        let mut conn = self.connection().await?;
        let info: redis::InfoDict = self
            .bounded(redis::cmd("INFO").query_async(&mut conn))
            .await?;
        let keys: u64 = self
            .bounded(redis::cmd("DBSIZE").query_async(&mut conn))
            .await?;

        let hits = info.get::<u64>("keyspace_hits").unwrap_or(0);
        let misses = info.get::<u64>("keyspace_misses").unwrap_or(0);

        Ok(CacheStats {
            backend: self.backend().to_string(),
            keys,
            hits,
            misses,
            hit_rate: CacheStats::hit_rate(hits, misses),
            used_memory_human: info.get::<String>("used_memory_human"),
            connected_clients: info.get::<u64>("connected_clients"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_px_millis_bounds() {
        assert_eq!(px_millis(Duration::ZERO), 1);
        assert_eq!(px_millis(Duration::from_micros(300)), 1);
        assert_eq!(px_millis(Duration::from_millis(1500)), 1500);
        assert_eq!(px_millis(Duration::MAX), MAX_TTL.as_millis() as u64);
    }

    #[test]
    fn test_new_rejects_malformed_url() {
        assert!(RedisStore::new("not a url", Duration::from_secs(1)).is_err());
    }

    #[tokio::test]
    async fn test_operations_before_ping_report_not_connected() {
        let store = RedisStore::new("redis://127.0.0.1:6379/0", Duration::from_secs(1)).unwrap();
        let err = store.get("job:1").await.unwrap_err();
        assert!(matches!(err, StoreError::NotConnected));
        assert!(err.is_connection_failure());
    }
}
