//! In-process `CacheStore`, used with `CACHE_BACKEND=memory` and in tests.
//!
//! Expiry uses the tokio clock, so paused-time tests can step past a TTL.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tokio::time::Instant;

use crate::cache::store::{CacheStats, CacheStore, StoreError, MAX_TTL};

struct Entry {
    payload: Vec<u8>,
    expires_at: Instant,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

#[derive(Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, Entry>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn compile_pattern(pattern: &str) -> Result<glob::Pattern, StoreError> {
    glob::Pattern::new(pattern).map_err(|e| StoreError::InvalidPattern {
        pattern: pattern.to_string(),
        message: e.msg.to_string(),
    })
}

#[async_trait]
impl CacheStore for MemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let now = Instant::now();
        let payload = self
            .entries
            .read()
            .await
            .get(key)
            .filter(|e| e.is_live(now))
            .map(|e| e.payload.clone());

        match payload {
            Some(p) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Ok(Some(p))
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                // Drop the expired entry, if that is why we missed.
                let mut entries = self.entries.write().await;
                if entries.get(key).is_some_and(|e| !e.is_live(now)) {
                    entries.remove(key);
                }
                Ok(None)
            }
        }
    }

    async fn set(&self, key: &str, payload: Vec<u8>, ttl: Duration) -> Result<(), StoreError> {
        let now = Instant::now();
        let entry = Entry {
            payload,
            expires_at: now.checked_add(ttl).unwrap_or_else(|| now + MAX_TTL),
        };
        self.entries.write().await.insert(key.to_string(), entry);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        let now = Instant::now();
        Ok(self
            .entries
            .write()
            .await
            .remove(key)
            .is_some_and(|e| e.is_live(now)))
    }

    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        let now = Instant::now();
        Ok(self
            .entries
            .read()
            .await
            .get(key)
            .is_some_and(|e| e.is_live(now)))
    }

    async fn clear_pattern(&self, pattern: &str) -> Result<u64, StoreError> {
        let matcher = compile_pattern(pattern)?;
        let now = Instant::now();

        let mut removed = 0;
        self.entries.write().await.retain(|key, entry| {
            if !entry.is_live(now) {
                return false;
            }
            if matcher.matches(key) {
                removed += 1;
                return false;
            }
            true
        });
        Ok(removed)
    }

    async fn stats(&self) -> Result<CacheStats, StoreError> {
        let now = Instant::now();
        let keys = self
            .entries
            .read()
            .await
            .values()
            .filter(|e| e.is_live(now))
            .count() as u64;
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);

        Ok(CacheStats {
            backend: self.backend().to_string(),
            keys,
            hits,
            misses,
            hit_rate: CacheStats::hit_rate(hits, misses),
            used_memory_human: None,
            connected_clients: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINUTE: Duration = Duration::from_secs(60);

    #[tokio::test]
    async fn test_set_then_get_returns_payload() {
        let store = MemoryStore::new();
        store.set("job:1", b"abc".to_vec(), MINUTE).await.unwrap();
        assert_eq!(store.get("job:1").await.unwrap(), Some(b"abc".to_vec()));
    }

    #[tokio::test]
    async fn test_oversized_ttl_is_capped_not_fatal() {
        let store = MemoryStore::new();
        store.set("job:1", b"abc".to_vec(), Duration::MAX).await.unwrap();
        assert_eq!(store.get("job:1").await.unwrap(), Some(b"abc".to_vec()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_entry_expires_after_ttl() {
        let store = MemoryStore::new();
        store
            .set("job:1", b"abc".to_vec(), Duration::from_millis(10))
            .await
            .unwrap();
        tokio::time::advance(Duration::from_millis(11)).await;

        assert_eq!(store.get("job:1").await.unwrap(), None);
        assert!(!store.exists("job:1").await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let store = MemoryStore::new();
        store.set("job:1", b"abc".to_vec(), MINUTE).await.unwrap();
        assert!(store.delete("job:1").await.unwrap());
        assert!(!store.delete("job:1").await.unwrap());
    }

    #[tokio::test]
    async fn test_clear_pattern_counts_only_matches() {
        let store = MemoryStore::new();
        for key in ["job:1", "job:2", "candidate:1", "dashboard:stats"] {
            store.set(key, b"x".to_vec(), MINUTE).await.unwrap();
        }

        assert_eq!(store.clear_pattern("*job*").await.unwrap(), 2);
        assert!(store.exists("candidate:1").await.unwrap());
        assert!(store.exists("dashboard:stats").await.unwrap());
    }

    #[tokio::test]
    async fn test_invalid_pattern_is_rejected() {
        let store = MemoryStore::new();
        let err = store.clear_pattern("[job").await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidPattern { .. }));
    }

    #[tokio::test]
    async fn test_stats_track_hits_and_misses() {
        let store = MemoryStore::new();
        store.set("job:1", b"x".to_vec(), MINUTE).await.unwrap();
        store.get("job:1").await.unwrap();
        store.get("job:2").await.unwrap();

        let stats = store.stats().await.unwrap();
        assert_eq!(stats.backend, "memory");
        assert_eq!(stats.keys, 1);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert!((stats.hit_rate - 0.5).abs() < f64::EPSILON);
    }
}
