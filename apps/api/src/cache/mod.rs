//! Result Cache — memoizes expensive results behind get/set/delete/pattern-clear.
//!
//! The cache is a pure performance optimization. Every operation degrades to
//! "miss" or "not stored" when the backing store is down, a payload is corrupt,
//! or a round-trip times out; callers never see a cache error.
//!
//! Connectivity: DISCONNECTED → CONNECTING → CONNECTED. `probe()` drives the
//! transition; a connection-class failure while CONNECTED drops back to
//! DISCONNECTED, where operations short-circuit without touching the store.

pub mod codec;
pub mod handlers;
pub mod keys;
pub mod memory_store;
pub mod redis_store;
pub mod store;

use std::future::Future;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, info, warn};

use crate::cache::keys::escape_pattern;
use crate::cache::store::{CacheStats, CacheStore, StoreError};

/// Aggregate namespaces whose cached views may depend on any entity.
const AGGREGATE_PATTERNS: [&str; 2] = ["*dashboard*", "*stats*"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

impl ConnectionState {
    fn as_u8(self) -> u8 {
        match self {
            ConnectionState::Disconnected => 0,
            ConnectionState::Connecting => 1,
            ConnectionState::Connected => 2,
        }
    }

    fn from_u8(raw: u8) -> Self {
        match raw {
            1 => ConnectionState::Connecting,
            2 => ConnectionState::Connected,
            _ => ConnectionState::Disconnected,
        }
    }
}

pub struct ResultCache {
    store: Arc<dyn CacheStore>,
    default_ttl: Duration,
    state: AtomicU8,
}

impl ResultCache {
    /// Starts DISCONNECTED; call `probe()` before use.
    pub fn new(store: Arc<dyn CacheStore>, default_ttl: Duration) -> Self {
        Self {
            store,
            default_ttl,
            state: AtomicU8::new(ConnectionState::Disconnected.as_u8()),
        }
    }

    pub fn backend(&self) -> &'static str {
        self.store.backend()
    }

    pub fn state(&self) -> ConnectionState {
        ConnectionState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    fn set_state(&self, state: ConnectionState) {
        self.state.store(state.as_u8(), Ordering::Release);
    }

    /// Runs one connection probe and moves to CONNECTED or DISCONNECTED.
    pub async fn probe(&self) -> ConnectionState {
        self.set_state(ConnectionState::Connecting);
        match self.store.ping().await {
            Ok(()) => {
                self.set_state(ConnectionState::Connected);
                info!(backend = self.backend(), "Cache connected");
            }
            Err(e) => {
                self.set_state(ConnectionState::Disconnected);
                warn!(backend = self.backend(), error = %e, "Cache not available, running without cache");
            }
        }
        self.state()
    }

    /// Re-probes every `every` while DISCONNECTED.
    pub fn spawn_reconnect_loop(self: Arc<Self>, every: Duration) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if self.state() == ConnectionState::Disconnected {
                    debug!("Re-probing cache backend");
                    self.probe().await;
                }
            }
        })
    }

    fn record_failure(&self, operation: &str, key: &str, error: &StoreError) {
        warn!(operation, key, error = %error, "Cache operation failed");
        if error.is_connection_failure() {
            self.set_state(ConnectionState::Disconnected);
            warn!(backend = self.backend(), "Cache connection lost, running without cache");
        }
    }

    /// Returns the cached value, or `None` on miss, expiry, outage or corrupt payload.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        if !self.is_connected() {
            return None;
        }

        let payload = match self.store.get(key).await {
            Ok(Some(payload)) => payload,
            Ok(None) => return None,
            Err(e) => {
                self.record_failure("cache_get", key, &e);
                return None;
            }
        };

        match codec::decode(&payload) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(key, error = %e, "Discarding corrupt cache payload");
                if let Err(e) = self.store.delete(key).await {
                    self.record_failure("cache_delete", key, &e);
                }
                None
            }
        }
    }

    /// Stores `value` for `ttl` (or the configured default). Returns false when
    /// nothing was stored; that is never an error for the caller.
    pub async fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T, ttl: Option<Duration>) -> bool {
        if !self.is_connected() {
            return false;
        }

        let payload = match codec::encode(value) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(key, error = %e, "Value could not be encoded for cache");
                return false;
            }
        };

        match self
            .store
            .set(key, payload, ttl.unwrap_or(self.default_ttl))
            .await
        {
            Ok(()) => true,
            Err(e) => {
                self.record_failure("cache_set", key, &e);
                false
            }
        }
    }

    /// Removes `key`. True when the store accepted the delete, whether or not
    /// the key existed.
    pub async fn delete(&self, key: &str) -> bool {
        if !self.is_connected() {
            return false;
        }

        match self.store.delete(key).await {
            Ok(_) => true,
            Err(e) => {
                self.record_failure("cache_delete", key, &e);
                false
            }
        }
    }

    pub async fn exists(&self, key: &str) -> bool {
        if !self.is_connected() {
            return false;
        }

        match self.store.exists(key).await {
            Ok(found) => found,
            Err(e) => {
                self.record_failure("cache_exists", key, &e);
                false
            }
        }
    }

    /// Removes every key matching a glob pattern; returns the count removed.
    pub async fn clear_pattern(&self, pattern: &str) -> u64 {
        if !self.is_connected() {
            return 0;
        }

        match self.store.clear_pattern(pattern).await {
            Ok(removed) => {
                debug!(pattern, removed, "Cleared cache pattern");
                removed
            }
            Err(e) => {
                self.record_failure("cache_clear_pattern", pattern, &e);
                0
            }
        }
    }

    /// Returns the cached value for `key`, or runs `producer` and caches its
    /// output. The producer runs at most once per call. Its error is returned
    /// as-is and nothing is cached.
    pub async fn get_or_compute<T, E, F, Fut>(
        &self,
        key: &str,
        ttl: Option<Duration>,
        producer: F,
    ) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Some(cached) = self.get::<T>(key).await {
            debug!(key, "Cache hit");
            return Ok(cached);
        }

        debug!(key, "Cache miss");
        let value = producer().await?;
        self.set(key, &value, ttl).await;
        Ok(value)
    }

    /// Coarse, pattern-based invalidation after an entity changes: every key
    /// naming the entity type, the id-scoped keys, and the aggregate views.
    pub async fn invalidate_related(&self, entity_type: &str, entity_id: Option<i64>) -> u64 {
        let entity = escape_pattern(entity_type);

        let mut patterns = vec![format!("*{entity}*")];
        if let Some(id) = entity_id {
            patterns.push(format!("*{entity}:{id}*"));
        }
        patterns.extend(AGGREGATE_PATTERNS.iter().map(|p| p.to_string()));

        let mut removed = 0;
        for pattern in &patterns {
            removed += self.clear_pattern(pattern).await;
        }

        info!(entity_type, ?entity_id, removed, "Invalidated related cache entries");
        removed
    }

    pub async fn stats(&self) -> Option<CacheStats> {
        if !self.is_connected() {
            return None;
        }

        match self.store.stats().await {
            Ok(stats) => Some(stats),
            Err(e) => {
                self.record_failure("cache_stats", "*", &e);
                None
            }
        }
    }
}
