//! Cache storage backends.
//!
//! # Responsibilities
//! - Define the `CacheStore` seam the HTTP layer talks to
//! - Provide an in-process store with per-entry expiry
//!
//! # Design Decisions
//! - Values are opaque bytes; serialization belongs to the caller
//! - Expired entries are dropped on read and swept every few hundred writes

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Writes between sweeps of expired entries.
const SWEEP_EVERY: u64 = 256;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache entry could not be serialized: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// A stored value together with the time it has left to live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheHit {
    pub value: Vec<u8>,
    pub ttl: Duration,
}

#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<CacheHit>, CacheError>;

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheError>;

    async fn del(&self, key: &str) -> Result<(), CacheError>;
}

#[derive(Debug, Clone)]
struct Entry {
    value: Vec<u8>,
    expires_at: Instant,
}

/// In-memory store shared by every request of the process.
#[derive(Debug, Clone, Default)]
pub struct MemoryCacheStore {
    inner: Arc<DashMap<String, Entry>>,
    writes: Arc<AtomicU64>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries, expired ones included until read.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Remove every expired entry. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.inner.len();
        self.inner.retain(|_, entry| entry.expires_at > now);
        before.saturating_sub(self.inner.len())
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn get(&self, key: &str) -> Result<Option<CacheHit>, CacheError> {
        let now = Instant::now();
        let hit = self.inner.get(key).map(|entry| {
            (
                entry.value.clone(),
                entry.expires_at.saturating_duration_since(now),
            )
        });

        match hit {
            Some((_, ttl)) if ttl.is_zero() => {
                self.inner.remove(key);
                Ok(None)
            }
            Some((value, ttl)) => Ok(Some(CacheHit { value, ttl })),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheError> {
        if ttl.is_zero() {
            return Ok(());
        }
        if (self.writes.fetch_add(1, Ordering::Relaxed) + 1) % SWEEP_EVERY == 0 {
            let purged = self.purge_expired();
            tracing::debug!(purged, remaining = self.inner.len(), "Swept expired cache entries");
        }
        self.inner.insert(
            key.to_string(),
            Entry {
                value,
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }

    async fn del(&self, key: &str) -> Result<(), CacheError> {
        self.inner.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_get_del() {
        let store = MemoryCacheStore::new();
        store
            .set("GET:/users", b"cached".to_vec(), Duration::from_secs(60))
            .await
            .unwrap();

        let hit = store.get("GET:/users").await.unwrap().unwrap();
        assert_eq!(hit.value, b"cached");
        assert!(hit.ttl <= Duration::from_secs(60));
        assert!(hit.ttl > Duration::from_secs(50));

        store.del("GET:/users").await.unwrap();
        assert!(store.get("GET:/users").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_expired_entry_is_dropped() {
        let store = MemoryCacheStore::new();
        store
            .set("k", b"v".to_vec(), Duration::from_millis(10))
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(30)).await;

        assert!(store.get("k").await.unwrap().is_none());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_purge_expired() {
        let store = MemoryCacheStore::new();
        for i in 0..50 {
            store
                .set(&format!("GET:/items?page={}", i), b"v".to_vec(), Duration::from_millis(1))
                .await
                .unwrap();
        }
        store
            .set("GET:/kept", b"v".to_vec(), Duration::from_secs(60))
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(20)).await;

        assert_eq!(store.purge_expired(), 50);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_writes_sweep_expired_entries() {
        let store = MemoryCacheStore::new();
        for i in 0..1000 {
            store
                .set(&format!("GET:/search?q={}", i), b"v".to_vec(), Duration::from_millis(1))
                .await
                .unwrap();
        }

        tokio::time::sleep(Duration::from_millis(20)).await;
        for i in 0..SWEEP_EVERY {
            store
                .set(&format!("GET:/live/{}", i), b"v".to_vec(), Duration::from_secs(60))
                .await
                .unwrap();
        }

        assert!(store.len() <= SWEEP_EVERY as usize);
    }

    #[tokio::test]
    async fn test_zero_ttl_is_not_stored() {
        let store = MemoryCacheStore::new();
        store.set("k", b"v".to_vec(), Duration::ZERO).await.unwrap();
        assert_eq!(store.len(), 0);
    }
}
