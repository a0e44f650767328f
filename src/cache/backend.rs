//! Cache backend implementations.

use super::key::CacheKey;
use super::manager::CacheConfig;
use crate::{Error, Result};
use async_trait::async_trait;
use lru::LruCache;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tracing::{debug, info};

#[derive(Clone)]
struct CacheEntry {
    data: Vec<u8>,
    inserted_at: Instant,
    /// Key plus value bytes, charged against the size ceiling.
    size: usize,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant, retention: Duration) -> bool {
        now.saturating_duration_since(self.inserted_at) >= retention
    }
}

#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Local lookup. Expired entries read as a miss.
    async fn get(&self, key: &CacheKey) -> Result<Option<Vec<u8>>>;
    /// Insert or replace. A replaced entry counts as freshly inserted.
    async fn set(&self, key: &CacheKey, value: &[u8]) -> Result<()>;
    async fn delete(&self, key: &CacheKey) -> Result<bool>;
    async fn clear(&self) -> Result<()>;
    async fn len(&self) -> Result<usize>;
    fn name(&self) -> &'static str;
    /// Entries dropped to stay under the size ceiling.
    fn evictions(&self) -> u64 {
        0
    }
}

struct Store {
    // Reads use `peek`, so recency order is insertion order.
    entries: LruCache<String, CacheEntry>,
    total_bytes: usize,
}

impl Store {
    fn remove(&mut self, key: &str) -> Option<CacheEntry> {
        let entry = self.entries.pop(key)?;
        self.total_bytes -= entry.size;
        Some(entry)
    }

    fn purge_expired(&mut self, now: Instant, retention: Duration) {
        while let Some((_, oldest)) = self.entries.peek_lru() {
            if !oldest.is_expired(now, retention) {
                break;
            }
            if let Some((_, entry)) = self.entries.pop_lru() {
                self.total_bytes -= entry.size;
            }
        }
    }
}

/// In-memory store bounded by a retention window and a total byte ceiling.
///
/// Eviction is oldest-first. Lookups never reorder entries.
pub struct MemoryCache {
    store: Mutex<Store>,
    retention: Duration,
    hard_max_bytes: usize,
    max_entry_bytes: usize,
    verbose: bool,
    evictions: AtomicU64,
}

impl MemoryCache {
    /// Build a cache from validated limits. Fails with
    /// [`Error::CacheUnavailable`] when the limits cannot hold any entry.
    pub fn new(config: &CacheConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            store: Mutex::new(Store {
                entries: LruCache::unbounded(),
                total_bytes: 0,
            }),
            retention: config.retention,
            hard_max_bytes: config.hard_max_bytes,
            max_entry_bytes: config.max_entry_bytes,
            verbose: config.verbose,
            evictions: AtomicU64::new(0),
        })
    }

    /// Bytes currently charged against the ceiling.
    pub fn total_bytes(&self) -> usize {
        self.lock().total_bytes
    }

    fn lock(&self) -> MutexGuard<'_, Store> {
        // Every mutation is a single insert or pop, so a poisoned store is still consistent.
        self.store.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl CacheBackend for MemoryCache {
    async fn get(&self, key: &CacheKey) -> Result<Option<Vec<u8>>> {
        let now = Instant::now();
        let mut store = self.lock();
        let expired = match store.entries.peek(key.as_str()) {
            Some(entry) if !entry.is_expired(now, self.retention) => {
                return Ok(Some(entry.data.clone()));
            }
            Some(_) => true,
            None => false,
        };
        if expired {
            debug!(key = %key.short(), "Cache entry expired, removing");
            store.remove(key.as_str());
        }
        Ok(None)
    }

    async fn set(&self, key: &CacheKey, value: &[u8]) -> Result<()> {
        let size = key.len() + value.len();
        if size > self.max_entry_bytes {
            return Err(Error::cache_write_rejected(format!(
                "entry of {} bytes exceeds the {} byte entry limit",
                size, self.max_entry_bytes
            )));
        }

        let now = Instant::now();
        let mut store = self.lock();
        store.remove(key.as_str());
        store.purge_expired(now, self.retention);
        while store.total_bytes + size > self.hard_max_bytes {
            let Some((evicted, entry)) = store.entries.pop_lru() else {
                break;
            };
            store.total_bytes -= entry.size;
            self.evictions.fetch_add(1, Ordering::Relaxed);
            let short = evicted.get(..8).unwrap_or(evicted.as_str());
            if self.verbose {
                info!(key = %short, bytes = entry.size, "Evicting oldest cache entry");
            } else {
                debug!(key = %short, bytes = entry.size, "Evicting oldest cache entry");
            }
        }
        store.entries.put(
            key.as_str().to_string(),
            CacheEntry {
                data: value.to_vec(),
                inserted_at: now,
                size,
            },
        );
        store.total_bytes += size;
        Ok(())
    }

    async fn delete(&self, key: &CacheKey) -> Result<bool> {
        Ok(self.lock().remove(key.as_str()).is_some())
    }

    async fn clear(&self) -> Result<()> {
        let mut store = self.lock();
        store.entries.clear();
        store.total_bytes = 0;
        Ok(())
    }

    async fn len(&self) -> Result<usize> {
        let now = Instant::now();
        Ok(self
            .lock()
            .entries
            .iter()
            .filter(|(_, e)| !e.is_expired(now, self.retention))
            .count())
    }

    fn name(&self) -> &'static str {
        "memory"
    }

    fn evictions(&self) -> u64 {
        self.evictions.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Query;

    fn key(prompt: &str) -> CacheKey {
        CacheKey::derive(&Query::new(prompt))
    }

    fn small_cache(hard_max_bytes: usize) -> MemoryCache {
        let config = CacheConfig::new()
            .with_hard_max_bytes(hard_max_bytes)
            .with_max_entry_bytes(hard_max_bytes);
        MemoryCache::new(&config).unwrap()
    }

    #[test]
    fn test_set_then_get() {
        tokio_test::block_on(async {
            let cache = small_cache(1024);
            cache.set(&key("a"), b"one").await.unwrap();
            assert_eq!(cache.get(&key("a")).await.unwrap(), Some(b"one".to_vec()));
            assert_eq!(cache.get(&key("b")).await.unwrap(), None);
            assert_eq!(cache.total_bytes(), 64 + 3);
        });
    }

    #[test]
    fn test_last_write_wins() {
        tokio_test::block_on(async {
            let cache = small_cache(1024);
            cache.set(&key("a"), b"first").await.unwrap();
            cache.set(&key("a"), b"second").await.unwrap();
            assert_eq!(cache.get(&key("a")).await.unwrap(), Some(b"second".to_vec()));
            assert_eq!(cache.len().await.unwrap(), 1);
            assert_eq!(cache.total_bytes(), 64 + 6);
        });
    }

    #[test]
    fn test_oldest_entry_evicted_at_ceiling() {
        tokio_test::block_on(async {
            // Room for exactly two 64-byte keys with 10-byte values.
            let cache = small_cache(2 * (64 + 10));
            cache.set(&key("a"), &[0u8; 10]).await.unwrap();
            cache.set(&key("b"), &[1u8; 10]).await.unwrap();
            // Reading "a" must not protect it; eviction follows insertion order.
            assert!(cache.get(&key("a")).await.unwrap().is_some());
            cache.set(&key("c"), &[2u8; 10]).await.unwrap();

            assert_eq!(cache.get(&key("a")).await.unwrap(), None);
            assert!(cache.get(&key("b")).await.unwrap().is_some());
            assert!(cache.get(&key("c")).await.unwrap().is_some());
            assert_eq!(cache.evictions(), 1);
            assert!(cache.total_bytes() <= 2 * (64 + 10));
        });
    }

    #[test]
    fn test_oversized_entry_rejected() {
        tokio_test::block_on(async {
            let cache = small_cache(100);
            let err = cache.set(&key("a"), &[0u8; 200]).await.unwrap_err();
            assert!(matches!(err, Error::CacheWriteRejected { .. }));
            assert_eq!(cache.len().await.unwrap(), 0);
        });
    }

    #[tokio::test]
    async fn test_expired_entry_is_a_miss() {
        let config = CacheConfig::new().with_retention(Duration::from_millis(30));
        let cache = MemoryCache::new(&config).unwrap();
        cache.set(&key("a"), b"soon gone").await.unwrap();
        assert!(cache.get(&key("a")).await.unwrap().is_some());

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(cache.get(&key("a")).await.unwrap(), None);
        assert_eq!(cache.total_bytes(), 0);
    }

    #[test]
    fn test_delete_and_clear() {
        tokio_test::block_on(async {
            let cache = small_cache(1024);
            cache.set(&key("a"), b"1").await.unwrap();
            cache.set(&key("b"), b"2").await.unwrap();
            assert!(cache.delete(&key("a")).await.unwrap());
            assert!(!cache.delete(&key("a")).await.unwrap());
            cache.clear().await.unwrap();
            assert_eq!(cache.len().await.unwrap(), 0);
            assert_eq!(cache.total_bytes(), 0);
        });
    }
}
