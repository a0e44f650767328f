//! Cache manager.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, warn};

use super::backend::{CacheBackend, MemoryCache};
use super::key::CacheKey;
use crate::{Error, Result};

/// Default retention window for cached responses.
pub const DEFAULT_RETENTION: Duration = Duration::from_secs(24 * 60 * 60);
/// Default ceiling on total cached bytes (256 MiB).
pub const DEFAULT_HARD_MAX_BYTES: usize = 256 * 1024 * 1024;
/// Default ceiling on a single entry (10 MiB).
pub const DEFAULT_MAX_ENTRY_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Entries older than this read as a miss even if still stored.
    pub retention: Duration,
    /// Oldest entries are evicted once stored bytes would exceed this.
    pub hard_max_bytes: usize,
    pub max_entry_bytes: usize,
    /// Log evictions and lookups at `info` instead of `debug`.
    pub verbose: bool,
    /// Collect hit/miss counters.
    pub stats_enabled: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            retention: DEFAULT_RETENTION,
            hard_max_bytes: DEFAULT_HARD_MAX_BYTES,
            max_entry_bytes: DEFAULT_MAX_ENTRY_BYTES,
            verbose: false,
            stats_enabled: false,
        }
    }
}

impl CacheConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_retention(mut self, retention: Duration) -> Self {
        self.retention = retention;
        self
    }

    pub fn with_hard_max_bytes(mut self, bytes: usize) -> Self {
        self.hard_max_bytes = bytes;
        self
    }

    pub fn with_max_entry_bytes(mut self, bytes: usize) -> Self {
        self.max_entry_bytes = bytes;
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn with_stats(mut self, enabled: bool) -> Self {
        self.stats_enabled = enabled;
        self
    }

    /// Reject limits under which no entry could ever be stored.
    pub fn validate(&self) -> Result<()> {
        if self.retention.is_zero() {
            return Err(Error::cache_unavailable("retention window must be non-zero"));
        }
        if self.hard_max_bytes == 0 {
            return Err(Error::cache_unavailable("hard size ceiling must be non-zero"));
        }
        if self.max_entry_bytes == 0 || self.max_entry_bytes > self.hard_max_bytes {
            return Err(Error::cache_unavailable(format!(
                "entry limit {} must be between 1 and the hard ceiling {}",
                self.max_entry_bytes, self.hard_max_bytes
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub sets: u64,
    pub evictions: u64,
    /// Failed lookups and writes, plus entries that were not valid UTF-8.
    pub errors: u64,
}

impl CacheStats {
    pub fn hit_ratio(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

#[derive(Default)]
struct AtomicStats {
    hits: AtomicU64,
    misses: AtomicU64,
    sets: AtomicU64,
    errors: AtomicU64,
}

/// Best-effort front for a [`CacheBackend`].
///
/// Lookups that fail read as a miss and writes that fail are logged and
/// dropped; nothing here ever fails a query.
pub struct CacheManager {
    config: CacheConfig,
    backend: Box<dyn CacheBackend>,
    stats: AtomicStats,
}

impl CacheManager {
    /// Build an in-memory cache. Fails with [`Error::CacheUnavailable`] when
    /// the configuration is unusable.
    pub fn new(config: CacheConfig) -> Result<Self> {
        let backend = MemoryCache::new(&config)?;
        Ok(Self::with_backend(config, Box::new(backend)))
    }

    pub fn with_backend(config: CacheConfig, backend: Box<dyn CacheBackend>) -> Self {
        Self {
            config,
            backend,
            stats: AtomicStats::default(),
        }
    }

    pub async fn get(&self, key: &CacheKey) -> Option<String> {
        let data = match self.backend.get(key).await {
            Ok(Some(data)) => data,
            Ok(None) => {
                self.count(&self.stats.misses);
                self.trace_lookup(key, "miss");
                return None;
            }
            Err(e) => {
                self.count(&self.stats.errors);
                warn!(key = %key.short(), error = %e, "Cache lookup failed, treating as miss");
                return None;
            }
        };
        match String::from_utf8(data) {
            Ok(text) => {
                self.count(&self.stats.hits);
                self.trace_lookup(key, "hit");
                Some(text)
            }
            Err(_) => {
                self.count(&self.stats.errors);
                warn!(key = %key.short(), "Cached entry is not UTF-8, treating as miss");
                None
            }
        }
    }

    /// Store a response. Failures are logged and swallowed.
    pub async fn set(&self, key: &CacheKey, value: &str) {
        match self.backend.set(key, value.as_bytes()).await {
            Ok(()) => self.count(&self.stats.sets),
            Err(e) => {
                self.count(&self.stats.errors);
                warn!(key = %key.short(), error = %e, "Cache write failed, continuing without it");
            }
        }
    }

    pub async fn delete(&self, key: &CacheKey) -> bool {
        self.backend.delete(key).await.unwrap_or(false)
    }

    pub async fn clear(&self) {
        if let Err(e) = self.backend.clear().await {
            warn!(error = %e, "Cache clear failed");
        }
    }

    pub async fn len(&self) -> usize {
        self.backend.len().await.unwrap_or(0)
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.stats.hits.load(Ordering::Relaxed),
            misses: self.stats.misses.load(Ordering::Relaxed),
            sets: self.stats.sets.load(Ordering::Relaxed),
            evictions: if self.config.stats_enabled {
                self.backend.evictions()
            } else {
                0
            },
            errors: self.stats.errors.load(Ordering::Relaxed),
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    fn count(&self, counter: &AtomicU64) {
        if self.config.stats_enabled {
            counter.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn trace_lookup(&self, key: &CacheKey, outcome: &'static str) {
        if self.config.verbose {
            info!(key = %key.short(), outcome, "Cache lookup");
        } else {
            debug!(key = %key.short(), outcome, "Cache lookup");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Query;
    use async_trait::async_trait;

    struct BrokenBackend;

    #[async_trait]
    impl CacheBackend for BrokenBackend {
        async fn get(&self, _: &CacheKey) -> Result<Option<Vec<u8>>> {
            Err(Error::cache_unavailable("down"))
        }
        async fn set(&self, _: &CacheKey, _: &[u8]) -> Result<()> {
            Err(Error::cache_write_rejected("down"))
        }
        async fn delete(&self, _: &CacheKey) -> Result<bool> {
            Err(Error::cache_unavailable("down"))
        }
        async fn clear(&self) -> Result<()> {
            Err(Error::cache_unavailable("down"))
        }
        async fn len(&self) -> Result<usize> {
            Err(Error::cache_unavailable("down"))
        }
        fn name(&self) -> &'static str {
            "broken"
        }
    }

    #[test]
    fn test_default_config_matches_documented_limits() {
        let config = CacheConfig::default();
        assert_eq!(config.retention, Duration::from_secs(86_400));
        assert_eq!(config.hard_max_bytes, 256 * 1024 * 1024);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_unusable_config_is_cache_unavailable() {
        for config in [
            CacheConfig::new().with_retention(Duration::ZERO),
            CacheConfig::new().with_hard_max_bytes(0),
            CacheConfig::new().with_max_entry_bytes(0),
            CacheConfig::new().with_hard_max_bytes(10).with_max_entry_bytes(11),
        ] {
            let err = CacheManager::new(config).err().expect("config should be rejected");
            assert!(matches!(err, Error::CacheUnavailable { .. }));
        }
    }

    #[tokio::test]
    async fn test_stats_track_hits_and_misses() {
        let cache = CacheManager::new(CacheConfig::new().with_stats(true)).unwrap();
        let key = CacheKey::derive(&Query::new("q"));
        assert_eq!(cache.get(&key).await, None);
        cache.set(&key, "answer").await;
        assert_eq!(cache.get(&key).await.as_deref(), Some("answer"));

        let stats = cache.stats();
        assert_eq!((stats.hits, stats.misses, stats.sets), (1, 1, 1));
        assert!((stats.hit_ratio() - 0.5).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_stats_disabled_stay_zero() {
        let cache = CacheManager::new(CacheConfig::new()).unwrap();
        let key = CacheKey::derive(&Query::new("q"));
        cache.set(&key, "answer").await;
        assert!(cache.get(&key).await.is_some());
        assert_eq!(cache.stats(), CacheStats::default());
    }

    #[tokio::test]
    async fn test_backend_failures_are_swallowed() {
        let cache =
            CacheManager::with_backend(CacheConfig::new().with_stats(true), Box::new(BrokenBackend));
        let key = CacheKey::derive(&Query::new("q"));
        cache.set(&key, "answer").await;
        assert_eq!(cache.get(&key).await, None);
        assert!(!cache.delete(&key).await);
        assert_eq!(cache.len().await, 0);
        assert_eq!(cache.stats().errors, 2);
        assert_eq!(cache.backend_name(), "broken");
    }
}
