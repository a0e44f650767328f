//! 响应缓存模块：以请求内容寻址，限定保留时间与总容量。
//!
//! # Response Caching Module
//!
//! Responses are stored under a [`CacheKey`] derived from the semantically
//! relevant fields of a [`Query`](crate::types::Query), so an identical query
//! is answered locally without a network round-trip.
//!
//! ## Key Components
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`CacheManager`] | Best-effort front: failed lookups miss, failed writes are dropped |
//! | [`CacheConfig`] | Retention window, byte ceilings and observational flags |
//! | [`CacheBackend`] | Trait for implementing custom cache backends |
//! | [`MemoryCache`] | In-memory store, oldest-first eviction under a byte ceiling |
//! | [`CacheKey`] | SHA-256 key derived from a query |
//!
//! ## Example
//!
//! ```rust
//! use simpleflash::cache::{derive_key, CacheConfig, CacheManager};
//! use simpleflash::Query;
//! use std::time::Duration;
//!
//! # tokio_test::block_on(async {
//! let cache = CacheManager::new(
//!     CacheConfig::new().with_retention(Duration::from_secs(3600)),
//! )
//! .expect("valid cache config");
//!
//! let key = derive_key(&Query::new("Write a haiku about the color of cows."));
//! cache.set(&key, "Black and white patches").await;
//! assert_eq!(cache.get(&key).await.as_deref(), Some("Black and white patches"));
//! # });
//! ```

mod backend;
mod key;
mod manager;

pub use backend::{CacheBackend, MemoryCache};
pub use key::{derive_key, CacheKey, CACHE_KEY_LEN};
pub use manager::{
    CacheConfig, CacheManager, CacheStats, DEFAULT_HARD_MAX_BYTES, DEFAULT_MAX_ENTRY_BYTES,
    DEFAULT_RETENTION,
};
