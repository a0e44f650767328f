//! # simpleflash
//!
//! 面向 Vertex AI Gemini 的轻量客户端，附带按内容寻址的响应缓存。
//!
//! A thin client for Gemini models on Vertex AI with a content-addressed
//! response cache in front of every query.
//!
//! ## Overview
//!
//! A [`FlashClient`] session owns the model ids, the request timeout, the
//! credentials and zero-or-one response cache. Each [`Query`] is reduced to a
//! SHA-256 [`CacheKey`](cache::CacheKey); a cache hit is answered locally and
//! a miss is forwarded to the [`ModelBackend`](drivers::ModelBackend), whose
//! trimmed answer is stored before it is returned.
//!
//! - Inline binary data routes the query to the multimodal model unless the
//!   query names a model explicitly.
//! - Cache failures never fail a query; a cache that cannot be initialized
//!   leaves the session running uncached.
//! - Nothing is retried. Timeouts and remote errors surface as
//!   [`Error::InferenceFailed`].
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use simpleflash::{FlashClient, Query};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> simpleflash::Result<()> {
//!     let client = FlashClient::new(
//!         "gemini-1.5-flash-001",
//!         "gemini-1.0-pro-vision",
//!         "europe-west4",
//!         "my-project",
//!         true,
//!     )?;
//!     client.set_timeout(Duration::from_secs(10));
//!
//!     let haiku = client
//!         .query_model(&Query::new("Write a haiku about the color of cows."))
//!         .await?;
//!     println!("{haiku}");
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`client`] | Session handle and builder |
//! | [`cache`] | Key derivation and the bounded response cache |
//! | [`types`] | Query and outbound request types |
//! | [`drivers`] | Model backend trait, Gemini wire mapping, Vertex backend |
//! | [`auth`] | Credential providers |
//! | [`config`] | Environment-driven session configuration |
//! | [`transport`] | Pooled HTTP client |

pub mod auth;
pub mod cache;
pub mod client;
pub mod config;
pub mod drivers;
pub mod transport;
pub mod types;

// Re-export main types for convenience
pub use cache::{derive_key, CacheConfig, CacheKey};
pub use client::{CacheState, FlashClient, FlashClientBuilder};
pub use config::SessionConfig;
pub use drivers::ModelBackend;
pub use types::{ContentPart, GenerateRequest, Query};

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for the library
pub mod error;
pub use error::{Error, ErrorContext, InferenceError};
