use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::cache::{CacheKey, CacheManager, CacheStats};
use crate::config::SessionConfig;
use crate::drivers::{BackendResult, ModelBackend};
use crate::error::InferenceError;
use crate::types::{GenerateRequest, Query};
use crate::{Error, Result};

/// Lifecycle of a session's response cache. Fixed at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheState {
    /// Lookups and writes go through the cache.
    Active,
    /// Caching was not requested.
    Disabled,
    /// Caching was requested but initialization failed; the session runs
    /// uncached for its whole lifetime.
    Unavailable,
}

/// Long-lived client session: credentials, model ids, timeout and an
/// optional response cache.
///
/// `FlashClient` is `Send + Sync`; share one behind an `Arc` and call it from
/// as many tasks as needed.
pub struct FlashClient {
    pub(crate) config: SessionConfig,
    pub(crate) backend: Arc<dyn ModelBackend>,
    pub(crate) cache: Option<CacheManager>,
    pub(crate) cache_state: CacheState,
    pub(crate) timeout_ms: AtomicU64,
}

impl FlashClient {
    /// Create a session against Vertex AI using ambient credentials.
    ///
    /// Fails with [`Error::CredentialsUnavailable`] when no access token can
    /// be found. A cache that cannot be initialized does not fail
    /// construction; see [`FlashClient::cache_state`].
    pub fn new(
        text_model: impl Into<String>,
        multimodal_model: impl Into<String>,
        location: impl Into<String>,
        project_id: impl Into<String>,
        enable_cache: bool,
    ) -> Result<Self> {
        crate::client::FlashClientBuilder::from_config(SessionConfig::new(
            text_model,
            multimodal_model,
            location,
            project_id,
            enable_cache,
        ))
        .build()
    }

    /// Create a session configured from the process environment.
    pub fn from_env() -> Result<Self> {
        crate::client::FlashClientBuilder::from_env()?.build()
    }

    pub fn builder() -> crate::client::FlashClientBuilder {
        crate::client::FlashClientBuilder::new()
    }

    /// Answer a query, from the cache when possible.
    ///
    /// On a miss the response is trimmed of surrounding whitespace, stored,
    /// and returned. Only successful responses are ever cached.
    pub async fn query_model(&self, query: &Query) -> Result<String> {
        let model = query
            .resolve_model(&self.config.text_model, &self.config.multimodal_model)
            .to_string();
        let key = CacheKey::derive(query);

        if let Some(cache) = &self.cache {
            if let Some(hit) = cache.get(&key).await {
                self.trace_query(&model, &key, "cache hit");
                return Ok(hit);
            }
        }

        let request = GenerateRequest::from_query(query)?;
        self.trace_query(&model, &key, "calling backend");
        let text = self
            .with_deadline(&model, self.backend.generate(&model, &request))
            .await?;
        let text = text.trim().to_string();

        if let Some(cache) = &self.cache {
            cache.set(&key, &text).await;
        }
        Ok(text)
    }

    /// Shorthand for a text-only query.
    pub async fn query_text(&self, prompt: &str) -> Result<String> {
        self.query_model(&Query::new(prompt)).await
    }

    /// Count tokens for `prompt` on the text model. Never cached.
    pub async fn count_tokens(&self, prompt: &str) -> Result<u64> {
        self.count_tokens_with_model(prompt, &self.config.text_model)
            .await
    }

    /// Count tokens for `prompt` on an explicit model. Never cached.
    pub async fn count_tokens_with_model(&self, prompt: &str, model: &str) -> Result<u64> {
        self.with_deadline(model, self.backend.count_tokens(model, prompt))
            .await
    }

    /// Change the per-call deadline. Applies to calls started afterwards.
    pub fn set_timeout(&self, timeout: Duration) {
        self.timeout_ms.store(timeout_millis(timeout), Ordering::Relaxed);
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms.load(Ordering::Relaxed))
    }

    pub fn text_model(&self) -> &str {
        &self.config.text_model
    }

    pub fn multimodal_model(&self) -> &str {
        &self.config.multimodal_model
    }

    pub fn project_id(&self) -> &str {
        &self.config.project_id
    }

    pub fn location(&self) -> &str {
        &self.config.location
    }

    pub fn cache_state(&self) -> CacheState {
        self.cache_state
    }

    /// Cache counters, when a cache is active.
    pub fn cache_stats(&self) -> Option<CacheStats> {
        self.cache.as_ref().map(|c| c.stats())
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Drop every cached response. Optional: nothing needs flushing at
    /// process exit, and the session stays usable afterwards.
    pub async fn close(&self) {
        if let Some(cache) = &self.cache {
            let entries = cache.len().await;
            cache.clear().await;
            info!(entries, "Response cache cleared");
        }
    }

    async fn with_deadline<T, F>(&self, model: &str, call: F) -> Result<T>
    where
        F: Future<Output = BackendResult<T>>,
    {
        let timeout = self.timeout();
        match tokio::time::timeout(timeout, call).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(Error::inference(model, e)),
            Err(_) => Err(Error::inference(model, InferenceError::Timeout(timeout))),
        }
    }

    fn trace_query(&self, model: &str, key: &CacheKey, step: &'static str) {
        if self.config.verbose {
            info!(model, key = %key.short(), step, "Query");
        } else {
            debug!(model, key = %key.short(), step, "Query");
        }
    }
}

/// Deadline in whole milliseconds, never below 1 ms.
pub(crate) fn timeout_millis(timeout: Duration) -> u64 {
    u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX).max(1)
}

impl std::fmt::Debug for FlashClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlashClient")
            .field("config", &self.config)
            .field("backend", &self.backend.name())
            .field("cache_state", &self.cache_state)
            .field("timeout", &self.timeout())
            .finish()
    }
}
