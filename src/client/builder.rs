use std::sync::atomic::AtomicU64;
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::auth::{CredentialProvider, DefaultCredentialProvider};
use crate::cache::{CacheBackend, CacheConfig, CacheManager};
use crate::client::core::{timeout_millis, CacheState, FlashClient};
use crate::config::SessionConfig;
use crate::drivers::{ModelBackend, VertexBackend};
use crate::{Error, Result};

/// Builder for sessions with custom configuration.
///
/// Keep this surface area small and predictable (developer-friendly).
pub struct FlashClientBuilder {
    config: SessionConfig,
    cache_config: Option<CacheConfig>,
    cache_backend: Option<Box<dyn CacheBackend>>,
    backend: Option<Arc<dyn ModelBackend>>,
    credentials: Option<Arc<dyn CredentialProvider>>,
    /// Override the Vertex AI host (primarily for testing with mock servers)
    endpoint: Option<String>,
}

impl FlashClientBuilder {
    pub fn new() -> Self {
        Self::from_config(SessionConfig::default())
    }

    pub fn from_config(config: SessionConfig) -> Self {
        Self {
            config,
            cache_config: None,
            cache_backend: None,
            backend: None,
            credentials: None,
            endpoint: None,
        }
    }

    /// Start from [`SessionConfig::from_env`].
    pub fn from_env() -> Result<Self> {
        Ok(Self::from_config(SessionConfig::from_env()?))
    }

    pub fn text_model(mut self, model: impl Into<String>) -> Self {
        self.config.text_model = model.into();
        self
    }

    pub fn multimodal_model(mut self, model: impl Into<String>) -> Self {
        self.config.multimodal_model = model.into();
        self
    }

    pub fn project_id(mut self, project_id: impl Into<String>) -> Self {
        self.config.project_id = project_id.into();
        self
    }

    pub fn location(mut self, location: impl Into<String>) -> Self {
        self.config.location = location.into();
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.config.verbose = verbose;
        self
    }

    /// Enable or disable the response cache.
    pub fn cache(mut self, enable: bool) -> Self {
        self.config.enable_cache = enable;
        self
    }

    /// Replace the default cache limits (24h retention, 256 MiB).
    pub fn cache_config(mut self, config: CacheConfig) -> Self {
        self.cache_config = Some(config);
        self
    }

    /// Use a custom cache store instead of the in-memory one.
    pub fn cache_backend(mut self, backend: Box<dyn CacheBackend>) -> Self {
        self.cache_backend = Some(backend);
        self
    }

    /// Use a custom model backend instead of Vertex AI.
    pub fn backend(mut self, backend: Arc<dyn ModelBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Use a custom credential provider instead of the ambient one.
    pub fn credentials(mut self, credentials: Arc<dyn CredentialProvider>) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Override the Vertex AI host.
    ///
    /// This is primarily for testing with mock servers. In production the
    /// regional `{location}-aiplatform.googleapis.com` host is used.
    pub fn endpoint(mut self, base_url: impl Into<String>) -> Self {
        self.endpoint = Some(base_url.into());
        self
    }

    /// Build the session.
    ///
    /// Credential failures abort construction. Cache initialization
    /// failures do not: the session is built with
    /// [`CacheState::Unavailable`] and serves every query uncached.
    pub fn build(self) -> Result<FlashClient> {
        self.config.validate()?;

        let backend: Arc<dyn ModelBackend> = match self.backend {
            Some(backend) => {
                if let Some(credentials) = &self.credentials {
                    probe_credentials(credentials.as_ref())?;
                }
                backend
            }
            None => {
                let credentials = self.credentials.unwrap_or_else(|| {
                    Arc::new(DefaultCredentialProvider::new(self.config.project_id.clone()))
                });
                probe_credentials(credentials.as_ref())?;
                let mut vertex = VertexBackend::new(
                    self.config.project_id.clone(),
                    self.config.location.clone(),
                    credentials,
                )?;
                if let Some(endpoint) = &self.endpoint {
                    vertex = vertex.with_base_url(endpoint)?;
                }
                Arc::new(vertex)
            }
        };

        let (cache, cache_state) = if !self.config.enable_cache {
            (None, CacheState::Disabled)
        } else {
            let cache_config = self
                .cache_config
                .unwrap_or_else(|| CacheConfig::default().with_verbose(self.config.verbose));
            match self.cache_backend {
                Some(store) => (
                    Some(CacheManager::with_backend(cache_config, store)),
                    CacheState::Active,
                ),
                None => match CacheManager::new(cache_config) {
                    Ok(manager) => (Some(manager), CacheState::Active),
                    Err(e) => {
                        warn!(error = %e, "Response cache unavailable, continuing without cache");
                        (None, CacheState::Unavailable)
                    }
                },
            }
        };

        info!(
            text_model = %self.config.text_model,
            multimodal_model = %self.config.multimodal_model,
            location = %self.config.location,
            backend = backend.name(),
            cache = ?cache_state,
            "Session ready"
        );

        let timeout_ms = timeout_millis(self.config.timeout);
        Ok(FlashClient {
            config: self.config,
            backend,
            cache,
            cache_state,
            timeout_ms: AtomicU64::new(timeout_ms),
        })
    }
}

impl Default for FlashClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn probe_credentials(credentials: &dyn CredentialProvider) -> Result<()> {
    match credentials.access_token() {
        Ok(_) => Ok(()),
        Err(e @ Error::CredentialsUnavailable { .. }) => Err(e),
        Err(other) => Err(Error::credentials(format!(
            "{} provider failed: {}",
            credentials.name(),
            other
        ))),
    }
}
