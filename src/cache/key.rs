//! Cache key generation.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::types::Query;
use crate::{Error, ErrorContext};

/// Length of a rendered key: a SHA-256 digest in lowercase hex.
pub const CACHE_KEY_LEN: usize = 64;

/// Always 64 lowercase hex chars; deserialization rejects anything else.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CacheKey {
    hash: String,
}

impl CacheKey {
    /// Derive the key for a query.
    ///
    /// The digest covers, in order and without separators: the prompt, the
    /// temperature as `{:.6}`, the inline data text exactly as supplied, the
    /// media type and the model override. Absent fields are skipped.
    pub fn derive(query: &Query) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(query.prompt.as_bytes());
        if let Some(t) = query.temperature {
            hasher.update(format!("{:.6}", t).as_bytes());
        }
        if let Some(ref data) = query.inline_data {
            hasher.update(data.as_bytes());
        }
        if let Some(ref media_type) = query.data_media_type {
            hasher.update(media_type.as_bytes());
        }
        if let Some(ref model) = query.model_override {
            hasher.update(model.as_bytes());
        }
        let hash: String = hasher.finalize().iter().map(|b| format!("{:02x}", b)).collect();
        Self { hash }
    }

    pub fn as_str(&self) -> &str {
        &self.hash
    }

    /// Number of bytes the key occupies in a cache entry.
    pub fn len(&self) -> usize {
        self.hash.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hash.is_empty()
    }

    /// Short prefix used in log lines.
    pub fn short(&self) -> &str {
        self.hash.get(..8).unwrap_or(self.hash.as_str())
    }
}

impl TryFrom<String> for CacheKey {
    type Error = Error;

    fn try_from(hash: String) -> Result<Self, Self::Error> {
        let well_formed = hash.len() == CACHE_KEY_LEN
            && hash.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));
        if !well_formed {
            return Err(Error::configuration_with_context(
                "cache key must be 64 lowercase hex characters",
                ErrorContext::new()
                    .with_field_path("cache_key")
                    .with_details(hash)
                    .with_source("cache_key"),
            ));
        }
        Ok(Self { hash })
    }
}

impl From<CacheKey> for String {
    fn from(key: CacheKey) -> Self {
        key.hash
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.hash)
    }
}

/// Derive the cache key for a query. Pure and infallible.
pub fn derive_key(query: &Query) -> CacheKey {
    CacheKey::derive(query)
}
