use std::time::Duration;
use thiserror::Error;

/// Structured context attached to configuration errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorContext {
    /// Setting that caused the error (e.g., "cache.retention", "SIMPLEFLASH_TIMEOUT_SECS")
    pub field_path: Option<String>,
    /// Additional context about the error (e.g., the rejected value)
    pub details: Option<String>,
    /// Component that raised the error (e.g., "session_builder", "vertex_backend")
    pub source: Option<String>,
}

impl ErrorContext {
    pub fn new() -> Self {
        Self {
            field_path: None,
            details: None,
            source: None,
        }
    }

    pub fn with_field_path(mut self, path: impl Into<String>) -> Self {
        self.field_path = Some(path.into());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

impl Default for ErrorContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Why a call to the model backend did not produce a result.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InferenceError {
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("transport failure: {0}")]
    Transport(String),

    #[error("credentials rejected or expired: {0}")]
    Credentials(String),

    #[error("remote returned HTTP {status}: {message}")]
    Remote { status: u16, message: String },

    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

impl InferenceError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, InferenceError::Timeout(_))
    }
}

/// Unified error type for simpleflash sessions.
#[derive(Debug, Error)]
pub enum Error {
    /// The credential provider could not supply a token. Only raised while
    /// constructing a session.
    #[error("Credentials unavailable: {message}")]
    CredentialsUnavailable { message: String },

    /// The response cache could not be initialized. Sessions never surface
    /// this from a query; they fall back to running uncached.
    #[error("Cache unavailable: {message}")]
    CacheUnavailable { message: String },

    /// A cache store refused a single write, e.g. an oversized entry. The
    /// cache manager logs and drops it.
    #[error("Cache write rejected: {message}")]
    CacheWriteRejected { message: String },

    /// Caller-supplied inline data is not valid base64.
    #[error("Invalid inline payload: {message}")]
    InvalidPayload { message: String },

    #[error("Inference failed for model {model}: {source}")]
    InferenceFailed {
        model: String,
        #[source]
        source: InferenceError,
    },

    #[error("Configuration error: {message}{}", format_context(.context))]
    Configuration {
        message: String,
        context: ErrorContext,
    },
}

// Helper function to format error context for display
fn format_context(ctx: &ErrorContext) -> String {
    let mut parts = Vec::new();
    if let Some(ref field) = ctx.field_path {
        parts.push(format!("field: {}", field));
    }
    if let Some(ref details) = ctx.details {
        parts.push(format!("details: {}", details));
    }
    if let Some(ref source) = ctx.source {
        parts.push(format!("source: {}", source));
    }
    if parts.is_empty() {
        String::new()
    } else {
        format!(" ({})", parts.join(", "))
    }
}

impl Error {
    pub fn credentials(msg: impl Into<String>) -> Self {
        Error::CredentialsUnavailable {
            message: msg.into(),
        }
    }

    pub fn cache_unavailable(msg: impl Into<String>) -> Self {
        Error::CacheUnavailable {
            message: msg.into(),
        }
    }

    pub fn cache_write_rejected(msg: impl Into<String>) -> Self {
        Error::CacheWriteRejected {
            message: msg.into(),
        }
    }

    pub fn invalid_payload(msg: impl Into<String>) -> Self {
        Error::InvalidPayload {
            message: msg.into(),
        }
    }

    pub fn inference(model: impl Into<String>, source: InferenceError) -> Self {
        Error::InferenceFailed {
            model: model.into(),
            source,
        }
    }

    /// Create a new configuration error with structured context
    pub fn configuration_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Configuration {
            message: msg.into(),
            context,
        }
    }

    /// Extract error context if available
    pub fn context(&self) -> Option<&ErrorContext> {
        match self {
            Error::Configuration { context, .. } => Some(context),
            _ => None,
        }
    }

    /// True when the error came from the per-session timeout rather than
    /// the remote side.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::InferenceFailed { source, .. } if source.is_timeout())
    }
}
