//! Caller-facing query type.

use serde::{Deserialize, Serialize};

/// A single model query.
///
/// Every optional field that is `None` contributes nothing to the cache key,
/// so a text-only query keys the same regardless of which optional fields a
/// caller knows about.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Query {
    pub prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    /// Binary payload in standard (padded) base64, as supplied by the caller.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inline_data: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_media_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_override: Option<String>,
}

impl Query {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            temperature: None,
            inline_data: None,
            data_media_type: None,
            model_override: None,
        }
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Attach base64-encoded inline data together with its media type.
    pub fn with_inline_data(
        mut self,
        base64_data: impl Into<String>,
        media_type: impl Into<String>,
    ) -> Self {
        self.inline_data = Some(base64_data.into());
        self.data_media_type = Some(media_type.into());
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model_override = Some(model.into());
        self
    }

    /// Pick the model this query is sent to.
    ///
    /// An explicit override always wins; otherwise inline data routes to the
    /// multimodal model and plain text to the text model.
    pub fn resolve_model<'a>(&'a self, text_model: &'a str, multimodal_model: &'a str) -> &'a str {
        match (&self.model_override, &self.inline_data) {
            (Some(model), _) => model,
            (None, Some(_)) => multimodal_model,
            (None, None) => text_model,
        }
    }
}

impl From<&str> for Query {
    fn from(prompt: &str) -> Self {
        Self::new(prompt)
    }
}

impl From<String> for Query {
    fn from(prompt: String) -> Self {
        Self::new(prompt)
    }
}
