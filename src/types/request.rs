//! Outbound request handed to a [`ModelBackend`](crate::drivers::ModelBackend).

use base64::Engine as _;

use super::Query;
use crate::{Error, Result};

/// Sampling temperature used when a query does not set one.
pub const DEFAULT_TEMPERATURE: f64 = 0.0;

/// Media type sent for inline data that arrives without one.
pub(crate) const FALLBACK_MEDIA_TYPE: &str = "application/octet-stream";

/// One content part, in the order the model should see it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentPart {
    Text(String),
    InlineData { mime_type: String, data: Vec<u8> },
}

/// Fully resolved request: temperature defaulted, inline data decoded.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerateRequest {
    pub temperature: f64,
    pub parts: Vec<ContentPart>,
}

impl GenerateRequest {
    /// Build the outbound request for a query, decoding any inline data.
    ///
    /// Fails with [`Error::InvalidPayload`] when the inline data is not
    /// standard padded base64.
    pub fn from_query(query: &Query) -> Result<Self> {
        let mut parts = vec![ContentPart::Text(query.prompt.clone())];

        if let Some(encoded) = &query.inline_data {
            let data = base64::engine::general_purpose::STANDARD
                .decode(encoded)
                .map_err(|e| Error::invalid_payload(format!("inline data is not valid base64: {}", e)))?;
            let mime_type = query
                .data_media_type
                .clone()
                .unwrap_or_else(|| FALLBACK_MEDIA_TYPE.to_string());
            parts.push(ContentPart::InlineData { mime_type, data });
        }

        Ok(Self {
            temperature: query.temperature.unwrap_or(DEFAULT_TEMPERATURE),
            parts,
        })
    }

    pub fn text(prompt: impl Into<String>) -> Self {
        Self {
            temperature: DEFAULT_TEMPERATURE,
            parts: vec![ContentPart::Text(prompt.into())],
        }
    }
}
