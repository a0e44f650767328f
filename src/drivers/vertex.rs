//! Vertex AI backend: Gemini publisher models over REST.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, Instrument};
use url::Url;
use uuid::Uuid;

use super::{BackendResult, GeminiDriver, ModelBackend};
use crate::auth::CredentialProvider;
use crate::error::InferenceError;
use crate::transport::HttpTransport;
use crate::types::GenerateRequest;
use crate::{Error, ErrorContext, Result};

/// Production [`ModelBackend`] talking to
/// `https://{location}-aiplatform.googleapis.com`.
pub struct VertexBackend {
    transport: HttpTransport,
    credentials: Arc<dyn CredentialProvider>,
    base_url: String,
    project_id: String,
    location: String,
}

impl VertexBackend {
    pub fn new(
        project_id: impl Into<String>,
        location: impl Into<String>,
        credentials: Arc<dyn CredentialProvider>,
    ) -> Result<Self> {
        let location = location.into();
        Ok(Self {
            transport: HttpTransport::new()?,
            credentials,
            base_url: format!("https://{}-aiplatform.googleapis.com", location),
            project_id: project_id.into(),
            location,
        })
    }

    /// Point the backend at another host, e.g. a regional proxy or a mock
    /// server in tests.
    pub fn with_base_url(mut self, base_url: &str) -> Result<Self> {
        let parsed = Url::parse(base_url).map_err(|e| {
            Error::configuration_with_context(
                format!("invalid endpoint URL: {}", e),
                ErrorContext::new()
                    .with_field_path("endpoint")
                    .with_details(base_url)
                    .with_source("vertex_backend"),
            )
        })?;
        self.base_url = parsed.as_str().trim_end_matches('/').to_string();
        Ok(self)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Full URL for a model method such as `generateContent`.
    pub fn model_url(&self, model: &str, method: &str) -> String {
        format!(
            "{}/v1/projects/{}/locations/{}/publishers/google/models/{}:{}",
            self.base_url, self.project_id, self.location, model, method
        )
    }

    async fn call(&self, model: &str, method: &str, body: &Value) -> BackendResult<Value> {
        let token = self
            .credentials
            .access_token()
            .map_err(|e| InferenceError::Credentials(e.to_string()))?;

        let request_id = Uuid::new_v4().to_string();
        let url = self.model_url(model, method);
        let span = tracing::debug_span!("vertex_call", %request_id, model, method);

        async {
            debug!(url = %url, "Sending request");
            let response = self
                .transport
                .post_json(&url, &token, body, &request_id)
                .await?;
            debug!(status = response.status, bytes = response.body.len(), "Received response");

            if !response.is_success() {
                return Err(GeminiDriver::parse_error(response.status, &response.body));
            }
            serde_json::from_str(&response.body).map_err(|e| {
                InferenceError::MalformedResponse(format!("response is not JSON: {}", e))
            })
        }
        .instrument(span)
        .await
    }
}

#[async_trait]
impl ModelBackend for VertexBackend {
    async fn generate(&self, model: &str, request: &GenerateRequest) -> BackendResult<String> {
        let body = GeminiDriver::build_generate_body(request);
        let response = self.call(model, "generateContent", &body).await?;
        GeminiDriver::parse_generate_response(&response)
    }

    async fn count_tokens(&self, model: &str, prompt: &str) -> BackendResult<u64> {
        let body = GeminiDriver::build_count_tokens_body(prompt);
        let response = self.call(model, "countTokens", &body).await?;
        GeminiDriver::parse_count_tokens_response(&response)
    }

    fn name(&self) -> &'static str {
        "vertex"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::StaticCredentials;

    fn backend() -> VertexBackend {
        VertexBackend::new(
            "44444444444",
            "europe-west4",
            Arc::new(StaticCredentials::new("token")),
        )
        .unwrap()
    }

    #[test]
    fn test_default_regional_endpoint() {
        let b = backend();
        assert_eq!(
            b.model_url("gemini-1.5-flash-001", "generateContent"),
            "https://europe-west4-aiplatform.googleapis.com/v1/projects/44444444444/locations/europe-west4/publishers/google/models/gemini-1.5-flash-001:generateContent"
        );
    }

    #[test]
    fn test_base_url_override() {
        let b = backend().with_base_url("http://127.0.0.1:8080/").unwrap();
        assert_eq!(b.base_url(), "http://127.0.0.1:8080");
        assert!(b
            .model_url("m", "countTokens")
            .starts_with("http://127.0.0.1:8080/v1/projects/"));
    }

    #[test]
    fn test_invalid_base_url() {
        let err = backend().with_base_url("not a url").err().unwrap();
        assert!(matches!(err, Error::Configuration { .. }));
    }
}
