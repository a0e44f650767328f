//! Gemini generateContent / countTokens 请求与响应格式转换
//!
//! Request/response mapping for the Vertex AI Gemini REST API:
//! - One `user` turn in `contents`; text first, then `inlineData` parts.
//! - `generationConfig.temperature` always set (sessions resolve the default).
//! - Response text is every `text` part of `candidates[0]`, concatenated.
//! - `countTokens` returns `totalTokens`.
//! - Errors arrive as `{"error": {"code", "message", "status"}}`.

use base64::Engine as _;
use serde_json::{json, Value};

use super::BackendResult;
use crate::error::InferenceError;
use crate::types::{ContentPart, GenerateRequest};

/// Stateless Gemini wire-format driver.
#[derive(Debug, Clone, Copy, Default)]
pub struct GeminiDriver;

impl GeminiDriver {
    fn part_to_json(part: &ContentPart) -> Value {
        match part {
            ContentPart::Text(text) => json!({ "text": text }),
            ContentPart::InlineData { mime_type, data } => json!({
                "inlineData": {
                    "mimeType": mime_type,
                    "data": base64::engine::general_purpose::STANDARD.encode(data),
                }
            }),
        }
    }

    pub fn build_generate_body(request: &GenerateRequest) -> Value {
        let parts: Vec<Value> = request.parts.iter().map(Self::part_to_json).collect();
        json!({
            "contents": [{ "role": "user", "parts": parts }],
            "generationConfig": { "temperature": request.temperature },
        })
    }

    pub fn build_count_tokens_body(prompt: &str) -> Value {
        json!({
            "contents": [{ "role": "user", "parts": [{ "text": prompt }] }],
        })
    }

    pub fn parse_generate_response(body: &Value) -> BackendResult<String> {
        if let Some(err) = Self::embedded_error(body) {
            return Err(err);
        }

        let Some(candidate) = body.pointer("/candidates/0") else {
            let reason = body
                .pointer("/promptFeedback/blockReason")
                .and_then(|r| r.as_str());
            return Err(InferenceError::MalformedResponse(match reason {
                Some(r) => format!("prompt blocked: {}", r),
                None => "response has no candidates".to_string(),
            }));
        };

        let texts: Vec<&str> = candidate
            .pointer("/content/parts")
            .and_then(|p| p.as_array())
            .map(|parts| parts.iter().filter_map(|p| p.get("text")?.as_str()).collect())
            .unwrap_or_default();

        if texts.is_empty() {
            let finish = candidate
                .get("finishReason")
                .and_then(|r| r.as_str())
                .unwrap_or("unknown");
            return Err(InferenceError::MalformedResponse(format!(
                "candidate has no text (finish reason: {})",
                finish
            )));
        }

        Ok(texts.concat())
    }

    pub fn parse_count_tokens_response(body: &Value) -> BackendResult<u64> {
        if let Some(err) = Self::embedded_error(body) {
            return Err(err);
        }
        body.get("totalTokens")
            .and_then(|v| v.as_u64())
            .ok_or_else(|| InferenceError::MalformedResponse("missing totalTokens".to_string()))
    }

    /// Map a non-2xx response to an error, preferring the API's own message.
    pub fn parse_error(status: u16, body: &str) -> InferenceError {
        let message = serde_json::from_str::<Value>(body)
            .ok()
            .and_then(|v| {
                v.pointer("/error/message")
                    .and_then(|m| m.as_str())
                    .map(String::from)
            })
            .unwrap_or_else(|| {
                let trimmed = body.trim();
                if trimmed.is_empty() {
                    "empty response body".to_string()
                } else {
                    trimmed.chars().take(512).collect()
                }
            });
        match status {
            401 | 403 => InferenceError::Credentials(message),
            _ => InferenceError::Remote { status, message },
        }
    }

    fn embedded_error(body: &Value) -> Option<InferenceError> {
        let err = body.get("error")?;
        let status = err
            .get("code")
            .and_then(|c| c.as_u64())
            .and_then(|c| u16::try_from(c).ok())
            .unwrap_or(500);
        let message = err
            .get("message")
            .and_then(|m| m.as_str())
            .unwrap_or("unknown error")
            .to_string();
        Some(InferenceError::Remote { status, message })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_text_request() {
        let body = GeminiDriver::build_generate_body(&GenerateRequest::text("Hello"));
        assert_eq!(body["contents"][0]["role"], "user");
        assert_eq!(body["contents"][0]["parts"][0]["text"], "Hello");
        assert_eq!(body["generationConfig"]["temperature"], 0.0);
    }

    #[test]
    fn test_build_inline_data_request() {
        let request = GenerateRequest {
            temperature: 0.25,
            parts: vec![
                ContentPart::Text("What is in this image?".into()),
                ContentPart::InlineData {
                    mime_type: "image/png".into(),
                    data: b"hello".to_vec(),
                },
            ],
        };
        let body = GeminiDriver::build_generate_body(&request);
        let parts = body["contents"][0]["parts"].as_array().unwrap();
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[1]["inlineData"]["mimeType"], "image/png");
        assert_eq!(parts[1]["inlineData"]["data"], "aGVsbG8=");
        assert_eq!(body["generationConfig"]["temperature"], 0.25);
    }

    #[test]
    fn test_parse_concatenates_text_parts() {
        let body = json!({
            "candidates": [{
                "content": { "role": "model", "parts": [{"text": "Black and white "}, {"text": "grazing"}] },
                "finishReason": "STOP"
            }]
        });
        assert_eq!(
            GeminiDriver::parse_generate_response(&body).unwrap(),
            "Black and white grazing"
        );
    }

    #[test]
    fn test_parse_blocked_prompt() {
        let body = json!({ "promptFeedback": { "blockReason": "SAFETY" } });
        let err = GeminiDriver::parse_generate_response(&body).unwrap_err();
        assert_eq!(
            err,
            InferenceError::MalformedResponse("prompt blocked: SAFETY".into())
        );
    }

    #[test]
    fn test_parse_candidate_without_text() {
        let body = json!({ "candidates": [{ "finishReason": "SAFETY" }] });
        let err = GeminiDriver::parse_generate_response(&body).unwrap_err();
        assert!(err.to_string().contains("SAFETY"));
    }

    #[test]
    fn test_parse_count_tokens() {
        let body = json!({ "totalTokens": 9, "totalBillableCharacters": 30 });
        assert_eq!(GeminiDriver::parse_count_tokens_response(&body).unwrap(), 9);
        assert!(GeminiDriver::parse_count_tokens_response(&json!({})).is_err());
    }

    #[test]
    fn test_parse_error_body() {
        let body = r#"{"error":{"code":429,"message":"Quota exceeded","status":"RESOURCE_EXHAUSTED"}}"#;
        assert_eq!(
            GeminiDriver::parse_error(429, body),
            InferenceError::Remote {
                status: 429,
                message: "Quota exceeded".into()
            }
        );
        assert!(matches!(
            GeminiDriver::parse_error(403, "forbidden"),
            InferenceError::Credentials(m) if m == "forbidden"
        ));
        assert!(matches!(
            GeminiDriver::parse_error(502, ""),
            InferenceError::Remote { status: 502, .. }
        ));
    }
}
