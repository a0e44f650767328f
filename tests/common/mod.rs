//! Test doubles shared by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use simpleflash::drivers::{BackendResult, ModelBackend};
use simpleflash::{GenerateRequest, InferenceError};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

pub const TEXT_MODEL: &str = "gemini-1.5-flash-001";
pub const MULTIMODAL_MODEL: &str = "gemini-1.0-pro-vision";

/// Scripted backend that records every call it receives.
pub struct CountingBackend {
    reply: String,
    tokens: u64,
    delay: Option<Duration>,
    failure: Option<InferenceError>,
    generate_calls: AtomicUsize,
    token_calls: AtomicUsize,
    models: Mutex<Vec<String>>,
    requests: Mutex<Vec<GenerateRequest>>,
}

impl CountingBackend {
    pub fn new(reply: &str) -> Self {
        Self {
            reply: reply.to_string(),
            tokens: 7,
            delay: None,
            failure: None,
            generate_calls: AtomicUsize::new(0),
            token_calls: AtomicUsize::new(0),
            models: Mutex::new(Vec::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(err: InferenceError) -> Self {
        Self {
            failure: Some(err),
            ..Self::new("")
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn generate_calls(&self) -> usize {
        self.generate_calls.load(Ordering::SeqCst)
    }

    pub fn token_calls(&self) -> usize {
        self.token_calls.load(Ordering::SeqCst)
    }

    pub fn models(&self) -> Vec<String> {
        self.models.lock().unwrap().clone()
    }

    pub fn last_request(&self) -> Option<GenerateRequest> {
        self.requests.lock().unwrap().last().cloned()
    }

    async fn pause(&self) {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl ModelBackend for CountingBackend {
    async fn generate(&self, model: &str, request: &GenerateRequest) -> BackendResult<String> {
        self.generate_calls.fetch_add(1, Ordering::SeqCst);
        self.models.lock().unwrap().push(model.to_string());
        self.requests.lock().unwrap().push(request.clone());
        self.pause().await;
        match &self.failure {
            Some(err) => Err(err.clone()),
            None => Ok(self.reply.clone()),
        }
    }

    async fn count_tokens(&self, model: &str, _prompt: &str) -> BackendResult<u64> {
        self.token_calls.fetch_add(1, Ordering::SeqCst);
        self.models.lock().unwrap().push(model.to_string());
        self.pause().await;
        match &self.failure {
            Some(err) => Err(err.clone()),
            None => Ok(self.tokens),
        }
    }

    fn name(&self) -> &'static str {
        "counting"
    }
}
