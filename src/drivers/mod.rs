//! 模型后端抽象层：通过 trait 隔离远程推理调用
//!
//! Model backend abstraction. A session only ever talks to a
//! `dyn ModelBackend`; [`VertexBackend`] is the production implementation and
//! tests substitute their own.

pub mod gemini;
pub mod vertex;

use async_trait::async_trait;

use crate::error::InferenceError;
use crate::types::GenerateRequest;

pub use gemini::GeminiDriver;
pub use vertex::VertexBackend;

/// Result of a single backend call.
pub type BackendResult<T> = std::result::Result<T, InferenceError>;

/// The remote model-inference collaborator.
///
/// Implementations must be safe to call concurrently; the session adds no
/// queueing or admission control of its own.
#[async_trait]
pub trait ModelBackend: Send + Sync {
    /// Generate text for an ordered list of content parts.
    async fn generate(&self, model: &str, request: &GenerateRequest) -> BackendResult<String>;

    /// Count the tokens `prompt` occupies for `model`.
    async fn count_tokens(&self, model: &str, prompt: &str) -> BackendResult<u64>;

    fn name(&self) -> &'static str {
        "custom"
    }
}
