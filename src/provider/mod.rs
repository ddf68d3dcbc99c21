//! LLM provider trait and implementations
//!
//! A provider answers one prompt with one model and hands back the raw
//! response body. Shape handling is left to [`crate::normalize`].

use crate::error::ProviderError;
use crate::models::{ModelCandidate, RequestConfig};
use async_trait::async_trait;

pub mod gemini;
pub use gemini::GeminiClient;

/// Trait for a single model call against an LLM service
#[async_trait]
pub trait LlmProvider: Send + Sync {
    async fn generate(
        &self,
        model: &ModelCandidate,
        prompt: &str,
        config: &RequestConfig,
    ) -> std::result::Result<serde_json::Value, ProviderError>;
}
