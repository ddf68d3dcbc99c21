//! Gemini API client
//!
//! Uses a long-lived reqwest::Client for connection pooling. The model is
//! chosen per call so one client serves the whole cascade.

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, error};

use crate::error::ProviderError;
use crate::models::{ModelCandidate, RequestConfig};
use crate::provider::LlmProvider;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Reusable Gemini client (connection-pooled)
pub struct GeminiClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(api_key: String, base_url: String, timeout: Duration) -> crate::Result<Self> {
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(8)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self, model: &ModelCandidate) -> String {
        format!("{}/models/{}:generateContent", self.base_url, model)
    }
}

#[async_trait]
impl LlmProvider for GeminiClient {
    async fn generate(
        &self,
        model: &ModelCandidate,
        prompt: &str,
        config: &RequestConfig,
    ) -> std::result::Result<serde_json::Value, ProviderError> {
        if self.api_key.is_empty() {
            return Err(ProviderError::from_message("GEMINI_API_KEY not configured"));
        }

        let request = build_request(prompt, config);

        debug!(model = %model, prompt_chars = prompt.len(), "Calling Gemini API");

        let response = self
            .client
            .post(self.endpoint(model))
            .query(&[("key", self.api_key.as_str())])
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                // The query string carries the key
                let e = e.without_url();
                error!("Gemini API request failed: {}", e);
                ProviderError::from_message(format!("Gemini API request failed: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!(model = %model, status = status.as_u16(), "Gemini API error response: {}", error_text);
            return Err(ProviderError::from_message(format!(
                "{} for models/{}: {}",
                status, model, error_text
            )));
        }

        response.json::<serde_json::Value>().await.map_err(|e| {
            let e = e.without_url();
            error!("Failed to parse Gemini response: {}", e);
            ProviderError::from_message(format!("Gemini parse error: {}", e))
        })
    }
}

fn build_request(prompt: &str, config: &RequestConfig) -> GeminiRequest {
    GeminiRequest {
        contents: vec![Content {
            role: "user",
            parts: vec![Part {
                text: prompt.to_string(),
            }],
        }],
        generation_config: GenerationConfig {
            temperature: config.temperature(),
            max_output_tokens: config.max_output_tokens(),
        },
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content {
    role: &'static str,
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct Part {
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}
