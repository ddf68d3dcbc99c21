//! Test doubles for the provider and market collaborators.
//!
//! `ScriptedProvider` answers each model from a fixed script and records the
//! order of calls, so cascade ordering can be asserted without a network.
//! `serve_local` runs a stub HTTP upstream on a loopback port for the real
//! clients to talk to.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use crate::error::ProviderError;
use crate::market::MarketDataSource;
use crate::models::{MarketSnapshot, ModelCandidate, RequestConfig};
use crate::provider::LlmProvider;

#[derive(Debug, Default)]
struct CallLog {
    models: Vec<String>,
    last_prompt: Option<String>,
    last_config: Option<RequestConfig>,
}

/// Provider with a per-model script of responses or error messages
#[derive(Debug, Default)]
pub struct ScriptedProvider {
    script: HashMap<String, Result<serde_json::Value, String>>,
    log: Mutex<CallLog>,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(mut self, model: &str, response: serde_json::Value) -> Self {
        self.script.insert(model.to_string(), Ok(response));
        self
    }

    pub fn fail(mut self, model: &str, message: &str) -> Self {
        self.script.insert(model.to_string(), Err(message.to_string()));
        self
    }

    /// Model identifiers in the order they were called
    pub fn calls(&self) -> Vec<String> {
        self.lock().models.clone()
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.lock().last_prompt.clone()
    }

    pub fn last_config(&self) -> Option<RequestConfig> {
        self.lock().last_config
    }

    fn lock(&self) -> MutexGuard<'_, CallLog> {
        self.log.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    async fn generate(
        &self,
        model: &ModelCandidate,
        prompt: &str,
        config: &RequestConfig,
    ) -> Result<serde_json::Value, ProviderError> {
        {
            let mut log = self.lock();
            log.models.push(model.to_string());
            log.last_prompt = Some(prompt.to_string());
            log.last_config = Some(*config);
        }

        match self.script.get(model.as_str()) {
            Some(Ok(response)) => Ok(response.clone()),
            Some(Err(message)) => Err(ProviderError::from_message(message.clone())),
            None => Err(ProviderError::from_message(format!(
                "no scripted response for {}",
                model
            ))),
        }
    }
}

/// Market source that always returns the same snapshot
#[derive(Debug, Clone)]
pub struct StaticMarketSource {
    snapshot: MarketSnapshot,
}

impl StaticMarketSource {
    pub fn new(snapshot: MarketSnapshot) -> Self {
        Self { snapshot }
    }
}

#[async_trait]
impl MarketDataSource for StaticMarketSource {
    async fn snapshot(&self) -> MarketSnapshot {
        self.snapshot.clone()
    }
}

/// Serve `router` on an ephemeral loopback port and return its base URL
pub async fn serve_local(router: axum::Router) -> std::io::Result<String> {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, router).await {
            tracing::warn!("Local stub server stopped: {}", e);
        }
    });

    Ok(format!("http://{}", addr))
}
