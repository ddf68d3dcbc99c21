//! Model cascade
//!
//! Ordered short-circuit over model candidates:
//! PENDING → TRYING(i) → SUCCEEDED | EXHAUSTED
//!
//! The state machine holds no I/O; [`ModelCascade`] drives it against an
//! [`LlmProvider`], one candidate at a time.

use std::sync::Arc;
use tracing::{info, warn};

use crate::error::{ProviderError, TradingMateError};
use crate::models::{ModelCandidate, RequestConfig};
use crate::provider::LlmProvider;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CascadeState {
    Pending,
    Trying(usize),
    Succeeded(usize),
    Exhausted,
}

/// Result of one cascade run
#[derive(Debug, Clone)]
pub enum CascadeOutcome {
    Succeeded {
        model: ModelCandidate,
        response: serde_json::Value,
    },
    AllFailed {
        attempts: usize,
        last_error: ProviderError,
    },
}

impl CascadeOutcome {
    /// Surface exhaustion as the crate error
    pub fn into_result(self) -> crate::Result<(ModelCandidate, serde_json::Value)> {
        match self {
            CascadeOutcome::Succeeded { model, response } => Ok((model, response)),
            CascadeOutcome::AllFailed {
                attempts,
                last_error,
            } => Err(TradingMateError::CascadeExhausted {
                attempts,
                last_error,
            }),
        }
    }
}

/// Cursor over a candidate list
#[derive(Debug)]
pub struct Cascade<'a> {
    candidates: &'a [ModelCandidate],
    state: CascadeState,
    attempts: usize,
    last_error: Option<ProviderError>,
}

impl<'a> Cascade<'a> {
    pub fn new(candidates: &'a [ModelCandidate]) -> Self {
        Self {
            candidates,
            state: CascadeState::Pending,
            attempts: 0,
            last_error: None,
        }
    }

    pub fn state(&self) -> CascadeState {
        self.state
    }

    pub fn attempts(&self) -> usize {
        self.attempts
    }

    pub fn last_error(&self) -> Option<&ProviderError> {
        self.last_error.as_ref()
    }

    /// Pending → Trying(0), or Exhausted when there is nothing to try
    pub fn start(&mut self) {
        if self.state != CascadeState::Pending {
            return;
        }
        self.state = self.enter(0);
    }

    /// Candidate to call next, if the cascade is still trying
    pub fn current(&self) -> Option<&'a ModelCandidate> {
        match self.state {
            CascadeState::Trying(i) => self.candidates.get(i),
            _ => None,
        }
    }

    /// Trying(i) → Succeeded(i)
    pub fn succeed(&mut self) {
        if let CascadeState::Trying(i) = self.state {
            self.attempts += 1;
            self.state = CascadeState::Succeeded(i);
        }
    }

    /// Trying(i) → Trying(i + 1), or Exhausted after the last candidate.
    /// The error replaces any earlier one.
    pub fn fail(&mut self, error: ProviderError) {
        if let CascadeState::Trying(i) = self.state {
            self.attempts += 1;
            self.last_error = Some(error);
            self.state = self.enter(i + 1);
        }
    }

    fn enter(&self, index: usize) -> CascadeState {
        if index < self.candidates.len() {
            CascadeState::Trying(index)
        } else {
            CascadeState::Exhausted
        }
    }

    /// Failure outcome for an exhausted cascade
    pub fn exhausted(self) -> CascadeOutcome {
        let last_error = self
            .last_error
            .unwrap_or_else(|| ProviderError::from_message("No model candidates configured"));

        CascadeOutcome::AllFailed {
            attempts: self.attempts,
            last_error,
        }
    }
}

/// Stateless executor; one instance can serve every session
#[derive(Clone)]
pub struct ModelCascade {
    provider: Arc<dyn LlmProvider>,
}

impl ModelCascade {
    pub fn new(provider: Arc<dyn LlmProvider>) -> Self {
        Self { provider }
    }

    pub async fn execute(
        &self,
        prompt: &str,
        candidates: &[ModelCandidate],
        config: &RequestConfig,
    ) -> CascadeOutcome {
        let mut cascade = Cascade::new(candidates);
        cascade.start();

        while let Some(candidate) = cascade.current() {
            match self.provider.generate(candidate, prompt, config).await {
                Ok(response) => {
                    cascade.succeed();
                    info!(model = %candidate, attempts = cascade.attempts(), "Model responded");
                    return CascadeOutcome::Succeeded {
                        model: candidate.clone(),
                        response,
                    };
                }
                Err(error) => {
                    warn!(
                        model = %candidate,
                        kind = ?error.kind,
                        "Model call failed, trying next candidate: {}",
                        error
                    );
                    cascade.fail(error);
                }
            }
        }

        warn!(attempts = cascade.attempts(), "All model candidates failed");
        cascade.exhausted()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderErrorKind;
    use crate::test_support::ScriptedProvider;
    use serde_json::json;

    fn candidates(ids: &[&str]) -> Vec<ModelCandidate> {
        ids.iter().map(|id| ModelCandidate::from(*id)).collect()
    }

    #[test]
    fn test_state_machine_short_circuits() {
        let list = candidates(&["a", "b", "c"]);
        let mut cascade = Cascade::new(&list);
        assert_eq!(cascade.state(), CascadeState::Pending);
        assert!(cascade.current().is_none());

        cascade.start();
        assert_eq!(cascade.state(), CascadeState::Trying(0));

        cascade.fail(ProviderError::from_message("boom"));
        assert_eq!(cascade.state(), CascadeState::Trying(1));
        assert_eq!(cascade.current().map(|c| c.as_str()), Some("b"));

        cascade.succeed();
        assert_eq!(cascade.state(), CascadeState::Succeeded(1));
        assert!(cascade.current().is_none());
        assert_eq!(cascade.attempts(), 2);

        // Terminal states ignore further transitions
        cascade.fail(ProviderError::from_message("late"));
        assert_eq!(cascade.state(), CascadeState::Succeeded(1));
    }

    #[test]
    fn test_state_machine_keeps_last_error() {
        let list = candidates(&["a", "b"]);
        let mut cascade = Cascade::new(&list);
        cascade.start();
        cascade.fail(ProviderError::from_message("first failure"));
        cascade.fail(ProviderError::from_message("429 second failure"));
        assert_eq!(cascade.state(), CascadeState::Exhausted);

        match cascade.exhausted() {
            CascadeOutcome::AllFailed {
                attempts,
                last_error,
            } => {
                assert_eq!(attempts, 2);
                assert_eq!(last_error.message, "429 second failure");
                assert_eq!(last_error.kind, ProviderErrorKind::QuotaExceeded);
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn test_empty_candidate_list_is_exhausted() {
        let mut cascade = Cascade::new(&[]);
        cascade.start();
        assert_eq!(cascade.state(), CascadeState::Exhausted);

        match cascade.exhausted() {
            CascadeOutcome::AllFailed {
                attempts,
                last_error,
            } => {
                assert_eq!(attempts, 0);
                assert_eq!(last_error.kind, ProviderErrorKind::Transient);
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_first_success_stops_cascade() {
        let provider = Arc::new(
            ScriptedProvider::new()
                .fail("gemini-3.0-pro", "404 Not Found for models/gemini-3.0-pro")
                .respond("gemini-2.5-flash", json!({ "text": "Buy levels: 25000" }))
                .respond("gemini-2.0-flash", json!({ "text": "never used" })),
        );
        let cascade = ModelCascade::new(provider.clone());
        let list = candidates(&["gemini-3.0-pro", "gemini-2.5-flash", "gemini-2.0-flash"]);

        let outcome = cascade
            .execute("prompt", &list, &RequestConfig::default())
            .await;

        let (model, response) = outcome.into_result().unwrap();
        assert_eq!(model.as_str(), "gemini-2.5-flash");
        assert_eq!(response["text"], "Buy levels: 25000");
        assert_eq!(provider.calls(), vec!["gemini-3.0-pro", "gemini-2.5-flash"]);
    }

    #[tokio::test]
    async fn test_all_failed_carries_last_error() {
        let provider = Arc::new(
            ScriptedProvider::new()
                .fail("a", "429 quota exceeded")
                .fail("b", "404 Not Found for models/b"),
        );
        let cascade = ModelCascade::new(provider.clone());
        let list = candidates(&["a", "b"]);

        let err = cascade
            .execute("prompt", &list, &RequestConfig::default())
            .await
            .into_result()
            .unwrap_err();

        match err {
            TradingMateError::CascadeExhausted {
                attempts,
                last_error,
            } => {
                assert_eq!(attempts, 2);
                assert_eq!(last_error.kind, ProviderErrorKind::ModelUnavailable);
                assert!(last_error.message.contains("models/b"));
            }
            other => panic!("unexpected error: {}", other),
        }
        assert_eq!(provider.calls(), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_request_config_forwarded() {
        let provider = Arc::new(ScriptedProvider::new().respond("a", json!({ "text": "ok" })));
        let cascade = ModelCascade::new(provider.clone());
        let config = RequestConfig::new(0.1, 64).unwrap();

        cascade.execute("the prompt", &candidates(&["a"]), &config).await;

        assert_eq!(provider.last_prompt().as_deref(), Some("the prompt"));
        assert_eq!(provider.last_config(), Some(config));
    }
}
