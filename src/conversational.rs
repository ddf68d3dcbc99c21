//! Conversational turn handling
//!
//! One turn: SNAPSHOT → APPEND USER → COMPOSE → CASCADE → NORMALIZE → SPLIT → APPEND ANSWER
//!
//! Conversation state lives in an explicit [`ChatSession`] created by
//! [`TradingMate::start_session`] and dropped when the session ends.

use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::cascade::ModelCascade;
use crate::config::AppConfig;
use crate::error::TradingMateError;
use crate::market::{MarketDataSource, YahooFinanceSource};
use crate::memory::{ConversationMessage, ConversationStore};
use crate::models::{MarketSnapshot, ModelCandidate, RequestConfig};
use crate::normalize::normalize;
use crate::prompt::PromptComposer;
use crate::provider::{GeminiClient, LlmProvider};
use crate::splitter::split;

/// Reply for one conversational turn
#[derive(Debug, Clone, Serialize)]
pub struct TurnReply {
    pub model_used: ModelCandidate,
    pub snapshot: MarketSnapshot,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thought: Option<String>,
    pub answer: String,
}

/// Conversation context for one user session
#[derive(Debug, Clone)]
pub struct ChatSession {
    session_id: Uuid,
    store: ConversationStore,
}

impl ChatSession {
    pub fn id(&self) -> Uuid {
        self.session_id
    }

    pub fn store(&self) -> &ConversationStore {
        &self.store
    }

    /// Messages shown to the user (system excluded)
    pub fn history(&self) -> Vec<ConversationMessage> {
        self.store.history().cloned().collect()
    }
}

/// Prompting and cascade settings shared by every session
#[derive(Debug, Clone)]
pub struct CoachSettings {
    pub system_prompt: String,
    pub candidates: Vec<ModelCandidate>,
    pub request: RequestConfig,
    pub composer: PromptComposer,
}

impl CoachSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            system_prompt: config.system_prompt.clone(),
            candidates: config.model_candidates.clone(),
            request: config.request,
            composer: config
                .reasoning_directive
                .as_deref()
                .map(PromptComposer::with_directive)
                .unwrap_or_default(),
        }
    }
}

/// Trading coach front-end: market context + model cascade
pub struct TradingMate {
    cascade: ModelCascade,
    market: Arc<dyn MarketDataSource>,
    settings: CoachSettings,
}

impl TradingMate {
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        market: Arc<dyn MarketDataSource>,
        settings: CoachSettings,
    ) -> Self {
        Self {
            cascade: ModelCascade::new(provider),
            market,
            settings,
        }
    }

    /// Gemini provider + Yahoo Finance snapshot source
    pub fn from_config(config: &AppConfig) -> crate::Result<Self> {
        let provider = GeminiClient::new(
            config.gemini_api_key.clone(),
            config.gemini_base_url.clone(),
            config.http_timeout,
        )?;
        let market = YahooFinanceSource::new(
            config.market_symbol.clone(),
            config.market_label.clone(),
            config.http_timeout,
        )?;

        info!(
            models = ?config.model_candidates,
            symbol = %config.market_symbol,
            "Trading coach configured"
        );

        Ok(Self::new(
            Arc::new(provider),
            Arc::new(market),
            CoachSettings::from_config(config),
        ))
    }

    pub fn settings(&self) -> &CoachSettings {
        &self.settings
    }

    /// New session seeded with the system message
    pub fn start_session(&self) -> ChatSession {
        self.start_session_with_id(Uuid::new_v4())
    }

    pub fn start_session_with_id(&self, session_id: Uuid) -> ChatSession {
        debug!(%session_id, "Starting chat session");
        ChatSession {
            session_id,
            store: ConversationStore::new(self.settings.system_prompt.clone()),
        }
    }

    pub async fn market_snapshot(&self) -> MarketSnapshot {
        self.market.snapshot().await
    }

    /// Run one user turn against the session.
    ///
    /// The user message stays in the log even when every model fails.
    pub async fn handle_turn(
        &self,
        session: &mut ChatSession,
        user_input: &str,
    ) -> crate::Result<TurnReply> {
        if user_input.trim().is_empty() {
            return Err(TradingMateError::EmptyInput);
        }

        let snapshot = self.market.snapshot().await;
        if !snapshot.is_available() {
            warn!(session_id = %session.session_id, "Continuing turn without live market data");
        }

        session
            .store
            .append(ConversationMessage::user(user_input))?;

        let prompt = self.settings.composer.compose(
            session.store.system_prompt(),
            &snapshot,
            session.store.messages(),
        );
        debug!(
            session_id = %session.session_id,
            prompt_chars = prompt.len(),
            messages = session.store.message_count(),
            "Prompt composed"
        );

        let (model_used, response) = self
            .cascade
            .execute(&prompt, &self.settings.candidates, &self.settings.request)
            .await
            .into_result()?;

        let reply = normalize(&response);
        let split = split(&reply);

        // Only the answer is fed back into later prompts
        session
            .store
            .append(ConversationMessage::assistant(split.answer.clone()))?;

        info!(
            session_id = %session.session_id,
            model = %model_used,
            has_thought = split.thought.is_some(),
            "Turn completed"
        );

        Ok(TurnReply {
            model_used,
            snapshot,
            thought: split.thought,
            answer: split.answer,
        })
    }
}
