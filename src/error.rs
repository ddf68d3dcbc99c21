//! Error types for the trading coach

use thiserror::Error;
use uuid::Uuid;

/// Result type alias for trading coach operations
pub type Result<T> = std::result::Result<T, TradingMateError>;

/// Category of a single failed model call.
///
/// Derived from the provider's error text, not from a structured status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderErrorKind {
    /// The identifier is not served for this account/project
    ModelUnavailable,
    /// Rate or billing limit hit
    QuotaExceeded,
    /// Anything else, network errors included
    Transient,
}

impl ProviderErrorKind {
    /// Classify a provider error message.
    pub fn classify(message: &str) -> Self {
        if message.contains("404") && message.contains("models/") {
            ProviderErrorKind::ModelUnavailable
        } else if message.contains("Quota")
            || message.contains("429")
            || message.to_lowercase().contains("quota")
        {
            ProviderErrorKind::QuotaExceeded
        } else {
            ProviderErrorKind::Transient
        }
    }

    /// Short operator-facing advice for this kind of failure
    pub fn hint(&self) -> &'static str {
        match self {
            ProviderErrorKind::ModelUnavailable => {
                "Model not enabled for this project. Check Google AI Studio."
            }
            ProviderErrorKind::QuotaExceeded => "Quota/billing issue. Check Google Cloud console.",
            ProviderErrorKind::Transient => "Temporary issue. Check logs.",
        }
    }
}

/// A failed call against one model candidate
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{message}")]
pub struct ProviderError {
    pub kind: ProviderErrorKind,
    pub message: String,
}

impl ProviderError {
    /// Build an error whose kind is inferred from its message text
    pub fn from_message(message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            kind: ProviderErrorKind::classify(&message),
            message,
        }
    }
}

#[derive(Error, Debug)]
pub enum TradingMateError {

    // =============================
    // Core Turn Errors
    // =============================

    #[error("No model could be used after {attempts} attempt(s): {last_error}")]
    CascadeExhausted {
        attempts: usize,
        #[source]
        last_error: ProviderError,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid message: {0}")]
    InvalidMessage(String),

    #[error("Empty user input")]
    EmptyInput,

    #[error("Session not found: {0}")]
    SessionNotFound(Uuid),

    #[error("Market data error: {0}")]
    MarketData(String),

    // =============================
    // External Library Conversions
    // =============================

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("HTTP client error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl TradingMateError {
    /// User-facing hint for errors that carry a provider failure.
    pub fn user_hint(&self) -> Option<&'static str> {
        match self {
            TradingMateError::CascadeExhausted { last_error, .. } => Some(last_error.kind.hint()),
            _ => None,
        }
    }
}
