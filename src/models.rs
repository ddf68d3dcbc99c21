//! Core data models for the trading coach

use serde::{Deserialize, Serialize};
use std::fmt;

//
// ================= Model Candidates =================
//

/// Opaque identifier naming one LLM deployment
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModelCandidate(String);

impl ModelCandidate {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ModelCandidate {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl fmt::Display for ModelCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Default cascade, most capable first, most stable last
pub const DEFAULT_MODEL_CANDIDATES: &[&str] =
    &["gemini-3.0-pro", "gemini-2.5-flash", "gemini-2.0-flash"];

pub fn default_candidates() -> Vec<ModelCandidate> {
    DEFAULT_MODEL_CANDIDATES
        .iter()
        .map(|id| ModelCandidate::from(*id))
        .collect()
}

//
// ================= Request Config =================
//

/// Generation settings sent with every candidate call
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RequestConfigFields")]
pub struct RequestConfig {
    temperature: f32,
    max_output_tokens: u32,
}

impl RequestConfig {
    pub fn new(temperature: f32, max_output_tokens: u32) -> crate::Result<Self> {
        if !(0.0..=1.0).contains(&temperature) {
            return Err(crate::error::TradingMateError::Config(format!(
                "temperature must be within [0, 1], got {}",
                temperature
            )));
        }
        if max_output_tokens == 0 {
            return Err(crate::error::TradingMateError::Config(
                "max_output_tokens must be positive".to_string(),
            ));
        }

        Ok(Self {
            temperature,
            max_output_tokens,
        })
    }

    pub fn temperature(&self) -> f32 {
        self.temperature
    }

    pub fn max_output_tokens(&self) -> u32 {
        self.max_output_tokens
    }
}

/// Unchecked wire form; deserialization goes through `RequestConfig::new`
#[derive(Deserialize)]
struct RequestConfigFields {
    temperature: f32,
    max_output_tokens: u32,
}

impl TryFrom<RequestConfigFields> for RequestConfig {
    type Error = crate::error::TradingMateError;

    fn try_from(fields: RequestConfigFields) -> crate::Result<Self> {
        Self::new(fields.temperature, fields.max_output_tokens)
    }
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            temperature: 0.45,
            max_output_tokens: 400,
        }
    }
}

//
// ================= Market Snapshot =================
//

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MarketReading {
    Quote {
        current: f64,
        change: f64,
        pct_change: f64,
    },
    Unavailable {
        error_detail: String,
    },
}

/// Point-in-time reading of one index, or the reason it is missing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub label: String,
    pub reading: MarketReading,
}

impl MarketSnapshot {
    pub fn quote(label: impl Into<String>, current: f64, change: f64, pct_change: f64) -> Self {
        Self {
            label: label.into(),
            reading: MarketReading::Quote {
                current,
                change,
                pct_change,
            },
        }
    }

    pub fn unavailable(label: impl Into<String>, error_detail: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            reading: MarketReading::Unavailable {
                error_detail: error_detail.into(),
            },
        }
    }

    /// Derive the reading from the session open and the latest close
    pub fn from_open_close(label: impl Into<String>, open: f64, current: f64) -> Self {
        let label = label.into();
        if open == 0.0 || !open.is_finite() || !current.is_finite() {
            return Self::unavailable(label, "Session open price is not usable.");
        }

        let change = current - open;
        let pct_change = (change / open) * 100.0;
        Self::quote(label, current, change, pct_change)
    }

    pub fn is_available(&self) -> bool {
        matches!(self.reading, MarketReading::Quote { .. })
    }

    /// One-line status used in prompts
    pub fn status_line(&self) -> String {
        match &self.reading {
            MarketReading::Quote {
                current,
                change,
                pct_change,
            } => format!(
                "{} {:.2} ({:+.2}, {:+.2}%)",
                self.label, current, change, pct_change
            ),
            MarketReading::Unavailable { error_detail } => {
                format!("{} data unavailable ({})", self.label, error_detail)
            }
        }
    }
}

impl fmt::Display for MarketSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.status_line())
    }
}
