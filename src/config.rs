//! Environment configuration
//!
//! Everything is read through a lookup closure; [`AppConfig::from_env`]
//! wires it to the process environment after loading `.env`.

use std::str::FromStr;
use std::time::Duration;

use crate::error::TradingMateError;
use crate::models::{default_candidates, ModelCandidate, RequestConfig};
use crate::prompt::DEFAULT_REASONING_DIRECTIVE;
use crate::provider::gemini::DEFAULT_BASE_URL;
use crate::Result;

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a personal Trading Coach.\n\
Speak in calm practical Hinglish. Keep answers short and focused only on trading: bias, levels, entry/exit framework, and risk management.\n\
Do NOT provide guaranteed financial advice or exact buy/sell orders.";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub gemini_api_key: String,
    pub gemini_base_url: String,
    pub model_candidates: Vec<ModelCandidate>,
    pub request: RequestConfig,
    pub market_symbol: String,
    pub market_label: String,
    pub system_prompt: String,
    /// Leading prompt line; `None` when disabled
    pub reasoning_directive: Option<String>,
    pub http_timeout: Duration,
    pub api_port: u16,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string());
        let non_empty = |key: &str| get(key).filter(|v| !v.is_empty());

        let gemini_api_key = non_empty("GEMINI_API_KEY").ok_or_else(|| {
            TradingMateError::Config(
                "GEMINI_API_KEY missing. Add it to the environment or .env file.".to_string(),
            )
        })?;

        let model_candidates = match non_empty("TRADING_MATE_MODELS") {
            Some(list) => parse_candidates(&list)?,
            None => default_candidates(),
        };

        let defaults = RequestConfig::default();
        let request = RequestConfig::new(
            parse_or(
                "TRADING_MATE_TEMPERATURE",
                non_empty("TRADING_MATE_TEMPERATURE"),
                defaults.temperature(),
            )?,
            parse_or(
                "TRADING_MATE_MAX_OUTPUT_TOKENS",
                non_empty("TRADING_MATE_MAX_OUTPUT_TOKENS"),
                defaults.max_output_tokens(),
            )?,
        )?;

        // An explicitly empty directive turns it off
        let reasoning_directive = match get("TRADING_MATE_REASONING_DIRECTIVE") {
            Some(v) if v.is_empty() => None,
            Some(v) => Some(v),
            None => Some(DEFAULT_REASONING_DIRECTIVE.to_string()),
        };

        let (port_key, port_value) = match non_empty("PORT") {
            Some(value) => ("PORT", Some(value)),
            None => ("API_PORT", non_empty("API_PORT")),
        };
        let api_port = parse_or(port_key, port_value, 8080u16)?;

        let timeout_secs = parse_or(
            "TRADING_MATE_HTTP_TIMEOUT_SECS",
            non_empty("TRADING_MATE_HTTP_TIMEOUT_SECS"),
            60u64,
        )?;

        Ok(Self {
            gemini_api_key,
            gemini_base_url: non_empty("GEMINI_BASE_URL")
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            model_candidates,
            request,
            market_symbol: non_empty("TRADING_MATE_SYMBOL").unwrap_or_else(|| "^NSEI".to_string()),
            market_label: non_empty("TRADING_MATE_INDEX_LABEL")
                .unwrap_or_else(|| "Nifty".to_string()),
            system_prompt: non_empty("TRADING_MATE_SYSTEM_PROMPT")
                .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string()),
            reasoning_directive,
            http_timeout: Duration::from_secs(timeout_secs),
            api_port,
        })
    }
}

fn parse_candidates(list: &str) -> Result<Vec<ModelCandidate>> {
    let candidates: Vec<ModelCandidate> = list
        .split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(ModelCandidate::from)
        .collect();

    if candidates.is_empty() {
        return Err(TradingMateError::Config(
            "TRADING_MATE_MODELS lists no model identifiers".to_string(),
        ));
    }
    Ok(candidates)
}

fn parse_or<T: FromStr>(key: &str, value: Option<String>, default: T) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    match value {
        Some(raw) => raw
            .parse()
            .map_err(|e| TradingMateError::Config(format!("{} = {:?}: {}", key, raw, e))),
        None => Ok(default),
    }
}
