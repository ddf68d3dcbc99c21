//! Trading Mate
//!
//! A conversational trading coach that:
//! - Injects a live index snapshot into every prompt
//! - Falls back through an ordered list of Gemini models until one answers
//! - Normalizes whatever response shape the answering model returns
//! - Separates `<think>` reasoning from the final answer
//! - Keeps an append-only conversation per session
//!
//! TURN FLOW:
//! SNAPSHOT → COMPOSE → CASCADE → NORMALIZE → SPLIT → APPEND

pub mod api;
pub mod cascade;
pub mod config;
pub mod conversational;
pub mod error;
pub mod market;
pub mod memory;
pub mod models;
pub mod normalize;
pub mod prompt;
pub mod provider;
pub mod splitter;

pub mod test_support;

pub use error::Result;

// Re-export common types
pub use models::*;
pub use cascade::{CascadeOutcome, ModelCascade};
pub use conversational::{ChatSession, TradingMate, TurnReply};
pub use error::{ProviderError, ProviderErrorKind, TradingMateError};
