//! Prompt composition
//!
//! Flattens the system instruction, the live market line and the chat
//! history into the single text block sent to every model candidate.

use crate::memory::{ConversationMessage, MessageRole};
use crate::models::MarketSnapshot;

/// Cue that hands the next line to the model
const ASSISTANT_CUE: &str = "Assistant:";

/// Default leading instruction, emitted ahead of the system prompt
pub const DEFAULT_REASONING_DIRECTIVE: &str =
    "Think step-by-step and then answer briefly in simple Hinglish.";

#[derive(Debug, Clone, Default)]
pub struct PromptComposer {
    reasoning_directive: Option<String>,
}

impl PromptComposer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Composer that prepends `directive` as the first prompt line
    pub fn with_directive(directive: impl Into<String>) -> Self {
        let directive = directive.into();
        Self {
            reasoning_directive: if directive.trim().is_empty() {
                None
            } else {
                Some(directive)
            },
        }
    }

    pub fn reasoning_directive(&self) -> Option<&str> {
        self.reasoning_directive.as_deref()
    }

    pub fn compose(
        &self,
        system_prompt: &str,
        snapshot: &MarketSnapshot,
        history: &[ConversationMessage],
    ) -> String {
        let body = compose(system_prompt, snapshot, history);
        match &self.reasoning_directive {
            Some(directive) => format!("{}\n{}", directive, body),
            None => body,
        }
    }
}

/// Build the prompt block. Pure; system messages in `history` are skipped.
pub fn compose(
    system_prompt: &str,
    snapshot: &MarketSnapshot,
    history: &[ConversationMessage],
) -> String {
    let market_line = format!("Live Market: {}", snapshot.status_line());
    let mut lines: Vec<String> = Vec::with_capacity(history.len() + 4);

    lines.push(system_prompt.to_string());
    lines.push(market_line);
    lines.push(String::new());

    for msg in history {
        match msg.role {
            MessageRole::User | MessageRole::Assistant => {
                lines.push(format!("{}: {}", msg.role.label(), msg.content));
            }
            MessageRole::System => {}
        }
    }

    lines.push(ASSISTANT_CUE.to_string());
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_history() -> Vec<ConversationMessage> {
        vec![
            ConversationMessage::new(MessageRole::System, "ignored here"),
            ConversationMessage::user("Aaj ka bias kya hai?"),
            ConversationMessage::assistant("Mildly bullish above 22000."),
            ConversationMessage::user("Entry kab lein?"),
        ]
    }

    #[test]
    fn test_compose_layout() {
        let snapshot = MarketSnapshot::quote("Nifty", 22110.0, 110.0, 0.5);
        let prompt = compose("You are a trading coach.", &snapshot, &sample_history());

        let expected = "You are a trading coach.\n\
                        Live Market: Nifty 22110.00 (+110.00, +0.50%)\n\
                        \n\
                        User: Aaj ka bias kya hai?\n\
                        Assistant: Mildly bullish above 22000.\n\
                        User: Entry kab lein?\n\
                        Assistant:";
        assert_eq!(prompt, expected);
    }

    #[test]
    fn test_compose_embeds_market_failure() {
        let snapshot = MarketSnapshot::unavailable("Nifty", "Market data empty.");
        let prompt = compose("coach", &snapshot, &[ConversationMessage::user("hi")]);

        assert!(prompt.contains("Live Market: Nifty data unavailable (Market data empty.)"));
        assert!(prompt.ends_with("User: hi\nAssistant:"));
    }

    #[test]
    fn test_compose_skips_system_messages() {
        let snapshot = MarketSnapshot::quote("Nifty", 1.0, 0.0, 0.0);
        let prompt = compose("coach", &snapshot, &sample_history());
        assert!(!prompt.contains("ignored here"));
        assert!(!prompt.contains("System:"));
    }

    #[test]
    fn test_composer_directive_comes_first() {
        let snapshot = MarketSnapshot::quote("Nifty", 1.0, 0.0, 0.0);
        let composer = PromptComposer::with_directive(DEFAULT_REASONING_DIRECTIVE);
        let prompt = composer.compose("coach", &snapshot, &[]);

        assert!(prompt.starts_with(&format!("{}\ncoach\n", DEFAULT_REASONING_DIRECTIVE)));
        assert!(prompt.ends_with("\n\nAssistant:"));
    }

    #[test]
    fn test_blank_directive_is_disabled() {
        let composer = PromptComposer::with_directive("   ");
        assert!(composer.reasoning_directive().is_none());
    }
}
