//! Thought/answer splitting for replies that use `<think>` delimiters

use serde::Serialize;

pub const THINK_OPEN: &str = "<think>";
pub const THINK_CLOSE: &str = "</think>";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SplitReply {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thought: Option<String>,
    pub answer: String,
}

/// Split off the first `<think>…</think>` span.
///
/// Only the first opening tag and the first closing tag after it are
/// honored. Anything beyond that pair stays in the answer verbatim. Without
/// a complete pair the reply is returned untouched as the answer.
pub fn split(reply: &str) -> SplitReply {
    let Some(open) = reply.find(THINK_OPEN) else {
        return unsplit(reply);
    };
    let inner_start = open + THINK_OPEN.len();
    let Some(close_offset) = reply[inner_start..].find(THINK_CLOSE) else {
        return unsplit(reply);
    };
    let inner_end = inner_start + close_offset;

    let thought = reply[inner_start..inner_end].trim().to_string();
    let answer = format!("{}{}", &reply[..open], &reply[inner_end + THINK_CLOSE.len()..]);

    SplitReply {
        thought: Some(thought),
        answer: answer.trim().to_string(),
    }
}

fn unsplit(reply: &str) -> SplitReply {
    SplitReply {
        thought: None,
        answer: reply.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_thought_and_answer() {
        let split = split("<think>checking levels</think>Stay calm, wait for confirmation");
        assert_eq!(split.thought.as_deref(), Some("checking levels"));
        assert_eq!(split.answer, "Stay calm, wait for confirmation");
    }

    #[test]
    fn test_plain_text_unchanged() {
        let reply = "  Nifty above 22000, trail your stop.  ";
        let split = split(reply);
        assert!(split.thought.is_none());
        assert_eq!(split.answer, reply);
    }

    #[test]
    fn test_unclosed_delimiter_is_not_split() {
        let reply = "<think>still reasoning";
        let split = split(reply);
        assert!(split.thought.is_none());
        assert_eq!(split.answer, reply);
    }

    #[test]
    fn test_text_around_span_is_kept() {
        let split = split("Bias: bullish. <think>\n  RSI 62\n</think> Entry above 22150.");
        assert_eq!(split.thought.as_deref(), Some("RSI 62"));
        assert_eq!(split.answer, "Bias: bullish.  Entry above 22150.");
    }

    #[test]
    fn test_only_first_pair_honored() {
        let split = split("<think>one</think>Answer <think>two</think> tail");
        assert_eq!(split.thought.as_deref(), Some("one"));
        assert_eq!(split.answer, "Answer <think>two</think> tail");
    }

    #[test]
    fn test_nested_delimiters_not_balanced() {
        let split = split("<think>outer <think>inner</think> rest</think>Done");
        assert_eq!(split.thought.as_deref(), Some("outer <think>inner"));
        assert_eq!(split.answer, "rest</think>Done");
    }
}
