//! Response normalization
//!
//! Different Gemini versions populate different subsets of `text`,
//! `candidates`, `output` and `parts`, sometimes several at once. Each
//! recognized field becomes a [`ResponseShape`] variant; shapes are probed
//! in a fixed order and the first one that yields text wins.

use serde_json::Value;

/// Returned when no probe yields text
pub const RESPONSE_UNAVAILABLE: &str = "Response unavailable";

/// One recognized layout of a provider response
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseShape<'a> {
    DirectText(&'a str),
    Candidates(&'a [Value]),
    Output(&'a [Value]),
    Parts(&'a [Value]),
}

impl<'a> ResponseShape<'a> {
    /// Shapes present on `response`, in probing order
    pub fn detect(response: &'a Value) -> Vec<ResponseShape<'a>> {
        let mut shapes = Vec::with_capacity(4);

        if let Some(text) = non_empty_str(response.get("text")) {
            shapes.push(ResponseShape::DirectText(text));
        }
        if let Some(list) = non_empty_list(response.get("candidates")) {
            shapes.push(ResponseShape::Candidates(list));
        }
        if let Some(list) = non_empty_list(response.get("output")) {
            shapes.push(ResponseShape::Output(list));
        }
        if let Some(list) = non_empty_list(response.get("parts")) {
            shapes.push(ResponseShape::Parts(list));
        }

        shapes
    }

    /// Text for this shape, or `None` to fall through to the next one
    pub fn extract(&self) -> Option<String> {
        match self {
            ResponseShape::DirectText(text) => Some((*text).to_string()),
            ResponseShape::Candidates(list) => list.first().map(extract_candidate),
            ResponseShape::Output(list) => {
                let texts: Vec<&str> = list.iter().filter_map(output_text).collect();
                join_non_empty(&texts)
            }
            ResponseShape::Parts(list) => join_non_empty(&part_texts(list)),
        }
    }
}

/// Convert a raw provider response into reply text. Never fails.
pub fn normalize(response: &Value) -> String {
    ResponseShape::detect(response)
        .iter()
        .find_map(ResponseShape::extract)
        .unwrap_or_else(|| RESPONSE_UNAVAILABLE.to_string())
}

/// First candidate: content, then parts, then message, then its JSON form
fn extract_candidate(candidate: &Value) -> String {
    if let Some(content) = candidate.get("content").filter(|v| is_truthy(v)) {
        return match content {
            Value::String(text) => text.clone(),
            other => other
                .get("parts")
                .and_then(Value::as_array)
                .and_then(|parts| join_non_empty(&part_texts(parts)))
                .unwrap_or_else(|| other.to_string()),
        };
    }

    if let Some(parts) = non_empty_list(candidate.get("parts")) {
        if let Some(text) = join_non_empty(&part_texts(parts)) {
            return text;
        }
    }

    if let Some(message) = candidate.get("message").filter(|v| is_truthy(v)) {
        return match message {
            Value::String(text) => text.clone(),
            other => other.to_string(),
        };
    }

    match candidate {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

fn output_text(entry: &Value) -> Option<&str> {
    non_empty_str(entry.get("content")).or_else(|| part_text(entry))
}

fn part_texts(parts: &[Value]) -> Vec<&str> {
    parts.iter().filter_map(part_text).collect()
}

/// `{"text": "..."}` entry or a bare string entry
fn part_text(part: &Value) -> Option<&str> {
    match part {
        Value::String(text) if !text.is_empty() => Some(text.as_str()),
        Value::Object(_) => non_empty_str(part.get("text")),
        _ => None,
    }
}

fn join_non_empty(texts: &[&str]) -> Option<String> {
    if texts.is_empty() {
        None
    } else {
        Some(texts.join("\n"))
    }
}

fn non_empty_str(value: Option<&Value>) -> Option<&str> {
    value.and_then(Value::as_str).filter(|s| !s.is_empty())
}

fn non_empty_list(value: Option<&Value>) -> Option<&[Value]> {
    value
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .filter(|list| !list.is_empty())
}

/// null, "", [], {} and false count as absent
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
        Value::Number(_) => true,
    }
}
