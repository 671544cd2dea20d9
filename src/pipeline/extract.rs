//! Forgiving JSON extraction from model output.
//!
//! Models are asked for "only JSON" but routinely wrap it in prose or code
//! fences. We try the whole text first, then the greedy span from the first
//! `{` to the last `}`. Callers decide what a failure means for their stage.

use std::sync::LazyLock;

use regex::Regex;
use serde::de::DeserializeOwned;
use serde_json::Value;

static OBJECT_SPAN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)\{.*\}").unwrap());

/// Extract a JSON object from free text, if there is one.
pub fn extract_json_object(raw: &str) -> Option<Value> {
    let trimmed = raw.trim();

    if let Ok(value @ Value::Object(_)) = serde_json::from_str::<Value>(trimmed) {
        return Some(value);
    }

    let span = OBJECT_SPAN.find(trimmed)?;
    match serde_json::from_str::<Value>(span.as_str()) {
        Ok(value @ Value::Object(_)) => Some(value),
        _ => None,
    }
}

/// Extract and deserialize a JSON object into `T`.
pub fn parse_structured<T: DeserializeOwned>(raw: &str) -> Option<T> {
    extract_json_object(raw).and_then(|value| serde_json::from_value(value).ok())
}
