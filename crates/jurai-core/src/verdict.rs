//! Recovers a JSON verdict from model free text.
//!
//! Models wrap JSON in code fences, quote it as a string, or bury it in prose.
//! [`parse_verdict`] tries progressively looser strategies and returns the
//! first value that decodes.

use crate::error::{JuraiError, Result};
use crate::llm::preview;
use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;

fn fence_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?s)```[A-Za-z0-9_-]*[ \t]*\r?\n?(.*?)```").expect("fence regex is valid")
    })
}

pub fn parse_verdict(raw: &str) -> Result<Value> {
    let text = raw.trim();

    if let Some(value) = decode(text) {
        return Ok(value);
    }

    if let Some(inner) = fence_re().captures(text).and_then(|c| c.get(1)) {
        if let Some(value) = decode(inner.as_str().trim()) {
            return Ok(value);
        }
    }

    if let (Some(start), Some(end)) = (text.find('{'), text.rfind('}')) {
        if start < end {
            if let Some(value) = decode(&text[start..=end]) {
                return Ok(value);
            }
        }
    }

    tracing::error!("Could not decode verdict: {}", preview(text));
    Err(JuraiError::Parse(format!(
        "no JSON object found in model output: {}",
        preview(text)
    )))
}

/// Decode `text`; a JSON string holding JSON is unwrapped once.
fn decode(text: &str) -> Option<Value> {
    if text.is_empty() {
        return None;
    }
    match serde_json::from_str::<Value>(text).ok()? {
        Value::String(inner) => serde_json::from_str::<Value>(inner.trim())
            .ok()
            .filter(|v| v.is_object() || v.is_array()),
        value => Some(value),
    }
}
