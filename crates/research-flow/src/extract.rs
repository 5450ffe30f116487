//! Structured extraction of LLM replies
//!
//! Generation backends are asked for JSON but routinely wrap it in code
//! fences, prose, or leave trailing commas. Extraction runs in stages:
//!
//! 1. strip code fences
//! 2. strict parse
//! 3. lenient repair: collapse whitespace, drop trailing commas
//! 4. outermost `{...}` substring, then brace balancing
//!
//! Call sites pick their own schema-complete default through
//! [`extract_or`], so a malformed reply never stops the workflow.

use regex::Regex;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::sync::OnceLock;
use thiserror::Error;
use tracing::{debug, warn};

/// Reasons a reply could not be turned into structured data
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExtractError {
    #[error("empty reply")]
    Empty,

    #[error("reply is not a JSON object")]
    NotAnObject,

    #[error("failed to parse reply: {0}")]
    Parse(String),
}

fn whitespace_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("valid whitespace regex"))
}

fn trailing_comma_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r",\s*([}\]])").expect("valid trailing comma regex"))
}

/// Strip a surrounding markdown code fence, preferring ```json blocks.
pub fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();

    if let Some(start) = trimmed.find("```json") {
        let after = &trimmed[start + 7..];
        if let Some(end) = after.find("```") {
            return after[..end].trim();
        }
        return after.trim();
    }

    if let Some(start) = trimmed.find("```") {
        let after = &trimmed[start + 3..];
        // Skip an optional language tag on the fence line
        let content_start = match after.find('\n') {
            Some(pos) if !after[..pos].contains('{') => pos + 1,
            _ => 0,
        };
        let after = &after[content_start..];
        if let Some(end) = after.find("```") {
            return after[..end].trim();
        }
        return after.trim();
    }

    trimmed
}

/// Collapse whitespace runs and remove commas directly before `}` or `]`.
pub fn repair_json(text: &str) -> String {
    let collapsed = whitespace_re().replace_all(text, " ");
    trailing_comma_re().replace_all(&collapsed, "$1").into_owned()
}

/// Slice from the first `{` to the last `}`, if both exist.
fn outer_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

/// Append closers for unbalanced braces and brackets outside strings.
pub fn balance_braces(text: &str) -> String {
    let mut stack = Vec::new();
    let mut in_string = false;
    let mut escape_next = false;

    for ch in text.chars() {
        if escape_next {
            escape_next = false;
            continue;
        }
        if ch == '\\' && in_string {
            escape_next = true;
            continue;
        }
        if ch == '"' {
            in_string = !in_string;
            continue;
        }
        if in_string {
            continue;
        }
        match ch {
            '{' => stack.push('}'),
            '[' => stack.push(']'),
            '}' | ']' => {
                stack.pop();
            }
            _ => {}
        }
    }

    let mut balanced = text.to_string();
    if in_string {
        balanced.push('"');
    }
    while let Some(closer) = stack.pop() {
        balanced.push(closer);
    }
    balanced
}

/// Parse a reply into a JSON value, repairing it if needed.
pub fn extract_json(reply: &str) -> Result<Value, ExtractError> {
    let cleaned = strip_code_fences(reply);
    if cleaned.is_empty() {
        return Err(ExtractError::Empty);
    }

    let strict_err = match serde_json::from_str::<Value>(cleaned) {
        Ok(value) => return Ok(value),
        Err(e) => e,
    };
    debug!(error = %strict_err, "Strict JSON parse failed, attempting repair");

    let repaired = repair_json(cleaned);
    if let Ok(value) = serde_json::from_str::<Value>(&repaired) {
        return Ok(value);
    }

    let candidate = match outer_object(&repaired) {
        Some(object) => object,
        None => match repaired.find('{') {
            Some(start) => &repaired[start..],
            None => return Err(ExtractError::Parse(strict_err.to_string())),
        },
    };
    if let Ok(value) = serde_json::from_str::<Value>(candidate) {
        return Ok(value);
    }

    let balanced = repair_json(&balance_braces(candidate));
    serde_json::from_str::<Value>(&balanced).map_err(|e| ExtractError::Parse(e.to_string()))
}

/// Parse a reply into a JSON object map.
pub fn extract_object(reply: &str) -> Result<Map<String, Value>, ExtractError> {
    match extract_json(reply)? {
        Value::Object(map) => Ok(map),
        _ => Err(ExtractError::NotAnObject),
    }
}

/// Parse a reply into `T`.
pub fn extract<T: DeserializeOwned>(reply: &str) -> Result<T, ExtractError> {
    let value = extract_json(reply)?;
    serde_json::from_value(value).map_err(|e| ExtractError::Parse(e.to_string()))
}

/// Parse a reply into `T`, substituting `fallback` on any failure.
pub fn extract_or<T, F>(reply: &str, context: &str, fallback: F) -> T
where
    T: DeserializeOwned,
    F: FnOnce() -> T,
{
    match extract(reply) {
        Ok(value) => value,
        Err(e) => {
            warn!(context, error = %e, "Failed to parse LLM reply, using fallback");
            fallback()
        }
    }
}
