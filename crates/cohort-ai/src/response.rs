//! Decoding of structured completions.
//!
//! Completions are untrusted text. Fenced code markers are removed, the
//! remainder must be a JSON array, and each element is decoded on its own so
//! one odd element does not sink the rest.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::debug;

use crate::error::WorkflowError;

/// Removes every `` ```json `` and `` ``` `` marker and trims the result.
pub fn strip_code_fences(text: &str) -> String {
    text.replace("```json", "").replace("```", "").trim().to_string()
}

/// A JSON array decoded element by element.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedArray<T> {
    /// Elements that decoded, in response order.
    pub items: Vec<T>,
    /// Elements that did not decode as `T`.
    pub skipped: usize,
}

/// Parses a completion as a JSON array, decoding each element as `T` and
/// counting the elements that do not decode.
pub fn decode_json_array<T: DeserializeOwned>(
    text: &str,
) -> Result<DecodedArray<T>, WorkflowError> {
    let value: Value = serde_json::from_str(&strip_code_fences(text))?;
    let Value::Array(elements) = value else {
        return Err(WorkflowError::NotAnArray);
    };

    let total = elements.len();
    let items: Vec<T> = elements
        .into_iter()
        .filter_map(|element| serde_json::from_value(element).ok())
        .collect();
    let skipped = total - items.len();
    if skipped > 0 {
        debug!(skipped, total, "skipped undecodable response elements");
    }
    Ok(DecodedArray { items, skipped })
}

/// Like [`decode_json_array`], keeping only the decoded elements.
pub fn parse_json_array<T: DeserializeOwned>(text: &str) -> Result<Vec<T>, WorkflowError> {
    decode_json_array(text).map(|decoded| decoded.items)
}

/// Decodes a score given as a number or a numeric string.
///
/// Anything else, including `null`, decodes as `None`.
pub fn lenient_score<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|score| score.is_finite()))
}

/// Decodes free text; non-string JSON is kept as its JSON rendering.
pub fn lenient_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s,
        Some(other) => other.to_string(),
    })
}
