//! Draft document representation and its storage codec
//!
//! A document is a JSON object keyed by section name. Stores may hand back
//! the persisted form either as a parsed JSON value or as JSON text (and
//! legacy rows hold JSON text that was itself string-encoded). All of that
//! is normalized here, at the store boundary, so the merger only ever sees
//! `Document`.

use serde_json::{Map, Value};
use thiserror::Error;

/// Section name -> arbitrarily nested section subtree
pub type Document = Map<String, Value>;

/// Why a persisted value could not become a `Document`
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct DecodeError(pub String);

/// Deepest string-in-string encoding unwrapped before giving up
const MAX_ENCODING_LAYERS: usize = 4;

/// Normalize a persisted value into a `Document`
///
/// Accepts an object, a JSON string holding an encoded object (possibly more
/// than once), or null (an empty document).
pub fn decode_value(value: Value) -> Result<Document, DecodeError> {
    let mut current = value;
    for _ in 0..=MAX_ENCODING_LAYERS {
        match current {
            Value::Object(map) => return Ok(map),
            Value::Null => return Ok(Document::new()),
            Value::String(text) => {
                let trimmed = text.trim();
                if trimmed.is_empty() {
                    return Ok(Document::new());
                }
                current = serde_json::from_str(trimmed)
                    .map_err(|e| DecodeError(format!("document text is not JSON: {}", e)))?;
            }
            other => {
                return Err(DecodeError(format!(
                    "document must be a JSON object, found {}",
                    value_kind(&other)
                )))
            }
        }
    }
    Err(DecodeError("document is string-encoded too many times".to_string()))
}

/// Normalize persisted JSON text (a TEXT column) into a `Document`
pub fn decode_text(raw: Option<&str>) -> Result<Document, DecodeError> {
    match raw {
        None => Ok(Document::new()),
        Some(text) => decode_value(Value::String(text.to_string())),
    }
}

/// Canonical JSON text written back to storage
pub fn encode(document: &Document) -> String {
    // Serializing a Map<String, Value> cannot fail
    Value::Object(document.clone()).to_string()
}

/// Nesting depth of a value; scalars are depth 0
pub fn depth(value: &Value) -> usize {
    match value {
        Value::Object(map) => 1 + map.values().map(depth).max().unwrap_or(0),
        Value::Array(items) => 1 + items.iter().map(depth).max().unwrap_or(0),
        _ => 0,
    }
}

/// Human-readable JSON type name for error messages
pub fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Look up a dotted path (`location.address.city`) in a document
///
/// Numeric segments index into arrays.
pub fn lookup<'a>(document: &'a Document, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let first = segments.next()?;
    let mut current = document.get(first)?;
    for segment in segments {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}
