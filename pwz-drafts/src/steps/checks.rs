//! Field-level value checks
//!
//! A check constrains a field only once it is set: an absent or `null`
//! value passes, and the step's completion rule decides whether the field
//! is needed at all. A set value that violates its check keeps the step
//! incomplete and is reported as a `FieldError`.

use serde::Serialize;
use serde_json::Value;

use crate::document::{lookup, Document};

/// Why one field keeps a step from completing
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    /// Dotted document path, e.g. `residential_pricing.sale_price`
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "check", rename_all = "snake_case")]
pub enum FieldCheck {
    /// Number strictly greater than zero
    Positive { path: String },
    /// Number within `[min, max]`; no upper bound when `max` is `None`
    Between {
        path: String,
        min: f64,
        max: Option<f64>,
    },
}

impl FieldCheck {
    pub fn positive(path: &str) -> Self {
        FieldCheck::Positive {
            path: path.to_string(),
        }
    }

    pub fn at_least(path: &str, min: f64) -> Self {
        FieldCheck::Between {
            path: path.to_string(),
            min,
            max: None,
        }
    }

    pub fn between(path: &str, min: f64, max: f64) -> Self {
        FieldCheck::Between {
            path: path.to_string(),
            min,
            max: Some(max),
        }
    }

    pub fn path(&self) -> &str {
        match self {
            FieldCheck::Positive { path } | FieldCheck::Between { path, .. } => path,
        }
    }

    /// The error for this field, if its value is set and out of bounds
    pub fn violation(&self, document: &Document) -> Option<FieldError> {
        let value = lookup(document, self.path()).filter(|v| !v.is_null())?;
        let Some(number) = value.as_f64() else {
            return Some(FieldError::new(self.path(), not_a_number(value)));
        };

        match self {
            FieldCheck::Positive { path } if number <= 0.0 => {
                Some(FieldError::new(path, "must be greater than 0"))
            }
            FieldCheck::Between { path, min, max } => match max {
                Some(max) if number < *min || number > *max => Some(FieldError::new(
                    path,
                    format!("must be between {} and {}", min, max),
                )),
                None if number < *min => {
                    Some(FieldError::new(path, format!("must be at least {}", min)))
                }
                _ => None,
            },
            _ => None,
        }
    }
}

fn not_a_number(value: &Value) -> String {
    let kind = match value {
        Value::Bool(_) => "a boolean",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
        Value::Null | Value::Number(_) => "not a number",
    };
    format!("must be a number, found {}", kind)
}
