//! Declarative completion rules
//!
//! Rules are data rather than closures so the catalog can be serialized for
//! `GET /steps` and so evaluation is trivially deterministic.

use serde::Serialize;
use serde_json::Value;

use super::FieldError;
use crate::document::{lookup, Document};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "rule", content = "args", rename_all = "snake_case")]
pub enum Rule {
    /// Value exists, is not null, and is not a blank string or empty container
    Present(String),
    /// Array, object or string with at least one element/character
    NonEmpty(String),
    /// Number strictly greater than zero
    Positive(String),
    /// Section exists as an object with at least one non-null field
    Touched(String),
    AllOf(Vec<Rule>),
    AnyOf(Vec<Rule>),
}

impl Rule {
    pub fn present(path: &str) -> Self {
        Rule::Present(path.to_string())
    }

    pub fn non_empty(path: &str) -> Self {
        Rule::NonEmpty(path.to_string())
    }

    pub fn positive(path: &str) -> Self {
        Rule::Positive(path.to_string())
    }

    pub fn touched(section: &str) -> Self {
        Rule::Touched(section.to_string())
    }

    pub fn is_satisfied(&self, document: &Document) -> bool {
        match self {
            Rule::Present(path) => lookup(document, path).is_some_and(is_present),
            Rule::NonEmpty(path) => lookup(document, path).is_some_and(|v| match v {
                Value::Array(items) => !items.is_empty(),
                Value::Object(map) => !map.is_empty(),
                Value::String(s) => !s.trim().is_empty(),
                _ => false,
            }),
            Rule::Positive(path) => lookup(document, path)
                .and_then(Value::as_f64)
                .is_some_and(|n| n > 0.0),
            Rule::Touched(section) => match document.get(section) {
                Some(Value::Object(map)) => map.values().any(|v| !v.is_null()),
                _ => false,
            },
            Rule::AllOf(rules) => rules.iter().all(|r| r.is_satisfied(document)),
            Rule::AnyOf(rules) => rules.iter().any(|r| r.is_satisfied(document)),
        }
    }

    /// Field errors explaining why the rule is not satisfied
    ///
    /// Empty when satisfied. An unsatisfied `AnyOf` reports every
    /// alternative; fixing any one of them is enough.
    pub fn diagnose(&self, document: &Document) -> Vec<FieldError> {
        if self.is_satisfied(document) {
            return Vec::new();
        }
        match self {
            Rule::Present(path) => vec![FieldError::new(path, "is required")],
            Rule::NonEmpty(path) => vec![FieldError::new(path, "must not be empty")],
            Rule::Positive(path) => vec![FieldError::new(path, "must be greater than 0")],
            Rule::Touched(section) => vec![FieldError::new(section, "has no values")],
            Rule::AllOf(rules) | Rule::AnyOf(rules) => {
                rules.iter().flat_map(|r| r.diagnose(document)).collect()
            }
        }
    }
}

fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.trim().is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
        Value::Bool(_) | Value::Number(_) => true,
    }
}
