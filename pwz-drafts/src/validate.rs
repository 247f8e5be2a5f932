//! Section payload validation
//!
//! Runs before any load or merge. A rejected payload leaves the stored
//! document untouched.

use serde_json::Value;

use crate::document::{depth, value_kind, Document};
use crate::error::{DraftError, Result};
use crate::steps::StepCatalog;

const MAX_SECTION_NAME_LEN: usize = 64;

/// Structural limits applied to incoming sections
#[derive(Debug, Clone)]
pub struct PayloadPolicy {
    pub allow_unknown_sections: bool,
    pub max_depth: usize,
}

impl Default for PayloadPolicy {
    fn default() -> Self {
        Self {
            allow_unknown_sections: true,
            max_depth: 32,
        }
    }
}

/// Check a section name: `[A-Za-z0-9_-]{1,64}`
pub fn validate_section_name(name: &str) -> Result<()> {
    if name.is_empty() || name.len() > MAX_SECTION_NAME_LEN {
        return Err(DraftError::invalid_section(
            name,
            format!("section name must be 1-{} characters", MAX_SECTION_NAME_LEN),
        ));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(DraftError::invalid_section(
            name,
            "section name may only contain letters, digits, '_' and '-'",
        ));
    }
    Ok(())
}

/// Validate every section of a payload
pub fn validate_payload(
    payload: &Document,
    catalog: &StepCatalog,
    policy: &PayloadPolicy,
) -> Result<()> {
    if payload.is_empty() {
        return Err(DraftError::invalid_section("", "payload contains no sections"));
    }

    for (name, subtree) in payload {
        validate_section_name(name)?;

        if !policy.allow_unknown_sections && !catalog.is_known_section(name) {
            return Err(DraftError::invalid_section(name, "unknown section"));
        }

        match subtree {
            // Explicit clear of the whole section
            Value::Null => {}
            Value::Object(_) => {
                // The section object itself is level 1
                let levels = depth(subtree);
                if levels > policy.max_depth {
                    return Err(DraftError::invalid_section(
                        name,
                        format!("nesting depth {} exceeds limit {}", levels, policy.max_depth),
                    ));
                }
            }
            other => {
                return Err(DraftError::invalid_section(
                    name,
                    format!("expected an object, found {}", value_kind(other)),
                ));
            }
        }
    }

    Ok(())
}
