//! Error types for pwz-drafts
//!
//! Every variant carries a stable `kind()` used in HTTP bodies and logs, and
//! the offending section name where one applies.

use thiserror::Error;
use uuid::Uuid;

/// Reconciliation engine error
#[derive(Error, Debug)]
pub enum DraftError {
    /// Draft id unknown to the store
    #[error("Draft not found: {0}")]
    NotFound(Uuid),

    /// Payload rejected before merge; the stored document is untouched
    #[error("Invalid section '{section}': {message}")]
    InvalidSection { section: String, message: String },

    /// Stored version differs from the expected one
    #[error("Version conflict: expected {expected}, stored {}", stored_version(.actual))]
    VersionConflict { expected: i64, actual: Option<i64> },

    /// Remerge retry bound reached
    #[error(
        "Conflict retry bound exceeded after {attempts} attempts; reload the draft and resubmit"
    )]
    ConflictExceeded { attempts: u32 },

    /// Transient storage failure that outlived its backoff budget
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    /// Publish requested while required steps are incomplete
    #[error("Draft is not ready to publish; missing steps: {}", .missing.join(", "))]
    NotReady { missing: Vec<String> },

    /// Mutation attempted on a published draft
    #[error("Draft {0} is already published")]
    AlreadyPublished(Uuid),

    /// Stored document could not be decoded into a JSON object
    #[error("Corrupt stored draft {draft_id}: {message}")]
    Corrupt { draft_id: Uuid, message: String },

    /// Non-transient database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl DraftError {
    pub fn invalid_section(section: impl Into<String>, message: impl Into<String>) -> Self {
        DraftError::InvalidSection {
            section: section.into(),
            message: message.into(),
        }
    }

    /// Stable machine-readable error kind
    pub fn kind(&self) -> &'static str {
        match self {
            DraftError::NotFound(_) => "NotFound",
            DraftError::InvalidSection { .. } => "InvalidSection",
            DraftError::VersionConflict { .. } => "VersionConflict",
            DraftError::ConflictExceeded { .. } => "ConflictExceeded",
            DraftError::StorageUnavailable(_) => "StorageUnavailable",
            DraftError::NotReady { .. } => "NotReady",
            DraftError::AlreadyPublished(_) => "AlreadyPublished",
            DraftError::Corrupt { .. } => "Corrupt",
            DraftError::Database(_) => "Database",
            DraftError::Internal(_) => "Internal",
        }
    }

    /// Offending section name, if the error is about one
    pub fn section(&self) -> Option<&str> {
        match self {
            DraftError::InvalidSection { section, .. } => Some(section),
            _ => None,
        }
    }

    /// Whether the caller should reload the draft and try again
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            DraftError::VersionConflict { .. }
                | DraftError::ConflictExceeded { .. }
                | DraftError::StorageUnavailable(_)
        )
    }
}

fn stored_version(actual: &Option<i64>) -> String {
    actual.map_or_else(|| "unknown".to_string(), |v| v.to_string())
}

/// Convenience Result type using DraftError
pub type Result<T> = std::result::Result<T, DraftError>;
