//! Draft persistence
//!
//! `DocumentStore` is the only seam between the reconciliation engine and
//! storage. Implementations must make `replace` an atomic compare-and-swap on
//! the draft version and must hand back documents already normalized into a
//! JSON object (see `crate::document`).

mod memory;
mod sqlite;

pub use memory::MemoryDocumentStore;
pub use sqlite::SqliteDocumentStore;

use std::collections::BTreeSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::document::Document;
use crate::error::Result;

/// Lifecycle status of a draft
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DraftStatus {
    #[default]
    Draft,
    /// Terminal; no further section saves are accepted
    Published,
}

impl DraftStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DraftStatus::Draft => "draft",
            DraftStatus::Published => "published",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "draft" => Some(DraftStatus::Draft),
            "published" => Some(DraftStatus::Published),
            _ => None,
        }
    }
}

/// A draft as persisted
#[derive(Debug, Clone, PartialEq)]
pub struct DraftRecord {
    pub id: Uuid,
    pub tenant_id: Option<String>,
    pub status: DraftStatus,
    pub document: Document,
    pub completed_steps: BTreeSet<String>,
    pub completion_percentage: u8,
    /// Compare-and-swap token; starts at 0 and grows by one per write
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields written by a successful `replace`
#[derive(Debug, Clone, PartialEq)]
pub struct DraftUpdate {
    pub document: Document,
    pub completed_steps: BTreeSet<String>,
    pub completion_percentage: u8,
    pub status: DraftStatus,
}

/// Storage backend for drafts
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Create an empty draft at version 0
    async fn create(&self, tenant_id: Option<&str>) -> Result<DraftRecord>;

    /// Load a draft; `NotFound` if the id is unknown
    async fn load(&self, id: Uuid) -> Result<DraftRecord>;

    /// Write `update` only if the stored version still equals `expected_version`
    ///
    /// Returns the draft exactly as persisted, at version
    /// `expected_version + 1`. A mismatch returns `VersionConflict` and
    /// writes nothing.
    async fn replace(
        &self,
        id: Uuid,
        update: &DraftUpdate,
        expected_version: i64,
    ) -> Result<DraftRecord>;

    /// Drafts owned by a tenant, newest first
    async fn list_by_tenant(&self, tenant_id: &str) -> Result<Vec<DraftRecord>>;

    /// Short backend name for logs and the health endpoint
    fn backend_name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip() {
        for status in [DraftStatus::Draft, DraftStatus::Published] {
            assert_eq!(DraftStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(DraftStatus::parse("archived"), None);
        assert_eq!(DraftStatus::default(), DraftStatus::Draft);
    }
}
