//! In-memory draft store
//!
//! Used by tests and by `storage = "memory"`. Documents are kept as raw JSON
//! values and normalized on load, same as the SQLite backend.

use std::collections::{BTreeSet, HashMap};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pwz_common::time;
use serde_json::Value;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{DocumentStore, DraftRecord, DraftStatus, DraftUpdate};
use crate::document;
use crate::error::{DraftError, Result};

#[derive(Debug, Clone)]
struct StoredDraft {
    tenant_id: Option<String>,
    status: DraftStatus,
    document: Value,
    completed_steps: BTreeSet<String>,
    completion_percentage: u8,
    version: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    /// Insertion order, for stable listing when timestamps tie
    seq: u64,
}

impl StoredDraft {
    fn to_record(&self, id: Uuid) -> Result<DraftRecord> {
        let document =
            document::decode_value(self.document.clone()).map_err(|e| DraftError::Corrupt {
                draft_id: id,
                message: e.to_string(),
            })?;

        Ok(DraftRecord {
            id,
            tenant_id: self.tenant_id.clone(),
            status: self.status,
            document,
            completed_steps: self.completed_steps.clone(),
            completion_percentage: self.completion_percentage,
            version: self.version,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Default)]
struct Inner {
    drafts: HashMap<Uuid, StoredDraft>,
    next_seq: u64,
}

/// Draft store held entirely in process memory
#[derive(Default)]
pub struct MemoryDocumentStore {
    inner: RwLock<Inner>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a draft whose stored document is an arbitrary JSON value
    ///
    /// Lets callers reproduce rows written by older clients, such as a
    /// document that was string-encoded before being stored.
    pub async fn insert_raw(&self, tenant_id: Option<&str>, raw_document: Value) -> Uuid {
        let id = pwz_common::uuid_utils::generate();
        let now = time::now();
        let mut inner = self.inner.write().await;
        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.drafts.insert(
            id,
            StoredDraft {
                tenant_id: tenant_id.map(str::to_string),
                status: DraftStatus::Draft,
                document: raw_document,
                completed_steps: BTreeSet::new(),
                completion_percentage: 0,
                version: 0,
                created_at: now,
                updated_at: now,
                seq,
            },
        );
        id
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn create(&self, tenant_id: Option<&str>) -> Result<DraftRecord> {
        let id = self.insert_raw(tenant_id, Value::Object(Default::default())).await;
        self.load(id).await
    }

    async fn load(&self, id: Uuid) -> Result<DraftRecord> {
        let inner = self.inner.read().await;
        inner
            .drafts
            .get(&id)
            .ok_or(DraftError::NotFound(id))?
            .to_record(id)
    }

    async fn replace(
        &self,
        id: Uuid,
        update: &DraftUpdate,
        expected_version: i64,
    ) -> Result<DraftRecord> {
        let mut inner = self.inner.write().await;
        let stored = inner.drafts.get_mut(&id).ok_or(DraftError::NotFound(id))?;

        if stored.version != expected_version {
            return Err(DraftError::VersionConflict {
                expected: expected_version,
                actual: Some(stored.version),
            });
        }

        stored.document = Value::Object(update.document.clone());
        stored.completed_steps = update.completed_steps.clone();
        stored.completion_percentage = update.completion_percentage.min(100);
        stored.status = update.status;
        stored.version = expected_version + 1;
        stored.updated_at = time::now();

        stored.to_record(id)
    }

    async fn list_by_tenant(&self, tenant_id: &str) -> Result<Vec<DraftRecord>> {
        let inner = self.inner.read().await;
        let mut matching: Vec<(&Uuid, &StoredDraft)> = inner
            .drafts
            .iter()
            .filter(|(_, d)| d.tenant_id.as_deref() == Some(tenant_id))
            .collect();
        matching.sort_by_key(|(_, d)| std::cmp::Reverse((d.created_at, d.seq)));

        matching
            .into_iter()
            .map(|(id, stored)| stored.to_record(*id))
            .collect()
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
