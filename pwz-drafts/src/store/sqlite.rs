//! SQLite-backed draft store
//!
//! The compare-and-swap is a single `UPDATE ... WHERE id = ? AND version = ?`;
//! zero affected rows means either the draft is gone or someone else wrote
//! first. Reads run under `retry_transient`; inserts and the compare-and-swap
//! run under `retry_write` so a timed-out write is never re-issued.

use std::collections::BTreeSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pwz_common::time;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use super::{DocumentStore, DraftRecord, DraftStatus, DraftUpdate};
use crate::document::{self, Document};
use crate::error::{DraftError, Result};
use crate::retry::{retry_transient, retry_write, RetryPolicy};

const SELECT_COLUMNS: &str = "id, tenant_id, status, document, completed_steps, \
     completion_percentage, version, created_at, updated_at";

/// Draft store over a SQLite pool created by `pwz_common::db::init_database`
#[derive(Clone)]
pub struct SqliteDocumentStore {
    pool: SqlitePool,
    retry: RetryPolicy,
}

impl SqliteDocumentStore {
    pub fn new(pool: SqlitePool, retry: RetryPolicy) -> Self {
        Self { pool, retry }
    }

    async fn insert_once(&self, record: &DraftRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO drafts (id, tenant_id, status, document, completed_steps,
                                completion_percentage, version, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(record.id.to_string())
        .bind(record.tenant_id.as_deref())
        .bind(record.status.as_str())
        .bind(document::encode(&record.document))
        .bind(encode_steps(&record.completed_steps))
        .bind(i64::from(record.completion_percentage))
        .bind(record.version)
        .bind(time::to_db(&record.created_at))
        .bind(time::to_db(&record.updated_at))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn load_once(&self, id: Uuid) -> Result<DraftRecord> {
        let row = sqlx::query(&format!("SELECT {} FROM drafts WHERE id = ?", SELECT_COLUMNS))
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?
            .ok_or(DraftError::NotFound(id))?;

        record_from_row(&row)
    }

    async fn replace_once(
        &self,
        id: Uuid,
        update: &DraftUpdate,
        expected_version: i64,
    ) -> Result<DraftRecord> {
        let written = sqlx::query(&format!(
            r#"
            UPDATE drafts
            SET document = ?, completed_steps = ?, completion_percentage = ?,
                status = ?, version = ?, updated_at = ?
            WHERE id = ? AND version = ?
            RETURNING {}
            "#,
            SELECT_COLUMNS
        ))
        .bind(document::encode(&update.document))
        .bind(encode_steps(&update.completed_steps))
        .bind(i64::from(update.completion_percentage.min(100)))
        .bind(update.status.as_str())
        .bind(expected_version + 1)
        .bind(time::to_db(&time::now()))
        .bind(id.to_string())
        .bind(expected_version)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(row) = written {
            return record_from_row(&row);
        }

        // Nothing written: find out whether the draft vanished or moved on
        let actual: Option<i64> = sqlx::query_scalar("SELECT version FROM drafts WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        match actual {
            None => Err(DraftError::NotFound(id)),
            Some(actual) => {
                debug!(draft_id = %id, expected_version, actual, "Compare-and-swap lost");
                Err(DraftError::VersionConflict {
                    expected: expected_version,
                    actual: Some(actual),
                })
            }
        }
    }

    async fn list_once(&self, tenant_id: &str) -> Result<Vec<DraftRecord>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM drafts WHERE tenant_id = ? ORDER BY created_at DESC, rowid DESC",
            SELECT_COLUMNS
        ))
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(record_from_row).collect()
    }
}

#[async_trait]
impl DocumentStore for SqliteDocumentStore {
    async fn create(&self, tenant_id: Option<&str>) -> Result<DraftRecord> {
        let now = time::now();
        let record = DraftRecord {
            id: pwz_common::uuid_utils::generate(),
            tenant_id: tenant_id.map(str::to_string),
            status: DraftStatus::Draft,
            document: Document::new(),
            completed_steps: BTreeSet::new(),
            completion_percentage: 0,
            version: 0,
            created_at: now,
            updated_at: now,
        };

        retry_write("create_draft", self.retry, || self.insert_once(&record)).await?;
        Ok(record)
    }

    async fn load(&self, id: Uuid) -> Result<DraftRecord> {
        retry_transient("load_draft", self.retry, || self.load_once(id)).await
    }

    async fn replace(
        &self,
        id: Uuid,
        update: &DraftUpdate,
        expected_version: i64,
    ) -> Result<DraftRecord> {
        retry_write("replace_draft", self.retry, || {
            self.replace_once(id, update, expected_version)
        })
        .await
    }

    async fn list_by_tenant(&self, tenant_id: &str) -> Result<Vec<DraftRecord>> {
        retry_transient("list_drafts", self.retry, || self.list_once(tenant_id)).await
    }

    fn backend_name(&self) -> &'static str {
        "sqlite"
    }
}

fn encode_steps(steps: &BTreeSet<String>) -> String {
    serde_json::Value::from(steps.iter().cloned().collect::<Vec<_>>()).to_string()
}

fn record_from_row(row: &SqliteRow) -> Result<DraftRecord> {
    let raw_id: String = row.try_get("id")?;
    let id = pwz_common::uuid_utils::parse(&raw_id)
        .map_err(|e| DraftError::Internal(format!("Invalid draft id {}: {}", raw_id, e)))?;

    let corrupt = |message: String| DraftError::Corrupt { draft_id: id, message };

    let raw_status: String = row.try_get("status")?;
    let status = DraftStatus::parse(&raw_status)
        .ok_or_else(|| corrupt(format!("unknown status '{}'", raw_status)))?;

    let raw_document: Option<String> = row.try_get("document")?;
    let document =
        document::decode_text(raw_document.as_deref()).map_err(|e| corrupt(e.to_string()))?;

    let raw_steps: Option<String> = row.try_get("completed_steps")?;
    let completed_steps = match raw_steps.as_deref().map(str::trim) {
        None | Some("") => BTreeSet::new(),
        Some(text) => serde_json::from_str::<BTreeSet<String>>(text)
            .map_err(|e| corrupt(format!("completed_steps is not a string array: {}", e)))?,
    };

    let percentage: i64 = row.try_get("completion_percentage")?;

    Ok(DraftRecord {
        id,
        tenant_id: row.try_get("tenant_id")?,
        status,
        document,
        completed_steps,
        completion_percentage: percentage.clamp(0, 100) as u8,
        version: row.try_get("version")?,
        created_at: timestamp(row, "created_at").map_err(corrupt)?,
        updated_at: timestamp(row, "updated_at").map_err(corrupt)?,
    })
}

fn timestamp(row: &SqliteRow, column: &str) -> std::result::Result<DateTime<Utc>, String> {
    let raw: String = row
        .try_get(column)
        .map_err(|e| format!("{} unreadable: {}", column, e))?;
    time::from_db(&raw).ok_or_else(|| format!("{} is not a timestamp: '{}'", column, raw))
}
