//! Draft reconciler
//!
//! Orchestrates a section save: validate the payload, load the current
//! draft, merge, recompute completion, then compare-and-swap against the
//! version that was just loaded. A lost swap remerges the same payload over
//! the winner's document, up to the configured bound.
//!
//! Exactly one successful write happens per call. The merged document and its
//! recomputed completion are always written together.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use pwz_common::config::{EngineSettings, StaleClientPolicy};
use pwz_common::{time, DraftEvent};
use serde::Serialize;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::audit::AuditSink;
use crate::completion::{Completion, CompletionTracker};
use crate::conflict::{ConflictResolver, Resolution, DEFAULT_MAX_ATTEMPTS};
use crate::document::Document;
use crate::error::{DraftError, Result};
use crate::merge::merge;
use crate::steps::{FieldError, StepCatalog};
use crate::store::{DocumentStore, DraftRecord, DraftStatus, DraftUpdate};
use crate::validate::{validate_payload, PayloadPolicy};

/// Reconciler tuning, usually taken from `[engine]` in the TOML config
#[derive(Debug, Clone)]
pub struct ReconcilerSettings {
    pub max_conflict_attempts: u32,
    pub stale_client_policy: StaleClientPolicy,
    pub payload: PayloadPolicy,
}

impl Default for ReconcilerSettings {
    fn default() -> Self {
        Self {
            max_conflict_attempts: DEFAULT_MAX_ATTEMPTS,
            stale_client_policy: StaleClientPolicy::default(),
            payload: PayloadPolicy::default(),
        }
    }
}

impl From<&EngineSettings> for ReconcilerSettings {
    fn from(engine: &EngineSettings) -> Self {
        Self {
            max_conflict_attempts: engine.max_conflict_attempts,
            stale_client_policy: engine.stale_client_policy,
            payload: PayloadPolicy {
                allow_unknown_sections: engine.allow_unknown_sections,
                max_depth: engine.max_section_depth,
            },
        }
    }
}

/// Draft state returned to callers
///
/// `completed_steps`, `percentage` and `step_errors` are always recomputed
/// from `document`; values a client may have sent are never consulted.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftSummary {
    pub id: Uuid,
    pub tenant_id: Option<String>,
    pub status: DraftStatus,
    pub document: Document,
    pub completed_steps: BTreeSet<String>,
    pub percentage: u8,
    /// Required steps still blocking publish
    pub missing_required: Vec<String>,
    /// Why each incomplete applicable step is incomplete, keyed by step id
    pub step_errors: BTreeMap<String, Vec<FieldError>>,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DraftSummary {
    fn new(record: DraftRecord, completion: Completion) -> Self {
        Self {
            id: record.id,
            tenant_id: record.tenant_id,
            status: record.status,
            document: record.document,
            completed_steps: completion.completed_steps,
            percentage: completion.percentage,
            missing_required: completion.missing_required,
            step_errors: completion.step_errors,
            version: record.version,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

/// What one pass of the commit loop decided to do with the loaded draft
enum Plan {
    Write(DraftUpdate, Completion),
    /// Nothing to write; return the draft as loaded
    Unchanged(Completion),
}

struct Committed {
    summary: DraftSummary,
    attempts: u32,
    written: bool,
}

pub struct DraftReconciler {
    store: Arc<dyn DocumentStore>,
    tracker: CompletionTracker,
    audit: Arc<dyn AuditSink>,
    settings: ReconcilerSettings,
}

impl DraftReconciler {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        catalog: Arc<StepCatalog>,
        audit: Arc<dyn AuditSink>,
        settings: ReconcilerSettings,
    ) -> Self {
        Self {
            store,
            tracker: CompletionTracker::new(catalog),
            audit,
            settings,
        }
    }

    pub fn catalog(&self) -> &StepCatalog {
        self.tracker.catalog()
    }

    pub fn settings(&self) -> &ReconcilerSettings {
        &self.settings
    }

    pub fn store_backend(&self) -> &'static str {
        self.store.backend_name()
    }

    /// Create an empty draft at version 0
    pub async fn create_draft(&self, tenant_id: Option<&str>) -> Result<DraftSummary> {
        let record = self.store.create(tenant_id).await?;

        info!(draft_id = %record.id, tenant_id = ?record.tenant_id, "Draft created");
        self.audit.record(DraftEvent::DraftCreated {
            draft_id: record.id,
            tenant_id: record.tenant_id.clone(),
            timestamp: time::now(),
        });

        Ok(self.summarize(record))
    }

    pub async fn get_draft(&self, id: Uuid) -> Result<DraftSummary> {
        let record = self.store.load(id).await?;
        Ok(self.summarize(record))
    }

    pub async fn list_drafts(&self, tenant_id: &str) -> Result<Vec<DraftSummary>> {
        let records = self.store.list_by_tenant(tenant_id).await?;
        Ok(records.into_iter().map(|r| self.summarize(r)).collect())
    }

    /// Merge a section payload into a draft
    ///
    /// `expected_version` is the version the caller last saw. A stale value
    /// is remerged or rejected according to the stale-client policy.
    pub async fn save_section(
        &self,
        id: Uuid,
        payload: Document,
        expected_version: Option<i64>,
    ) -> Result<DraftSummary> {
        validate_payload(&payload, self.catalog(), &self.settings.payload)?;
        let sections: Vec<String> = payload.keys().cloned().collect();

        let committed = self
            .commit(id, expected_version, |current| {
                if current.status == DraftStatus::Published {
                    return Err(DraftError::AlreadyPublished(id));
                }
                let document = merge(&current.document, &payload);
                let completion = self.tracker.evaluate(&document);
                let update = DraftUpdate {
                    document,
                    completed_steps: completion.completed_steps.clone(),
                    completion_percentage: completion.percentage,
                    status: DraftStatus::Draft,
                };
                Ok(Plan::Write(update, completion))
            })
            .await?;

        let summary = committed.summary;
        debug!(
            draft_id = %id,
            sections = ?sections,
            version = summary.version,
            percentage = summary.percentage,
            attempts = committed.attempts,
            "Sections saved"
        );
        self.audit.record(DraftEvent::SectionSaved {
            draft_id: id,
            sections,
            version: summary.version,
            percentage: summary.percentage,
            attempts: committed.attempts,
            timestamp: time::now(),
        });

        Ok(summary)
    }

    /// Move a draft to `published` once every applicable required step is complete
    ///
    /// Publishing an already published draft succeeds without writing.
    pub async fn publish(&self, id: Uuid, expected_version: Option<i64>) -> Result<DraftSummary> {
        let committed = self
            .commit(id, expected_version, |current| {
                let completion = self.tracker.evaluate(&current.document);
                if current.status == DraftStatus::Published {
                    return Ok(Plan::Unchanged(completion));
                }
                if !completion.is_publishable() {
                    return Err(DraftError::NotReady {
                        missing: completion.missing_required,
                    });
                }
                let update = DraftUpdate {
                    document: current.document.clone(),
                    completed_steps: completion.completed_steps.clone(),
                    completion_percentage: completion.percentage,
                    status: DraftStatus::Published,
                };
                Ok(Plan::Write(update, completion))
            })
            .await?;

        if committed.written {
            info!(draft_id = %id, version = committed.summary.version, "Draft published");
            self.audit.record(DraftEvent::DraftPublished {
                draft_id: id,
                version: committed.summary.version,
                timestamp: time::now(),
            });
        }

        Ok(committed.summary)
    }

    /// Load, plan and compare-and-swap until the write lands or the bound is hit
    async fn commit<F>(
        &self,
        id: Uuid,
        expected_version: Option<i64>,
        mut plan: F,
    ) -> Result<Committed>
    where
        F: FnMut(&DraftRecord) -> Result<Plan>,
    {
        let mut resolver = ConflictResolver::new(
            self.settings.max_conflict_attempts,
            self.settings.stale_client_policy,
        );
        let mut client_version = expected_version;

        loop {
            let current = self.store.load(id).await?;

            // The caller's version only matters against the first load
            if let Some(expected) = client_version.take() {
                if expected > current.version {
                    warn!(
                        draft_id = %id,
                        expected,
                        actual = current.version,
                        "Client version is ahead of the stored draft"
                    );
                } else if expected < current.version {
                    warn!(
                        draft_id = %id,
                        expected,
                        actual = current.version,
                        policy = ?self.settings.stale_client_policy,
                        "Stale client version"
                    );
                }
                if expected != current.version {
                    resolver.on_stale_client(expected, current.version)?;
                }
            }

            let (update, completion) = match plan(&current)? {
                Plan::Unchanged(completion) => {
                    return Ok(Committed {
                        summary: DraftSummary::new(current, completion),
                        attempts: resolver.attempts(),
                        written: false,
                    });
                }
                Plan::Write(update, completion) => (update, completion),
            };

            match self.store.replace(id, &update, current.version).await {
                Ok(record) => {
                    let attempts = resolver.attempts();
                    resolver.on_success();
                    return Ok(Committed {
                        summary: DraftSummary::new(record, completion),
                        attempts,
                        written: true,
                    });
                }
                Err(DraftError::VersionConflict { actual, .. }) => {
                    match resolver.on_persist_conflict() {
                        Resolution::Remerge => {
                            let attempt = resolver.attempts() - 1;
                            warn!(
                                draft_id = %id,
                                attempt,
                                loaded_version = current.version,
                                stored_version = ?actual,
                                "Concurrent write won; remerging"
                            );
                            self.audit.record(DraftEvent::ConflictRetried {
                                draft_id: id,
                                attempt,
                                timestamp: time::now(),
                            });
                        }
                        Resolution::GiveUp => {
                            let err = resolver.exceeded();
                            error!(draft_id = %id, error = %err, "Conflict retries exhausted");
                            if let DraftError::ConflictExceeded { attempts } = err {
                                self.audit.record(DraftEvent::ConflictExhausted {
                                    draft_id: id,
                                    attempts,
                                    timestamp: time::now(),
                                });
                            }
                            return Err(err);
                        }
                    }
                }
                Err(err) => return Err(err),
            }
        }
    }

    fn summarize(&self, record: DraftRecord) -> DraftSummary {
        let completion = self.tracker.evaluate(&record.document);
        DraftSummary::new(record, completion)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::NullAuditSink;
    use crate::store::MemoryDocumentStore;
    use serde_json::{json, Value};

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    fn reconciler() -> DraftReconciler {
        DraftReconciler::new(
            Arc::new(MemoryDocumentStore::new()),
            Arc::new(StepCatalog::property_wizard()),
            Arc::new(NullAuditSink),
            ReconcilerSettings::default(),
        )
    }

    #[tokio::test]
    async fn test_invalid_payload_leaves_draft_untouched() {
        let r = reconciler();
        let draft = r.create_draft(None).await.unwrap();
        r.save_section(draft.id, doc(json!({"location": {"city": "Rio"}})), None)
            .await
            .unwrap();

        let err = r
            .save_section(draft.id, doc(json!({"rooms": ["not", "an", "object"]})), None)
            .await
            .unwrap_err();
        assert_eq!(err.section(), Some("rooms"));

        let after = r.get_draft(draft.id).await.unwrap();
        assert_eq!(after.version, 1);
        assert!(!after.document.contains_key("rooms"));
    }

    #[tokio::test]
    async fn test_settings_from_engine_config() {
        let engine = EngineSettings {
            max_conflict_attempts: 5,
            stale_client_policy: StaleClientPolicy::Reject,
            allow_unknown_sections: false,
            max_section_depth: 8,
            ..Default::default()
        };
        let settings = ReconcilerSettings::from(&engine);
        assert_eq!(settings.max_conflict_attempts, 5);
        assert_eq!(settings.stale_client_policy, StaleClientPolicy::Reject);
        assert!(!settings.payload.allow_unknown_sections);
        assert_eq!(settings.payload.max_depth, 8);
    }
}
