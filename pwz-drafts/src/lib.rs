//! pwz-drafts library - property wizard draft reconciliation
//!
//! Accepts partial section saves for long-lived multi-step drafts, deep-merges
//! them into the stored document without losing other sections, recomputes
//! step completion, and persists under an optimistic version check.

use std::sync::Arc;

use axum::Router;
use pwz_common::config::EngineSettings;
use pwz_common::EventBus;
use tower_http::trace::TraceLayer;

use crate::audit::{AuditSink, FanoutAuditSink, TracingAuditSink};
use crate::steps::{property_wizard_steps, StepCatalog};
use crate::store::DocumentStore;

pub mod api;
pub mod audit;
pub mod completion;
pub mod conflict;
pub mod document;
pub mod error;
pub mod merge;
pub mod reconciler;
pub mod retry;
pub mod steps;
pub mod store;
pub mod validate;

pub use error::{DraftError, Result};
pub use reconciler::{DraftReconciler, DraftSummary, ReconcilerSettings};

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub reconciler: Arc<DraftReconciler>,
    /// Bus the reconciler's audit sink publishes to; feeds `GET /events`
    pub events: EventBus,
}

impl AppState {
    pub fn new(reconciler: Arc<DraftReconciler>, events: EventBus) -> Self {
        Self { reconciler, events }
    }

    /// Wire a reconciler over `store` with the property wizard catalog
    ///
    /// Audit events go to a fresh `EventBus` and to the log. Fails if the
    /// step catalog does not validate.
    pub fn with_store(
        store: Arc<dyn DocumentStore>,
        engine: &EngineSettings,
    ) -> pwz_common::Result<Self> {
        let catalog = StepCatalog::try_new(property_wizard_steps())?;
        let events = EventBus::new(engine.event_bus_capacity);
        let audit = FanoutAuditSink::new(vec![
            Arc::new(events.clone()) as Arc<dyn AuditSink>,
            Arc::new(TracingAuditSink),
        ]);
        let reconciler = DraftReconciler::new(
            store,
            Arc::new(catalog),
            Arc::new(audit),
            ReconcilerSettings::from(engine),
        );
        Ok(Self::new(Arc::new(reconciler), events))
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::{get, post, put};

    Router::new()
        .route("/steps", get(api::list_steps))
        .route("/drafts", post(api::create_draft).get(api::list_drafts))
        .route("/drafts/:id", get(api::get_draft))
        .route("/drafts/:id/sections/:section", put(api::save_section))
        .route("/drafts/:id/publish", post(api::publish_draft))
        .route("/events", get(api::event_stream))
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
