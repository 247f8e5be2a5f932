//! Audit sinks for draft lifecycle events
//!
//! The reconciler records every save, conflict retry and publish through an
//! injected `AuditSink`. Recording never fails a save.

use pwz_common::{DraftEvent, EventBus};
use tracing::info;

pub trait AuditSink: Send + Sync {
    fn record(&self, event: DraftEvent);
}

impl AuditSink for EventBus {
    fn record(&self, event: DraftEvent) {
        self.emit_lossy(event);
    }
}

/// Writes each event as a structured log line
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn record(&self, event: DraftEvent) {
        info!(
            event = event.event_type(),
            draft_id = %event.draft_id(),
            "Draft event"
        );
    }
}

/// Discards every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NullAuditSink;

impl AuditSink for NullAuditSink {
    fn record(&self, _event: DraftEvent) {}
}

/// Sends each event to several sinks
pub struct FanoutAuditSink {
    sinks: Vec<std::sync::Arc<dyn AuditSink>>,
}

impl FanoutAuditSink {
    pub fn new(sinks: Vec<std::sync::Arc<dyn AuditSink>>) -> Self {
        Self { sinks }
    }
}

impl AuditSink for FanoutAuditSink {
    fn record(&self, event: DraftEvent) {
        for sink in &self.sinks {
            sink.record(event.clone());
        }
    }
}
