//! Step catalog endpoint

use axum::{extract::State, Json};
use serde::Serialize;

use crate::steps::StepDef;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct StepsResponse {
    pub total: usize,
    pub steps: Vec<StepDef>,
}

/// GET /steps
pub async fn list_steps(State(state): State<AppState>) -> Json<StepsResponse> {
    let catalog = state.reconciler.catalog();
    Json(StepsResponse {
        total: catalog.len(),
        steps: catalog.steps().to_vec(),
    })
}
