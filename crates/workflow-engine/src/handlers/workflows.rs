//! Workflow definition API handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use bss_workflow_actions::WorkflowContext;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::models::WorkflowDefinition;
use crate::error::AppResult;
use crate::state::AppState;
use crate::trigger::seed_context;

/// Request to trigger a workflow directly.
#[derive(Debug, Clone, Deserialize)]
pub struct TriggerRequest {
    pub subject_type: String,
    pub subject_id: String,
    #[serde(default)]
    pub context: WorkflowContext,
}

/// Response for a trigger request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerResponse {
    pub workflow: String,
    /// Absent when the workflow is inactive.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution_id: Option<Uuid>,
    pub triggered: bool,
}

/// List workflow definitions.
///
/// GET /api/workflows
pub async fn list(State(state): State<AppState>) -> AppResult<Json<Vec<WorkflowDefinition>>> {
    let definitions = state.controller.definitions().list().await?;
    Ok(Json(definitions))
}

/// Trigger a workflow for a subject.
///
/// POST /api/workflows/{name}/trigger
///
/// Returns `202 Accepted`; the run proceeds in the background.
pub async fn trigger(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(request): Json<TriggerRequest>,
) -> AppResult<(StatusCode, Json<TriggerResponse>)> {
    let context = seed_context(&request.subject_type, &request.subject_id, request.context);
    let execution_id = state
        .controller
        .trigger(&name, &request.subject_type, &request.subject_id, context)
        .await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(TriggerResponse {
            workflow: name,
            execution_id,
            triggered: execution_id.is_some(),
        }),
    ))
}
