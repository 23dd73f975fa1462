//! Execution management API handlers.
//!
//! Handles status, subject lookup, cancellation and retry of executions.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::db::models::Execution;
use crate::engine::ExecutionDetail;
use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// Query parameters for listing executions of a subject.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubjectQuery {
    pub subject_type: Option<String>,
    pub subject_id: Option<String>,
}

/// List executions for a subject, most recent first.
///
/// GET /api/executions?subject_type=customer&subject_id=...
pub async fn list_for_subject(
    State(state): State<AppState>,
    Query(query): Query<SubjectQuery>,
) -> AppResult<Json<Vec<Execution>>> {
    let (subject_type, subject_id) = match (query.subject_type, query.subject_id) {
        (Some(subject_type), Some(subject_id)) => (subject_type, subject_id),
        _ => {
            return Err(AppError::Validation(
                "subject_type and subject_id are required".to_string(),
            ))
        }
    };

    let executions = state
        .controller
        .get_executions_for_subject(&subject_type, &subject_id)
        .await?;
    Ok(Json(executions))
}

/// Get an execution with its steps and progress.
///
/// GET /api/executions/{execution_id}
pub async fn get(
    State(state): State<AppState>,
    Path(execution_id): Path<Uuid>,
) -> AppResult<Json<ExecutionDetail>> {
    let detail = state.controller.get_execution_detail(execution_id).await?;
    Ok(Json(detail))
}

/// Cancel an execution.
///
/// POST /api/executions/{execution_id}/cancel
pub async fn cancel(
    State(state): State<AppState>,
    Path(execution_id): Path<Uuid>,
) -> AppResult<Json<Execution>> {
    let execution = state.controller.cancel(execution_id).await?;
    Ok(Json(execution))
}

/// Retry a failed execution.
///
/// POST /api/executions/{execution_id}/retry
///
/// `409 Conflict` unless the execution has failed.
pub async fn retry(
    State(state): State<AppState>,
    Path(execution_id): Path<Uuid>,
) -> AppResult<(StatusCode, Json<Execution>)> {
    let execution = state.controller.retry(execution_id).await?;
    Ok((StatusCode::ACCEPTED, Json(execution)))
}
