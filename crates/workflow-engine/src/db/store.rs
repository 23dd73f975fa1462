//! Store traits consumed by the execution controller.

use async_trait::async_trait;
use uuid::Uuid;

use crate::db::models::{Execution, StepExecution, WorkflowDefinition};
use crate::error::AppResult;

/// Read access to workflow definitions, plus seeding.
#[async_trait]
pub trait WorkflowDefinitionStore: Send + Sync {
    async fn find_by_name(&self, name: &str) -> AppResult<Option<WorkflowDefinition>>;

    /// Insert or replace the definition with the same name.
    async fn save(&self, definition: &WorkflowDefinition) -> AppResult<()>;

    /// Insert unless a definition with the same name exists. Returns whether
    /// it was inserted.
    async fn insert_if_absent(&self, definition: &WorkflowDefinition) -> AppResult<bool>;

    /// All definitions ordered by name.
    async fn list(&self) -> AppResult<Vec<WorkflowDefinition>>;
}

/// Execution and step execution rows.
#[async_trait]
pub trait ExecutionStore: Send + Sync {
    /// Persist an execution together with its steps. Either every row is
    /// written or none is.
    async fn create_execution(&self, execution: &Execution, steps: &[StepExecution])
        -> AppResult<()>;

    async fn save_execution(&self, execution: &Execution) -> AppResult<()>;

    async fn find_execution(&self, id: Uuid) -> AppResult<Option<Execution>>;

    /// Delete an execution and its steps. Returns whether it existed.
    async fn delete_execution(&self, id: Uuid) -> AppResult<bool>;

    /// Executions for a subject, most recent first.
    async fn find_by_subject(&self, subject_type: &str, subject_id: &str)
        -> AppResult<Vec<Execution>>;

    async fn save_step(&self, step: &StepExecution) -> AppResult<()>;

    async fn find_step(&self, id: Uuid) -> AppResult<Option<StepExecution>>;

    async fn delete_step(&self, id: Uuid) -> AppResult<bool>;

    async fn find_steps_by_execution_id_order_by_step_number(
        &self,
        execution_id: Uuid,
    ) -> AppResult<Vec<StepExecution>>;

    /// Reset every step of an execution to `pending`. Returns the number of
    /// steps reset.
    async fn reset_steps_to_pending(&self, execution_id: Uuid) -> AppResult<u64>;
}
