//! In-memory stores guarded by `tokio::sync::RwLock`.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::db::models::{Execution, StepExecution, WorkflowDefinition};
use crate::db::store::{ExecutionStore, WorkflowDefinitionStore};
use crate::error::{AppError, AppResult};

/// Workflow definitions keyed by name.
#[derive(Debug, Default)]
pub struct MemoryDefinitionStore {
    definitions: RwLock<HashMap<String, WorkflowDefinition>>,
}

impl MemoryDefinitionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl WorkflowDefinitionStore for MemoryDefinitionStore {
    async fn find_by_name(&self, name: &str) -> AppResult<Option<WorkflowDefinition>> {
        Ok(self.definitions.read().await.get(name).cloned())
    }

    async fn save(&self, definition: &WorkflowDefinition) -> AppResult<()> {
        self.definitions
            .write()
            .await
            .insert(definition.name.clone(), definition.clone());
        Ok(())
    }

    async fn insert_if_absent(&self, definition: &WorkflowDefinition) -> AppResult<bool> {
        let mut definitions = self.definitions.write().await;
        if definitions.contains_key(&definition.name) {
            return Ok(false);
        }
        definitions.insert(definition.name.clone(), definition.clone());
        Ok(true)
    }

    async fn list(&self) -> AppResult<Vec<WorkflowDefinition>> {
        let mut definitions: Vec<_> = self.definitions.read().await.values().cloned().collect();
        definitions.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(definitions)
    }
}

#[derive(Debug, Default)]
struct Tables {
    executions: HashMap<Uuid, Execution>,
    steps: HashMap<Uuid, StepExecution>,
}

/// Executions and steps in two maps behind one lock, so multi-row writes are
/// atomic.
#[derive(Debug, Default)]
pub struct MemoryExecutionStore {
    tables: RwLock<Tables>,
}

impl MemoryExecutionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ExecutionStore for MemoryExecutionStore {
    async fn create_execution(
        &self,
        execution: &Execution,
        steps: &[StepExecution],
    ) -> AppResult<()> {
        if let Some(step) = steps.iter().find(|s| s.execution_id != execution.id) {
            return Err(AppError::Validation(format!(
                "Step {} does not belong to execution {}",
                step.id, execution.id
            )));
        }

        let mut tables = self.tables.write().await;
        if tables.executions.contains_key(&execution.id) {
            return Err(AppError::Validation(format!(
                "Execution {} already exists",
                execution.id
            )));
        }
        tables.executions.insert(execution.id, execution.clone());
        for step in steps {
            tables.steps.insert(step.id, step.clone());
        }
        Ok(())
    }

    async fn save_execution(&self, execution: &Execution) -> AppResult<()> {
        self.tables
            .write()
            .await
            .executions
            .insert(execution.id, execution.clone());
        Ok(())
    }

    async fn find_execution(&self, id: Uuid) -> AppResult<Option<Execution>> {
        Ok(self.tables.read().await.executions.get(&id).cloned())
    }

    async fn delete_execution(&self, id: Uuid) -> AppResult<bool> {
        let mut tables = self.tables.write().await;
        let existed = tables.executions.remove(&id).is_some();
        tables.steps.retain(|_, step| step.execution_id != id);
        Ok(existed)
    }

    async fn find_by_subject(
        &self,
        subject_type: &str,
        subject_id: &str,
    ) -> AppResult<Vec<Execution>> {
        let tables = self.tables.read().await;
        let mut executions: Vec<_> = tables
            .executions
            .values()
            .filter(|e| e.subject_type == subject_type && e.subject_id == subject_id)
            .cloned()
            .collect();
        executions.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        Ok(executions)
    }

    async fn save_step(&self, step: &StepExecution) -> AppResult<()> {
        self.tables.write().await.steps.insert(step.id, step.clone());
        Ok(())
    }

    async fn find_step(&self, id: Uuid) -> AppResult<Option<StepExecution>> {
        Ok(self.tables.read().await.steps.get(&id).cloned())
    }

    async fn delete_step(&self, id: Uuid) -> AppResult<bool> {
        Ok(self.tables.write().await.steps.remove(&id).is_some())
    }

    async fn find_steps_by_execution_id_order_by_step_number(
        &self,
        execution_id: Uuid,
    ) -> AppResult<Vec<StepExecution>> {
        let tables = self.tables.read().await;
        let mut steps: Vec<_> = tables
            .steps
            .values()
            .filter(|s| s.execution_id == execution_id)
            .cloned()
            .collect();
        steps.sort_by_key(|s| s.step_number);
        Ok(steps)
    }

    async fn reset_steps_to_pending(&self, execution_id: Uuid) -> AppResult<u64> {
        let mut tables = self.tables.write().await;
        let mut reset = 0;
        for step in tables
            .steps
            .values_mut()
            .filter(|s| s.execution_id == execution_id)
        {
            step.reset();
            reset += 1;
        }
        Ok(reset)
    }
}
