//! PostgreSQL stores.
//!
//! Status and step type columns are TEXT; context, input and output are
//! JSONB. `ensure_schema` creates the tables if they are missing.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::{FromRow, PgPool};
use std::time::Duration;
use uuid::Uuid;

use crate::config::DatabaseConfig;
use crate::db::models::{Execution, StepExecution, StepDefinition, WorkflowDefinition};
use crate::db::store::{ExecutionStore, WorkflowDefinitionStore};
use crate::error::{AppError, AppResult};

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS workflow_definition (
        id UUID PRIMARY KEY,
        name TEXT NOT NULL UNIQUE,
        description TEXT,
        active BOOLEAN NOT NULL DEFAULT TRUE,
        steps JSONB NOT NULL DEFAULT '[]',
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS workflow_execution (
        id UUID PRIMARY KEY,
        workflow_id UUID NOT NULL,
        workflow_name TEXT NOT NULL,
        subject_type TEXT NOT NULL,
        subject_id TEXT NOT NULL,
        status TEXT NOT NULL,
        current_step INTEGER NOT NULL DEFAULT 0,
        total_steps INTEGER NOT NULL,
        context JSONB NOT NULL DEFAULT '{}',
        started_at TIMESTAMPTZ NOT NULL,
        completed_at TIMESTAMPTZ,
        error_message TEXT
    )
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS idx_workflow_execution_subject
        ON workflow_execution (subject_type, subject_id)
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS workflow_step_execution (
        id UUID PRIMARY KEY,
        execution_id UUID NOT NULL REFERENCES workflow_execution (id) ON DELETE CASCADE,
        step_number INTEGER NOT NULL,
        step_name TEXT NOT NULL,
        step_type TEXT NOT NULL,
        status TEXT NOT NULL,
        input_data JSONB NOT NULL DEFAULT '{}',
        output_data JSONB,
        started_at TIMESTAMPTZ,
        completed_at TIMESTAMPTZ,
        error_message TEXT,
        UNIQUE (execution_id, step_number)
    )
    "#,
];

/// Create a connection pool.
pub async fn connect_pool(config: &DatabaseConfig) -> AppResult<PgPool> {
    let options = config.connect_options()?;
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.acquire_timeout))
        .connect_with(options)
        .await?;

    tracing::info!(
        from_url = config.url.is_some(),
        max_connections = config.max_connections,
        "Database connection pool created"
    );

    Ok(pool)
}

/// Create the workflow tables if they do not exist.
pub async fn ensure_schema(pool: &PgPool) -> AppResult<()> {
    for statement in SCHEMA {
        sqlx::query(*statement).execute(pool).await?;
    }
    tracing::debug!("Workflow schema ready");
    Ok(())
}

fn corrupt(what: &str, detail: impl std::fmt::Display) -> AppError {
    AppError::Internal(format!("Corrupt {} row: {}", what, detail))
}

#[derive(Debug, FromRow)]
struct DefinitionRow {
    id: Uuid,
    name: String,
    description: Option<String>,
    active: bool,
    steps: serde_json::Value,
    created_at: DateTime<Utc>,
}

impl TryFrom<DefinitionRow> for WorkflowDefinition {
    type Error = AppError;

    fn try_from(row: DefinitionRow) -> Result<Self, Self::Error> {
        let steps: Vec<StepDefinition> =
            serde_json::from_value(row.steps).map_err(|e| corrupt("workflow_definition", e))?;
        Ok(WorkflowDefinition {
            id: row.id,
            name: row.name,
            description: row.description,
            active: row.active,
            steps,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct ExecutionRow {
    id: Uuid,
    workflow_id: Uuid,
    workflow_name: String,
    subject_type: String,
    subject_id: String,
    status: String,
    current_step: i32,
    total_steps: i32,
    context: serde_json::Value,
    started_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
    error_message: Option<String>,
}

impl TryFrom<ExecutionRow> for Execution {
    type Error = AppError;

    fn try_from(row: ExecutionRow) -> Result<Self, Self::Error> {
        Ok(Execution {
            id: row.id,
            workflow_id: row.workflow_id,
            workflow_name: row.workflow_name,
            subject_type: row.subject_type,
            subject_id: row.subject_id,
            status: row.status.parse().map_err(|e| corrupt("workflow_execution", e))?,
            current_step: row.current_step,
            total_steps: row.total_steps,
            context: serde_json::from_value(row.context)
                .map_err(|e| corrupt("workflow_execution", e))?,
            started_at: row.started_at,
            completed_at: row.completed_at,
            error_message: row.error_message,
        })
    }
}

#[derive(Debug, FromRow)]
struct StepRow {
    id: Uuid,
    execution_id: Uuid,
    step_number: i32,
    step_name: String,
    step_type: String,
    status: String,
    input_data: serde_json::Value,
    output_data: Option<serde_json::Value>,
    started_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
    error_message: Option<String>,
}

impl TryFrom<StepRow> for StepExecution {
    type Error = AppError;

    fn try_from(row: StepRow) -> Result<Self, Self::Error> {
        Ok(StepExecution {
            id: row.id,
            execution_id: row.execution_id,
            step_number: row.step_number,
            step_name: row.step_name,
            step_type: row
                .step_type
                .parse()
                .map_err(|e| corrupt("workflow_step_execution", e))?,
            status: row
                .status
                .parse()
                .map_err(|e| corrupt("workflow_step_execution", e))?,
            input_data: row.input_data,
            output_data: row.output_data,
            started_at: row.started_at,
            completed_at: row.completed_at,
            error_message: row.error_message,
        })
    }
}

const EXECUTION_COLUMNS: &str = "id, workflow_id, workflow_name, subject_type, subject_id, status, \
     current_step, total_steps, context, started_at, completed_at, error_message";

const STEP_COLUMNS: &str = "id, execution_id, step_number, step_name, step_type, status, \
     input_data, output_data, started_at, completed_at, error_message";

/// Workflow definitions in `workflow_definition`.
#[derive(Clone)]
pub struct PgDefinitionStore {
    pool: PgPool,
}

impl PgDefinitionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl WorkflowDefinitionStore for PgDefinitionStore {
    async fn find_by_name(&self, name: &str) -> AppResult<Option<WorkflowDefinition>> {
        let row = sqlx::query_as::<_, DefinitionRow>(
            r#"
            SELECT id, name, description, active, steps, created_at
            FROM workflow_definition
            WHERE name = $1
            "#,
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        row.map(WorkflowDefinition::try_from).transpose()
    }

    async fn save(&self, definition: &WorkflowDefinition) -> AppResult<()> {
        let steps = serde_json::to_value(&definition.steps)?;
        sqlx::query(
            r#"
            INSERT INTO workflow_definition (id, name, description, active, steps, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (name) DO UPDATE
            SET description = EXCLUDED.description,
                active = EXCLUDED.active,
                steps = EXCLUDED.steps
            "#,
        )
        .bind(definition.id)
        .bind(&definition.name)
        .bind(&definition.description)
        .bind(definition.active)
        .bind(steps)
        .bind(definition.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn insert_if_absent(&self, definition: &WorkflowDefinition) -> AppResult<bool> {
        let steps = serde_json::to_value(&definition.steps)?;
        let result = sqlx::query(
            r#"
            INSERT INTO workflow_definition (id, name, description, active, steps, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (name) DO NOTHING
            "#,
        )
        .bind(definition.id)
        .bind(&definition.name)
        .bind(&definition.description)
        .bind(definition.active)
        .bind(steps)
        .bind(definition.created_at)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list(&self) -> AppResult<Vec<WorkflowDefinition>> {
        let rows = sqlx::query_as::<_, DefinitionRow>(
            r#"
            SELECT id, name, description, active, steps, created_at
            FROM workflow_definition
            ORDER BY name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(WorkflowDefinition::try_from).collect()
    }
}

/// Executions in `workflow_execution` and steps in `workflow_step_execution`.
#[derive(Clone)]
pub struct PgExecutionStore {
    pool: PgPool,
}

impl PgExecutionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Check if the database connection is healthy.
    pub async fn ping(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }
}

async fn upsert_execution<'e, E>(executor: E, execution: &Execution) -> AppResult<()>
where
    E: sqlx::Executor<'e, Database = sqlx::Postgres>,
{
    let context = serde_json::to_value(&execution.context)?;
    sqlx::query(
        r#"
        INSERT INTO workflow_execution (
            id, workflow_id, workflow_name, subject_type, subject_id, status,
            current_step, total_steps, context, started_at, completed_at, error_message
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
        ON CONFLICT (id) DO UPDATE
        SET status = EXCLUDED.status,
            current_step = EXCLUDED.current_step,
            total_steps = EXCLUDED.total_steps,
            context = EXCLUDED.context,
            completed_at = EXCLUDED.completed_at,
            error_message = EXCLUDED.error_message
        "#,
    )
    .bind(execution.id)
    .bind(execution.workflow_id)
    .bind(&execution.workflow_name)
    .bind(&execution.subject_type)
    .bind(&execution.subject_id)
    .bind(execution.status.as_str())
    .bind(execution.current_step)
    .bind(execution.total_steps)
    .bind(context)
    .bind(execution.started_at)
    .bind(execution.completed_at)
    .bind(&execution.error_message)
    .execute(executor)
    .await?;
    Ok(())
}

async fn upsert_step<'e, E>(executor: E, step: &StepExecution) -> AppResult<()>
where
    E: sqlx::Executor<'e, Database = sqlx::Postgres>,
{
    sqlx::query(
        r#"
        INSERT INTO workflow_step_execution (
            id, execution_id, step_number, step_name, step_type, status,
            input_data, output_data, started_at, completed_at, error_message
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        ON CONFLICT (id) DO UPDATE
        SET status = EXCLUDED.status,
            output_data = EXCLUDED.output_data,
            started_at = EXCLUDED.started_at,
            completed_at = EXCLUDED.completed_at,
            error_message = EXCLUDED.error_message
        "#,
    )
    .bind(step.id)
    .bind(step.execution_id)
    .bind(step.step_number)
    .bind(&step.step_name)
    .bind(step.step_type.as_str())
    .bind(step.status.as_str())
    .bind(&step.input_data)
    .bind(&step.output_data)
    .bind(step.started_at)
    .bind(step.completed_at)
    .bind(&step.error_message)
    .execute(executor)
    .await?;
    Ok(())
}

#[async_trait]
impl ExecutionStore for PgExecutionStore {
    async fn create_execution(
        &self,
        execution: &Execution,
        steps: &[StepExecution],
    ) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;
        upsert_execution(&mut *tx, execution).await?;
        for step in steps {
            upsert_step(&mut *tx, step).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn save_execution(&self, execution: &Execution) -> AppResult<()> {
        upsert_execution(&self.pool, execution).await
    }

    async fn find_execution(&self, id: Uuid) -> AppResult<Option<Execution>> {
        let row = sqlx::query_as::<_, ExecutionRow>(&format!(
            "SELECT {} FROM workflow_execution WHERE id = $1",
            EXECUTION_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Execution::try_from).transpose()
    }

    async fn delete_execution(&self, id: Uuid) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM workflow_execution WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn find_by_subject(
        &self,
        subject_type: &str,
        subject_id: &str,
    ) -> AppResult<Vec<Execution>> {
        let rows = sqlx::query_as::<_, ExecutionRow>(&format!(
            "SELECT {} FROM workflow_execution \
             WHERE subject_type = $1 AND subject_id = $2 \
             ORDER BY started_at DESC",
            EXECUTION_COLUMNS
        ))
        .bind(subject_type)
        .bind(subject_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Execution::try_from).collect()
    }

    async fn save_step(&self, step: &StepExecution) -> AppResult<()> {
        upsert_step(&self.pool, step).await
    }

    async fn find_step(&self, id: Uuid) -> AppResult<Option<StepExecution>> {
        let row = sqlx::query_as::<_, StepRow>(&format!(
            "SELECT {} FROM workflow_step_execution WHERE id = $1",
            STEP_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(StepExecution::try_from).transpose()
    }

    async fn delete_step(&self, id: Uuid) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM workflow_step_execution WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn find_steps_by_execution_id_order_by_step_number(
        &self,
        execution_id: Uuid,
    ) -> AppResult<Vec<StepExecution>> {
        let rows = sqlx::query_as::<_, StepRow>(&format!(
            "SELECT {} FROM workflow_step_execution \
             WHERE execution_id = $1 \
             ORDER BY step_number",
            STEP_COLUMNS
        ))
        .bind(execution_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(StepExecution::try_from).collect()
    }

    async fn reset_steps_to_pending(&self, execution_id: Uuid) -> AppResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE workflow_step_execution
            SET status = 'pending',
                output_data = NULL,
                started_at = NULL,
                completed_at = NULL,
                error_message = NULL
            WHERE execution_id = $1
            "#,
        )
        .bind(execution_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}
