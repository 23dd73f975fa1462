//! Step driver.
//!
//! Runs one step record through `pending -> running -> {completed | failed |
//! skipped}`, persisting each transition. Delay and action bodies run on the
//! bounded worker pool; the driver waits for them before returning, so the
//! caller sees the step's terminal state. Condition steps run inline.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use bss_workflow_actions::{ActionConfig, ActionRegistry, WorkflowContext};
use chrono::Utc;
use serde_json::{json, Value};
use tokio::sync::Semaphore;

use crate::db::models::{StepExecution, StepStatus, StepType};
use crate::db::store::ExecutionStore;
use crate::engine::evaluator::ConditionEvaluator;
use crate::error::{AppError, AppResult};

/// A step's input decoded by step type.
#[derive(Debug, Clone, PartialEq)]
pub enum StepSpec {
    Delay { seconds: u64 },
    Action { action: String, config: ActionConfig },
    Condition { expression: String },
}

impl StepSpec {
    /// Decode the persisted input of a step of the given type.
    ///
    /// - delay: `delay_seconds`, a non-negative integer, default 0
    /// - action: `action` (required) and `config` (object, default empty)
    /// - condition: `condition`, default empty (which evaluates false)
    pub fn decode(step_type: StepType, input: &Value) -> AppResult<Self> {
        match step_type {
            StepType::Delay => {
                let seconds = match input.get("delay_seconds") {
                    None | Some(Value::Null) => 0,
                    Some(value) => value.as_u64().ok_or_else(|| {
                        AppError::Validation(format!(
                            "delay_seconds must be a non-negative integer, got {}",
                            value
                        ))
                    })?,
                };
                Ok(StepSpec::Delay { seconds })
            }
            StepType::Action => {
                let action = input
                    .get("action")
                    .and_then(Value::as_str)
                    .ok_or_else(|| {
                        AppError::Validation("Action step has no 'action' name".to_string())
                    })?
                    .to_string();
                let config = match input.get("config") {
                    None | Some(Value::Null) => ActionConfig::new(),
                    Some(Value::Object(map)) => map.clone(),
                    Some(other) => {
                        return Err(AppError::Validation(format!(
                            "Action config must be an object, got {}",
                            other
                        )))
                    }
                };
                Ok(StepSpec::Action { action, config })
            }
            StepType::Condition => Ok(StepSpec::Condition {
                expression: input
                    .get("condition")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
            }),
        }
    }
}

/// Terminal result of running a step body.
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    Completed(Value),
    Skipped(Value),
    Failed(String),
}

impl StepOutcome {
    pub fn status(&self) -> StepStatus {
        match self {
            StepOutcome::Completed(_) => StepStatus::Completed,
            StepOutcome::Skipped(_) => StepStatus::Skipped,
            StepOutcome::Failed(_) => StepStatus::Failed,
        }
    }
}

/// Executes steps against the action registry and condition evaluator.
#[derive(Clone)]
pub struct StepDriver {
    store: Arc<dyn ExecutionStore>,
    registry: Arc<ActionRegistry>,
    evaluator: ConditionEvaluator,
    workers: Arc<Semaphore>,
}

impl StepDriver {
    /// Create a driver whose worker pool runs at most `worker_pool_size`
    /// delay/action bodies at once.
    pub fn new(
        store: Arc<dyn ExecutionStore>,
        registry: Arc<ActionRegistry>,
        worker_pool_size: usize,
    ) -> Self {
        Self {
            store,
            registry,
            evaluator: ConditionEvaluator::new(),
            workers: Arc::new(Semaphore::new(worker_pool_size.max(1))),
        }
    }

    /// Drive a step to a terminal state and persist it.
    ///
    /// The step is saved as `running` before its body starts. Step failures
    /// are recorded on the returned step, not returned as errors; `Err` means
    /// the store failed.
    pub async fn drive(
        &self,
        mut step: StepExecution,
        context: &WorkflowContext,
    ) -> AppResult<StepExecution> {
        step.status = StepStatus::Running;
        step.started_at = Some(Utc::now());
        self.store.save_step(&step).await?;

        tracing::info!(
            execution_id = %step.execution_id,
            step = %step.step_name,
            step_type = %step.step_type,
            "Executing step"
        );

        let outcome = match StepSpec::decode(step.step_type, &step.input_data) {
            Ok(spec) => self.execute(spec, context).await,
            Err(e) => StepOutcome::Failed(e.to_string()),
        };

        step.status = outcome.status();
        step.completed_at = Some(Utc::now());
        match outcome {
            StepOutcome::Completed(output) => {
                tracing::info!(execution_id = %step.execution_id, step = %step.step_name, "Step completed");
                step.output_data = Some(output);
            }
            StepOutcome::Skipped(output) => {
                tracing::info!(execution_id = %step.execution_id, step = %step.step_name, "Step skipped");
                step.output_data = Some(output);
            }
            StepOutcome::Failed(message) => {
                tracing::error!(
                    execution_id = %step.execution_id,
                    step = %step.step_name,
                    error = %message,
                    "Step failed"
                );
                step.error_message = Some(message);
            }
        }

        self.store.save_step(&step).await?;
        Ok(step)
    }

    /// Run a decoded step body.
    pub async fn execute(&self, spec: StepSpec, context: &WorkflowContext) -> StepOutcome {
        match spec {
            StepSpec::Delay { seconds } => {
                tracing::debug!(seconds, "Delaying step");
                self.offload(async move {
                    if seconds > 0 {
                        tokio::time::sleep(Duration::from_secs(seconds)).await;
                    }
                    StepOutcome::Completed(json!({ "delayed": true }))
                })
                .await
            }
            StepSpec::Action { action, config } => {
                let registry = self.registry.clone();
                let context = context.clone();
                self.offload(async move {
                    match registry.dispatch(&action, &config, &context).await {
                        Ok(result) => StepOutcome::Completed(Value::Object(result)),
                        Err(e) => StepOutcome::Failed(e.to_string()),
                    }
                })
                .await
            }
            StepSpec::Condition { expression } => {
                if self.evaluator.evaluate(&expression, context) {
                    StepOutcome::Completed(json!({ "condition_result": true }))
                } else {
                    StepOutcome::Skipped(json!({
                        "condition_result": false,
                        "reason": "condition_not_met"
                    }))
                }
            }
        }
    }

    /// Run a body on the worker pool and wait for it.
    async fn offload<F>(&self, body: F) -> StepOutcome
    where
        F: Future<Output = StepOutcome> + Send + 'static,
    {
        let permit = match self.workers.clone().acquire_owned().await {
            Ok(permit) => permit,
            Err(_) => return StepOutcome::Failed("Step worker pool is closed".to_string()),
        };

        let handle = tokio::spawn(async move {
            // Keep permit until done
            let _permit = permit;
            body.await
        });

        match handle.await {
            Ok(outcome) => outcome,
            Err(e) => StepOutcome::Failed(format!("Step worker aborted: {}", e)),
        }
    }
}
