//! Execution controller.
//!
//! Creates executions from workflow definitions, drives their steps in order
//! and aggregates step outcomes into the execution status. Runs are spawned
//! as one task per trigger or retry.
//!
//! Status rules:
//! - `completed` once every step is completed or skipped
//! - `failed` on the first failed step; later steps stay `pending`
//! - `cancelled` at any time; a cancelled execution starts no further steps
//!   and is never overwritten by completion or failure

use std::sync::Arc;

use bss_workflow_actions::WorkflowContext;
use chrono::Utc;
use serde::Serialize;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::db::models::{
    Execution, ExecutionStatus, StepExecution, StepStatus, WorkflowDefinition,
};
use crate::db::store::{ExecutionStore, WorkflowDefinitionStore};
use crate::engine::state::ExecutionProgress;
use crate::engine::step::StepDriver;
use crate::error::{AppError, AppResult};
use crate::result_ext::ResultExt;

/// An execution with its ordered steps and their aggregate.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionDetail {
    #[serde(flatten)]
    pub execution: Execution,
    pub steps: Vec<StepExecution>,
    pub progress: ExecutionProgress,
}

/// Drives workflow executions.
#[derive(Clone)]
pub struct ExecutionController {
    definitions: Arc<dyn WorkflowDefinitionStore>,
    executions: Arc<dyn ExecutionStore>,
    driver: StepDriver,
}

impl ExecutionController {
    pub fn new(
        definitions: Arc<dyn WorkflowDefinitionStore>,
        executions: Arc<dyn ExecutionStore>,
        driver: StepDriver,
    ) -> Self {
        Self {
            definitions,
            executions,
            driver,
        }
    }

    pub fn definitions(&self) -> &Arc<dyn WorkflowDefinitionStore> {
        &self.definitions
    }

    /// Start a run of the named workflow for a subject.
    ///
    /// Returns the new execution id, or `None` if the workflow is inactive.
    /// The run itself proceeds in the background.
    pub async fn trigger(
        &self,
        workflow_name: &str,
        subject_type: &str,
        subject_id: &str,
        context: WorkflowContext,
    ) -> AppResult<Option<Uuid>> {
        let definition = self
            .definitions
            .find_by_name(workflow_name)
            .await?
            .ok_or_else(|| AppError::WorkflowNotFound(workflow_name.to_string()))?;

        if !definition.active {
            tracing::warn!(workflow = %workflow_name, "Workflow is inactive, not triggering");
            return Ok(None);
        }

        let execution_id = self
            .create_execution(&definition, subject_type, subject_id, context)
            .await?;
        self.spawn_run(execution_id);
        Ok(Some(execution_id))
    }

    /// Persist a `running` execution and one `pending` step per definition
    /// step, atomically.
    pub async fn create_execution(
        &self,
        definition: &WorkflowDefinition,
        subject_type: &str,
        subject_id: &str,
        context: WorkflowContext,
    ) -> AppResult<Uuid> {
        let execution = Execution::start(definition, subject_type, subject_id, context);
        let steps: Vec<StepExecution> = definition
            .steps
            .iter()
            .enumerate()
            .map(|(number, step)| StepExecution::pending(execution.id, number as i32, step))
            .collect();

        self.executions.create_execution(&execution, &steps).await?;

        tracing::info!(
            execution_id = %execution.id,
            workflow = %definition.name,
            subject_type = %subject_type,
            subject_id = %subject_id,
            total_steps = execution.total_steps,
            "Created workflow execution"
        );

        Ok(execution.id)
    }

    /// Run an execution on a background task.
    pub fn spawn_run(&self, execution_id: Uuid) -> JoinHandle<()> {
        let controller = self.clone();
        tokio::spawn(async move {
            let _ = controller
                .run(execution_id)
                .await
                .log(format!("running execution {}", execution_id));
        })
    }

    /// Drive every pending step in order.
    ///
    /// A no-op for executions that are already completed, failed or
    /// cancelled. If the store fails mid-run the execution is marked failed
    /// and the error returned.
    pub async fn run(&self, execution_id: Uuid) -> AppResult<()> {
        let execution = self.load(execution_id).await?;
        if execution.status.is_terminal() {
            tracing::warn!(
                execution_id = %execution_id,
                status = %execution.status,
                "Execution already finished, not running"
            );
            return Ok(());
        }

        tracing::info!(
            execution_id = %execution_id,
            workflow = %execution.workflow_name,
            "Starting workflow execution"
        );

        if let Err(e) = self.run_steps(&execution).await {
            let _ = self
                .mark_failed(execution_id, &e.to_string())
                .await
                .log("marking execution failed");
            return Err(e);
        }
        Ok(())
    }

    async fn run_steps(&self, execution: &Execution) -> AppResult<()> {
        let steps = self
            .executions
            .find_steps_by_execution_id_order_by_step_number(execution.id)
            .await?;

        for step in steps {
            if step.status != StepStatus::Pending {
                continue;
            }

            if self.load(execution.id).await?.status == ExecutionStatus::Cancelled {
                tracing::info!(execution_id = %execution.id, "Execution cancelled, stopping");
                return Ok(());
            }

            let step = self.driver.drive(step, &execution.context).await?;

            if step.status == StepStatus::Failed {
                let message = step.error_message.clone().unwrap_or_default();
                let failure = AppError::StepFailure {
                    step: step.step_name.clone(),
                    message: message.clone(),
                };
                tracing::error!(execution_id = %execution.id, error = %failure, "Execution failed");
                self.mark_failed(execution.id, &message).await?;
                return Ok(());
            }

            self.update_current_step(execution.id).await?;
        }

        self.check_and_update_execution_status(execution.id).await
    }

    /// Mark an execution cancelled. Steps already running finish and persist
    /// their outcome; no further steps start.
    pub async fn cancel(&self, execution_id: Uuid) -> AppResult<Execution> {
        let mut execution = self.load(execution_id).await?;
        execution.status = ExecutionStatus::Cancelled;
        execution.completed_at = Some(Utc::now());
        self.executions.save_execution(&execution).await?;

        tracing::info!(execution_id = %execution_id, "Execution cancelled");
        Ok(execution)
    }

    /// Reset a failed execution and run it again in the background.
    pub async fn retry(&self, execution_id: Uuid) -> AppResult<Execution> {
        let execution = self.reset_for_retry(execution_id).await?;
        self.spawn_run(execution_id);
        Ok(execution)
    }

    /// Reset a failed execution and all its steps to their initial state.
    ///
    /// Anything but a failed execution is rejected with `InvalidState` and
    /// left untouched.
    pub async fn reset_for_retry(&self, execution_id: Uuid) -> AppResult<Execution> {
        let mut execution = self.load(execution_id).await?;
        if execution.status != ExecutionStatus::Failed {
            return Err(AppError::InvalidState(format!(
                "Only failed executions can be retried; execution {} is {}",
                execution_id, execution.status
            )));
        }

        // Steps are reset while the execution is still `failed`.
        let reset = self.executions.reset_steps_to_pending(execution_id).await?;

        execution.status = ExecutionStatus::Running;
        execution.current_step = 0;
        execution.error_message = None;
        execution.completed_at = None;
        self.executions.save_execution(&execution).await?;

        tracing::info!(execution_id = %execution_id, steps = reset, "Execution reset for retry");

        Ok(execution)
    }

    pub async fn get_execution_status(&self, execution_id: Uuid) -> AppResult<Execution> {
        self.load(execution_id).await
    }

    pub async fn get_executions_for_subject(
        &self,
        subject_type: &str,
        subject_id: &str,
    ) -> AppResult<Vec<Execution>> {
        self.executions.find_by_subject(subject_type, subject_id).await
    }

    pub async fn get_execution_detail(&self, execution_id: Uuid) -> AppResult<ExecutionDetail> {
        let execution = self.load(execution_id).await?;
        let steps = self
            .executions
            .find_steps_by_execution_id_order_by_step_number(execution_id)
            .await?;
        let progress = ExecutionProgress::from_steps(&steps);

        Ok(ExecutionDetail {
            execution,
            steps,
            progress,
        })
    }

    async fn load(&self, execution_id: Uuid) -> AppResult<Execution> {
        self.executions
            .find_execution(execution_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Execution not found: {}", execution_id)))
    }

    async fn progress(&self, execution_id: Uuid) -> AppResult<ExecutionProgress> {
        let steps = self
            .executions
            .find_steps_by_execution_id_order_by_step_number(execution_id)
            .await?;
        Ok(ExecutionProgress::from_steps(&steps))
    }

    async fn update_current_step(&self, execution_id: Uuid) -> AppResult<()> {
        let progress = self.progress(execution_id).await?;
        let mut execution = self.load(execution_id).await?;
        execution.current_step = progress.completed_steps as i32;
        self.executions.save_execution(&execution).await
    }

    async fn check_and_update_execution_status(&self, execution_id: Uuid) -> AppResult<()> {
        let progress = self.progress(execution_id).await?;
        if !progress.is_finished() {
            return Ok(());
        }

        let mut execution = self.load(execution_id).await?;
        if execution.status != ExecutionStatus::Running {
            return Ok(());
        }

        execution.status = ExecutionStatus::Completed;
        execution.completed_at = Some(Utc::now());
        execution.current_step = progress.completed_steps as i32;
        self.executions.save_execution(&execution).await?;

        tracing::info!(execution_id = %execution_id, "Workflow execution completed");
        Ok(())
    }

    async fn mark_failed(&self, execution_id: Uuid, message: &str) -> AppResult<()> {
        let mut execution = self.load(execution_id).await?;
        if execution.status == ExecutionStatus::Cancelled {
            tracing::warn!(
                execution_id = %execution_id,
                error = %message,
                "Step failed after cancellation, keeping cancelled status"
            );
            return Ok(());
        }

        execution.status = ExecutionStatus::Failed;
        execution.completed_at = Some(Utc::now());
        execution.error_message = Some(message.to_string());
        self.executions.save_execution(&execution).await?;

        tracing::error!(execution_id = %execution_id, error = %message, "Workflow execution failed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory::{MemoryDefinitionStore, MemoryExecutionStore};
    use crate::db::models::StepDefinition;
    use async_trait::async_trait;
    use bss_workflow_actions::{
        create_default_registry, ActionError, LogMailSender, MailMessage, MailSender,
        NotificationHub, SimulationSettings,
    };
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Fails the first `failures` sends, then delivers.
    struct FlakyMailer {
        failures: AtomicUsize,
    }

    impl FlakyMailer {
        fn new(failures: usize) -> Self {
            Self {
                failures: AtomicUsize::new(failures),
            }
        }
    }

    #[async_trait]
    impl MailSender for FlakyMailer {
        async fn send(&self, _message: &MailMessage) -> Result<(), ActionError> {
            let remaining = self.failures.load(Ordering::SeqCst);
            if remaining > 0 {
                self.failures.store(remaining - 1, Ordering::SeqCst);
                return Err(ActionError::Mail("smtp unavailable".to_string()));
            }
            Ok(())
        }
    }

    struct Harness {
        controller: ExecutionController,
        definitions: Arc<MemoryDefinitionStore>,
        executions: Arc<MemoryExecutionStore>,
    }

    fn harness_with_mailer(mailer: Arc<dyn MailSender>) -> Harness {
        let definitions = Arc::new(MemoryDefinitionStore::new());
        let executions = Arc::new(MemoryExecutionStore::new());
        let registry = create_default_registry(
            mailer,
            NotificationHub::new(),
            SimulationSettings::instant(),
        );
        let driver = StepDriver::new(executions.clone(), Arc::new(registry), 4);
        let controller = ExecutionController::new(definitions.clone(), executions.clone(), driver);
        Harness {
            controller,
            definitions,
            executions,
        }
    }

    fn harness() -> Harness {
        harness_with_mailer(Arc::new(LogMailSender))
    }

    fn onboarding() -> WorkflowDefinition {
        WorkflowDefinition::new(
            "customer_onboarding",
            vec![
                StepDefinition::condition("check_active", "{{status}} == ACTIVE"),
                StepDefinition::action(
                    "send_welcome",
                    "send_email",
                    json!({"to": "{{email}}", "subject": "Welcome", "template": "welcome_email"}),
                ),
            ],
        )
    }

    fn three_step_email() -> WorkflowDefinition {
        WorkflowDefinition::new(
            "three_steps",
            vec![
                StepDefinition::delay("wait", 0),
                StepDefinition::action("email", "send_email", json!({"to": "{{email}}"})),
                StepDefinition::action("ticket", "create_ticket", json!({"queue": "billing"})),
            ],
        )
    }

    fn context(pairs: &[(&str, Value)]) -> WorkflowContext {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    async fn create(h: &Harness, definition: &WorkflowDefinition, ctx: WorkflowContext) -> Uuid {
        h.controller
            .create_execution(definition, "customer", "c-1", ctx)
            .await
            .unwrap()
    }

    async fn wait_for_terminal(controller: &ExecutionController, id: Uuid) -> Execution {
        for _ in 0..500 {
            let execution = controller.get_execution_status(id).await.unwrap();
            if execution.status.is_terminal() {
                return execution;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("execution {} did not finish", id);
    }

    fn assert_status_invariants(detail: &ExecutionDetail) {
        let all_done = detail.steps.iter().all(|s| s.status.is_done());
        assert_eq!(
            detail.execution.status == ExecutionStatus::Completed,
            all_done,
            "completed iff every step is completed or skipped"
        );
        if detail.execution.status == ExecutionStatus::Failed {
            let first_failed = detail
                .steps
                .iter()
                .position(|s| s.status == StepStatus::Failed)
                .expect("a failed execution has a failed step");
            assert!(detail.steps[first_failed + 1..]
                .iter()
                .all(|s| s.status == StepStatus::Pending));
        }
        assert_eq!(
            detail.execution.current_step as usize,
            detail.progress.completed_steps
        );
    }

    #[tokio::test]
    async fn test_create_execution_copies_definition() {
        let h = harness();
        let definition = onboarding();
        let id = create(&h, &definition, context(&[("status", json!("ACTIVE"))])).await;

        let detail = h.controller.get_execution_detail(id).await.unwrap();
        assert_eq!(detail.execution.status, ExecutionStatus::Running);
        assert_eq!(detail.execution.current_step, 0);
        assert_eq!(detail.execution.total_steps, 2);
        assert_eq!(detail.execution.workflow_id, definition.id);
        assert_eq!(detail.steps.len(), 2);
        for (step, step_definition) in detail.steps.iter().zip(&definition.steps) {
            assert_eq!(step.status, StepStatus::Pending);
            assert_eq!(step.step_name, step_definition.name);
            assert_eq!(step.input_data, step_definition.config);
        }
    }

    #[tokio::test]
    async fn test_onboarding_active_customer_completes() {
        let h = harness();
        let id = create(
            &h,
            &onboarding(),
            context(&[("status", json!("ACTIVE")), ("email", json!("a@b.com"))]),
        )
        .await;

        h.controller.run(id).await.unwrap();

        let detail = h.controller.get_execution_detail(id).await.unwrap();
        assert_eq!(detail.execution.status, ExecutionStatus::Completed);
        assert!(detail.execution.completed_at.is_some());
        assert_eq!(detail.steps[0].status, StepStatus::Completed);
        assert_eq!(
            detail.steps[0].output_data,
            Some(json!({"condition_result": true}))
        );
        assert_eq!(detail.steps[1].status, StepStatus::Completed);
        let output = detail.steps[1].output_data.as_ref().unwrap();
        assert_eq!(output["status"], json!("success"));
        assert_eq!(output["to"], json!("a@b.com"));
        assert_eq!(detail.execution.current_step, 2);
        assert_status_invariants(&detail);
    }

    #[tokio::test]
    async fn test_onboarding_pending_customer_still_runs_every_step() {
        // The evaluator only looks for an operator, so "PENDING == ACTIVE" holds.
        let h = harness();
        let id = create(
            &h,
            &onboarding(),
            context(&[("status", json!("PENDING")), ("email", json!("a@b.com"))]),
        )
        .await;

        h.controller.run(id).await.unwrap();

        let detail = h.controller.get_execution_detail(id).await.unwrap();
        assert_eq!(detail.steps[0].status, StepStatus::Completed);
        assert_eq!(detail.steps[1].status, StepStatus::Completed);
        assert_eq!(detail.execution.status, ExecutionStatus::Completed);
        assert_status_invariants(&detail);
    }

    #[tokio::test]
    async fn test_skipped_condition_does_not_stop_later_steps() {
        let h = harness();
        let definition = WorkflowDefinition::new(
            "skip_then_email",
            vec![
                StepDefinition::condition("check", "{{status}} is ACTIVE"),
                StepDefinition::action("email", "send_email", json!({"to": "{{email}}"})),
            ],
        );
        let id = create(
            &h,
            &definition,
            context(&[("status", json!("PENDING")), ("email", json!("a@b.com"))]),
        )
        .await;

        h.controller.run(id).await.unwrap();

        let detail = h.controller.get_execution_detail(id).await.unwrap();
        assert_eq!(detail.steps[0].status, StepStatus::Skipped);
        assert_eq!(
            detail.steps[0].output_data,
            Some(json!({"condition_result": false, "reason": "condition_not_met"}))
        );
        assert_eq!(detail.steps[1].status, StepStatus::Completed);
        assert_eq!(detail.execution.status, ExecutionStatus::Completed);
        // Skipped steps do not count towards current_step.
        assert_eq!(detail.execution.current_step, 1);
        assert_status_invariants(&detail);
    }

    #[tokio::test]
    async fn test_single_delay_step_completes() {
        let h = harness();
        let definition =
            WorkflowDefinition::new("just_wait", vec![StepDefinition::delay("wait", 0)]);
        let id = create(&h, &definition, WorkflowContext::new()).await;

        h.controller.run(id).await.unwrap();

        let detail = h.controller.get_execution_detail(id).await.unwrap();
        assert_eq!(detail.execution.status, ExecutionStatus::Completed);
        assert_eq!(detail.steps[0].output_data, Some(json!({"delayed": true})));
    }

    #[tokio::test]
    async fn test_empty_workflow_completes() {
        let h = harness();
        let definition = WorkflowDefinition::new("nothing", vec![]);
        let id = create(&h, &definition, WorkflowContext::new()).await;

        h.controller.run(id).await.unwrap();

        let execution = h.controller.get_execution_status(id).await.unwrap();
        assert_eq!(execution.status, ExecutionStatus::Completed);
        assert_eq!(execution.total_steps, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_steps_run_strictly_in_order() {
        let h = harness();
        let definition = WorkflowDefinition::new(
            "wait_then_ticket",
            vec![
                StepDefinition::delay("wait", 60),
                StepDefinition::action("ticket", "create_ticket", json!({"queue": "support"})),
            ],
        );
        let id = create(&h, &definition, WorkflowContext::new()).await;

        h.controller.run(id).await.unwrap();

        let detail = h.controller.get_execution_detail(id).await.unwrap();
        assert_eq!(detail.execution.status, ExecutionStatus::Completed);
        let wait_done = detail.steps[0].completed_at.unwrap();
        let ticket_started = detail.steps[1].started_at.unwrap();
        assert!(wait_done <= ticket_started);
    }

    #[tokio::test]
    async fn test_action_failure_fails_execution_and_stops() {
        let h = harness_with_mailer(Arc::new(FlakyMailer::new(1)));
        let id = create(
            &h,
            &three_step_email(),
            context(&[("email", json!("a@b.com"))]),
        )
        .await;

        h.controller.run(id).await.unwrap();

        let detail = h.controller.get_execution_detail(id).await.unwrap();
        assert_eq!(detail.execution.status, ExecutionStatus::Failed);
        assert_eq!(
            detail.execution.error_message.as_deref(),
            Some("Failed to send email: smtp unavailable")
        );
        assert_eq!(detail.steps[0].status, StepStatus::Completed);
        assert_eq!(detail.steps[1].status, StepStatus::Failed);
        assert_eq!(detail.steps[2].status, StepStatus::Pending);
        assert_eq!(detail.progress.failed_steps, 1);
        assert_status_invariants(&detail);
    }

    #[tokio::test]
    async fn test_unknown_action_does_not_fail_execution() {
        let h = harness();
        let definition = WorkflowDefinition::new(
            "unknown_action",
            vec![StepDefinition::action("launch", "launch_rocket", json!({}))],
        );
        let id = create(&h, &definition, WorkflowContext::new()).await;

        h.controller.run(id).await.unwrap();

        let detail = h.controller.get_execution_detail(id).await.unwrap();
        assert_eq!(detail.execution.status, ExecutionStatus::Completed);
        assert_eq!(
            detail.steps[0].output_data.as_ref().unwrap()["status"],
            json!("failed")
        );
    }

    #[tokio::test]
    async fn test_run_is_idempotent_for_finished_executions() {
        let h = harness();
        let id = create(
            &h,
            &onboarding(),
            context(&[("status", json!("ACTIVE")), ("email", json!("a@b.com"))]),
        )
        .await;
        h.controller.run(id).await.unwrap();
        let before = h.controller.get_execution_detail(id).await.unwrap();

        h.controller.run(id).await.unwrap();

        let after = h.controller.get_execution_detail(id).await.unwrap();
        assert_eq!(before.execution, after.execution);
        assert_eq!(before.steps, after.steps);
    }

    #[tokio::test]
    async fn test_run_does_not_rerun_failed_execution() {
        let h = harness_with_mailer(Arc::new(FlakyMailer::new(1)));
        let id = create(&h, &three_step_email(), context(&[("email", json!("a@b.com"))])).await;
        h.controller.run(id).await.unwrap();
        let before = h.controller.get_execution_detail(id).await.unwrap();

        h.controller.run(id).await.unwrap();

        let after = h.controller.get_execution_detail(id).await.unwrap();
        assert_eq!(after.execution.status, ExecutionStatus::Failed);
        assert_eq!(before.steps, after.steps);
    }

    #[tokio::test]
    async fn test_reset_for_retry() {
        let h = harness_with_mailer(Arc::new(FlakyMailer::new(1)));
        let id = create(&h, &three_step_email(), context(&[("email", json!("a@b.com"))])).await;
        h.controller.run(id).await.unwrap();

        let execution = h.controller.reset_for_retry(id).await.unwrap();
        assert_eq!(execution.status, ExecutionStatus::Running);
        assert_eq!(execution.current_step, 0);
        assert!(execution.error_message.is_none());
        assert!(execution.completed_at.is_none());

        let detail = h.controller.get_execution_detail(id).await.unwrap();
        assert!(detail
            .steps
            .iter()
            .all(|s| s.status == StepStatus::Pending && s.output_data.is_none()));
    }

    /// Delegates to the in-memory store but refuses to reset steps.
    struct NoResetStore(Arc<MemoryExecutionStore>);

    #[async_trait]
    impl ExecutionStore for NoResetStore {
        async fn create_execution(
            &self,
            execution: &Execution,
            steps: &[StepExecution],
        ) -> AppResult<()> {
            self.0.create_execution(execution, steps).await
        }

        async fn save_execution(&self, execution: &Execution) -> AppResult<()> {
            self.0.save_execution(execution).await
        }

        async fn find_execution(&self, id: Uuid) -> AppResult<Option<Execution>> {
            self.0.find_execution(id).await
        }

        async fn delete_execution(&self, id: Uuid) -> AppResult<bool> {
            self.0.delete_execution(id).await
        }

        async fn find_by_subject(
            &self,
            subject_type: &str,
            subject_id: &str,
        ) -> AppResult<Vec<Execution>> {
            self.0.find_by_subject(subject_type, subject_id).await
        }

        async fn save_step(&self, step: &StepExecution) -> AppResult<()> {
            self.0.save_step(step).await
        }

        async fn find_step(&self, id: Uuid) -> AppResult<Option<StepExecution>> {
            self.0.find_step(id).await
        }

        async fn delete_step(&self, id: Uuid) -> AppResult<bool> {
            self.0.delete_step(id).await
        }

        async fn find_steps_by_execution_id_order_by_step_number(
            &self,
            execution_id: Uuid,
        ) -> AppResult<Vec<StepExecution>> {
            self.0
                .find_steps_by_execution_id_order_by_step_number(execution_id)
                .await
        }

        async fn reset_steps_to_pending(&self, _execution_id: Uuid) -> AppResult<u64> {
            Err(AppError::Internal("step reset unavailable".to_string()))
        }
    }

    #[tokio::test]
    async fn test_failed_step_reset_leaves_execution_retryable() {
        let h = harness_with_mailer(Arc::new(FlakyMailer::new(1)));
        let id = create(&h, &three_step_email(), context(&[("email", json!("a@b.com"))])).await;
        h.controller.run(id).await.unwrap();

        let store: Arc<dyn ExecutionStore> = Arc::new(NoResetStore(h.executions.clone()));
        let registry = create_default_registry(
            Arc::new(LogMailSender),
            NotificationHub::new(),
            SimulationSettings::instant(),
        );
        let driver = StepDriver::new(store.clone(), Arc::new(registry), 4);
        let controller = ExecutionController::new(h.definitions.clone(), store, driver);

        assert!(controller.reset_for_retry(id).await.is_err());
        let execution = controller.get_execution_status(id).await.unwrap();
        assert_eq!(execution.status, ExecutionStatus::Failed);

        // The original store can still retry it to completion.
        h.controller.retry(id).await.unwrap();
        let execution = wait_for_terminal(&h.controller, id).await;
        assert_eq!(execution.status, ExecutionStatus::Completed);
    }

    #[tokio::test]
    async fn test_retry_rejects_non_failed_execution() {
        let h = harness();
        let id = create(
            &h,
            &onboarding(),
            context(&[("status", json!("ACTIVE")), ("email", json!("a@b.com"))]),
        )
        .await;

        // Running
        let result = h.controller.retry(id).await;
        assert!(matches!(result, Err(AppError::InvalidState(_))));

        h.controller.run(id).await.unwrap();
        let before = h.controller.get_execution_detail(id).await.unwrap();

        // Completed
        let result = h.controller.reset_for_retry(id).await;
        assert!(matches!(result, Err(AppError::InvalidState(_))));

        let after = h.controller.get_execution_detail(id).await.unwrap();
        assert_eq!(before.execution, after.execution);
        assert_eq!(before.steps, after.steps);
    }

    #[tokio::test]
    async fn test_retry_runs_failed_execution_to_completion() {
        let h = harness_with_mailer(Arc::new(FlakyMailer::new(1)));
        let id = create(&h, &three_step_email(), context(&[("email", json!("a@b.com"))])).await;
        h.controller.run(id).await.unwrap();
        assert_eq!(
            h.controller.get_execution_status(id).await.unwrap().status,
            ExecutionStatus::Failed
        );

        h.controller.retry(id).await.unwrap();
        let execution = wait_for_terminal(&h.controller, id).await;

        assert_eq!(execution.status, ExecutionStatus::Completed);
        assert_eq!(execution.current_step, 3);
        assert!(execution.error_message.is_none());
    }

    #[tokio::test]
    async fn test_trigger_runs_in_background() {
        let h = harness();
        h.definitions.save(&onboarding()).await.unwrap();

        let id = h
            .controller
            .trigger(
                "customer_onboarding",
                "customer",
                "c-7",
                context(&[("status", json!("ACTIVE")), ("email", json!("a@b.com"))]),
            )
            .await
            .unwrap()
            .unwrap();

        let execution = wait_for_terminal(&h.controller, id).await;
        assert_eq!(execution.status, ExecutionStatus::Completed);

        let for_subject = h
            .controller
            .get_executions_for_subject("customer", "c-7")
            .await
            .unwrap();
        assert_eq!(for_subject.len(), 1);
        assert_eq!(for_subject[0].id, id);
    }

    #[tokio::test]
    async fn test_trigger_unknown_workflow() {
        let h = harness();
        let result = h
            .controller
            .trigger("no_such_workflow", "customer", "c-1", WorkflowContext::new())
            .await;

        assert!(matches!(result, Err(AppError::WorkflowNotFound(name)) if name == "no_such_workflow"));
        assert!(h
            .executions
            .find_by_subject("customer", "c-1")
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_trigger_inactive_workflow_creates_nothing() {
        let h = harness();
        let mut definition = onboarding();
        definition.active = false;
        h.definitions.save(&definition).await.unwrap();

        let result = h
            .controller
            .trigger("customer_onboarding", "customer", "c-1", WorkflowContext::new())
            .await
            .unwrap();

        assert!(result.is_none());
        assert!(h
            .executions
            .find_by_subject("customer", "c-1")
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_cancel_before_run_prevents_steps() {
        let h = harness();
        let id = create(
            &h,
            &onboarding(),
            context(&[("status", json!("ACTIVE")), ("email", json!("a@b.com"))]),
        )
        .await;

        let cancelled = h.controller.cancel(id).await.unwrap();
        assert_eq!(cancelled.status, ExecutionStatus::Cancelled);
        assert!(cancelled.completed_at.is_some());

        h.controller.run(id).await.unwrap();

        let detail = h.controller.get_execution_detail(id).await.unwrap();
        assert_eq!(detail.execution.status, ExecutionStatus::Cancelled);
        assert!(detail.steps.iter().all(|s| s.status == StepStatus::Pending));
    }

    #[tokio::test]
    async fn test_cancel_has_no_state_guard() {
        let h = harness();
        let id = create(&h, &onboarding(), context(&[("status", json!("ACTIVE")), ("email", json!("a@b.com"))])).await;
        h.controller.run(id).await.unwrap();

        h.controller.cancel(id).await.unwrap();
        let again = h.controller.cancel(id).await.unwrap();
        assert_eq!(again.status, ExecutionStatus::Cancelled);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_during_run_stops_after_current_step() {
        let h = harness();
        let definition = WorkflowDefinition::new(
            "long_wait",
            vec![
                StepDefinition::delay("wait", 60),
                StepDefinition::action("ticket", "create_ticket", json!({})),
            ],
        );
        let id = create(&h, &definition, WorkflowContext::new()).await;

        let run = h.controller.spawn_run(id);
        tokio::time::sleep(Duration::from_secs(1)).await;
        h.controller.cancel(id).await.unwrap();
        run.await.unwrap();

        let detail = h.controller.get_execution_detail(id).await.unwrap();
        assert_eq!(detail.execution.status, ExecutionStatus::Cancelled);
        // The in-flight delay still finishes and records its outcome.
        assert_eq!(detail.steps[0].status, StepStatus::Completed);
        assert_eq!(detail.steps[1].status, StepStatus::Pending);
    }

    #[tokio::test]
    async fn test_unknown_execution_is_not_found() {
        let h = harness();
        let missing = Uuid::new_v4();
        assert!(matches!(
            h.controller.get_execution_status(missing).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(h.controller.cancel(missing).await, Err(AppError::NotFound(_))));
        assert!(matches!(h.controller.retry(missing).await, Err(AppError::NotFound(_))));
        assert!(matches!(h.controller.run(missing).await, Err(AppError::NotFound(_))));
    }
}
