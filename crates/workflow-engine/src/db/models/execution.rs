//! Execution and step execution models.

use bss_workflow_actions::WorkflowContext;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::workflow::{StepDefinition, StepType, WorkflowDefinition};

/// Execution status values.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl ExecutionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionStatus::Running => "running",
            ExecutionStatus::Completed => "completed",
            ExecutionStatus::Failed => "failed",
            ExecutionStatus::Cancelled => "cancelled",
        }
    }

    /// No step runs once an execution reaches a terminal status.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ExecutionStatus::Running)
    }
}

impl std::fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ExecutionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "running" => Ok(ExecutionStatus::Running),
            "completed" => Ok(ExecutionStatus::Completed),
            "failed" => Ok(ExecutionStatus::Failed),
            "cancelled" => Ok(ExecutionStatus::Cancelled),
            other => Err(format!("Unknown execution status: {}", other)),
        }
    }
}

/// Step status values.
///
/// `pending -> running -> {completed | failed | skipped}`
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Skipped,
}

impl StepStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StepStatus::Pending => "pending",
            StepStatus::Running => "running",
            StepStatus::Completed => "completed",
            StepStatus::Failed => "failed",
            StepStatus::Skipped => "skipped",
        }
    }

    /// Completed or skipped.
    pub fn is_done(&self) -> bool {
        matches!(self, StepStatus::Completed | StepStatus::Skipped)
    }
}

impl std::fmt::Display for StepStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for StepStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(StepStatus::Pending),
            "running" => Ok(StepStatus::Running),
            "completed" => Ok(StepStatus::Completed),
            "failed" => Ok(StepStatus::Failed),
            "skipped" => Ok(StepStatus::Skipped),
            other => Err(format!("Unknown step status: {}", other)),
        }
    }
}

/// One triggered run of a workflow.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Execution {
    pub id: Uuid,
    pub workflow_id: Uuid,
    pub workflow_name: String,

    /// Subject entity type, e.g. "customer".
    pub subject_type: String,

    /// Subject entity id.
    pub subject_id: String,

    pub status: ExecutionStatus,

    /// Number of steps with status `completed`.
    pub current_step: i32,

    pub total_steps: i32,
    pub context: WorkflowContext,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
}

impl Execution {
    /// A fresh `running` execution of `definition`.
    pub fn start(
        definition: &WorkflowDefinition,
        subject_type: &str,
        subject_id: &str,
        context: WorkflowContext,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            workflow_id: definition.id,
            workflow_name: definition.name.clone(),
            subject_type: subject_type.to_string(),
            subject_id: subject_id.to_string(),
            status: ExecutionStatus::Running,
            current_step: 0,
            total_steps: definition.total_steps(),
            context,
            started_at: Utc::now(),
            completed_at: None,
            error_message: None,
        }
    }
}

/// One step instance within an execution.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StepExecution {
    pub id: Uuid,
    pub execution_id: Uuid,

    /// Index of the step in its definition; fixes execution order.
    pub step_number: i32,

    pub step_name: String,
    pub step_type: StepType,
    pub status: StepStatus,

    /// Copied verbatim from the definition's step config.
    pub input_data: serde_json::Value,

    pub output_data: Option<serde_json::Value>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
}

impl StepExecution {
    /// A `pending` step for the definition step at `step_number`.
    pub fn pending(execution_id: Uuid, step_number: i32, definition: &StepDefinition) -> Self {
        Self {
            id: Uuid::new_v4(),
            execution_id,
            step_number,
            step_name: definition.name.clone(),
            step_type: definition.step_type,
            status: StepStatus::Pending,
            input_data: definition.config.clone(),
            output_data: None,
            started_at: None,
            completed_at: None,
            error_message: None,
        }
    }

    /// Back to `pending`, keeping the input.
    pub fn reset(&mut self) {
        self.status = StepStatus::Pending;
        self.output_data = None;
        self.started_at = None;
        self.completed_at = None;
        self.error_message = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_status_parsing() {
        assert_eq!("FAILED".parse::<ExecutionStatus>(), Ok(ExecutionStatus::Failed));
        assert_eq!("skipped".parse::<StepStatus>(), Ok(StepStatus::Skipped));
        assert!("paused".parse::<ExecutionStatus>().is_err());
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(!ExecutionStatus::Running.is_terminal());
        assert!(ExecutionStatus::Completed.is_terminal());
        assert!(ExecutionStatus::Failed.is_terminal());
        assert!(ExecutionStatus::Cancelled.is_terminal());
    }

    #[test]
    fn test_start_and_pending_steps() {
        let definition = WorkflowDefinition::new(
            "payment_failed_recovery",
            vec![
                StepDefinition::delay("wait", 0),
                StepDefinition::action("retry", "retry_payment", json!({})),
            ],
        );

        let execution = Execution::start(&definition, "payment", "p-1", WorkflowContext::new());
        assert_eq!(execution.status, ExecutionStatus::Running);
        assert_eq!(execution.total_steps, 2);
        assert_eq!(execution.current_step, 0);
        assert_eq!(execution.workflow_id, definition.id);

        let step = StepExecution::pending(execution.id, 1, &definition.steps[1]);
        assert_eq!(step.status, StepStatus::Pending);
        assert_eq!(step.step_type, StepType::Action);
        assert_eq!(step.input_data["action"], json!("retry_payment"));
    }

    #[test]
    fn test_step_reset_keeps_input() {
        let definition = StepDefinition::delay("wait", 3);
        let mut step = StepExecution::pending(Uuid::new_v4(), 0, &definition);
        step.status = StepStatus::Failed;
        step.error_message = Some("boom".to_string());
        step.output_data = Some(json!({"x": 1}));
        step.started_at = Some(Utc::now());

        step.reset();

        assert_eq!(step.status, StepStatus::Pending);
        assert!(step.error_message.is_none());
        assert!(step.output_data.is_none());
        assert!(step.started_at.is_none());
        assert_eq!(step.input_data, json!({"delay_seconds": 3}));
    }
}
