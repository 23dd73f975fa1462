//! Aggregation of step statuses into execution progress.

use serde::{Deserialize, Serialize};

use crate::db::models::{StepExecution, StepStatus};

/// Step counts for one execution.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionProgress {
    pub total_steps: usize,
    pub completed_steps: usize,
    pub skipped_steps: usize,
    pub failed_steps: usize,
    pub pending_steps: usize,
    pub running_steps: usize,
}

impl ExecutionProgress {
    pub fn from_steps(steps: &[StepExecution]) -> Self {
        steps.iter().fold(
            Self {
                total_steps: steps.len(),
                ..Self::default()
            },
            |mut progress, step| {
                match step.status {
                    StepStatus::Completed => progress.completed_steps += 1,
                    StepStatus::Skipped => progress.skipped_steps += 1,
                    StepStatus::Failed => progress.failed_steps += 1,
                    StepStatus::Pending => progress.pending_steps += 1,
                    StepStatus::Running => progress.running_steps += 1,
                }
                progress
            },
        )
    }

    /// Every step is completed or skipped. True for an empty workflow.
    pub fn is_finished(&self) -> bool {
        self.completed_steps + self.skipped_steps == self.total_steps
    }

    pub fn has_failure(&self) -> bool {
        self.failed_steps > 0
    }
}
