//! Workflow execution engine.
//!
//! - **Controller**: creates executions and drives them step by step
//! - **Step**: runs a single step record to its terminal state
//! - **Evaluator**: evaluates condition step expressions
//! - **State**: aggregates step statuses into execution progress

pub mod controller;
pub mod evaluator;
pub mod state;
pub mod step;

pub use controller::{ExecutionController, ExecutionDetail};
pub use evaluator::ConditionEvaluator;
pub use state::ExecutionProgress;
pub use step::{StepDriver, StepOutcome, StepSpec};
