//! Workflow definition model.
//!
//! Definitions are static configuration; the engine only reads them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Kind of a workflow step.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum StepType {
    /// Wait for `delay_seconds`.
    Delay,
    /// Dispatch a named action.
    Action,
    /// Evaluate a condition; a false result skips the step.
    Condition,
}

impl StepType {
    pub fn as_str(&self) -> &'static str {
        match self {
            StepType::Delay => "delay",
            StepType::Action => "action",
            StepType::Condition => "condition",
        }
    }
}

impl std::fmt::Display for StepType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for StepType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "delay" => Ok(StepType::Delay),
            "action" => Ok(StepType::Action),
            "condition" => Ok(StepType::Condition),
            other => Err(format!("Unknown step type: {}", other)),
        }
    }
}

/// One step of a workflow definition.
///
/// `config` is copied verbatim into the step execution's input when an
/// execution is created.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StepDefinition {
    pub name: String,

    #[serde(rename = "type")]
    pub step_type: StepType,

    #[serde(default = "empty_object")]
    pub config: serde_json::Value,
}

fn empty_object() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}

/// A named, ordered sequence of steps.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkflowDefinition {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,

    /// Unique lookup key.
    pub name: String,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default = "default_active")]
    pub active: bool,

    #[serde(default)]
    pub steps: Vec<StepDefinition>,

    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

fn default_active() -> bool {
    true
}

impl WorkflowDefinition {
    /// Create an active definition.
    pub fn new(name: impl Into<String>, steps: Vec<StepDefinition>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            description: None,
            active: true,
            steps,
            created_at: Utc::now(),
        }
    }

    pub fn total_steps(&self) -> i32 {
        self.steps.len() as i32
    }
}

impl StepDefinition {
    pub fn new(name: impl Into<String>, step_type: StepType, config: serde_json::Value) -> Self {
        Self {
            name: name.into(),
            step_type,
            config,
        }
    }

    pub fn delay(name: impl Into<String>, delay_seconds: u64) -> Self {
        Self::new(
            name,
            StepType::Delay,
            serde_json::json!({ "delay_seconds": delay_seconds }),
        )
    }

    pub fn action(name: impl Into<String>, action: &str, config: serde_json::Value) -> Self {
        Self::new(
            name,
            StepType::Action,
            serde_json::json!({ "action": action, "config": config }),
        )
    }

    pub fn condition(name: impl Into<String>, condition: &str) -> Self {
        Self::new(
            name,
            StepType::Condition,
            serde_json::json!({ "condition": condition }),
        )
    }
}
