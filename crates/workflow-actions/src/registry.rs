//! Action registry and dispatch.

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

use crate::context::WorkflowContext;
use crate::error::ActionError;
use crate::template::substitute_value;

/// Handler configuration taken from a step's `config` blob.
pub type ActionConfig = serde_json::Map<String, Value>;

/// Result map produced by an action.
pub type ActionOutput = serde_json::Map<String, Value>;

/// The closed set of actions a workflow step can name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    SendEmail,
    ProvisionService,
    CreateTicket,
    RetryPayment,
    SuspendServices,
    SendNotification,
}

impl ActionKind {
    pub const ALL: [ActionKind; 6] = [
        ActionKind::SendEmail,
        ActionKind::ProvisionService,
        ActionKind::CreateTicket,
        ActionKind::RetryPayment,
        ActionKind::SuspendServices,
        ActionKind::SendNotification,
    ];

    /// Wire name used in workflow definitions.
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::SendEmail => "send_email",
            ActionKind::ProvisionService => "provision_service",
            ActionKind::CreateTicket => "create_ticket",
            ActionKind::RetryPayment => "retry_payment",
            ActionKind::SuspendServices => "suspend_services",
            ActionKind::SendNotification => "send_notification",
        }
    }

    /// Parse a wire name. Unknown names yield `None`.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == name)
    }
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A side-effecting workflow action.
#[async_trait]
pub trait ActionHandler: Send + Sync {
    /// The action this handler implements.
    fn kind(&self) -> ActionKind;

    /// Execute with placeholder-substituted configuration.
    ///
    /// Returns handler-specific result fields. The registry adds `action` and
    /// `executed_at`.
    async fn execute(
        &self,
        config: &ActionConfig,
        context: &WorkflowContext,
    ) -> Result<ActionOutput, ActionError>;
}

/// Registry of action handlers, built once at startup.
pub struct ActionRegistry {
    handlers: HashMap<ActionKind, Arc<dyn ActionHandler>>,
}

impl ActionRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Register a handler, replacing any previous handler for the same kind.
    pub fn register<T: ActionHandler + 'static>(&mut self, handler: T) {
        self.handlers.insert(handler.kind(), Arc::new(handler));
    }

    /// Get a handler by kind.
    pub fn get(&self, kind: ActionKind) -> Option<Arc<dyn ActionHandler>> {
        self.handlers.get(&kind).cloned()
    }

    /// Check if a handler is registered for an action name.
    pub fn has(&self, name: &str) -> bool {
        ActionKind::from_name(name).is_some_and(|kind| self.handlers.contains_key(&kind))
    }

    /// List registered action names.
    pub fn list(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.handlers.keys().map(|k| k.as_str()).collect();
        names.sort_unstable();
        names
    }

    /// Dispatch an action by name.
    ///
    /// Unknown actions produce a `status: failed` result rather than an error.
    /// Handler errors propagate to the caller.
    pub async fn dispatch(
        &self,
        action: &str,
        config: &ActionConfig,
        context: &WorkflowContext,
    ) -> Result<ActionOutput, ActionError> {
        tracing::info!(action = %action, "Executing workflow action");

        let mut result = ActionOutput::new();
        result.insert("action".to_string(), Value::String(action.to_string()));
        result.insert(
            "executed_at".to_string(),
            Value::String(Utc::now().to_rfc3339()),
        );

        let handler = match ActionKind::from_name(action).and_then(|kind| self.get(kind)) {
            Some(handler) => handler,
            None => {
                tracing::warn!(action = %action, "Unknown workflow action");
                result.insert("status".to_string(), Value::String("failed".to_string()));
                result.insert(
                    "error".to_string(),
                    Value::String(format!("Unknown action: {}", action)),
                );
                return Ok(result);
            }
        };

        let config = match substitute_value(&Value::Object(config.clone()), context) {
            Value::Object(map) => map,
            _ => ActionConfig::new(),
        };

        let output = handler.execute(&config, context).await.map_err(|e| {
            tracing::error!(action = %action, error = %e, "Workflow action failed");
            e
        })?;

        result.extend(output);
        Ok(result)
    }
}

impl Default for ActionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ActionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionRegistry")
            .field("actions", &self.list())
            .finish()
    }
}
