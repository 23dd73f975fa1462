//! Help desk ticket action.

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;

use super::{config_str_or_empty, now_rfc3339};
use crate::context::{get_str, WorkflowContext};
use crate::error::ActionError;
use crate::registry::{ActionConfig, ActionHandler, ActionKind, ActionOutput};

/// Opens a ticket with a synthetic `TICKET-<millis>` id. Never fails.
///
/// Config keys: `queue`, `priority`, `subject`, `description`.
#[derive(Debug, Default)]
pub struct CreateTicketAction;

impl CreateTicketAction {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ActionHandler for CreateTicketAction {
    fn kind(&self) -> ActionKind {
        ActionKind::CreateTicket
    }

    async fn execute(
        &self,
        config: &ActionConfig,
        context: &WorkflowContext,
    ) -> Result<ActionOutput, ActionError> {
        let queue = config_str_or_empty(config, "queue");
        let priority = config_str_or_empty(config, "priority");
        let subject = config_str_or_empty(config, "subject");
        let description = config_str_or_empty(config, "description");
        let customer_id = get_str(context, "customer_id");

        let ticket_id = format!("TICKET-{}", Utc::now().timestamp_millis());

        tracing::info!(
            ticket_id = %ticket_id,
            queue = %queue,
            priority = %priority,
            customer_id = ?customer_id,
            "Created ticket"
        );

        let mut out = ActionOutput::new();
        out.insert("status".to_string(), Value::from("success"));
        out.insert("ticket_id".to_string(), Value::from(ticket_id));
        out.insert("queue".to_string(), Value::from(queue));
        out.insert("priority".to_string(), Value::from(priority));
        out.insert("subject".to_string(), Value::from(subject));
        out.insert("description".to_string(), Value::from(description));
        out.insert("customer_id".to_string(), Value::from(customer_id));
        out.insert("created_at".to_string(), Value::from(now_rfc3339()));
        Ok(out)
    }
}
