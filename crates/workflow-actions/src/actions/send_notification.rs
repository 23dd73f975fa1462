//! Real-time notification action.

use async_trait::async_trait;
use serde_json::{json, Value};

use super::{config_str_or_empty, now_rfc3339};
use crate::context::{get_str, WorkflowContext};
use crate::error::ActionError;
use crate::notify::NotificationHub;
use crate::registry::{ActionConfig, ActionHandler, ActionKind, ActionOutput};

/// Broadcasts a notification of `type` carrying `message`. Never fails;
/// having no subscribers connected is not an error.
pub struct SendNotificationAction {
    hub: NotificationHub,
}

impl SendNotificationAction {
    pub fn new(hub: NotificationHub) -> Self {
        Self { hub }
    }
}

#[async_trait]
impl ActionHandler for SendNotificationAction {
    fn kind(&self) -> ActionKind {
        ActionKind::SendNotification
    }

    async fn execute(
        &self,
        config: &ActionConfig,
        context: &WorkflowContext,
    ) -> Result<ActionOutput, ActionError> {
        let notification_type = config_str_or_empty(config, "type");
        let message = config_str_or_empty(config, "message");
        let customer_id = get_str(context, "customer_id");

        let delivered = self
            .hub
            .broadcast(
                &notification_type,
                json!({
                    "customer_id": customer_id,
                    "message": message,
                }),
            )
            .await;

        tracing::info!(
            notification_type = %notification_type,
            customer_id = ?customer_id,
            delivered,
            "Notification sent"
        );

        let mut out = ActionOutput::new();
        out.insert("status".to_string(), Value::from("success"));
        out.insert("type".to_string(), Value::from(notification_type));
        out.insert("customer_id".to_string(), Value::from(customer_id));
        out.insert("message".to_string(), Value::from(message));
        out.insert("sent_at".to_string(), Value::from(now_rfc3339()));
        Ok(out)
    }
}
