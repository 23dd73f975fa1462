//! Service provisioning action.

use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

use super::now_rfc3339;
use crate::context::{get_str, WorkflowContext};
use crate::error::ActionError;
use crate::registry::{ActionConfig, ActionHandler, ActionKind, ActionOutput};

/// Provisions the configured `services` for the context's customer.
///
/// The provisioning system is simulated by a fixed delay. Never fails.
pub struct ProvisionServiceAction {
    delay: Duration,
}

impl ProvisionServiceAction {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

#[async_trait]
impl ActionHandler for ProvisionServiceAction {
    fn kind(&self) -> ActionKind {
        ActionKind::ProvisionService
    }

    async fn execute(
        &self,
        config: &ActionConfig,
        context: &WorkflowContext,
    ) -> Result<ActionOutput, ActionError> {
        let services = match config.get("services") {
            Some(Value::Array(items)) => Value::Array(items.clone()),
            Some(Value::Null) | None => Value::Array(Vec::new()),
            Some(single) => Value::Array(vec![single.clone()]),
        };
        let customer_id = get_str(context, "customer_id");

        tracing::info!(
            services = %services,
            customer_id = ?customer_id,
            "Provisioning services"
        );

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let mut out = ActionOutput::new();
        out.insert("status".to_string(), Value::from("success"));
        out.insert("services".to_string(), services);
        out.insert("customer_id".to_string(), Value::from(customer_id));
        out.insert("provisioned_at".to_string(), Value::from(now_rfc3339()));
        Ok(out)
    }
}
