//! Templated email action.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

use super::{config_str, config_str_or_empty, now_rfc3339};
use crate::context::{get_str, WorkflowContext};
use crate::error::ActionError;
use crate::mail::{MailMessage, MailSender};
use crate::registry::{ActionConfig, ActionHandler, ActionKind, ActionOutput};

/// Sends an email rendered from a named template.
///
/// Config keys: `to` (required), `subject`, `template`.
pub struct SendEmailAction {
    mailer: Arc<dyn MailSender>,
}

impl SendEmailAction {
    pub fn new(mailer: Arc<dyn MailSender>) -> Self {
        Self { mailer }
    }
}

/// Body text for a template name. Unknown templates get a generic message.
pub fn email_body(template: &str, context: &WorkflowContext) -> String {
    match template {
        "welcome_email" => format!(
            "Welcome to BSS! We're excited to have you as a customer.\n\n\
             Your customer ID: {}\n\n\
             Best regards,\nThe BSS Team",
            get_str(context, "customer_id").unwrap_or_default()
        ),
        "payment_failed" => "Dear Customer,\n\n\
             We were unable to process your recent payment.\n\n\
             Please update your payment information to avoid service interruption.\n\n\
             Best regards,\nThe BSS Team"
            .to_string(),
        _ => "Dear Customer,\n\nThank you for your business.\n\nBest regards,\nThe BSS Team"
            .to_string(),
    }
}

#[async_trait]
impl ActionHandler for SendEmailAction {
    fn kind(&self) -> ActionKind {
        ActionKind::SendEmail
    }

    async fn execute(
        &self,
        config: &ActionConfig,
        context: &WorkflowContext,
    ) -> Result<ActionOutput, ActionError> {
        let to = config_str(config, "to")
            .ok_or_else(|| ActionError::Configuration("send_email requires 'to'".to_string()))?;
        let subject = config_str_or_empty(config, "subject");
        let template = config_str_or_empty(config, "template");

        tracing::info!(to = %to, template = %template, "Sending email");

        let message = MailMessage {
            to: to.clone(),
            subject: subject.clone(),
            body: email_body(&template, context),
        };
        self.mailer.send(&message).await?;

        tracing::info!(to = %to, "Email sent successfully");

        let mut out = ActionOutput::new();
        out.insert("status".to_string(), Value::from("success"));
        out.insert("to".to_string(), Value::from(to));
        out.insert("subject".to_string(), Value::from(subject));
        out.insert("template".to_string(), Value::from(template));
        out.insert("sent_at".to_string(), Value::from(now_rfc3339()));
        Ok(out)
    }
}
