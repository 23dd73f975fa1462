//! Outbound mail collaborator.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ActionError;

/// A rendered email ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MailMessage {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Delivers rendered email.
#[async_trait]
pub trait MailSender: Send + Sync {
    /// Send a message. An error fails the calling action.
    async fn send(&self, message: &MailMessage) -> Result<(), ActionError>;
}

/// Mail sender that only records deliveries in the log.
#[derive(Debug, Clone, Default)]
pub struct LogMailSender;

#[async_trait]
impl MailSender for LogMailSender {
    async fn send(&self, message: &MailMessage) -> Result<(), ActionError> {
        if message.to.trim().is_empty() {
            return Err(ActionError::Mail("recipient address is empty".to_string()));
        }

        tracing::info!(
            to = %message.to,
            subject = %message.subject,
            body_len = message.body.len(),
            "Email delivered"
        );
        Ok(())
    }
}
