//! Built-in action handlers.
//!
//! - `send_email` - Render a template and hand it to the mail sender
//! - `provision_service` - Provision services for a customer
//! - `create_ticket` - Open a help desk ticket
//! - `retry_payment` - Retry a failed payment through the gateway
//! - `suspend_services` - Schedule a service suspension
//! - `send_notification` - Push a notification to connected subscribers

mod create_ticket;
mod provision_service;
mod retry_payment;
mod send_email;
mod send_notification;
mod suspend_services;

pub use self::create_ticket::CreateTicketAction;
pub use self::provision_service::ProvisionServiceAction;
pub use self::retry_payment::RetryPaymentAction;
pub use self::send_email::{email_body, SendEmailAction};
pub use self::send_notification::SendNotificationAction;
pub use self::suspend_services::SuspendServicesAction;

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use crate::context::value_to_string;
use crate::mail::MailSender;
use crate::notify::NotificationHub;
use crate::registry::{ActionConfig, ActionRegistry};

/// Tunables for the simulated external systems.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationSettings {
    /// Latency of the provisioning system.
    pub provision_delay: Duration,
    /// Latency of a payment gateway retry.
    pub payment_retry_delay: Duration,
    /// Probability in `[0, 1]` that a payment retry succeeds.
    pub payment_success_rate: f64,
}

impl SimulationSettings {
    /// Settings with no latency, for tests.
    pub fn instant() -> Self {
        Self {
            provision_delay: Duration::ZERO,
            payment_retry_delay: Duration::ZERO,
            ..Self::default()
        }
    }
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            provision_delay: Duration::from_millis(1000),
            payment_retry_delay: Duration::from_millis(500),
            payment_success_rate: 0.9,
        }
    }
}

/// Create a registry with every built-in action registered.
pub fn create_default_registry(
    mailer: Arc<dyn MailSender>,
    notifications: NotificationHub,
    simulation: SimulationSettings,
) -> ActionRegistry {
    let mut registry = ActionRegistry::new();

    registry.register(SendEmailAction::new(mailer));
    registry.register(ProvisionServiceAction::new(simulation.provision_delay));
    registry.register(CreateTicketAction::new());
    registry.register(RetryPaymentAction::new(
        simulation.payment_retry_delay,
        simulation.payment_success_rate,
    ));
    registry.register(SuspendServicesAction::new());
    registry.register(SendNotificationAction::new(notifications));

    registry
}

/// Read a config entry as a string; `null` and absent are `None`.
pub(crate) fn config_str(config: &ActionConfig, key: &str) -> Option<String> {
    match config.get(key) {
        None | Some(Value::Null) => None,
        Some(v) => Some(value_to_string(v)),
    }
}

/// Read a config entry as a string, defaulting to empty.
pub(crate) fn config_str_or_empty(config: &ActionConfig, key: &str) -> String {
    config_str(config, key).unwrap_or_default()
}

pub(crate) fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339()
}
