//! BSS Workflow Actions
//!
//! Side-effecting handlers dispatched by workflow action steps.
//!
//! This crate provides:
//! - Action registry keyed by the closed set of action names
//! - Built-in actions: send_email, provision_service, create_ticket,
//!   retry_payment, suspend_services, send_notification
//! - `{{key}}` placeholder substitution over the workflow context
//! - Notification hub for connected real-time subscribers

pub mod actions;
pub mod context;
pub mod error;
pub mod mail;
pub mod notify;
pub mod registry;
pub mod template;

pub use actions::{create_default_registry, SimulationSettings};
pub use context::WorkflowContext;
pub use error::ActionError;
pub use mail::{LogMailSender, MailMessage, MailSender};
pub use notify::{Notification, NotificationHub};
pub use registry::{ActionConfig, ActionHandler, ActionKind, ActionOutput, ActionRegistry};
