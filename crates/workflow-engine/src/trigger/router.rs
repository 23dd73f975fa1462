//! Maps inbound domain events to workflow triggers.
//!
//! | topic             | event type | workflow                  | subject              |
//! |-------------------|------------|---------------------------|----------------------|
//! | `customer.events` | CREATED    | `customer_onboarding`     | customer/customer_id |
//! | `payment.events`  | FAILED     | `payment_failed_recovery` | payment/payment_id   |
//! | `invoice.events`  | any        | none                      |                      |
//!
//! Routing never fails: every problem is logged and reported as an outcome.

use bss_workflow_actions::context::value_to_string;
use bss_workflow_actions::WorkflowContext;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::engine::controller::ExecutionController;
use crate::error::AppError;

pub const CUSTOMER_EVENTS: &str = "customer.events";
pub const PAYMENT_EVENTS: &str = "payment.events";
pub const INVOICE_EVENTS: &str = "invoice.events";

/// Topics the engine consumes.
pub const TOPICS: [&str; 3] = [CUSTOMER_EVENTS, PAYMENT_EVENTS, INVOICE_EVENTS];

pub const CUSTOMER_ONBOARDING: &str = "customer_onboarding";
pub const PAYMENT_FAILED_RECOVERY: &str = "payment_failed_recovery";

/// A domain event as published on the event topics.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DomainEvent {
    #[serde(default)]
    pub id: Option<String>,

    #[serde(rename = "type")]
    pub event_type: String,

    /// Everything else in the payload, e.g. `customer_id`, `email`, `status`.
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

/// What routing an event did.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RouteOutcome {
    Triggered {
        workflow: String,
        execution_id: Uuid,
    },
    /// The workflow exists but is inactive; nothing was created.
    Inactive { workflow: String },
    /// No workflow handles this event.
    Ignored { reason: String },
    /// Triggering failed; nothing was created.
    Failed { workflow: String, error: String },
}

/// A recognized event resolved to its workflow and subject.
#[derive(Debug, Clone, PartialEq)]
struct Route {
    workflow: &'static str,
    subject_type: &'static str,
    subject_id: String,
}

#[derive(Clone)]
pub struct TriggerRouter {
    controller: ExecutionController,
}

impl TriggerRouter {
    pub fn new(controller: ExecutionController) -> Self {
        Self { controller }
    }

    /// Route an event received on `topic`.
    pub async fn route(&self, topic: &str, event: DomainEvent) -> RouteOutcome {
        let route = match resolve(topic, &event) {
            Ok(route) => route,
            Err(reason) => {
                tracing::debug!(
                    topic = %topic,
                    event_type = %event.event_type,
                    reason = %reason,
                    "Event does not trigger a workflow"
                );
                return RouteOutcome::Ignored { reason };
            }
        };

        let context = build_context(route.subject_type, &route.subject_id, &event);
        let workflow = route.workflow.to_string();

        match self
            .controller
            .trigger(route.workflow, route.subject_type, &route.subject_id, context)
            .await
        {
            Ok(Some(execution_id)) => {
                tracing::info!(
                    topic = %topic,
                    workflow = %workflow,
                    execution_id = %execution_id,
                    subject_id = %route.subject_id,
                    "Workflow triggered by event"
                );
                RouteOutcome::Triggered {
                    workflow,
                    execution_id,
                }
            }
            Ok(None) => {
                let error = AppError::WorkflowInactive(workflow.clone());
                tracing::warn!(topic = %topic, error = %error, "Event not handled");
                RouteOutcome::Inactive { workflow }
            }
            Err(e) => {
                tracing::error!(
                    topic = %topic,
                    workflow = %workflow,
                    error = %e,
                    "Failed to trigger workflow for event"
                );
                RouteOutcome::Failed {
                    workflow,
                    error: e.to_string(),
                }
            }
        }
    }

    /// Decode a JSON payload and route it. Malformed payloads are ignored.
    pub async fn route_payload(&self, topic: &str, payload: &[u8]) -> RouteOutcome {
        match serde_json::from_slice::<DomainEvent>(payload) {
            Ok(event) => self.route(topic, event).await,
            Err(e) => {
                tracing::warn!(topic = %topic, error = %e, "Dropping malformed event payload");
                RouteOutcome::Ignored {
                    reason: format!("Malformed event payload: {}", e),
                }
            }
        }
    }
}

fn resolve(topic: &str, event: &DomainEvent) -> Result<Route, String> {
    let (workflow, subject_type, id_field) = match topic {
        CUSTOMER_EVENTS if event.event_type.eq_ignore_ascii_case("CREATED") => {
            (CUSTOMER_ONBOARDING, "customer", "customer_id")
        }
        PAYMENT_EVENTS if event.event_type.eq_ignore_ascii_case("FAILED") => {
            (PAYMENT_FAILED_RECOVERY, "payment", "payment_id")
        }
        CUSTOMER_EVENTS | PAYMENT_EVENTS | INVOICE_EVENTS => {
            return Err(format!(
                "No workflow for {} event on {}",
                event.event_type, topic
            ))
        }
        other => return Err(format!("Unknown topic: {}", other)),
    };

    let subject_id = match event.attributes.get(id_field) {
        None | Some(Value::Null) => String::new(),
        Some(value) => value_to_string(value),
    };
    if subject_id.is_empty() {
        return Err(format!("{} event has no {}", event.event_type, id_field));
    }

    Ok(Route {
        workflow,
        subject_type,
        subject_id,
    })
}

/// Seed an execution context from an event: every attribute plus
/// `entity_type`, `entity_id`, `triggered_at`, `event_type` and `event_id`.
pub fn build_context(subject_type: &str, subject_id: &str, event: &DomainEvent) -> WorkflowContext {
    let attributes = event
        .attributes
        .iter()
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();

    let mut context = seed_context(subject_type, subject_id, attributes);
    context.insert(
        "event_type".to_string(),
        Value::from(event.event_type.clone()),
    );
    if let Some(id) = &event.id {
        context.insert("event_id".to_string(), Value::from(id.clone()));
    }
    context
}

/// Add the standard `entity_type`, `entity_id` and `triggered_at` fields,
/// replacing any caller-supplied values.
pub fn seed_context(
    subject_type: &str,
    subject_id: &str,
    mut context: WorkflowContext,
) -> WorkflowContext {
    context.insert("entity_type".to_string(), Value::from(subject_type));
    context.insert("entity_id".to_string(), Value::from(subject_id));
    context.insert(
        "triggered_at".to_string(),
        Value::from(Utc::now().to_rfc3339()),
    );
    context
}
