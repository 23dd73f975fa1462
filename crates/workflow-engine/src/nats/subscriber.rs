//! Domain event subscriber.

use std::sync::Arc;

use futures::stream::{select_all, StreamExt};

use crate::error::{AppError, AppResult};
use crate::trigger::{RouteOutcome, TriggerRouter, TOPICS};

/// Subscribes to every event topic with core NATS and routes each message.
///
/// Delivery is at most once: failures are logged by the router and the
/// message is considered handled.
pub struct EventSubscriber {
    client: Arc<async_nats::Client>,
    router: TriggerRouter,
}

impl EventSubscriber {
    pub fn new(client: Arc<async_nats::Client>, router: TriggerRouter) -> Self {
        Self { client, router }
    }

    /// Subscribe to all topics and route messages until the subscriptions
    /// end.
    pub async fn run(self) -> AppResult<()> {
        let mut subscriptions = Vec::with_capacity(TOPICS.len());
        for topic in TOPICS {
            let subscriber = self
                .client
                .subscribe(topic)
                .await
                .map_err(|e| AppError::Nats(format!("Failed to subscribe to {}: {}", topic, e)))?;
            tracing::info!(topic = %topic, "Subscribed to domain events");
            subscriptions.push(subscriber);
        }

        let mut messages = select_all(subscriptions);
        while let Some(msg) = messages.next().await {
            let topic = msg.subject.to_string();
            match self.router.route_payload(&topic, &msg.payload).await {
                RouteOutcome::Triggered { execution_id, .. } => {
                    tracing::debug!(topic = %topic, execution_id = %execution_id, "Event handled");
                }
                outcome => {
                    tracing::debug!(topic = %topic, outcome = ?outcome, "Event produced no execution");
                }
            }
        }

        tracing::warn!("NATS event subscriptions ended");
        Ok(())
    }
}
