//! Notification fan-out to locally connected subscribers.
//!
//! Each subscriber owns an unbounded channel. Broadcasting to an empty hub is
//! a no-op, and subscribers whose receiver was dropped are pruned on the next
//! broadcast.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, RwLock};
use uuid::Uuid;

/// A notification pushed to subscribers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub event_type: String,
    pub data: serde_json::Value,
    pub sent_at: DateTime<Utc>,
}

/// Sending half held by the hub for each subscriber.
pub type NotificationSender = mpsc::UnboundedSender<Notification>;

/// Receiving half handed to a subscriber.
pub type NotificationReceiver = mpsc::UnboundedReceiver<Notification>;

/// Fan-out hub for notifications.
#[derive(Clone, Default)]
pub struct NotificationHub {
    subscribers: Arc<RwLock<HashMap<String, NotificationSender>>>,
}

impl NotificationHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new subscriber and return its id and receiver.
    pub async fn subscribe(&self) -> (String, NotificationReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        let subscriber_id = Uuid::new_v4().to_string();

        let mut subscribers = self.subscribers.write().await;
        subscribers.insert(subscriber_id.clone(), tx);

        tracing::debug!(
            subscriber_id = %subscriber_id,
            total = subscribers.len(),
            "Notification subscriber registered"
        );

        (subscriber_id, rx)
    }

    /// Remove a subscriber.
    pub async fn unsubscribe(&self, subscriber_id: &str) {
        if self.subscribers.write().await.remove(subscriber_id).is_some() {
            tracing::debug!(subscriber_id = %subscriber_id, "Notification subscriber removed");
        }
    }

    /// Number of registered subscribers.
    pub async fn subscriber_count(&self) -> usize {
        self.subscribers.read().await.len()
    }

    /// Deliver a notification to every connected subscriber.
    ///
    /// Returns the number of subscribers the notification reached.
    pub async fn broadcast(&self, event_type: &str, data: serde_json::Value) -> usize {
        let notification = Notification {
            event_type: event_type.to_string(),
            data,
            sent_at: Utc::now(),
        };

        let mut closed = Vec::new();
        let mut delivered = 0;
        {
            let subscribers = self.subscribers.read().await;
            if subscribers.is_empty() {
                tracing::debug!(event_type = %event_type, "No notification subscribers connected");
                return 0;
            }
            for (id, sender) in subscribers.iter() {
                if sender.send(notification.clone()).is_ok() {
                    delivered += 1;
                } else {
                    closed.push(id.clone());
                }
            }
        }

        if !closed.is_empty() {
            let mut subscribers = self.subscribers.write().await;
            for id in &closed {
                subscribers.remove(id);
            }
        }

        tracing::debug!(
            event_type = %event_type,
            delivered,
            pruned = closed.len(),
            "Notification broadcast"
        );

        delivered
    }
}

impl std::fmt::Debug for NotificationHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationHub").finish_non_exhaustive()
    }
}
