//! Server-Sent Events stream of workflow notifications.

use std::convert::Infallible;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use axum::{
    extract::State,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse,
    },
};
use bss_workflow_actions::NotificationHub;
use futures::stream::Stream;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_stream::StreamExt;

use crate::state::AppState;

/// Subscribe to notifications.
///
/// GET /api/notifications
///
/// Each notification is sent as an event named after its type, with the
/// notification as JSON data.
pub async fn stream(State(state): State<AppState>) -> axum::response::Response {
    let (subscriber_id, rx) = state.notifications.subscribe().await;
    tracing::info!(subscriber_id = %subscriber_id, "Notification stream opened");

    let events = UnboundedReceiverStream::new(rx).map(|notification| {
        let data = serde_json::to_string(&notification).unwrap_or_default();
        Ok::<_, Infallible>(
            Event::default()
                .event(notification.event_type.as_str())
                .data(data),
        )
    });

    let stream = CleanupStream {
        inner: Box::pin(events),
        hub: state.notifications.clone(),
        subscriber_id,
    };

    Sse::new(stream)
        .keep_alive(KeepAlive::new().interval(Duration::from_secs(15)).text("ping"))
        .into_response()
}

/// Unsubscribes from the hub when the client disconnects.
struct CleanupStream<S> {
    inner: Pin<Box<S>>,
    hub: NotificationHub,
    subscriber_id: String,
}

impl<S: Stream<Item = Result<Event, Infallible>> + Send> Stream for CleanupStream<S> {
    type Item = Result<Event, Infallible>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.as_mut().poll_next(cx)
    }
}

impl<S> Drop for CleanupStream<S> {
    fn drop(&mut self) {
        let hub = self.hub.clone();
        let subscriber_id = std::mem::take(&mut self.subscriber_id);
        tokio::spawn(async move {
            hub.unsubscribe(&subscriber_id).await;
            tracing::info!(subscriber_id = %subscriber_id, "Notification stream closed");
        });
    }
}
