//! Domain event ingestion over HTTP.
//!
//! Same routing as the NATS subscriber, for environments without a broker.

use axum::{
    extract::{Path, State},
    Json,
};

use crate::state::AppState;
use crate::trigger::{DomainEvent, RouteOutcome};

/// Route a domain event.
///
/// POST /api/events/{topic}
///
/// Always `200 OK`; the body reports what routing did.
pub async fn publish(
    State(state): State<AppState>,
    Path(topic): Path<String>,
    Json(event): Json<DomainEvent>,
) -> Json<RouteOutcome> {
    Json(state.router.route(&topic, event).await)
}
