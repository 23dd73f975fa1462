//! Health check endpoint.

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};

use crate::state::AppState;

/// Health check response.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// "ok" or "unhealthy"
    pub status: String,

    /// Server version
    pub version: String,

    /// Server uptime in seconds
    pub uptime_seconds: u64,

    /// Persistence backend, "memory" or "postgres"
    pub store: String,

    /// Database connectivity, when the postgres backend is in use
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,

    /// NATS connectivity status
    pub nats: String,
}

/// Health check.
///
/// `GET /health`
///
/// - `200 OK` if the server is running and its store is reachable
/// - `503 Service Unavailable` if the database cannot be reached
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let database_healthy = match &state.postgres {
        Some(store) => Some(store.ping().await),
        None => None,
    };
    let healthy = database_healthy.unwrap_or(true);

    let response = HealthResponse {
        status: if healthy { "ok" } else { "unhealthy" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.uptime_seconds(),
        store: state.config.store.to_string(),
        database: database_healthy.map(|ok| {
            if ok { "connected" } else { "disconnected" }.to_string()
        }),
        nats: if state.has_nats() {
            "connected"
        } else {
            "not_configured"
        }
        .to_string(),
    };

    let status_code = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(response))
}
