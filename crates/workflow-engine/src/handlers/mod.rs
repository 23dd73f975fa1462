//! HTTP handlers for the workflow engine API.
//!
//! This module contains all route handlers organized by domain, and the
//! router that wires them together.

pub mod events;
pub mod executions;
pub mod health;
pub mod notifications;
pub mod workflows;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

pub use health::health_check;

/// Build the application router with all routes.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let health_routes = Router::new().route("/health", get(health_check));

    let workflow_routes = Router::new()
        .route("/api/workflows", get(workflows::list))
        .route("/api/workflows/{name}/trigger", post(workflows::trigger));

    let execution_routes = Router::new()
        .route("/api/executions", get(executions::list_for_subject))
        .route("/api/executions/{execution_id}", get(executions::get))
        .route(
            "/api/executions/{execution_id}/cancel",
            post(executions::cancel),
        )
        .route(
            "/api/executions/{execution_id}/retry",
            post(executions::retry),
        );

    let event_routes = Router::new()
        .route("/api/events/{topic}", post(events::publish))
        .route("/api/notifications", get(notifications::stream));

    Router::new()
        .merge(health_routes)
        .merge(workflow_routes)
        .merge(execution_routes)
        .merge(event_routes)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::Router;
    use bss_workflow_actions::{
        create_default_registry, LogMailSender, NotificationHub, SimulationSettings,
    };
    use serde_json::Value;
    use tower::ServiceExt;

    use crate::config::EngineConfig;
    use crate::db::memory::{MemoryDefinitionStore, MemoryExecutionStore};
    use crate::definitions::{builtin_definitions, seed_definitions};
    use crate::engine::{ExecutionController, StepDriver};
    use crate::state::AppState;

    /// State over in-memory stores seeded with the built-in workflows.
    pub async fn state() -> AppState {
        let definitions = Arc::new(MemoryDefinitionStore::new());
        seed_definitions(definitions.as_ref(), &builtin_definitions().unwrap())
            .await
            .unwrap();
        let executions = Arc::new(MemoryExecutionStore::new());
        let notifications = NotificationHub::new();
        let registry = create_default_registry(
            Arc::new(LogMailSender),
            notifications.clone(),
            SimulationSettings::instant(),
        );
        let driver = StepDriver::new(executions.clone(), Arc::new(registry), 4);
        let controller = ExecutionController::new(definitions, executions, driver);
        AppState::new(controller, notifications, EngineConfig::default())
    }

    pub async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    pub fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    pub fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    pub fn post(uri: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }
}
