//! Application state shared by the HTTP handlers.

use std::sync::Arc;

use bss_workflow_actions::NotificationHub;

use crate::config::EngineConfig;
use crate::db::PgExecutionStore;
use crate::engine::ExecutionController;
use crate::trigger::TriggerRouter;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub controller: ExecutionController,

    pub router: TriggerRouter,

    /// Fan-out behind the notification stream
    pub notifications: NotificationHub,

    pub config: Arc<EngineConfig>,

    /// NATS client (optional)
    pub nats: Option<Arc<async_nats::Client>>,

    /// Set when executions are persisted in PostgreSQL
    pub postgres: Option<PgExecutionStore>,

    /// Server start time for uptime calculation
    pub start_time: std::time::Instant,
}

impl AppState {
    pub fn new(
        controller: ExecutionController,
        notifications: NotificationHub,
        config: EngineConfig,
    ) -> Self {
        Self {
            router: TriggerRouter::new(controller.clone()),
            controller,
            notifications,
            config: Arc::new(config),
            nats: None,
            postgres: None,
            start_time: std::time::Instant::now(),
        }
    }

    pub fn with_nats(mut self, nats: Option<Arc<async_nats::Client>>) -> Self {
        self.nats = nats;
        self
    }

    pub fn with_postgres(mut self, store: PgExecutionStore) -> Self {
        self.postgres = Some(store);
        self
    }

    /// Get the server uptime in seconds.
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    pub fn has_nats(&self) -> bool {
        self.nats.is_some()
    }
}
