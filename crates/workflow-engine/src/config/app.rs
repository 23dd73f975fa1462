//! Engine configuration.

use std::time::Duration;

use bss_workflow_actions::SimulationSettings;
use serde::Deserialize;

/// Where executions and workflow definitions are persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Memory,
    Postgres,
}

impl std::fmt::Display for StoreBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreBackend::Memory => write!(f, "memory"),
            StoreBackend::Postgres => write!(f, "postgres"),
        }
    }
}

/// Engine configuration loaded from environment variables.
///
/// Environment variables are prefixed with `BSS_WORKFLOW_`:
/// - `BSS_WORKFLOW_HOST`: Server bind address (default: "0.0.0.0")
/// - `BSS_WORKFLOW_PORT`: Server port (default: 8090)
/// - `BSS_WORKFLOW_NATS_URL`: NATS URL for domain events (optional)
/// - `BSS_WORKFLOW_STORE`: `memory` or `postgres` (default: memory)
/// - `BSS_WORKFLOW_WORKER_POOL_SIZE`: Concurrent delay/action step bodies (default: 8)
/// - `BSS_WORKFLOW_DEFINITIONS_PATH`: YAML file of workflow definitions (optional)
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// Server bind address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// NATS URL (optional)
    #[serde(default)]
    pub nats_url: Option<String>,

    /// Persistence backend
    #[serde(default = "default_store")]
    pub store: StoreBackend,

    /// Size of the step worker pool
    #[serde(default = "default_worker_pool_size")]
    pub worker_pool_size: usize,

    /// Simulated provisioning latency in milliseconds
    #[serde(default = "default_provision_delay_ms")]
    pub provision_delay_ms: u64,

    /// Simulated payment gateway latency in milliseconds
    #[serde(default = "default_payment_retry_delay_ms")]
    pub payment_retry_delay_ms: u64,

    /// Probability that a payment retry succeeds
    #[serde(default = "default_payment_success_rate")]
    pub payment_success_rate: f64,

    /// Workflow definitions file; built-in definitions are used when unset
    #[serde(default)]
    pub definitions_path: Option<String>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8090
}

fn default_store() -> StoreBackend {
    StoreBackend::Memory
}

fn default_worker_pool_size() -> usize {
    8
}

fn default_provision_delay_ms() -> u64 {
    1000
}

fn default_payment_retry_delay_ms() -> u64 {
    500
}

fn default_payment_success_rate() -> f64 {
    0.9
}

impl EngineConfig {
    /// Load configuration from environment variables.
    ///
    /// Environment variables are prefixed with `BSS_WORKFLOW_`.
    pub fn from_env() -> Result<Self, envy::Error> {
        envy::prefixed("BSS_WORKFLOW_").from_env::<EngineConfig>()
    }

    /// Get the server bind address as a string suitable for `TcpListener::bind`.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Settings for the simulated provisioning system and payment gateway.
    pub fn simulation(&self) -> SimulationSettings {
        SimulationSettings {
            provision_delay: Duration::from_millis(self.provision_delay_ms),
            payment_retry_delay: Duration::from_millis(self.payment_retry_delay_ms),
            payment_success_rate: self.payment_success_rate,
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            nats_url: None,
            store: default_store(),
            worker_pool_size: default_worker_pool_size(),
            provision_delay_ms: default_provision_delay_ms(),
            payment_retry_delay_ms: default_payment_retry_delay_ms(),
            payment_success_rate: default_payment_success_rate(),
            definitions_path: None,
        }
    }
}
