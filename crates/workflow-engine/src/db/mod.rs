//! Persistence for workflow definitions and executions.
//!
//! The engine talks to the `WorkflowDefinitionStore` and `ExecutionStore`
//! traits. `memory` backs tests and single-process deployments; `postgres`
//! persists through SQLx.

pub mod memory;
pub mod models;
pub mod postgres;
pub mod store;

pub use memory::{MemoryDefinitionStore, MemoryExecutionStore};
pub use postgres::{connect_pool, ensure_schema, PgDefinitionStore, PgExecutionStore};
pub use store::{ExecutionStore, WorkflowDefinitionStore};
