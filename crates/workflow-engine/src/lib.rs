//! BSS Workflow Engine Library
//!
//! Event-triggered workflow execution for the BSS platform:
//!
//! - **Trigger Routing**: Map domain events (customer created, payment failed)
//!   to named workflows
//! - **Execution Control**: Create tracked executions and drive their steps in
//!   order, with cancellation and retry of failed runs
//! - **Step Driving**: Run delay, action and condition steps on a bounded
//!   worker pool and persist every status transition
//! - **Persistence**: In-memory or PostgreSQL stores for definitions and
//!   executions
//!
//! ## Modules
//!
//! - [`config`]: Configuration loading from environment variables
//! - [`db`]: Data model and stores
//! - [`definitions`]: YAML workflow definitions and the built-in workflows
//! - [`engine`]: Execution controller, step driver and condition evaluator
//! - [`error`]: Custom error types with Axum integration
//! - [`handlers`]: HTTP route handlers
//! - [`nats`]: Domain event subscriber
//! - [`state`]: Shared application state
//! - [`trigger`]: Event to workflow routing
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use bss_workflow_actions::{create_default_registry, LogMailSender, NotificationHub};
//! use bss_workflow_engine::{
//!     db::{MemoryDefinitionStore, MemoryExecutionStore},
//!     engine::{ExecutionController, StepDriver},
//! };
//!
//! let executions = Arc::new(MemoryExecutionStore::new());
//! let registry = create_default_registry(
//!     Arc::new(LogMailSender),
//!     NotificationHub::new(),
//!     Default::default(),
//! );
//! let driver = StepDriver::new(executions.clone(), Arc::new(registry), 8);
//! let controller = ExecutionController::new(
//!     Arc::new(MemoryDefinitionStore::new()),
//!     executions,
//!     driver,
//! );
//! ```

pub mod config;
pub mod db;
pub mod definitions;
pub mod engine;
pub mod error;
pub mod handlers;
pub mod nats;
pub mod result_ext;
pub mod state;
pub mod trigger;

pub use error::{AppError, AppResult};
pub use result_ext::ResultExt;
