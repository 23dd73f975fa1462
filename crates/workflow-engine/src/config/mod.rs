//! Configuration module for the BSS workflow engine.
//!
//! Configuration is loaded from environment variables using `envy`.

mod app;
mod database;

pub use app::{EngineConfig, StoreBackend};
pub use database::DatabaseConfig;
