//! Data model for workflow definitions and their executions.

pub mod execution;
pub mod workflow;

pub use execution::*;
pub use workflow::*;
