//! Event-driven workflow triggering.

pub mod router;

pub use router::{build_context, seed_context, DomainEvent, RouteOutcome, TriggerRouter, TOPICS};
