//! NATS integration.
//!
//! Consumes domain events from the customer, payment and invoice topics and
//! hands them to the trigger router. The engine runs without NATS; events can
//! also be posted over HTTP.

pub mod subscriber;

pub use subscriber::EventSubscriber;
