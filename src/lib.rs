//! ntfy-bridge - MQTT to ntfy push-notification bridge
//!
//! This library provides the core functionality for subscribing to a set of
//! configured MQTT topics and forwarding a notification payload extracted
//! from each matching message to an ntfy-compatible push endpoint.

pub mod broker;
pub mod cli;
pub mod config;
pub mod notifier;
pub mod registry;
pub mod router;

// Re-export the routing types for convenience
pub use registry::Registry;
pub use router::Router;
