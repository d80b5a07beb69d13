//! # vigil-observability
//!
//! Tracing initialization, structured event helpers, and tick metrics
//! aggregation for the alert engine.

pub mod metrics;
pub mod tracing_setup;

pub use metrics::TickMetrics;
pub use tracing_setup::init_tracing;
