//! # vigil-ingest
//!
//! Ingress for the alert engine: the sensor webhook normalizer, the
//! immediate-escalation report handler, and the fixed-window rate
//! limiter every entry point passes through first.

pub mod normalizer;
pub mod ratelimit;
pub mod report;

pub use normalizer::{IngestOutcome, SensorEventNormalizer, SensorWebhookEvent};
pub use ratelimit::{InMemoryCounterStore, RateLimitDecision, RateLimiter};
pub use report::{EscalationReport, EscalationReportHandler, EscalationResponse};
