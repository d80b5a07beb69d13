//! # vigil-core
//!
//! Foundation crate for the Vigil inactivity-detection and alert-escalation
//! engine. Defines all types, traits, errors, config, and constants.
//! Every other crate in the workspace depends on this.

pub mod config;
pub mod constants;
pub mod errors;
pub mod models;
pub mod traits;

// Re-export the most commonly used types at the crate root.
pub use config::VigilConfig;
pub use errors::{VigilError, VigilResult};
pub use models::{
    ActivityRecord, ActivitySource, Alert, AlertKind, AlertPhase, AlertState, NotificationAttempt,
    Patient, RecipientKind, Severity, TickSummary,
};
