//! Data model: patients, activity records, alerts, notification attempts,
//! and the per-tick summary.

mod activity;
mod alert;
mod notification;
mod patient;
mod tick;

pub use activity::{ActivityRecord, ActivitySource};
pub use alert::{Alert, AlertKind, AlertPhase, AlertState, Resolution, Severity};
pub use notification::{AttemptOutcome, NotificationAttempt, RecipientKind};
pub use patient::{ContactChannel, ContactPoint, Patient};
pub use tick::{TickError, TickSummary};
