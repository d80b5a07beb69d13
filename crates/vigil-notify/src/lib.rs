//! # vigil-notify
//!
//! Notification dispatch for the alert engine: template selection,
//! per-(alert, recipient) idempotency, bounded retry, and the webhook
//! send adapter. Dispatch outcomes never feed back into alert state —
//! a paging outage must not block or revert a transition.

pub mod channel;
pub mod dispatcher;
pub mod idempotency;
pub mod templates;

pub use channel::{WebhookSender, WebhookSenderConfig};
pub use dispatcher::{DispatchOutcome, NotificationDispatcher};
pub use idempotency::IdempotencyGuard;
