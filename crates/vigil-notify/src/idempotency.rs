//! Duplicate-send protection, keyed on (alert id, recipient kind) — a
//! scope, not a time window, so retries converge instead of fanning out.
//!
//! Two layers: the attempt history in the store decides whether a send is
//! still owed, and an in-process in-flight set collapses concurrent
//! dispatch calls for the same pair into one send.

use chrono::{DateTime, Utc};
use dashmap::DashSet;

use vigil_core::models::{AttemptOutcome, NotificationAttempt, RecipientKind};

/// What the attempt history says about a dispatch request.
#[derive(Debug, Clone)]
pub enum IdempotencyCheck {
    /// A send already succeeded in scope; the request is a no-op.
    AlreadySent(NotificationAttempt),
    /// The retry budget is spent; never retried again.
    Exhausted { failed_attempts: u32 },
    /// A send is owed; this is the attempt number to record.
    Proceed { attempt_number: u32 },
}

/// Holds the in-flight set. One guard is shared per dispatcher.
#[derive(Debug, Default)]
pub struct IdempotencyGuard {
    in_flight: DashSet<String>,
}

/// Releases the in-flight slot on drop.
pub struct InFlightToken<'a> {
    guard: &'a IdempotencyGuard,
    key: String,
}

impl Drop for InFlightToken<'_> {
    fn drop(&mut self) {
        self.guard.in_flight.remove(&self.key);
    }
}

impl IdempotencyGuard {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(alert_id: &str, recipient: RecipientKind) -> String {
        format!("{alert_id}:{}", recipient.as_str())
    }

    /// Claim the (alert, recipient) pair. Returns None if another dispatch
    /// for the pair is already running in this process.
    pub fn try_begin(&self, alert_id: &str, recipient: RecipientKind) -> Option<InFlightToken<'_>> {
        let key = Self::key(alert_id, recipient);
        if self.in_flight.insert(key.clone()) {
            Some(InFlightToken { guard: self, key })
        } else {
            None
        }
    }

    /// Decide from the attempt history whether a send is owed.
    ///
    /// `resend_after`: when set, a `sent` attempt only deduplicates if it
    /// happened at or after this instant; the re-notification path uses
    /// this to start a fresh delivery generation. Failure counting always
    /// restarts after the most recent successful send.
    pub fn evaluate(
        attempts: &[NotificationAttempt],
        max_attempts: u32,
        resend_after: Option<DateTime<Utc>>,
    ) -> IdempotencyCheck {
        let last_sent = attempts
            .iter()
            .filter(|a| a.outcome == AttemptOutcome::Sent)
            .max_by_key(|a| a.attempted_at);

        if let Some(sent) = last_sent {
            let still_covers = match resend_after {
                None => true,
                Some(cutoff) => sent.attempted_at >= cutoff,
            };
            if still_covers {
                return IdempotencyCheck::AlreadySent(sent.clone());
            }
        }

        let since = last_sent.map(|a| a.attempted_at);
        let failed_attempts = attempts
            .iter()
            .filter(|a| a.outcome == AttemptOutcome::Failed)
            .filter(|a| since.map(|s| a.attempted_at > s).unwrap_or(true))
            .count() as u32;

        if failed_attempts >= max_attempts {
            return IdempotencyCheck::Exhausted { failed_attempts };
        }

        let next_number = attempts.iter().map(|a| a.attempt_number).max().unwrap_or(0) + 1;
        IdempotencyCheck::Proceed {
            attempt_number: next_number,
        }
    }
}
