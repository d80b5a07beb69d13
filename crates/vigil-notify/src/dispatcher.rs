//! NotificationDispatcher — resolves channel and template, applies the
//! idempotency guard, invokes the send capability, and records every
//! attempt. Failure here is surfaced, never propagated into alert state.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use vigil_core::config::NotificationConfig;
use vigil_core::errors::{VigilError, VigilResult};
use vigil_core::models::{Alert, AttemptOutcome, NotificationAttempt, Patient, RecipientKind};
use vigil_core::traits::{IEngineStore, ISendCapability, SendRequest};
use vigil_observability::tracing_setup::events;

use crate::idempotency::{IdempotencyCheck, IdempotencyGuard};
use crate::templates;

/// Result of one dispatch request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// A message went out on this call.
    Sent,
    /// A send already succeeded (or is in flight); nothing was sent.
    Deduplicated,
    /// This attempt failed; the retry budget is not yet spent.
    Failed { attempt_number: u32 },
    /// The retry budget is spent. Surfaced in the tick summary and never
    /// retried again.
    Exhausted,
}

pub struct NotificationDispatcher {
    store: Arc<dyn IEngineStore>,
    sender: Arc<dyn ISendCapability>,
    config: NotificationConfig,
    guard: IdempotencyGuard,
}

impl NotificationDispatcher {
    pub fn new(
        store: Arc<dyn IEngineStore>,
        sender: Arc<dyn ISendCapability>,
        config: NotificationConfig,
    ) -> Self {
        Self {
            store,
            sender,
            config,
            guard: IdempotencyGuard::new(),
        }
    }

    /// Dispatch one message for (alert, recipient).
    ///
    /// Idempotent per pair: a second request after a successful send is a
    /// no-op, and a second request racing a first in this process waits
    /// on nothing — it observes the in-flight send and deduplicates.
    pub fn dispatch(
        &self,
        alert: &Alert,
        patient: &Patient,
        recipient: RecipientKind,
        now: DateTime<Utc>,
    ) -> VigilResult<DispatchOutcome> {
        self.dispatch_inner(alert, patient, recipient, now, None)
    }

    /// Re-notification path: a `sent` attempt older than `resend_after`
    /// no longer deduplicates, starting a fresh delivery generation.
    pub fn dispatch_renotify(
        &self,
        alert: &Alert,
        patient: &Patient,
        recipient: RecipientKind,
        now: DateTime<Utc>,
        resend_after: DateTime<Utc>,
    ) -> VigilResult<DispatchOutcome> {
        self.dispatch_inner(alert, patient, recipient, now, Some(resend_after))
    }

    fn dispatch_inner(
        &self,
        alert: &Alert,
        patient: &Patient,
        recipient: RecipientKind,
        now: DateTime<Utc>,
        resend_after: Option<DateTime<Utc>>,
    ) -> VigilResult<DispatchOutcome> {
        let span = vigil_observability::dispatch_span!(alert.id, recipient);
        let _enter = span.enter();

        let Some(_token) = self.guard.try_begin(&alert.id, recipient) else {
            return Ok(DispatchOutcome::Deduplicated);
        };

        let attempts = self.store.attempts_for(&alert.id, recipient)?;
        let attempt_number = match IdempotencyGuard::evaluate(
            &attempts,
            self.config.max_attempts,
            resend_after,
        ) {
            IdempotencyCheck::AlreadySent(_) => return Ok(DispatchOutcome::Deduplicated),
            IdempotencyCheck::Exhausted { failed_attempts } => {
                events::notification_exhausted(&alert.id, recipient, failed_attempts);
                return Ok(DispatchOutcome::Exhausted);
            }
            IdempotencyCheck::Proceed { attempt_number } => attempt_number,
        };

        let contact = patient
            .primary_contact(recipient == RecipientKind::Caregiver)
            .ok_or_else(|| {
                VigilError::not_found(format!(
                    "{} contact for patient {}",
                    recipient.as_str(),
                    patient.id
                ))
            })?;

        let attempt = NotificationAttempt::pending(
            &alert.id,
            recipient,
            attempt_number,
            contact.channel,
            now,
        );
        self.store.append_attempt(&attempt)?;

        let message = templates::render(alert, patient, recipient);
        let request = SendRequest {
            alert_id: alert.id.clone(),
            patient_id: patient.id.clone(),
            recipient,
            channel: contact.channel,
            address: contact.address.clone(),
            severity: alert.severity,
            subject: message.subject,
            body: message.body,
        };

        match self.sender.send(&request) {
            Ok(receipt) => {
                self.store.finish_attempt(
                    &attempt.id,
                    AttemptOutcome::Sent,
                    receipt.provider_message_id.as_deref(),
                )?;
                events::notification_sent(&alert.id, recipient, attempt_number);
                Ok(DispatchOutcome::Sent)
            }
            Err(send_err) => {
                self.store
                    .finish_attempt(&attempt.id, AttemptOutcome::Failed, None)?;
                events::notification_failed(
                    &alert.id,
                    recipient,
                    attempt_number,
                    &send_err.to_string(),
                );
                // Count this generation's failures, this one included.
                let attempts = self.store.attempts_for(&alert.id, recipient)?;
                match IdempotencyGuard::evaluate(&attempts, self.config.max_attempts, resend_after)
                {
                    IdempotencyCheck::Exhausted { failed_attempts } => {
                        events::notification_exhausted(&alert.id, recipient, failed_attempts);
                        Ok(DispatchOutcome::Exhausted)
                    }
                    _ => Ok(DispatchOutcome::Failed { attempt_number }),
                }
            }
        }
    }
}
