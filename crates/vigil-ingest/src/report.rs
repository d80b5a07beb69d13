//! Immediate-escalation report: a human-originated fall/help report
//! carrying contact info and a location. Always produces an escalated
//! alert synchronously; the soft check-in stage is never entered.

use std::sync::{Arc, OnceLock};

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

use vigil_core::errors::{VigilError, VigilResult};
use vigil_core::models::{AlertKind, RecipientKind};
use vigil_core::traits::IEngineStore;
use vigil_engine::AlertStateMachine;
use vigil_notify::NotificationDispatcher;
use vigil_observability::tracing_setup::events;

use crate::ratelimit::RateLimiter;

/// Inbound report payload.
#[derive(Debug, Clone, Deserialize)]
pub struct EscalationReport {
    /// E.164 phone number or https URL identifying the patient.
    pub contact: String,
    /// Where the incident happened, free-form.
    pub location: String,
    #[serde(default)]
    pub message: Option<String>,
}

/// Response body for a handled report.
#[derive(Debug, Clone, Serialize)]
pub struct EscalationResponse {
    pub alert_id: String,
    pub patient_id: String,
}

fn contact_is_routable(contact: &str) -> bool {
    static E164: OnceLock<Regex> = OnceLock::new();
    let e164 = E164.get_or_init(|| Regex::new(r"^\+[1-9]\d{6,14}$").expect("valid regex"));
    e164.is_match(contact) || contact.starts_with("https://")
}

pub struct EscalationReportHandler {
    store: Arc<dyn IEngineStore>,
    machine: AlertStateMachine,
    dispatcher: Arc<NotificationDispatcher>,
    limiter: RateLimiter,
}

impl EscalationReportHandler {
    pub fn new(
        store: Arc<dyn IEngineStore>,
        dispatcher: Arc<NotificationDispatcher>,
        limiter: RateLimiter,
    ) -> Self {
        let machine = AlertStateMachine::new(Arc::clone(&store));
        Self {
            store,
            machine,
            dispatcher,
            limiter,
        }
    }

    pub fn handle(
        &self,
        sender_key: &str,
        report: &EscalationReport,
        now: DateTime<Utc>,
    ) -> VigilResult<EscalationResponse> {
        self.limiter.enforce(sender_key, now)?;

        if !contact_is_routable(&report.contact) {
            events::event_rejected("validation", "unroutable contact");
            return Err(VigilError::validation(
                "contact must be an E.164 phone number or https URL",
            ));
        }
        if report.location.trim().is_empty() {
            return Err(VigilError::validation("location must not be empty"));
        }

        // Never guess: an unknown contact is rejected, not matched fuzzily.
        let patient = self
            .store
            .find_patient_by_contact(&report.contact)?
            .ok_or_else(|| {
                events::event_rejected("not_found", "no patient for reported contact");
                VigilError::not_found("no patient maps to the reported contact")
            })?;

        let alert = self
            .machine
            .force_escalate(&patient.id, AlertKind::FallDetected, now)?;
        let context = match &report.message {
            Some(msg) => format!("fall report at {}: {msg}", report.location),
            None => format!("fall report at {}", report.location),
        };
        self.store.append_resolution_note(&alert.id, &context)?;

        if let Err(e) = self
            .dispatcher
            .dispatch(&alert, &patient, RecipientKind::Caregiver, now)
        {
            tracing::warn!(alert_id = %alert.id, error = %e, "report notification failed");
        }

        Ok(EscalationResponse {
            alert_id: alert.id,
            patient_id: patient.id,
        })
    }
}
