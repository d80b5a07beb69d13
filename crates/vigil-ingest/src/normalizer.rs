//! SensorEventNormalizer — validates and classifies third-party webhook
//! payloads. The upstream vendor sends events for every device class it
//! knows about; most are irrelevant here and are acknowledged-and-dropped
//! rather than rejected. Explicit fall/help signals skip the activity
//! sink entirely and force an escalated alert.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use vigil_core::config::MonitoringConfig;
use vigil_core::errors::{VigilError, VigilResult};
use vigil_core::models::{ActivityRecord, ActivitySource, AlertKind, Patient, RecipientKind};
use vigil_core::traits::IEngineStore;
use vigil_engine::AlertStateMachine;
use vigil_notify::NotificationDispatcher;
use vigil_observability::tracing_setup::events;

use crate::ratelimit::RateLimiter;

/// Device types that report presence/motion and feed the activity sink.
const PRESENCE_DEVICE_TYPES: &[&str] = &["motion", "presence"];

/// Device types whose events escalate immediately.
const ESCALATION_DEVICE_TYPES: &[&str] = &["fall", "sos_button"];

/// The fields the engine needs from the vendor envelope. Extra vendor
/// fields are ignored; wrong types on these fail validation.
#[derive(Debug, Clone, Deserialize)]
pub struct SensorWebhookEvent {
    pub device_type: String,
    pub device_id: String,
    /// Binary detection state; required for presence device types.
    #[serde(default)]
    pub detected: Option<bool>,
    /// Sample timestamp; required for presence device types.
    #[serde(default)]
    pub observed_at: Option<DateTime<Utc>>,
}

/// Categorized result of one webhook delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum IngestOutcome {
    /// A presence detection became an activity record.
    Recorded {
        patient_id: String,
        record_id: String,
    },
    /// Acknowledged and dropped — not an error.
    Ignored { reason: String },
    /// An immediate-escalation signal forced an escalated alert.
    Escalated { alert_id: String },
    /// A signal kind opted out of the bypass opened a soft check-in.
    CheckinRequested { alert_id: String },
}

pub struct SensorEventNormalizer {
    store: Arc<dyn IEngineStore>,
    machine: AlertStateMachine,
    dispatcher: Arc<NotificationDispatcher>,
    limiter: RateLimiter,
    monitoring: MonitoringConfig,
}

impl SensorEventNormalizer {
    pub fn new(
        store: Arc<dyn IEngineStore>,
        dispatcher: Arc<NotificationDispatcher>,
        limiter: RateLimiter,
        monitoring: MonitoringConfig,
    ) -> Self {
        let machine = AlertStateMachine::new(Arc::clone(&store));
        Self {
            store,
            machine,
            dispatcher,
            limiter,
            monitoring,
        }
    }

    /// Handle one raw webhook delivery from `sender_key` (e.g. sender IP).
    pub fn handle_sensor_webhook(
        &self,
        sender_key: &str,
        payload: &serde_json::Value,
        now: DateTime<Utc>,
    ) -> VigilResult<IngestOutcome> {
        let span = vigil_observability::ingest_span!(sender_key);
        let _enter = span.enter();

        self.limiter.enforce(sender_key, now)?;

        let event: SensorWebhookEvent =
            serde_json::from_value(payload.clone()).map_err(|e| {
                events::event_rejected("validation", &e.to_string());
                VigilError::validation(format!("malformed sensor payload: {e}"))
            })?;

        if ESCALATION_DEVICE_TYPES.contains(&event.device_type.as_str()) {
            return self.escalate_from_device(&event, now);
        }

        if PRESENCE_DEVICE_TYPES.contains(&event.device_type.as_str()) {
            return self.record_presence(&event);
        }

        events::event_ignored(&event.device_type, "unmonitored device type");
        Ok(IngestOutcome::Ignored {
            reason: format!("device type {} is not monitored", event.device_type),
        })
    }

    fn record_presence(&self, event: &SensorWebhookEvent) -> VigilResult<IngestOutcome> {
        let detected = event.detected.ok_or_else(|| {
            events::event_rejected("validation", "missing detection state");
            VigilError::validation("presence event is missing the detection state")
        })?;
        let observed_at = event.observed_at.ok_or_else(|| {
            events::event_rejected("validation", "missing sample timestamp");
            VigilError::validation("presence event is missing the sample timestamp")
        })?;

        // An absence sample is not evidence of activity; acknowledging it
        // without a write keeps the silence clock honest.
        if !detected {
            events::event_ignored(&event.device_type, "no presence detected");
            return Ok(IngestOutcome::Ignored {
                reason: "no presence detected".to_string(),
            });
        }

        let patient = self.patient_for_device(&event.device_id)?;
        let record = ActivityRecord::new(
            &patient.id,
            ActivitySource::Sensor,
            observed_at,
            Some(format!("device {}", event.device_id)),
        );
        self.store.append_activity(&record)?;
        events::activity_recorded(&patient.id, ActivitySource::Sensor);

        Ok(IngestOutcome::Recorded {
            patient_id: patient.id,
            record_id: record.id,
        })
    }

    fn escalate_from_device(
        &self,
        event: &SensorWebhookEvent,
        now: DateTime<Utc>,
    ) -> VigilResult<IngestOutcome> {
        let patient = self.patient_for_device(&event.device_id)?;

        // Deployments can opt a signal kind out of the bypass, sending it
        // through the soft check-in stage instead.
        if !self.monitoring.bypasses_soft_stage(AlertKind::FallDetected) {
            let outcome =
                self.machine
                    .open_checkin(&patient.id, AlertKind::FallDetected, None, now)?;
            let alert = outcome.alert().clone();
            if outcome.was_created() {
                if let Err(e) =
                    self.dispatcher
                        .dispatch(&alert, &patient, RecipientKind::Patient, now)
                {
                    tracing::warn!(alert_id = %alert.id, error = %e, "check-in notification failed");
                }
            }
            return Ok(IngestOutcome::CheckinRequested { alert_id: alert.id });
        }

        let alert = self
            .machine
            .force_escalate(&patient.id, AlertKind::FallDetected, now)?;
        self.store.append_resolution_note(
            &alert.id,
            &format!("signal from device {} ({})", event.device_id, event.device_type),
        )?;

        // Notification delivery is decoupled from alert state: a paging
        // failure is logged, the escalation stands.
        if let Err(e) = self
            .dispatcher
            .dispatch(&alert, &patient, RecipientKind::Caregiver, now)
        {
            tracing::warn!(alert_id = %alert.id, error = %e, "escalation notification failed");
        }

        Ok(IngestOutcome::Escalated { alert_id: alert.id })
    }

    fn patient_for_device(&self, device_id: &str) -> VigilResult<Patient> {
        self.store.find_patient_by_device(device_id)?.ok_or_else(|| {
            events::event_rejected("not_found", &format!("device {device_id} is unmapped"));
            VigilError::not_found(format!("no patient mapped to device {device_id}"))
        })
    }
}
