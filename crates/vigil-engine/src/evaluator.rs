//! ThresholdEvaluator — the tick processor. Invoked with no
//! patient-specific input; reads the monitored population and the
//! per-patient activity maxima, then walks each patient through the
//! decision table. A per-patient failure is recorded and skipped; only
//! an unreachable store or invalid configuration aborts the tick.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use vigil_core::config::{MonitoringConfig, Thresholds};
use vigil_core::errors::VigilResult;
use vigil_core::models::{
    ActivityRecord, ActivitySource, Alert, AlertKind, AlertState, Patient, RecipientKind,
    TickSummary,
};
use vigil_core::traits::IEngineStore;
use vigil_notify::{DispatchOutcome, NotificationDispatcher};
use vigil_observability::tracing_setup::events;

use crate::machine::AlertStateMachine;

pub struct ThresholdEvaluator {
    store: Arc<dyn IEngineStore>,
    machine: AlertStateMachine,
    dispatcher: Arc<NotificationDispatcher>,
    config: MonitoringConfig,
}

impl ThresholdEvaluator {
    pub fn new(
        store: Arc<dyn IEngineStore>,
        dispatcher: Arc<NotificationDispatcher>,
        config: MonitoringConfig,
    ) -> Self {
        let machine = AlertStateMachine::new(Arc::clone(&store));
        Self {
            store,
            machine,
            dispatcher,
            config,
        }
    }

    /// Run one tick at the given instant.
    ///
    /// Safe to invoke concurrently: every transition is a compare-and-set
    /// and every notification goes through the idempotency guard, so
    /// overlapping ticks converge instead of duplicating work.
    pub fn run_tick(&self, now: DateTime<Utc>) -> VigilResult<TickSummary> {
        // Undefined thresholds make every decision below unsafe.
        self.config.validate()?;

        let patients = self.store.patients_with_monitoring_enabled()?;
        let span = vigil_observability::tick_span!(patients.len());
        let _enter = span.enter();

        let latest: HashMap<String, ActivityRecord> = self
            .store
            .latest_activity_per_patient()?
            .into_iter()
            .map(|r| (r.patient_id.clone(), r))
            .collect();

        let mut summary = TickSummary::default();
        for patient in &patients {
            if let Err(e) = self.evaluate_patient(patient, latest.get(&patient.id), now, &mut summary)
            {
                tracing::warn!(patient_id = %patient.id, error = %e, "patient evaluation failed");
                summary.record_error(&patient.id, e.to_string());
            }
        }

        events::tick_completed(&summary);
        Ok(summary)
    }

    fn evaluate_patient(
        &self,
        patient: &Patient,
        latest: Option<&ActivityRecord>,
        now: DateTime<Utc>,
        summary: &mut TickSummary,
    ) -> VigilResult<()> {
        let thresholds = self.config.thresholds_for(&patient.id);

        match self
            .store
            .active_alert(&patient.id, AlertKind::ProlongedInactivity)?
        {
            None => self.maybe_open_checkin(patient, latest, thresholds, now, summary)?,
            Some(alert) if alert.state == AlertState::AwaitingCheckin => {
                self.progress_checkin(patient, &alert, latest, thresholds, now, summary)?
            }
            Some(alert) => self.progress_escalated(patient, &alert, latest, now, summary)?,
        }

        // Fall alerts are created at ingest time, never opened here; the
        // tick only moves the existing lifecycle forward.
        if let Some(alert) = self.store.active_alert(&patient.id, AlertKind::FallDetected)? {
            match alert.state {
                AlertState::AwaitingCheckin => {
                    self.progress_checkin(patient, &alert, latest, thresholds, now, summary)?
                }
                AlertState::Escalated => {
                    self.progress_escalated(patient, &alert, latest, now, summary)?
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Rule 2: no active alert and silence past the soft threshold.
    fn maybe_open_checkin(
        &self,
        patient: &Patient,
        latest: Option<&ActivityRecord>,
        thresholds: Thresholds,
        now: DateTime<Utc>,
        summary: &mut TickSummary,
    ) -> VigilResult<()> {
        // No baseline yet: a patient with zero activity records has no
        // silence to measure.
        let Some(latest) = latest else {
            tracing::debug!(patient_id = %patient.id, "no activity baseline, skipping");
            return Ok(());
        };

        if now - latest.recorded_at < thresholds.soft_threshold {
            return Ok(());
        }

        let outcome = self.machine.open_checkin(
            &patient.id,
            AlertKind::ProlongedInactivity,
            Some(latest.id.clone()),
            now,
        )?;
        if !outcome.was_created() {
            // A concurrent tick won the create; it also owns the dispatch.
            return Ok(());
        }
        summary.alerts_created += 1;

        match self
            .dispatcher
            .dispatch(outcome.alert(), patient, RecipientKind::Patient, now)?
        {
            DispatchOutcome::Sent => summary.check_ins_sent += 1,
            DispatchOutcome::Exhausted => {
                summary.record_error(&patient.id, "check-in notification permanently failed")
            }
            _ => {}
        }
        Ok(())
    }

    /// Rules 3 and 4, plus retry of a failed check-in prompt.
    fn progress_checkin(
        &self,
        patient: &Patient,
        alert: &Alert,
        latest: Option<&ActivityRecord>,
        thresholds: Thresholds,
        now: DateTime<Utc>,
        summary: &mut TickSummary,
    ) -> VigilResult<()> {
        // Rule 3: activity newer than the alert's causing record resolves
        // it silently.
        if let Some(latest) = latest {
            let newer_than_cause = match &alert.cause_activity_id {
                Some(cause_id) => latest.id != *cause_id,
                None => latest.recorded_at > alert.state_entered_at,
            };
            if newer_than_cause {
                let outcome = self.machine.resolve_from_activity(alert, &latest.id, now)?;
                if outcome.was_applied() {
                    summary.resolved += 1;
                }
                return Ok(());
            }
        }

        // Rule 4: escalation window elapsed with no newer activity.
        if now - alert.state_entered_at >= thresholds.escalation_window {
            let outcome = self.machine.escalate_after_window(alert, now)?;
            if outcome.was_applied() {
                match self.dispatcher.dispatch(
                    outcome.alert(),
                    patient,
                    RecipientKind::Caregiver,
                    now,
                )? {
                    DispatchOutcome::Sent => summary.escalations_sent += 1,
                    DispatchOutcome::Exhausted => summary
                        .record_error(&patient.id, "escalation notification permanently failed"),
                    _ => {}
                }
            }
            return Ok(());
        }

        // Still waiting: give a previously failed check-in prompt another
        // try. Deduplicates to a no-op if the prompt already went out.
        match self
            .dispatcher
            .dispatch(alert, patient, RecipientKind::Patient, now)?
        {
            DispatchOutcome::Sent => summary.check_ins_sent += 1,
            DispatchOutcome::Exhausted => {
                summary.record_error(&patient.id, "check-in notification permanently failed")
            }
            _ => {}
        }
        Ok(())
    }

    /// Rule 5 plus caregiver notification retry / re-notification.
    fn progress_escalated(
        &self,
        patient: &Patient,
        alert: &Alert,
        latest: Option<&ActivityRecord>,
        now: DateTime<Utc>,
        summary: &mut TickSummary,
    ) -> VigilResult<()> {
        // Rule 5: only an explicit acknowledgment stands an escalation
        // down. Renewed passive activity is not enough; caregivers are
        // never silently called off.
        if let Some(latest) = latest {
            if latest.source == ActivitySource::ExplicitAck
                && latest.recorded_at > alert.state_entered_at
            {
                let actor = latest
                    .detail
                    .clone()
                    .unwrap_or_else(|| format!("explicit_ack:{}", latest.id));
                let outcome =
                    self.machine
                        .acknowledge_escalated(alert, &actor, "explicit acknowledgment", now)?;
                if outcome.was_applied() {
                    summary.resolved += 1;
                }
                return Ok(());
            }
        }

        let renotify_window = self
            .config
            .escalated_renotify_secs
            .map(|secs| Duration::seconds(secs as i64));

        let outcome = match renotify_window {
            Some(window) if now - alert.state_entered_at >= window => self
                .dispatcher
                .dispatch_renotify(alert, patient, RecipientKind::Caregiver, now, now - window)?,
            _ => self
                .dispatcher
                .dispatch(alert, patient, RecipientKind::Caregiver, now)?,
        };
        match outcome {
            DispatchOutcome::Sent => summary.escalations_sent += 1,
            DispatchOutcome::Exhausted => {
                summary.record_error(&patient.id, "escalation notification permanently failed")
            }
            _ => {}
        }
        Ok(())
    }
}
