//! AlertStateMachine — owns every alert mutation. All writes go through
//! the store's compare-and-set operations, so two racing callers agree
//! on one winner and the loser observes the winner's row as a no-op.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use vigil_core::constants::ENGINE_ACTOR;
use vigil_core::errors::{VigilError, VigilResult};
use vigil_core::models::{Alert, AlertKind, AlertState, Resolution, Severity};
use vigil_core::traits::{CreateOutcome, IEngineStore, TransitionOutcome};
use vigil_observability::tracing_setup::events;

pub struct AlertStateMachine {
    store: Arc<dyn IEngineStore>,
}

impl AlertStateMachine {
    pub fn new(store: Arc<dyn IEngineStore>) -> Self {
        Self { store }
    }

    /// NORMAL → AWAITING_CHECKIN: open a soft check-in alert.
    ///
    /// `cause_activity_id` is the newest activity record at open time;
    /// the silence being measured is silence since that record.
    pub fn open_checkin(
        &self,
        patient_id: &str,
        kind: AlertKind,
        cause_activity_id: Option<String>,
        now: DateTime<Utc>,
    ) -> VigilResult<CreateOutcome> {
        let alert = Alert::open(
            patient_id,
            kind,
            Severity::Warning,
            AlertState::AwaitingCheckin,
            cause_activity_id,
            now,
        );
        let outcome = self.store.create_alert_if_none_active(&alert)?;
        if outcome.was_created() {
            events::alert_created(&alert.id, patient_id, alert.kind, alert.state);
        }
        Ok(outcome)
    }

    /// NORMAL → ESCALATED: immediate-escalation signal, skipping the soft
    /// stage. Idempotent under duplicated deliveries: a second call finds
    /// the first call's row. If a soft check-in alert of the same kind is
    /// already open, it is promoted instead.
    pub fn force_escalate(
        &self,
        patient_id: &str,
        kind: AlertKind,
        now: DateTime<Utc>,
    ) -> VigilResult<Alert> {
        let alert = Alert::open(patient_id, kind, Severity::Critical, AlertState::Escalated, None, now);
        match self.store.create_alert_if_none_active(&alert)? {
            CreateOutcome::Created(created) => {
                events::alert_created(&created.id, patient_id, kind, created.state);
                Ok(created)
            }
            CreateOutcome::AlreadyActive(existing) => match existing.state {
                AlertState::Escalated => Ok(existing),
                AlertState::AwaitingCheckin => {
                    Ok(self.apply(&existing, AlertState::Escalated, now, None)?)
                }
                // Terminal rows are never returned as active.
                other => Err(VigilError::upstream(format!(
                    "active alert in unexpected state {other}"
                ))),
            },
        }
    }

    /// AWAITING_CHECKIN → ESCALATED: the escalation window elapsed with
    /// no newer activity.
    pub fn escalate_after_window(
        &self,
        alert: &Alert,
        now: DateTime<Utc>,
    ) -> VigilResult<TransitionOutcome> {
        self.apply_cas(alert, AlertState::AwaitingCheckin, AlertState::Escalated, now, None)
    }

    /// AWAITING_CHECKIN → RESOLVED: activity newer than the alert's cause
    /// arrived; the engine itself stands the alert down.
    pub fn resolve_from_activity(
        &self,
        alert: &Alert,
        activity_id: &str,
        now: DateTime<Utc>,
    ) -> VigilResult<TransitionOutcome> {
        let resolution = Resolution {
            resolved_by: ENGINE_ACTOR.to_string(),
            resolved_at: now,
            reason: format!("renewed activity ({activity_id})"),
        };
        self.apply_cas(
            alert,
            AlertState::AwaitingCheckin,
            AlertState::Resolved,
            now,
            Some(resolution),
        )
    }

    /// ESCALATED → RESOLVED: requires an explicit acknowledging actor.
    /// An escalated alert is never stood down by passive activity alone.
    pub fn acknowledge_escalated(
        &self,
        alert: &Alert,
        actor: &str,
        reason: &str,
        now: DateTime<Utc>,
    ) -> VigilResult<TransitionOutcome> {
        if actor.trim().is_empty() {
            return Err(VigilError::validation(
                "acknowledging an escalated alert requires an actor",
            ));
        }
        let resolution = Resolution {
            resolved_by: actor.to_string(),
            resolved_at: now,
            reason: reason.to_string(),
        };
        self.apply_cas(alert, AlertState::Escalated, AlertState::Resolved, now, Some(resolution))
    }

    /// ANY_NON_TERMINAL → FALSE_ALARM: manual operator override.
    pub fn mark_false_alarm(
        &self,
        alert_id: &str,
        actor: &str,
        reason: &str,
        now: DateTime<Utc>,
    ) -> VigilResult<Alert> {
        if actor.trim().is_empty() {
            return Err(VigilError::validation("marking a false alarm requires an actor"));
        }
        let alert = self
            .store
            .get_alert(alert_id)?
            .ok_or_else(|| VigilError::not_found(format!("alert {alert_id}")))?;

        if alert.state == AlertState::FalseAlarm {
            return Ok(alert);
        }
        if alert.state.is_terminal() {
            return Err(VigilError::validation(format!(
                "alert {alert_id} is already terminal ({})",
                alert.state
            )));
        }

        let resolution = Resolution {
            resolved_by: actor.to_string(),
            resolved_at: now,
            reason: reason.to_string(),
        };
        self.apply(&alert, AlertState::FalseAlarm, now, Some(resolution))
    }

    /// CAS transition keyed on the caller's snapshot of the alert state.
    /// Re-applying a transition whose target was already reached comes
    /// back as `PreconditionFailed` carrying the existing row: a no-op,
    /// not an error.
    fn apply_cas(
        &self,
        alert: &Alert,
        expected: AlertState,
        to: AlertState,
        now: DateTime<Utc>,
        resolution: Option<Resolution>,
    ) -> VigilResult<TransitionOutcome> {
        if !expected.phase().can_transition_to(to.phase()) {
            return Err(VigilError::validation(format!(
                "illegal transition {expected} -> {to}"
            )));
        }
        let outcome =
            self.store
                .transition_alert(&alert.id, expected, to, now, resolution.as_ref())?;
        match &outcome {
            TransitionOutcome::Applied(updated) => {
                events::alert_transitioned(&updated.id, expected, to);
            }
            TransitionOutcome::PreconditionFailed(current) => {
                events::transition_lost_race(&current.id, expected, current.state);
            }
        }
        Ok(outcome)
    }

    /// Like [`Self::apply_cas`] but unwraps to the resulting row: a lost
    /// race returns whatever the winner left behind.
    fn apply(
        &self,
        alert: &Alert,
        to: AlertState,
        now: DateTime<Utc>,
        resolution: Option<Resolution>,
    ) -> VigilResult<Alert> {
        let outcome = self.apply_cas(alert, alert.state, to, now, resolution)?;
        Ok(outcome.alert().clone())
    }
}
