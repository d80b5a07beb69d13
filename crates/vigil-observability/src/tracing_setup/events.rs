//! Structured events with stable field names, one function per event so
//! call sites stay greppable and field names stay consistent.

use vigil_core::models::{ActivitySource, AlertKind, AlertState, RecipientKind, TickSummary};

pub fn activity_recorded(patient_id: &str, source: ActivitySource) {
    tracing::info!(
        target: "vigil::ingest",
        patient_id = %patient_id,
        source = source.as_str(),
        "activity recorded"
    );
}

pub fn event_ignored(device_type: &str, reason: &str) {
    tracing::debug!(
        target: "vigil::ingest",
        device_type = %device_type,
        reason = %reason,
        "event ignored"
    );
}

pub fn event_rejected(kind: &str, message: &str) {
    tracing::warn!(
        target: "vigil::ingest",
        kind = %kind,
        message = %message,
        "event rejected"
    );
}

pub fn alert_created(alert_id: &str, patient_id: &str, kind: AlertKind, state: AlertState) {
    tracing::info!(
        target: "vigil::engine",
        alert_id = %alert_id,
        patient_id = %patient_id,
        kind = kind.as_str(),
        state = state.as_str(),
        "alert created"
    );
}

pub fn alert_transitioned(alert_id: &str, from: AlertState, to: AlertState) {
    tracing::info!(
        target: "vigil::engine",
        alert_id = %alert_id,
        from = from.as_str(),
        to = to.as_str(),
        "alert transitioned"
    );
}

pub fn transition_lost_race(alert_id: &str, expected: AlertState, found: AlertState) {
    tracing::debug!(
        target: "vigil::engine",
        alert_id = %alert_id,
        expected = expected.as_str(),
        found = found.as_str(),
        "transition precondition no longer holds"
    );
}

pub fn notification_sent(alert_id: &str, recipient: RecipientKind, attempt_number: u32) {
    tracing::info!(
        target: "vigil::notify",
        alert_id = %alert_id,
        recipient = recipient.as_str(),
        attempt_number,
        "notification sent"
    );
}

pub fn notification_failed(alert_id: &str, recipient: RecipientKind, attempt_number: u32, error: &str) {
    tracing::warn!(
        target: "vigil::notify",
        alert_id = %alert_id,
        recipient = recipient.as_str(),
        attempt_number,
        error = %error,
        "notification attempt failed"
    );
}

pub fn notification_exhausted(alert_id: &str, recipient: RecipientKind, attempts: u32) {
    tracing::error!(
        target: "vigil::notify",
        alert_id = %alert_id,
        recipient = recipient.as_str(),
        attempts,
        "notification permanently failed"
    );
}

pub fn tick_completed(summary: &TickSummary) {
    tracing::info!(
        target: "vigil::engine",
        alerts_created = summary.alerts_created,
        check_ins_sent = summary.check_ins_sent,
        escalations_sent = summary.escalations_sent,
        resolved = summary.resolved,
        error_count = summary.errors.len(),
        "tick completed"
    );
}
