//! Integration tests for the SQLite store: round trips, the per-patient
//! max read, and the compare-and-set contracts.

use chrono::{Duration, Utc};
use test_fixtures::{make_activity, make_patient};
use vigil_core::models::{
    ActivitySource, Alert, AlertKind, AlertState, AttemptOutcome, NotificationAttempt,
    RecipientKind, Resolution, Severity,
};
use vigil_core::traits::IEngineStore;
use vigil_store::StorageEngine;

fn open_store() -> StorageEngine {
    StorageEngine::open_in_memory().expect("in-memory store")
}

fn make_alert(patient_id: &str, state: AlertState) -> Alert {
    Alert::open(
        patient_id,
        AlertKind::ProlongedInactivity,
        Severity::Warning,
        state,
        None,
        Utc::now(),
    )
}

#[test]
fn patient_round_trip_and_device_lookup() {
    let store = open_store();
    let patient = make_patient("p1");
    store.put_patient(&patient).unwrap();

    let loaded = store.get_patient("p1").unwrap().unwrap();
    assert_eq!(loaded.display_name, patient.display_name);
    assert_eq!(loaded.contacts, patient.contacts);

    let by_device = store.find_patient_by_device("dev-p1").unwrap().unwrap();
    assert_eq!(by_device.id, "p1");
    assert!(store.find_patient_by_device("dev-unknown").unwrap().is_none());

    let by_contact = store
        .find_patient_by_contact(&patient.contacts[0].address)
        .unwrap()
        .unwrap();
    assert_eq!(by_contact.id, "p1");
}

#[test]
fn monitoring_enabled_filters_disabled_patients() {
    let store = open_store();
    store.put_patient(&make_patient("p1")).unwrap();
    store
        .put_patient(&test_fixtures::make_unmonitored_patient("p2"))
        .unwrap();

    let monitored = store.patients_with_monitoring_enabled().unwrap();
    assert_eq!(monitored.len(), 1);
    assert_eq!(monitored[0].id, "p1");
}

#[test]
fn latest_activity_is_the_max_across_sources() {
    let store = open_store();
    let now = Utc::now();
    store
        .append_activity(&make_activity("p1", ActivitySource::Sensor, now - Duration::hours(2)))
        .unwrap();
    store
        .append_activity(&make_activity(
            "p1",
            ActivitySource::Conversational,
            now - Duration::minutes(5),
        ))
        .unwrap();
    store
        .append_activity(&make_activity("p1", ActivitySource::Sensor, now - Duration::hours(1)))
        .unwrap();

    let latest = store.latest_activity("p1").unwrap().unwrap();
    assert_eq!(latest.source, ActivitySource::Conversational);
    assert_eq!(latest.recorded_at, now - Duration::minutes(5));
}

#[test]
fn latest_per_patient_returns_one_row_per_patient() {
    let store = open_store();
    let now = Utc::now();
    for patient in ["p1", "p2"] {
        store
            .append_activity(&make_activity(patient, ActivitySource::Sensor, now - Duration::hours(3)))
            .unwrap();
        store
            .append_activity(&make_activity(patient, ActivitySource::Sensor, now - Duration::hours(1)))
            .unwrap();
    }

    let mut latest = store.latest_activity_per_patient().unwrap();
    latest.sort_by(|a, b| a.patient_id.cmp(&b.patient_id));
    assert_eq!(latest.len(), 2);
    assert!(latest.iter().all(|r| r.recorded_at == now - Duration::hours(1)));
}

#[test]
fn second_create_observes_the_first_row() {
    let store = open_store();
    let first = make_alert("p1", AlertState::AwaitingCheckin);
    let second = make_alert("p1", AlertState::Escalated);

    assert!(store.create_alert_if_none_active(&first).unwrap().was_created());
    let outcome = store.create_alert_if_none_active(&second).unwrap();
    assert!(!outcome.was_created());
    assert_eq!(outcome.alert().id, first.id);

    // A different kind is a separate lifecycle.
    let fall = Alert::open(
        "p1",
        AlertKind::FallDetected,
        Severity::Critical,
        AlertState::Escalated,
        None,
        Utc::now(),
    );
    assert!(store.create_alert_if_none_active(&fall).unwrap().was_created());
}

#[test]
fn create_is_allowed_again_after_terminal_state() {
    let store = open_store();
    let first = make_alert("p1", AlertState::AwaitingCheckin);
    store.create_alert_if_none_active(&first).unwrap();

    let outcome = store
        .transition_alert(
            &first.id,
            AlertState::AwaitingCheckin,
            AlertState::Resolved,
            Utc::now(),
            Some(&Resolution {
                resolved_by: "caregiver-1".to_string(),
                resolved_at: Utc::now(),
                reason: "renewed activity".to_string(),
            }),
        )
        .unwrap();
    assert!(outcome.was_applied());
    assert_eq!(outcome.alert().state, AlertState::Resolved);
    assert_eq!(
        outcome.alert().resolution.as_ref().unwrap().resolved_by,
        "caregiver-1"
    );

    let next = make_alert("p1", AlertState::AwaitingCheckin);
    assert!(store.create_alert_if_none_active(&next).unwrap().was_created());
}

#[test]
fn transition_with_stale_precondition_is_a_noop() {
    let store = open_store();
    let alert = make_alert("p1", AlertState::AwaitingCheckin);
    store.create_alert_if_none_active(&alert).unwrap();

    store
        .transition_alert(
            &alert.id,
            AlertState::AwaitingCheckin,
            AlertState::Escalated,
            Utc::now(),
            None,
        )
        .unwrap();

    // Second writer still believes the alert awaits check-in.
    let outcome = store
        .transition_alert(
            &alert.id,
            AlertState::AwaitingCheckin,
            AlertState::Resolved,
            Utc::now(),
            None,
        )
        .unwrap();
    assert!(!outcome.was_applied());
    assert_eq!(outcome.alert().state, AlertState::Escalated);
}

#[test]
fn attempt_outcome_is_immutable_once_terminal() {
    let store = open_store();
    let alert = make_alert("p1", AlertState::AwaitingCheckin);
    store.create_alert_if_none_active(&alert).unwrap();

    let attempt = NotificationAttempt::pending(
        &alert.id,
        RecipientKind::Patient,
        1,
        vigil_core::models::ContactChannel::Sms,
        Utc::now(),
    );
    store.append_attempt(&attempt).unwrap();
    store
        .finish_attempt(&attempt.id, AttemptOutcome::Sent, Some("msg-1"))
        .unwrap();
    // A late failure report must not overwrite the sent outcome.
    store
        .finish_attempt(&attempt.id, AttemptOutcome::Failed, None)
        .unwrap();

    let attempts = store.attempts_for(&alert.id, RecipientKind::Patient).unwrap();
    assert_eq!(attempts.len(), 1);
    assert_eq!(attempts[0].outcome, AttemptOutcome::Sent);
    assert_eq!(attempts[0].provider_message_id.as_deref(), Some("msg-1"));
}

#[test]
fn resolution_notes_append_to_terminal_alerts() {
    let store = open_store();
    let alert = make_alert("p1", AlertState::AwaitingCheckin);
    store.create_alert_if_none_active(&alert).unwrap();
    store
        .transition_alert(
            &alert.id,
            AlertState::AwaitingCheckin,
            AlertState::FalseAlarm,
            Utc::now(),
            None,
        )
        .unwrap();

    store.append_resolution_note(&alert.id, "sensor was unplugged").unwrap();
    store.append_resolution_note(&alert.id, "confirmed with family").unwrap();
    // Notes never mutate the row itself.
    let loaded = store.get_alert(&alert.id).unwrap().unwrap();
    assert_eq!(loaded.state, AlertState::FalseAlarm);
}
