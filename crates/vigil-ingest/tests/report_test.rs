//! Immediate-escalation report handling.

use std::sync::Arc;

use chrono::Utc;
use test_fixtures::{make_patient, InMemoryStore, ScriptedSender};
use vigil_core::config::{NotificationConfig, RateLimitConfig};
use vigil_core::models::{AlertState, AttemptOutcome, RecipientKind};
use vigil_core::traits::IEngineStore;
use vigil_ingest::{EscalationReport, EscalationReportHandler, RateLimiter};
use vigil_notify::NotificationDispatcher;

fn handler() -> (Arc<InMemoryStore>, Arc<ScriptedSender>, EscalationReportHandler) {
    let store = Arc::new(InMemoryStore::new());
    let sender = Arc::new(ScriptedSender::new());
    let dispatcher = Arc::new(NotificationDispatcher::new(
        Arc::clone(&store) as Arc<dyn IEngineStore>,
        Arc::clone(&sender) as _,
        NotificationConfig::default(),
    ));
    let handler = EscalationReportHandler::new(
        Arc::clone(&store) as Arc<dyn IEngineStore>,
        dispatcher,
        RateLimiter::in_memory(RateLimitConfig::default()),
    );
    (store, sender, handler)
}

#[test]
fn report_creates_an_escalated_alert_and_pages_the_caregiver() {
    let (store, sender, handler) = handler();
    let patient = make_patient("p1");
    store.put_patient(&patient).unwrap();

    let response = handler
        .handle(
            "203.0.113.5",
            &EscalationReport {
                contact: patient.contacts[0].address.clone(),
                location: "kitchen".to_string(),
                message: Some("found on the floor".to_string()),
            },
            Utc::now(),
        )
        .unwrap();

    assert_eq!(response.patient_id, "p1");
    let alerts = store.all_alerts();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].state, AlertState::Escalated);

    let notes = store.notes_for(&response.alert_id);
    assert_eq!(notes.len(), 1);
    assert!(notes[0].contains("kitchen"));

    let attempts = store
        .attempts_for(&response.alert_id, RecipientKind::Caregiver)
        .unwrap();
    assert_eq!(attempts.len(), 1);
    assert_eq!(attempts[0].outcome, AttemptOutcome::Sent);
    assert_eq!(sender.sent_count(), 1);
}

#[test]
fn unroutable_contact_is_rejected() {
    let (store, _sender, handler) = handler();
    store.put_patient(&make_patient("p1")).unwrap();

    let err = handler
        .handle(
            "203.0.113.5",
            &EscalationReport {
                contact: "not-a-number".to_string(),
                location: "kitchen".to_string(),
                message: None,
            },
            Utc::now(),
        )
        .unwrap_err();

    assert_eq!(err.kind(), "validation");
    assert!(store.all_alerts().is_empty());
}

#[test]
fn unknown_contact_is_never_guessed() {
    let (store, _sender, handler) = handler();
    store.put_patient(&make_patient("p1")).unwrap();

    let err = handler
        .handle(
            "203.0.113.5",
            &EscalationReport {
                contact: "+19998887777".to_string(),
                location: "kitchen".to_string(),
                message: None,
            },
            Utc::now(),
        )
        .unwrap_err();

    assert_eq!(err.kind(), "not_found");
    assert!(store.all_alerts().is_empty());
}

#[test]
fn empty_location_is_rejected() {
    let (store, _sender, handler) = handler();
    let patient = make_patient("p1");
    store.put_patient(&patient).unwrap();

    let err = handler
        .handle(
            "203.0.113.5",
            &EscalationReport {
                contact: patient.contacts[0].address.clone(),
                location: "   ".to_string(),
                message: None,
            },
            Utc::now(),
        )
        .unwrap_err();

    assert_eq!(err.kind(), "validation");
}
