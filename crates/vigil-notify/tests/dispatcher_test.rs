//! Dispatcher integration: idempotency, bounded retry, and the
//! concurrent-dispatch race.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{Duration, Utc};
use test_fixtures::{make_patient, InMemoryStore, ScriptedSender};
use vigil_core::config::NotificationConfig;
use vigil_core::models::{
    Alert, AlertKind, AlertState, AttemptOutcome, RecipientKind, Severity,
};
use vigil_core::traits::IEngineStore;
use vigil_notify::{DispatchOutcome, NotificationDispatcher};

fn make_alert(patient_id: &str) -> Alert {
    Alert::open(
        patient_id,
        AlertKind::ProlongedInactivity,
        Severity::Warning,
        AlertState::AwaitingCheckin,
        None,
        Utc::now(),
    )
}

fn dispatcher(
    store: Arc<InMemoryStore>,
    sender: Arc<ScriptedSender>,
    max_attempts: u32,
) -> NotificationDispatcher {
    NotificationDispatcher::new(
        store,
        sender,
        NotificationConfig {
            max_attempts,
            ..Default::default()
        },
    )
}

#[test]
fn second_dispatch_after_send_is_a_noop() {
    let store = Arc::new(InMemoryStore::new());
    let sender = Arc::new(ScriptedSender::new());
    let patient = make_patient("p1");
    let alert = make_alert("p1");
    let d = dispatcher(Arc::clone(&store), Arc::clone(&sender), 3);

    let now = Utc::now();
    assert_eq!(
        d.dispatch(&alert, &patient, RecipientKind::Patient, now).unwrap(),
        DispatchOutcome::Sent
    );
    assert_eq!(
        d.dispatch(&alert, &patient, RecipientKind::Patient, now).unwrap(),
        DispatchOutcome::Deduplicated
    );

    assert_eq!(sender.sent_count(), 1);
    let attempts = store.attempts_for(&alert.id, RecipientKind::Patient).unwrap();
    assert_eq!(attempts.len(), 1);
    assert_eq!(attempts[0].outcome, AttemptOutcome::Sent);
}

#[test]
fn recipients_are_independent_scopes() {
    let store = Arc::new(InMemoryStore::new());
    let sender = Arc::new(ScriptedSender::new());
    let patient = make_patient("p1");
    let alert = make_alert("p1");
    let d = dispatcher(Arc::clone(&store), Arc::clone(&sender), 3);

    let now = Utc::now();
    assert_eq!(
        d.dispatch(&alert, &patient, RecipientKind::Patient, now).unwrap(),
        DispatchOutcome::Sent
    );
    assert_eq!(
        d.dispatch(&alert, &patient, RecipientKind::Caregiver, now).unwrap(),
        DispatchOutcome::Sent
    );
    assert_eq!(sender.sent_count(), 2);
}

#[test]
fn failures_retry_until_the_budget_is_spent() {
    let store = Arc::new(InMemoryStore::new());
    let sender = Arc::new(ScriptedSender::failing(10));
    let patient = make_patient("p1");
    let alert = make_alert("p1");
    let d = dispatcher(Arc::clone(&store), Arc::clone(&sender), 2);

    let now = Utc::now();
    assert_eq!(
        d.dispatch(&alert, &patient, RecipientKind::Patient, now).unwrap(),
        DispatchOutcome::Failed { attempt_number: 1 }
    );
    // Second failure spends the budget.
    assert_eq!(
        d.dispatch(&alert, &patient, RecipientKind::Patient, now).unwrap(),
        DispatchOutcome::Exhausted
    );
    // Further requests short-circuit without touching the sender.
    assert_eq!(
        d.dispatch(&alert, &patient, RecipientKind::Patient, now).unwrap(),
        DispatchOutcome::Exhausted
    );

    let attempts = store.attempts_for(&alert.id, RecipientKind::Patient).unwrap();
    assert_eq!(attempts.len(), 2);
    assert!(attempts.iter().all(|a| a.outcome == AttemptOutcome::Failed));
}

#[test]
fn retry_after_transient_failure_succeeds() {
    let store = Arc::new(InMemoryStore::new());
    let sender = Arc::new(ScriptedSender::failing(1));
    let patient = make_patient("p1");
    let alert = make_alert("p1");
    let d = dispatcher(Arc::clone(&store), Arc::clone(&sender), 3);

    let now = Utc::now();
    assert!(matches!(
        d.dispatch(&alert, &patient, RecipientKind::Patient, now).unwrap(),
        DispatchOutcome::Failed { .. }
    ));
    assert_eq!(
        d.dispatch(&alert, &patient, RecipientKind::Patient, now).unwrap(),
        DispatchOutcome::Sent
    );

    let attempts = store.attempts_for(&alert.id, RecipientKind::Patient).unwrap();
    assert_eq!(attempts.len(), 2);
    assert_eq!(attempts[1].outcome, AttemptOutcome::Sent);
    assert_eq!(attempts[1].attempt_number, 2);
}

#[test]
fn concurrent_dispatches_converge_on_one_send() {
    let store = Arc::new(InMemoryStore::new());
    let sender = Arc::new(ScriptedSender::new().with_delay(StdDuration::from_millis(100)));
    let patient = make_patient("p1");
    let alert = make_alert("p1");
    let d = Arc::new(dispatcher(Arc::clone(&store), Arc::clone(&sender), 3));

    let now = Utc::now();
    let mut handles = vec![];
    for _ in 0..4 {
        let d = Arc::clone(&d);
        let alert = alert.clone();
        let patient = patient.clone();
        handles.push(std::thread::spawn(move || {
            d.dispatch(&alert, &patient, RecipientKind::Patient, now).unwrap()
        }));
    }
    let outcomes: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    let sent = outcomes.iter().filter(|o| **o == DispatchOutcome::Sent).count();
    let deduped = outcomes
        .iter()
        .filter(|o| **o == DispatchOutcome::Deduplicated)
        .count();
    assert_eq!(sent, 1, "exactly one thread must send");
    assert_eq!(deduped, 3);
    assert_eq!(sender.sent_count(), 1);

    let attempts = store.attempts_for(&alert.id, RecipientKind::Patient).unwrap();
    let sent_attempts = attempts
        .iter()
        .filter(|a| a.outcome == AttemptOutcome::Sent)
        .count();
    assert_eq!(sent_attempts, 1);
}

#[test]
fn renotify_sends_again_after_the_window() {
    let store = Arc::new(InMemoryStore::new());
    let sender = Arc::new(ScriptedSender::new());
    let patient = make_patient("p1");
    let alert = make_alert("p1");
    let d = dispatcher(Arc::clone(&store), Arc::clone(&sender), 3);

    let first_send = Utc::now() - Duration::minutes(30);
    assert_eq!(
        d.dispatch(&alert, &patient, RecipientKind::Caregiver, first_send).unwrap(),
        DispatchOutcome::Sent
    );

    let now = Utc::now();
    // Within the window: still covered by the first send.
    assert_eq!(
        d.dispatch_renotify(
            &alert,
            &patient,
            RecipientKind::Caregiver,
            now,
            now - Duration::hours(1),
        )
        .unwrap(),
        DispatchOutcome::Deduplicated
    );
    // Past the window: a fresh generation goes out.
    assert_eq!(
        d.dispatch_renotify(
            &alert,
            &patient,
            RecipientKind::Caregiver,
            now,
            now - Duration::minutes(10),
        )
        .unwrap(),
        DispatchOutcome::Sent
    );
    assert_eq!(sender.sent_count(), 2);
}

#[test]
fn missing_contact_is_a_not_found_error() {
    let store = Arc::new(InMemoryStore::new());
    let sender = Arc::new(ScriptedSender::new());
    let mut patient = make_patient("p1");
    patient.caregiver_contacts.clear();
    let alert = make_alert("p1");
    let d = dispatcher(Arc::clone(&store), Arc::clone(&sender), 3);

    let err = d
        .dispatch(&alert, &patient, RecipientKind::Caregiver, Utc::now())
        .unwrap_err();
    assert_eq!(err.kind(), "not_found");
    assert_eq!(sender.sent_count(), 0);
}
