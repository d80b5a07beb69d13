//! Webhook normalization: classification, validation, the escalation
//! bypass, and rate limiting at the door.

use std::sync::Arc;

use chrono::{Duration, Utc};
use serde_json::json;
use test_fixtures::{make_patient, InMemoryStore, ScriptedSender};
use vigil_core::config::{MonitoringConfig, NotificationConfig, RateLimitConfig};
use vigil_core::models::{AlertKind, AlertState, AttemptOutcome, RecipientKind};
use vigil_core::traits::IEngineStore;
use vigil_ingest::{IngestOutcome, RateLimiter, SensorEventNormalizer};
use vigil_notify::NotificationDispatcher;

fn normalizer_with(
    rate_limit: RateLimitConfig,
    monitoring: MonitoringConfig,
) -> (Arc<InMemoryStore>, Arc<ScriptedSender>, SensorEventNormalizer) {
    let store = Arc::new(InMemoryStore::new());
    let sender = Arc::new(ScriptedSender::new());
    let dispatcher = Arc::new(NotificationDispatcher::new(
        Arc::clone(&store) as Arc<dyn IEngineStore>,
        Arc::clone(&sender) as _,
        NotificationConfig::default(),
    ));
    let normalizer = SensorEventNormalizer::new(
        Arc::clone(&store) as Arc<dyn IEngineStore>,
        dispatcher,
        RateLimiter::in_memory(rate_limit),
        monitoring,
    );
    (store, sender, normalizer)
}

fn normalizer(
    rate_limit: RateLimitConfig,
) -> (Arc<InMemoryStore>, Arc<ScriptedSender>, SensorEventNormalizer) {
    normalizer_with(rate_limit, MonitoringConfig::default())
}

fn default_normalizer() -> (Arc<InMemoryStore>, Arc<ScriptedSender>, SensorEventNormalizer) {
    normalizer(RateLimitConfig::default())
}

#[test]
fn presence_detection_becomes_an_activity_record() {
    let (store, _sender, normalizer) = default_normalizer();
    store.put_patient(&make_patient("p1")).unwrap();
    let observed = Utc::now() - Duration::seconds(3);

    let outcome = normalizer
        .handle_sensor_webhook(
            "10.0.0.1",
            &json!({
                "device_type": "motion",
                "device_id": "dev-p1",
                "detected": true,
                "observed_at": observed.to_rfc3339(),
                "battery": 82
            }),
            Utc::now(),
        )
        .unwrap();

    match outcome {
        IngestOutcome::Recorded { patient_id, .. } => assert_eq!(patient_id, "p1"),
        other => panic!("expected Recorded, got {other:?}"),
    }
    let latest = store.latest_activity("p1").unwrap().unwrap();
    assert_eq!(latest.recorded_at, observed);
}

#[test]
fn absence_sample_is_acknowledged_without_writes() {
    let (store, _sender, normalizer) = default_normalizer();
    store.put_patient(&make_patient("p1")).unwrap();

    let outcome = normalizer
        .handle_sensor_webhook(
            "10.0.0.1",
            &json!({
                "device_type": "motion",
                "device_id": "dev-p1",
                "detected": false,
                "observed_at": Utc::now().to_rfc3339()
            }),
            Utc::now(),
        )
        .unwrap();

    assert!(matches!(outcome, IngestOutcome::Ignored { .. }));
    assert!(store.latest_activity("p1").unwrap().is_none());
}

#[test]
fn unmonitored_device_type_is_ignored_with_zero_writes() {
    let (store, sender, normalizer) = default_normalizer();
    store.put_patient(&make_patient("p1")).unwrap();

    let outcome = normalizer
        .handle_sensor_webhook(
            "10.0.0.1",
            &json!({
                "device_type": "thermostat",
                "device_id": "dev-p1",
                "detected": true,
                "observed_at": Utc::now().to_rfc3339()
            }),
            Utc::now(),
        )
        .unwrap();

    assert!(matches!(outcome, IngestOutcome::Ignored { .. }));
    assert!(store.latest_activity("p1").unwrap().is_none());
    assert!(store.all_alerts().is_empty());
    assert_eq!(sender.sent_count(), 0);
}

#[test]
fn malformed_payloads_are_validation_errors() {
    let (store, _sender, normalizer) = default_normalizer();
    store.put_patient(&make_patient("p1")).unwrap();
    let now = Utc::now();

    // Missing device_id.
    let err = normalizer
        .handle_sensor_webhook("10.0.0.1", &json!({"device_type": "motion"}), now)
        .unwrap_err();
    assert_eq!(err.kind(), "validation");

    // Wrong discriminator type.
    let err = normalizer
        .handle_sensor_webhook(
            "10.0.0.1",
            &json!({"device_type": 7, "device_id": "dev-p1"}),
            now,
        )
        .unwrap_err();
    assert_eq!(err.kind(), "validation");

    // Presence event without a detection state.
    let err = normalizer
        .handle_sensor_webhook(
            "10.0.0.1",
            &json!({"device_type": "motion", "device_id": "dev-p1"}),
            now,
        )
        .unwrap_err();
    assert_eq!(err.kind(), "validation");

    assert!(store.latest_activity("p1").unwrap().is_none());
}

#[test]
fn unmapped_device_is_not_found() {
    let (_store, _sender, normalizer) = default_normalizer();

    let err = normalizer
        .handle_sensor_webhook(
            "10.0.0.1",
            &json!({
                "device_type": "motion",
                "device_id": "dev-ghost",
                "detected": true,
                "observed_at": Utc::now().to_rfc3339()
            }),
            Utc::now(),
        )
        .unwrap_err();
    assert_eq!(err.kind(), "not_found");
}

#[test]
fn fall_signal_escalates_immediately_with_one_notification() {
    let (store, sender, normalizer) = default_normalizer();
    store.put_patient(&make_patient("p1")).unwrap();
    let now = Utc::now();

    let outcome = normalizer
        .handle_sensor_webhook(
            "10.0.0.1",
            &json!({"device_type": "fall", "device_id": "dev-p1"}),
            now,
        )
        .unwrap();

    let alert_id = match outcome {
        IngestOutcome::Escalated { alert_id } => alert_id,
        other => panic!("expected Escalated, got {other:?}"),
    };

    let alerts = store.all_alerts();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].state, AlertState::Escalated);
    assert_eq!(alerts[0].kind, AlertKind::FallDetected);
    // The soft stage was never entered and the activity sink untouched.
    assert!(store.latest_activity("p1").unwrap().is_none());

    let attempts = store.attempts_for(&alert_id, RecipientKind::Caregiver).unwrap();
    assert_eq!(attempts.len(), 1);
    assert_eq!(attempts[0].outcome, AttemptOutcome::Sent);
    assert_eq!(sender.sent_count(), 1);
}

#[test]
fn duplicated_fall_delivery_converges_on_one_alert_and_one_send() {
    let (store, sender, normalizer) = default_normalizer();
    store.put_patient(&make_patient("p1")).unwrap();
    let now = Utc::now();
    let payload = json!({"device_type": "sos_button", "device_id": "dev-p1"});

    let first = normalizer
        .handle_sensor_webhook("10.0.0.1", &payload, now)
        .unwrap();
    let second = normalizer
        .handle_sensor_webhook("10.0.0.1", &payload, now + Duration::seconds(1))
        .unwrap();

    let (IngestOutcome::Escalated { alert_id: a1 }, IngestOutcome::Escalated { alert_id: a2 }) =
        (first, second)
    else {
        panic!("both deliveries must escalate");
    };
    assert_eq!(a1, a2);
    assert_eq!(store.all_alerts().len(), 1);
    assert_eq!(sender.sent_count(), 1);
}

#[test]
fn fall_signal_without_bypass_opens_a_soft_checkin() {
    let monitoring = MonitoringConfig {
        bypass_soft_stage: vec![],
        ..Default::default()
    };
    let (store, sender, normalizer) = normalizer_with(RateLimitConfig::default(), monitoring);
    store.put_patient(&make_patient("p1")).unwrap();

    let outcome = normalizer
        .handle_sensor_webhook(
            "10.0.0.1",
            &json!({"device_type": "fall", "device_id": "dev-p1"}),
            Utc::now(),
        )
        .unwrap();

    assert!(matches!(outcome, IngestOutcome::CheckinRequested { .. }));
    let alerts = store.all_alerts();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].state, AlertState::AwaitingCheckin);
    // The prompt goes to the patient, not the caregiver.
    assert_eq!(sender.sent()[0].recipient, RecipientKind::Patient);
}

#[test]
fn over_quota_senders_get_a_retry_after() {
    let (store, _sender, normalizer) = normalizer(RateLimitConfig {
        limit: 2,
        window_secs: 60,
    });
    store.put_patient(&make_patient("p1")).unwrap();
    let now = Utc::now();
    let payload = json!({
        "device_type": "motion",
        "device_id": "dev-p1",
        "detected": true,
        "observed_at": now.to_rfc3339()
    });

    normalizer.handle_sensor_webhook("10.0.0.9", &payload, now).unwrap();
    normalizer.handle_sensor_webhook("10.0.0.9", &payload, now).unwrap();
    let err = normalizer
        .handle_sensor_webhook("10.0.0.9", &payload, now)
        .unwrap_err();

    assert_eq!(err.kind(), "rate_limit");
    let body = err.to_body();
    assert!(body.retry_after_secs.unwrap() <= 60);
}
